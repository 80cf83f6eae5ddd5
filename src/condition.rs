//! Condition matching. Every rule outcome here is a boolean: malformed rules fail closed.

use serde_json::Value;
use tracing::warn;

use crate::context::EvalContext;
use crate::model::{Condition, ConditionValue, Operator};

/// True iff every condition holds (empty list holds trivially).
pub fn all_hold(conditions: &[Condition], ctx: &EvalContext<'_>) -> bool {
    conditions.iter().all(|c| holds(c, ctx))
}

pub fn holds(cond: &Condition, ctx: &EvalContext<'_>) -> bool {
    let field = ctx.lookup(&cond.field);
    let principal_id;
    let expected: &Value = match &cond.value {
        ConditionValue::CurrentPrincipalId => {
            principal_id = Value::String(ctx.principal().id.clone());
            &principal_id
        }
        ConditionValue::Literal(v) => v,
    };
    compare(cond.operator, field, expected, &cond.field)
}

fn compare(op: Operator, field: Option<&Value>, expected: &Value, path: &str) -> bool {
    match op {
        Operator::Eq => field.is_some_and(|v| values_equal(v, expected)),
        Operator::Ne => !field.is_some_and(|v| values_equal(v, expected)),
        Operator::In => match expected.as_array() {
            Some(items) => field.is_some_and(|v| items.iter().any(|i| values_equal(v, i))),
            None => not_a_list(path),
        },
        Operator::Nin => match expected.as_array() {
            Some(items) => !field.is_some_and(|v| items.iter().any(|i| values_equal(v, i))),
            None => not_a_list(path),
        },
        Operator::Gt => numeric(field, expected, |a, b| a > b),
        Operator::Gte => numeric(field, expected, |a, b| a >= b),
        Operator::Lt => numeric(field, expected, |a, b| a < b),
        Operator::Lte => numeric(field, expected, |a, b| a <= b),
        Operator::Unknown => {
            warn!(target: "course_authz::condition", "unknown operator on field '{}'; condition fails closed", path);
            false
        }
    }
}

fn not_a_list(path: &str) -> bool {
    warn!(target: "course_authz::condition", "in/nin on field '{}' without a list value; condition fails closed", path);
    false
}

/// Strict equality, except numbers compare by value so `18` equals `18.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn numeric(field: Option<&Value>, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (field.and_then(Value::as_f64), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod condition_tests;
