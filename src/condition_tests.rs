use super::*;
use serde_json::{json, Map};

use crate::model::Principal;

fn ctx_with(principal: &Principal, v: Value) -> EvalContext<'_> {
    let map: Map<String, Value> = match v {
        Value::Object(m) => m,
        _ => Map::new(),
    };
    EvalContext::new(principal, &map)
}

fn cond(field: &str, op: Operator, v: Value) -> Condition {
    Condition::new(field, op, ConditionValue::Literal(v))
}

#[test]
fn numeric_threshold() {
    let p = Principal::new("u1", "student");
    let c = cond("age", Operator::Gte, json!(18));
    assert!(holds(&c, &ctx_with(&p, json!({"age": 18}))));
    assert!(!holds(&c, &ctx_with(&p, json!({"age": 17}))));
    assert!(holds(&cond("age", Operator::Gt, json!(18)), &ctx_with(&p, json!({"age": 18.5}))));
    assert!(holds(&cond("age", Operator::Lt, json!(18)), &ctx_with(&p, json!({"age": 17}))));
    assert!(holds(&cond("age", Operator::Lte, json!(18)), &ctx_with(&p, json!({"age": 18}))));
}

#[test]
fn numeric_operators_reject_non_numbers() {
    let p = Principal::new("u1", "student");
    let c = cond("age", Operator::Gte, json!(18));
    assert!(!holds(&c, &ctx_with(&p, json!({"age": "20"}))));
    assert!(!holds(&c, &ctx_with(&p, json!({}))));
    assert!(!holds(&cond("age", Operator::Lt, json!("x")), &ctx_with(&p, json!({"age": 1}))));
}

#[test]
fn equality_is_strict_but_numeric_aware() {
    let p = Principal::new("u1", "student");
    assert!(holds(&cond("n", Operator::Eq, json!(18)), &ctx_with(&p, json!({"n": 18.0}))));
    assert!(!holds(&cond("n", Operator::Eq, json!("18")), &ctx_with(&p, json!({"n": 18}))));
    assert!(holds(&cond("n", Operator::Ne, json!("18")), &ctx_with(&p, json!({"n": 18}))));
    assert!(!holds(&cond("n", Operator::Ne, json!(18)), &ctx_with(&p, json!({"n": 18}))));
}

#[test]
fn absent_field_semantics() {
    let p = Principal::new("u1", "student");
    let empty = ctx_with(&p, json!({}));
    assert!(!holds(&cond("missing", Operator::Eq, Value::Null), &empty));
    assert!(holds(&cond("missing", Operator::Ne, json!(1)), &empty));
    assert!(!holds(&cond("missing", Operator::In, json!([1, 2])), &empty));
    assert!(holds(&cond("missing", Operator::Nin, json!([1, 2])), &empty));
    // present null is a real value
    let with_null = ctx_with(&p, json!({"x": null}));
    assert!(holds(&cond("x", Operator::Eq, Value::Null), &with_null));
}

#[test]
fn membership_operators() {
    let p = Principal::new("u1", "student");
    let ctx = ctx_with(&p, json!({"resource": {"status": "open"}}));
    assert!(holds(&cond("resource.status", Operator::In, json!(["open", "waitlist"])), &ctx));
    assert!(!holds(&cond("resource.status", Operator::Nin, json!(["open", "waitlist"])), &ctx));
    assert!(holds(&cond("resource.status", Operator::Nin, json!(["closed"])), &ctx));
    // non-list value fails closed for both
    assert!(!holds(&cond("resource.status", Operator::In, json!("open")), &ctx));
    assert!(!holds(&cond("resource.status", Operator::Nin, json!("closed")), &ctx));
}

#[test]
fn current_principal_reference() {
    let p = Principal::new("u42", "student");
    let c = Condition::owned_by_principal("resource.id");
    assert!(holds(&c, &ctx_with(&p, json!({"resource": {"id": "u42"}}))));
    assert!(!holds(&c, &ctx_with(&p, json!({"resource": {"id": "u7"}}))));
    // a literal with the same text is not a reference
    let lit = cond("resource.id", Operator::Eq, json!("current_principal_id"));
    assert!(!holds(&lit, &ctx_with(&p, json!({"resource": {"id": "u42"}}))));
}

#[test]
fn unknown_operator_fails_closed() {
    let p = Principal::new("u1", "student");
    let c: Condition = serde_json::from_value(json!({"field": "age", "operator": "regex", "value": ".*"})).unwrap();
    assert_eq!(c.operator, Operator::Unknown);
    assert!(!holds(&c, &ctx_with(&p, json!({"age": 1}))));
}

#[test]
fn conditions_are_and_combined() {
    let p = Principal::new("u1", "student");
    let conds = vec![cond("age", Operator::Gte, json!(18)), cond("year", Operator::In, json!([3, 4]))];
    assert!(all_hold(&conds, &ctx_with(&p, json!({"age": 20, "year": 3}))));
    assert!(!all_hold(&conds, &ctx_with(&p, json!({"age": 20, "year": 1}))));
    assert!(!all_hold(&conds, &ctx_with(&p, json!({"age": 16, "year": 3}))));
    assert!(all_hold(&[], &ctx_with(&p, json!({}))));
}
