//! Permission data model: principals, grants, conditions and the administrative records
//! they are built from. Everything here is plain data; evaluation lives in `condition` and
//! `evaluator`.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

/// Action token matching any requested action on a resource.
pub const WILDCARD_ACTION: &str = "*";

/// Authenticated actor making a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Principal {
    pub id: String,
    pub role: String,
    /// Extra principal data exposed to conditions under `user.*` (e.g. `profile.department`).
    #[serde(default, flatten)]
    pub attrs: Map<String, Value>,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self { id: id.into(), role: role.into(), attrs: Map::new() }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Object form used as `user` in the merged evaluation context.
    /// `id` and `role` always win over same-named attrs.
    pub fn to_value(&self) -> Value {
        let mut obj = self.attrs.clone();
        obj.insert("id".into(), Value::String(self.id.clone()));
        obj.insert("role".into(), Value::String(self.role.clone()));
        Value::Object(obj)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    In,
    Nin,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Anything not recognised when the rule was loaded. Never matches.
    #[serde(other)]
    Unknown,
}

/// Key of the object form that marks a symbolic reference: `{"ref": "current_principal_id"}`.
pub const REF_KEY: &str = "ref";
pub const CURRENT_PRINCIPAL_ID_REF: &str = "current_principal_id";

/// Right-hand side of a condition. On the wire a reference is `{"ref": "<name>"}`; every
/// other JSON value is taken as a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// Resolved to the evaluating principal's id.
    CurrentPrincipalId,
    Literal(Value),
}

impl ConditionValue {
    pub fn literal(v: impl Into<Value>) -> Self { ConditionValue::Literal(v.into()) }

    fn from_json(v: Value) -> Result<Self, String> {
        match v {
            Value::Object(ref obj) if obj.len() == 1 && obj.contains_key(REF_KEY) => {
                match obj.get(REF_KEY).and_then(Value::as_str) {
                    Some(CURRENT_PRINCIPAL_ID_REF) => Ok(ConditionValue::CurrentPrincipalId),
                    other => Err(format!("unknown reference {:?}", other)),
                }
            }
            other => Ok(ConditionValue::Literal(other)),
        }
    }
}

impl Serialize for ConditionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConditionValue::CurrentPrincipalId => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(REF_KEY, CURRENT_PRINCIPAL_ID_REF)?;
                map.end()
            }
            ConditionValue::Literal(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ConditionValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ConditionValue::from_json(Value::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    /// Dotted path into the merged context, e.g. `resource.userId`.
    pub field: String,
    pub operator: Operator,
    pub value: ConditionValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: ConditionValue) -> Self {
        Self { field: field.into(), operator, value }
    }

    /// `field == <current principal id>`
    pub fn owned_by_principal(field: impl Into<String>) -> Self {
        Self::new(field, Operator::Eq, ConditionValue::CurrentPrincipalId)
    }

    /// Placeholder for a rule that could not be read. Never holds.
    pub fn never() -> Self { Self::new("", Operator::Unknown, ConditionValue::Literal(Value::Null)) }
}

/// Decode a stored condition list one rule at a time. A malformed rule is replaced by
/// [`Condition::never`] so only the grant carrying it stops matching.
pub fn decode_conditions(raw: Value) -> Vec<Condition> {
    let items = match raw {
        Value::Null => return Vec::new(),
        Value::Array(items) => items,
        other => {
            warn!(target: "course_authz::model", "conditions must be a list, got {}; grant disabled", other);
            return vec![Condition::never()];
        }
    };
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<Condition>(item.clone()).unwrap_or_else(|e| {
                warn!(target: "course_authz::model", "malformed condition {} ({}); treated as never matching", item, e);
                Condition::never()
            })
        })
        .collect()
}

fn lenient_conditions<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Condition>, D::Error> {
    Ok(decode_conditions(Value::deserialize(deserializer)?))
}

/// A (resource, action-set, conditions) tuple attached to a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Grant {
    pub resource: String,
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_conditions")]
    pub conditions: Vec<Condition>,
}

impl Grant {
    pub fn new<I, S>(resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { resource: resource.into(), actions: actions.into_iter().map(Into::into).collect(), conditions: Vec::new() }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn allows_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == WILDCARD_ACTION || a == action)
    }

    pub fn is_unconditional(&self) -> bool { self.conditions.is_empty() }
}

/// Administratively managed named grant. Read-only to the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub resource: String,
    pub action: String,
    #[serde(default, deserialize_with = "lenient_conditions")]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn to_grant(&self) -> Grant {
        Grant { resource: self.resource.clone(), actions: vec![self.action.clone()], conditions: self.conditions.clone() }
    }
}

/// Input for creating a permission record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPermission {
    pub name: String,
    pub resource: String,
    pub action: String,
    #[serde(default, deserialize_with = "lenient_conditions")]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPermission {
    pub fn new(name: impl Into<String>, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self { name: name.into(), resource: resource.into(), action: action.into(), conditions: Vec::new(), description: None }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PermissionPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Binding of a permission to a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RolePermission {
    pub role: String,
    pub permission_id: Uuid,
    pub granted_at: DateTime<Utc>,
    #[serde(default)]
    pub granted_by: Option<String>,
}

/// One requested (resource, action) with its dynamic context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PermissionCheck {
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl PermissionCheck {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self { resource: resource.into(), action: action.into(), context: Map::new() }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Attach resolved resource data under `resource`.
    pub fn with_resource(self, resource: Value) -> Self { self.with_context("resource", resource) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn condition_values_read_plain_literals_and_refs() {
        let lit: ConditionValue = serde_json::from_value(json!(18)).unwrap();
        assert_eq!(lit, ConditionValue::literal(18));
        let s: ConditionValue = serde_json::from_value(json!("current_principal_id")).unwrap();
        assert_eq!(s, ConditionValue::literal("current_principal_id"));
        let r: ConditionValue = serde_json::from_value(json!({"ref": "current_principal_id"})).unwrap();
        assert_eq!(r, ConditionValue::CurrentPrincipalId);
        assert!(serde_json::from_value::<ConditionValue>(json!({"ref": "someone_else"})).is_err());

        assert_eq!(serde_json::to_value(ConditionValue::CurrentPrincipalId).unwrap(), json!({"ref": "current_principal_id"}));
        assert_eq!(serde_json::to_value(ConditionValue::literal(json!([1, 2]))).unwrap(), json!([1, 2]));
    }

    #[test]
    fn malformed_rules_become_never_conditions() {
        let g: Grant = serde_json::from_value(json!({
            "resource": "enrollment",
            "actions": ["create"],
            "conditions": [
                {"field": "age", "operator": "gte", "value": 18},
                {"field": "year", "operator": 3, "value": 1},
                {"operator": "eq"}
            ]
        }))
        .unwrap();
        assert_eq!(g.conditions.len(), 3);
        assert_eq!(g.conditions[0], Condition::new("age", Operator::Gte, ConditionValue::literal(18)));
        assert_eq!(g.conditions[1], Condition::never());
        assert_eq!(g.conditions[2], Condition::never());

        assert_eq!(decode_conditions(json!("oops")), vec![Condition::never()]);
        assert!(decode_conditions(Value::Null).is_empty());
    }
}
