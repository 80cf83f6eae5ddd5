//! Evaluation context: the caller's check context merged with the principal, plus the
//! dotted-path accessor conditions use to read it.

use serde_json::{Map, Value};

use crate::model::Principal;

/// Merged, read-only view handed to condition evaluation.
#[derive(Debug, Clone)]
pub struct EvalContext<'a> {
    principal: &'a Principal,
    root: Value,
}

impl<'a> EvalContext<'a> {
    /// `context` merged with `{ user: principal }`; the principal replaces any caller `user`.
    pub fn new(principal: &'a Principal, context: &Map<String, Value>) -> Self {
        let mut root = context.clone();
        root.insert("user".into(), principal.to_value());
        Self { principal, root: Value::Object(root) }
    }

    pub fn principal(&self) -> &Principal { self.principal }

    /// Resolve a dotted path. `None` means the path is absent, which is distinct from
    /// a present `null`.
    pub fn lookup(&self, path: &str) -> Option<&Value> { lookup_path(&self.root, path) }

    pub fn as_value(&self) -> &Value { &self.root }
}

/// Walk `path` segment by segment: object keys by name, array elements by index.
pub fn lookup_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() { return None; }
    let mut segments = path.split('.');
    descend(root, &mut segments)
}

fn descend<'v, 's>(cur: &'v Value, segments: &mut impl Iterator<Item = &'s str>) -> Option<&'v Value> {
    let Some(seg) = segments.next() else { return Some(cur); };
    if seg.is_empty() { return None; }
    let next = match cur {
        Value::Object(map) => map.get(seg)?,
        Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
        _ => return None,
    };
    descend(next, segments)
}
