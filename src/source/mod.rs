//! Permission sources: where the evaluator loads a role's grants from on a cache miss.
//! The evaluator depends only on `PermissionSource`; concrete stores live in sub-modules.

pub mod memory;
pub mod file;
#[cfg(feature = "postgres")]
pub mod postgres;

use futures_util::future::BoxFuture;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::model::Grant;

pub use memory::MemoryPermissionStore;
pub use file::{GrantsDocument, JsonFileSource};
#[cfg(feature = "postgres")]
pub use postgres::PgPermissionSource;

/// Read-only access to role grants. Implementations must not cache; the evaluator does.
pub trait PermissionSource: Send + Sync {
    fn load_grants<'a>(&'a self, role: &'a str) -> BoxFuture<'a, StoreResult<Vec<Grant>>>;
}

impl<T: PermissionSource + ?Sized> PermissionSource for Arc<T> {
    fn load_grants<'a>(&'a self, role: &'a str) -> BoxFuture<'a, StoreResult<Vec<Grant>>> {
        (**self).load_grants(role)
    }
}

/// Collapse grants that share a resource and condition list into one action set,
/// keeping first-seen order.
pub fn merge_grants(grants: impl IntoIterator<Item = Grant>) -> Vec<Grant> {
    let mut out: Vec<Grant> = Vec::new();
    for g in grants {
        match out.iter_mut().find(|o| o.resource == g.resource && o.conditions == g.conditions) {
            Some(existing) => {
                for a in g.actions {
                    if !existing.actions.contains(&a) { existing.actions.push(a); }
                }
            }
            None => out.push(g),
        }
    }
    out
}
