//! Role-based permission evaluation for the course-selection service.
//! Keep the public surface thin and split implementation across sub-modules.

pub mod model;
pub mod context;
pub mod condition;
pub mod cache;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod source;
pub mod seed;
pub mod middleware;

pub use cache::{CacheStats, RoleCache};
pub use config::EvaluatorConfig;
pub use error::{AccessError, StoreError, StoreResult};
pub use evaluator::PermissionEvaluator;
pub use middleware::{authorize, require_permission, CheckMode, LoadedResource, PermissionGuard, PermissionRequirement, ResourceLoader};
pub use model::{
    Condition, ConditionValue, Grant, NewPermission, Operator, Permission, PermissionCheck, PermissionPatch, Principal,
    RolePermission, WILDCARD_ACTION,
};
pub use source::{GrantsDocument, JsonFileSource, MemoryPermissionStore, PermissionSource};
#[cfg(feature = "postgres")]
pub use source::PgPermissionSource;
