//! Starting roles and permissions for the course-selection service.

use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::model::{Condition, NewPermission};
use crate::source::MemoryPermissionStore;

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_ADMIN: &str = "admin";

/// Default permission catalogue: `(role, permission)`.
pub fn default_permissions() -> Vec<(&'static str, NewPermission)> {
    let own = || Condition::owned_by_principal("resource.userId");
    let self_only = || Condition::owned_by_principal("resource.id");
    vec![
        (ROLE_STUDENT, NewPermission::new("course:read", "course", "read")),
        (ROLE_STUDENT, NewPermission::new("course:list", "course", "list")),
        (ROLE_STUDENT, NewPermission::new("course:compare", "course", "compare")),
        (ROLE_STUDENT, NewPermission::new("favorite:create", "favorite", "create")),
        (ROLE_STUDENT, NewPermission::new("favorite:list:own", "favorite", "list").with_condition(own())),
        (ROLE_STUDENT, NewPermission::new("favorite:delete:own", "favorite", "delete").with_condition(own())),
        (ROLE_STUDENT, NewPermission::new("selection:create", "selection", "create")),
        (ROLE_STUDENT, NewPermission::new("selection:read:own", "selection", "read").with_condition(own())),
        (ROLE_STUDENT, NewPermission::new("selection:delete:own", "selection", "delete").with_condition(own())),
        (ROLE_STUDENT, NewPermission::new("user:read:self", "user", "read").with_condition(self_only())),
        (ROLE_STUDENT, NewPermission::new("user:update:self", "user", "update").with_condition(self_only())),
        (ROLE_ADMIN, NewPermission::new("course:*", "course", "*")),
        (ROLE_ADMIN, NewPermission::new("user:*", "user", "*")),
        (ROLE_ADMIN, NewPermission::new("permission:*", "permission", "*")),
        (ROLE_ADMIN, NewPermission::new("selection:*", "selection", "*")),
        (ROLE_ADMIN, NewPermission::new("favorite:*", "favorite", "*")),
    ]
}

/// Install the default catalogue. Idempotent: existing names and bindings are kept.
/// Returns the number of new role bindings created.
pub fn install_default_grants(store: &MemoryPermissionStore) -> StoreResult<usize> {
    let mut bound = 0usize;
    for (role, req) in default_permissions() {
        let perm = match store.create_permission(req.clone()) {
            Ok(p) => p,
            Err(StoreError::Conflict(_)) => store
                .permission_by_name(&req.name)
                .ok_or_else(|| StoreError::NotFound(format!("permission '{}'", req.name)))?,
            Err(e) => return Err(e),
        };
        match store.grant(role, perm.id, Some("system")) {
            Ok(_) => bound += 1,
            Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }
    info!(target: "course_authz::seed", "default grants installed new_bindings={}", bound);
    Ok(bound)
}
