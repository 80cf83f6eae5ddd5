//! In-process permission store: administrative CRUD over `Permission` and `RolePermission`
//! records, served to the evaluator as merged grants.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{merge_grants, PermissionSource};
use crate::error::{StoreError, StoreResult};
use crate::model::{Grant, NewPermission, Permission, PermissionPatch, RolePermission};

#[derive(Debug, Default)]
struct Tables {
    permissions: HashMap<Uuid, Permission>,
    // insertion order of role bindings is the order grants are served in
    bindings: Vec<RolePermission>,
}

#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
    loads: AtomicU64,
}

impl MemoryPermissionStore {
    pub fn new() -> Self { Self::default() }

    pub fn create_permission(&self, req: NewPermission) -> StoreResult<Permission> {
        let mut t = self.tables.write();
        if t.permissions.values().any(|p| p.name == req.name) {
            return Err(StoreError::Conflict(format!("permission '{}' already exists", req.name)));
        }
        let now = Utc::now();
        let perm = Permission {
            id: Uuid::new_v4(),
            name: req.name,
            resource: req.resource,
            action: req.action,
            conditions: req.conditions,
            description: req.description,
            created_at: now,
            updated_at: now,
        };
        t.permissions.insert(perm.id, perm.clone());
        info!(target: "course_authz::store", "permission.create name={} {}:{}", perm.name, perm.resource, perm.action);
        Ok(perm)
    }

    pub fn update_permission(&self, id: Uuid, patch: PermissionPatch) -> StoreResult<Permission> {
        let mut t = self.tables.write();
        if let Some(name) = patch.name.as_deref() {
            if t.permissions.values().any(|p| p.name == name && p.id != id) {
                return Err(StoreError::Conflict(format!("permission '{}' already exists", name)));
            }
        }
        let perm = t.permissions.get_mut(&id).ok_or_else(|| StoreError::NotFound(format!("permission {}", id)))?;
        if let Some(v) = patch.name { perm.name = v; }
        if let Some(v) = patch.resource { perm.resource = v; }
        if let Some(v) = patch.action { perm.action = v; }
        if let Some(v) = patch.conditions { perm.conditions = v; }
        if patch.description.is_some() { perm.description = patch.description; }
        perm.updated_at = Utc::now();
        Ok(perm.clone())
    }

    /// Delete a permission and every role binding that references it.
    pub fn delete_permission(&self, id: Uuid) -> StoreResult<Permission> {
        let mut t = self.tables.write();
        let perm = t.permissions.remove(&id).ok_or_else(|| StoreError::NotFound(format!("permission {}", id)))?;
        t.bindings.retain(|b| b.permission_id != id);
        info!(target: "course_authz::store", "permission.delete name={}", perm.name);
        Ok(perm)
    }

    pub fn permission(&self, id: Uuid) -> Option<Permission> { self.tables.read().permissions.get(&id).cloned() }

    pub fn permission_by_name(&self, name: &str) -> Option<Permission> {
        self.tables.read().permissions.values().find(|p| p.name == name).cloned()
    }

    /// All permissions ordered by name.
    pub fn list_permissions(&self) -> Vec<Permission> {
        let mut out: Vec<Permission> = self.tables.read().permissions.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn grant(&self, role: &str, permission_id: Uuid, granted_by: Option<&str>) -> StoreResult<RolePermission> {
        let mut t = self.tables.write();
        if !t.permissions.contains_key(&permission_id) {
            return Err(StoreError::NotFound(format!("permission {}", permission_id)));
        }
        if t.bindings.iter().any(|b| b.role == role && b.permission_id == permission_id) {
            return Err(StoreError::Conflict(format!("role '{}' already holds permission {}", role, permission_id)));
        }
        let binding = RolePermission {
            role: role.to_string(),
            permission_id,
            granted_at: Utc::now(),
            granted_by: granted_by.map(str::to_string),
        };
        t.bindings.push(binding.clone());
        info!(target: "course_authz::store", "role.grant role={} permission={} by={:?}", role, permission_id, granted_by);
        Ok(binding)
    }

    pub fn revoke(&self, role: &str, permission_id: Uuid) -> bool {
        let mut t = self.tables.write();
        let before = t.bindings.len();
        t.bindings.retain(|b| !(b.role == role && b.permission_id == permission_id));
        before != t.bindings.len()
    }

    pub fn role_bindings(&self, role: &str) -> Vec<RolePermission> {
        self.tables.read().bindings.iter().filter(|b| b.role == role).cloned().collect()
    }

    /// Roles that hold at least one permission, sorted.
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self.tables.read().bindings.iter().map(|b| b.role.clone()).collect();
        roles.sort();
        roles.dedup();
        roles
    }

    pub fn grants_for_role(&self, role: &str) -> Vec<Grant> {
        let t = self.tables.read();
        let grants = t
            .bindings
            .iter()
            .filter(|b| b.role == role)
            .filter_map(|b| t.permissions.get(&b.permission_id))
            .map(Permission::to_grant);
        merge_grants(grants)
    }

    /// Simulate an outage: while offline every load fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) { self.offline.store(offline, Ordering::Relaxed); }

    /// Number of `load_grants` calls served or failed so far.
    pub fn load_count(&self) -> u64 { self.loads.load(Ordering::Relaxed) }
}

impl PermissionSource for MemoryPermissionStore {
    fn load_grants<'a>(&'a self, role: &'a str) -> BoxFuture<'a, StoreResult<Vec<Grant>>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let out = if self.offline.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable("memory store offline".into()))
        } else {
            let grants = self.grants_for_role(role);
            debug!(target: "course_authz::store", "load_grants role={} grants={}", role, grants.len());
            Ok(grants)
        };
        future::ready(out).boxed()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
