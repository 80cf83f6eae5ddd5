//! Permission evaluator: role grants from a `PermissionSource`, refined by per-grant
//! conditions against the request context, with a per-role cache in front of the source.
//!
//! A check is allowed when at least one grant for the principal's role names the requested
//! resource, covers the action (directly or via `"*"`), and has all of its conditions hold.
//! Store failures propagate; they are never cached and never turned into a deny here.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheStats, RoleCache};
use crate::condition;
use crate::config::EvaluatorConfig;
use crate::context::EvalContext;
use crate::error::StoreResult;
use crate::model::{Grant, PermissionCheck, Principal};
use crate::source::PermissionSource;

pub struct PermissionEvaluator {
    source: Arc<dyn PermissionSource>,
    cache: RoleCache,
}

impl std::fmt::Debug for PermissionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEvaluator").field("cache", &self.cache).finish_non_exhaustive()
    }
}

impl PermissionEvaluator {
    pub fn new(source: Arc<dyn PermissionSource>, config: &EvaluatorConfig) -> Self {
        Self { source, cache: RoleCache::new(config.cache_timeout()) }
    }

    pub fn with_defaults(source: Arc<dyn PermissionSource>) -> Self {
        Self::new(source, &EvaluatorConfig::default())
    }

    /// Grants held by `role`, from cache when fresh, otherwise freshly loaded and cached.
    pub async fn role_grants(&self, role: &str) -> StoreResult<Arc<Vec<Grant>>> {
        if let Some(entry) = self.cache.get(role) {
            debug!(target: "course_authz::evaluator", "cache hit role={} grants={}", role, entry.grants.len());
            return Ok(entry.grants);
        }
        debug!(target: "course_authz::evaluator", "cache miss role={}; loading grants", role);
        // No lock is held across the load; concurrent misses may both load and the later put wins.
        let grants = self.source.load_grants(role).await?;
        Ok(self.cache.put(role, grants).grants)
    }

    pub async fn check_permission(&self, principal: &Principal, check: &PermissionCheck) -> StoreResult<bool> {
        let grants = self.role_grants(&principal.role).await?;
        let allowed = evaluate_grants(&grants, principal, check);
        debug!(
            target: "course_authz::evaluator",
            "check user={} role={} {}:{} allow={}",
            principal.id, principal.role, check.resource, check.action, allowed
        );
        Ok(allowed)
    }

    /// True if any check passes; evaluated in order, stops at the first pass.
    pub async fn check_any_permission(&self, principal: &Principal, checks: &[PermissionCheck]) -> StoreResult<bool> {
        for check in checks {
            if self.check_permission(principal, check).await? { return Ok(true); }
        }
        Ok(false)
    }

    /// True if every check passes; evaluated in order, stops at the first failure.
    pub async fn check_all_permissions(&self, principal: &Principal, checks: &[PermissionCheck]) -> StoreResult<bool> {
        for check in checks {
            if !self.check_permission(principal, check).await? { return Ok(false); }
        }
        Ok(true)
    }

    pub fn clear_all_cache(&self) {
        let n = self.cache.invalidate_all();
        debug!(target: "course_authz::evaluator", "cache cleared entries={}", n);
    }

    pub fn clear_role_cache(&self, role: &str) -> bool { self.cache.invalidate(role) }

    pub fn cache_stats(&self) -> CacheStats { self.cache.stats() }
}

/// Pure decision over an already loaded grant list.
pub fn evaluate_grants(grants: &[Grant], principal: &Principal, check: &PermissionCheck) -> bool {
    let mut candidates = grants
        .iter()
        .filter(|g| g.resource == check.resource && g.allows_action(&check.action))
        .peekable();
    if candidates.peek().is_none() { return false; }
    let ctx = EvalContext::new(principal, &check.context);
    candidates.any(|g| condition::all_hold(&g.conditions, &ctx))
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod evaluator_tests;
