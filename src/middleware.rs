//! axum adapter around the evaluator. The identity layer is expected to have placed a
//! `Principal` in the request extensions; this layer turns the evaluator's answer into
//! 401 / 403 / 404 / 500 responses or lets the request through.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::lookup_path;
use crate::error::AccessError;
use crate::evaluator::PermissionEvaluator;
use crate::model::{PermissionCheck, Principal};

/// Fetches the concrete resource a request targets so conditions can see it as `resource`.
/// `Ok(None)` means the resource does not exist.
pub trait ResourceLoader: Send + Sync {
    fn load<'a>(&'a self, parts: &'a Parts) -> BoxFuture<'a, Result<Option<Value>, AccessError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    Single,
    Any,
    All,
}

/// What a route demands before its handler runs. Built through `single`, `any` or `all`.
#[derive(Clone)]
pub struct PermissionRequirement {
    checks: Vec<(String, String)>,
    mode: CheckMode,
    loader: Option<Arc<dyn ResourceLoader>>,
    /// Owner of the loaded resource (`resource.userId == principal.id`) passes without a grant.
    ownership: bool,
}

impl PermissionRequirement {
    pub fn single(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self { checks: vec![(resource.into(), action.into())], mode: CheckMode::Single, loader: None, ownership: false }
    }

    pub fn any<I, R, A>(checks: I) -> Self
    where
        I: IntoIterator<Item = (R, A)>,
        R: Into<String>,
        A: Into<String>,
    {
        Self { checks: collect_pairs(checks), mode: CheckMode::Any, loader: None, ownership: false }
    }

    pub fn all<I, R, A>(checks: I) -> Self
    where
        I: IntoIterator<Item = (R, A)>,
        R: Into<String>,
        A: Into<String>,
    {
        Self { checks: collect_pairs(checks), mode: CheckMode::All, loader: None, ownership: false }
    }

    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_ownership(mut self) -> Self {
        self.ownership = true;
        self
    }

    pub fn checks(&self) -> &[(String, String)] { &self.checks }

    pub fn mode(&self) -> CheckMode { self.mode }

    pub fn loader(&self) -> Option<&Arc<dyn ResourceLoader>> { self.loader.as_ref() }

    pub fn ownership(&self) -> bool { self.ownership }

    fn to_checks(&self, resource: Option<&Value>) -> Vec<PermissionCheck> {
        self.checks
            .iter()
            .map(|(r, a)| {
                let check = PermissionCheck::new(r.clone(), a.clone());
                match resource {
                    Some(v) => check.with_resource(v.clone()),
                    None => check,
                }
            })
            .collect()
    }

    fn forbidden(&self) -> AccessError {
        let resources = self.checks.iter().map(|(r, _)| r.as_str()).collect::<Vec<_>>().join(",");
        let actions = self.checks.iter().map(|(_, a)| a.as_str()).collect::<Vec<_>>().join(",");
        AccessError::forbidden(resources, actions)
    }
}

fn collect_pairs<I, R, A>(checks: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (R, A)>,
    R: Into<String>,
    A: Into<String>,
{
    checks.into_iter().map(|(r, a)| (r.into(), a.into())).collect()
}

/// Resource returned by the requirement's loader, available to handlers via extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedResource(pub Value);

/// Middleware state: shared evaluator plus one route's requirement.
#[derive(Clone)]
pub struct PermissionGuard {
    pub evaluator: Arc<PermissionEvaluator>,
    pub requirement: Arc<PermissionRequirement>,
}

impl PermissionGuard {
    pub fn new(evaluator: Arc<PermissionEvaluator>, requirement: PermissionRequirement) -> Self {
        Self { evaluator, requirement: Arc::new(requirement) }
    }
}

fn is_owner(principal: &Principal, resource: Option<&Value>) -> bool {
    resource
        .and_then(|v| lookup_path(v, "userId"))
        .and_then(Value::as_str)
        .is_some_and(|owner| owner == principal.id)
}

/// Decide one request. Transport-independent so it can be reused outside axum.
pub async fn authorize(
    evaluator: &PermissionEvaluator,
    principal: Option<&Principal>,
    requirement: &PermissionRequirement,
    resource: Option<&Value>,
) -> Result<(), AccessError> {
    let Some(principal) = principal else { return Err(AccessError::unauthenticated()); };
    if requirement.ownership && is_owner(principal, resource) {
        debug!(target: "course_authz::middleware", "ownership shortcut user={}", principal.id);
        return Ok(());
    }
    let checks = requirement.to_checks(resource);
    let outcome = match (requirement.mode, checks.as_slice()) {
        (_, []) => Ok(false),
        (CheckMode::Single, [only]) => evaluator.check_permission(principal, only).await,
        (CheckMode::Any, _) => evaluator.check_any_permission(principal, &checks).await,
        // a Single requirement carrying several checks demands all of them
        (CheckMode::All | CheckMode::Single, _) => evaluator.check_all_permissions(principal, &checks).await,
    };
    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => Err(requirement.forbidden()),
        Err(e) => {
            warn!(target: "course_authz::middleware", "permission check failed user={} err={}", principal.id, e);
            Err(AccessError::from(e))
        }
    }
}

/// Use with `axum::middleware::from_fn_with_state(guard, require_permission)`.
pub async fn require_permission(State(guard): State<PermissionGuard>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();
    let Some(principal) = parts.extensions.get::<Principal>().cloned() else {
        return AccessError::unauthenticated().into_response();
    };
    let resource = match guard.requirement.loader() {
        Some(loader) => match loader.load(&parts).await {
            Ok(Some(v)) => Some(v),
            Ok(None) => return AccessError::not_found("resource not found").into_response(),
            Err(e) => return e.into_response(),
        },
        None => None,
    };
    if let Err(e) = authorize(&guard.evaluator, Some(&principal), &guard.requirement, resource.as_ref()).await {
        return e.into_response();
    }
    if let Some(v) = resource {
        parts.extensions.insert(LoadedResource(v));
    }
    next.run(Request::from_parts(parts, body)).await
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({ "status": self.code_str(), "error": self });
        (status, Json(body)).into_response()
    }
}
