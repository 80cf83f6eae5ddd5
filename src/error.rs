//! Error model. `StoreError` is the narrow infrastructure channel the evaluator propagates;
//! `AccessError` is what the request-facing adapter reports, with an HTTP status mapping.
//! Rule outcomes (denied, malformed rule) are never errors.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("permission store unavailable: {0}")]
    Unavailable(String),
    #[error("permission store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("permission data could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[cfg(feature = "postgres")]
    #[error("postgres: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessError {
    Unauthenticated { code: String, message: String },
    Forbidden { code: String, message: String, resource: String, action: String },
    NotFound { code: String, message: String },
    Internal { code: String, message: String },
}

impl AccessError {
    pub fn code_str(&self) -> &str {
        match self {
            AccessError::Unauthenticated { code, .. }
            | AccessError::Forbidden { code, .. }
            | AccessError::NotFound { code, .. }
            | AccessError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AccessError::Unauthenticated { message, .. }
            | AccessError::Forbidden { message, .. }
            | AccessError::NotFound { message, .. }
            | AccessError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn unauthenticated() -> Self {
        AccessError::Unauthenticated { code: "unauthenticated".into(), message: "authentication required".into() }
    }

    pub fn forbidden<S: Into<String>>(resource: S, action: S) -> Self {
        let (resource, action) = (resource.into(), action.into());
        AccessError::Forbidden {
            code: "forbidden".into(),
            message: format!("missing permission {}:{}", resource, action),
            resource,
            action,
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self { AccessError::NotFound { code: "not_found".into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(msg: S) -> Self { AccessError::Internal { code: "internal".into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AccessError::Unauthenticated { .. } => 401,
            AccessError::Forbidden { .. } => 403,
            AccessError::NotFound { .. } => 404,
            AccessError::Internal { .. } => 500,
        }
    }
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AccessError {}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        // Infrastructure faults surface as internal errors; callers deny.
        AccessError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AccessError::unauthenticated().http_status(), 401);
        assert_eq!(AccessError::forbidden("course", "delete").http_status(), 403);
        assert_eq!(AccessError::not_found("no course").http_status(), 404);
        assert_eq!(AccessError::internal("boom").http_status(), 500);
    }

    #[test]
    fn forbidden_carries_requirement() {
        let e = AccessError::forbidden("course", "delete");
        assert_eq!(e.code_str(), "forbidden");
        assert_eq!(e.to_string(), "forbidden: missing permission course:delete");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "forbidden");
        assert_eq!(v["resource"], "course");
        assert_eq!(v["action"], "delete");
    }

    #[test]
    fn store_errors_become_internal() {
        let e: AccessError = StoreError::Unavailable("db down".into()).into();
        assert_eq!(e.http_status(), 500);
        assert!(e.message().contains("db down"));
    }
}
