//! JSON-file permission source. The document is re-read on every load so edits on disk are
//! picked up once the evaluator's cache entry for a role expires.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{merge_grants, PermissionSource};
use crate::error::{StoreError, StoreResult};
use crate::model::Grant;

/// `{ "roles": { "<role>": [ <grant>, ... ] } }`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GrantsDocument {
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<Grant>>,
}

impl GrantsDocument {
    pub fn from_json(text: &str) -> StoreResult<Self> { Ok(serde_json::from_str(text)?) }

    pub fn grants_for(&self, role: &str) -> Vec<Grant> {
        self.roles.get(role).map(|g| merge_grants(g.iter().cloned())).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    pub async fn read_document(&self) -> StoreResult<GrantsDocument> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::Unavailable(format!("grants file {} not found", self.path.display()))
            } else {
                StoreError::Io(e)
            }
        })?;
        GrantsDocument::from_json(&text)
    }
}

impl PermissionSource for JsonFileSource {
    fn load_grants<'a>(&'a self, role: &'a str) -> BoxFuture<'a, StoreResult<Vec<Grant>>> {
        async move {
            let doc = self.read_document().await?;
            let grants = doc.grants_for(role);
            debug!(target: "course_authz::store", "file load_grants path={} role={} grants={}", self.path.display(), role, grants.len());
            Ok(grants)
        }
        .boxed()
    }
}
