//! Postgres permission source over the application's `permissions` and `role_permissions`
//! tables. Conditions are stored as a JSON text column.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio_postgres::{Client, Row};
use tracing::debug;

use super::{merge_grants, PermissionSource};
use crate::error::StoreResult;
use crate::model::{decode_conditions, Condition, Grant};

const GRANTS_FOR_ROLE_SQL: &str = "SELECT p.resource, p.action, p.conditions \
     FROM permissions p JOIN role_permissions rp ON rp.permission_id = p.id \
     WHERE rp.role = $1 \
     ORDER BY rp.granted_at, p.name";

#[derive(Clone)]
pub struct PgPermissionSource {
    client: Arc<Client>,
}

impl PgPermissionSource {
    pub fn new(client: Arc<Client>) -> Self { Self { client } }

    /// Connect with a libpq-style connection string; the connection task is spawned on the
    /// current runtime.
    pub async fn connect(conn_str: &str) -> StoreResult<Self> {
        let (client, connection) = tokio_postgres::connect(conn_str, tokio_postgres::NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "course_authz::store", "postgres connection error: {}", e);
            }
        });
        Ok(Self::new(Arc::new(client)))
    }
}

/// Text that is not JSON at all is a store error; a well-formed but wrong rule only
/// disables itself.
fn parse_conditions(raw: Option<&str>) -> StoreResult<Vec<Condition>> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") => Ok(Vec::new()),
        Some(text) => Ok(decode_conditions(serde_json::from_str(text)?)),
    }
}

fn row_to_grant(row: &Row) -> StoreResult<Grant> {
    let resource: String = row.try_get("resource")?;
    let action: String = row.try_get("action")?;
    let raw: Option<String> = row.try_get("conditions")?;
    let conditions = parse_conditions(raw.as_deref())?;
    Ok(Grant { resource, actions: vec![action], conditions })
}

impl PermissionSource for PgPermissionSource {
    fn load_grants<'a>(&'a self, role: &'a str) -> BoxFuture<'a, StoreResult<Vec<Grant>>> {
        async move {
            let rows = self.client.query(GRANTS_FOR_ROLE_SQL, &[&role]).await?;
            let grants = rows.iter().map(row_to_grant).collect::<StoreResult<Vec<_>>>()?;
            debug!(target: "course_authz::store", "pg load_grants role={} rows={}", role, rows.len());
            Ok(merge_grants(grants))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::{ConditionValue, Operator};

    #[test]
    fn empty_conditions_column() {
        for raw in [None, Some(""), Some("  "), Some("null")] {
            assert!(parse_conditions(raw).unwrap().is_empty(), "{:?}", raw);
        }
    }

    #[test]
    fn conditions_column_json() {
        let got = parse_conditions(Some(
            r#"[{"field":"resource.userId","operator":"eq","value":{"ref":"current_principal_id"}},
                {"field":"age","operator":"gte","value":18}]"#,
        ))
        .unwrap();
        assert_eq!(got[0], Condition::owned_by_principal("resource.userId"));
        assert_eq!(got[1], Condition::new("age", Operator::Gte, ConditionValue::literal(18)));

        let bad_rule = parse_conditions(Some(r#"[{"field":"age","operator":[],"value":1}]"#)).unwrap();
        assert_eq!(bad_rule, vec![Condition::never()]);

        assert!(matches!(parse_conditions(Some("{ not json")), Err(StoreError::Decode(_))));
    }
}
