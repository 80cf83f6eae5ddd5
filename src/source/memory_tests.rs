use super::*;
use crate::model::Condition;

#[test]
fn permission_names_are_unique() {
    let store = MemoryPermissionStore::new();
    store.create_permission(NewPermission::new("course:read", "course", "read")).unwrap();
    let dup = store.create_permission(NewPermission::new("course:read", "course", "list"));
    assert!(matches!(dup, Err(StoreError::Conflict(_))));
}

#[test]
fn update_rejects_taken_name_and_applies_patch() {
    let store = MemoryPermissionStore::new();
    let a = store.create_permission(NewPermission::new("a", "course", "read")).unwrap();
    store.create_permission(NewPermission::new("b", "course", "list")).unwrap();
    let clash = store.update_permission(a.id, PermissionPatch { name: Some("b".into()), ..Default::default() });
    assert!(matches!(clash, Err(StoreError::Conflict(_))));

    let updated = store
        .update_permission(a.id, PermissionPatch { action: Some("update".into()), ..Default::default() })
        .unwrap();
    assert_eq!(updated.action, "update");
    assert_eq!(updated.name, "a");
    assert!(updated.updated_at >= updated.created_at);
}

#[test]
fn grant_and_revoke() {
    let store = MemoryPermissionStore::new();
    let p = store.create_permission(NewPermission::new("course:read", "course", "read")).unwrap();
    let b = store.grant("student", p.id, Some("admin-1")).unwrap();
    assert_eq!(b.granted_by.as_deref(), Some("admin-1"));
    assert!(matches!(store.grant("student", p.id, None), Err(StoreError::Conflict(_))));
    assert!(matches!(store.grant("student", Uuid::new_v4(), None), Err(StoreError::NotFound(_))));
    assert_eq!(store.roles(), vec!["student".to_string()]);

    assert!(store.revoke("student", p.id));
    assert!(!store.revoke("student", p.id));
    assert!(store.grants_for_role("student").is_empty());
}

#[test]
fn delete_cascades_to_bindings() {
    let store = MemoryPermissionStore::new();
    let p = store.create_permission(NewPermission::new("course:read", "course", "read")).unwrap();
    store.grant("student", p.id, None).unwrap();
    store.grant("admin", p.id, None).unwrap();
    store.delete_permission(p.id).unwrap();
    assert!(store.role_bindings("student").is_empty());
    assert!(store.role_bindings("admin").is_empty());
    assert!(matches!(store.delete_permission(p.id), Err(StoreError::NotFound(_))));
}

#[test]
fn grants_merge_per_role() {
    let store = MemoryPermissionStore::new();
    let read = store.create_permission(NewPermission::new("course:read", "course", "read")).unwrap();
    let list = store.create_permission(NewPermission::new("course:list", "course", "list")).unwrap();
    let own = store
        .create_permission(
            NewPermission::new("favorite:delete:own", "favorite", "delete")
                .with_condition(Condition::owned_by_principal("resource.userId")),
        )
        .unwrap();
    for id in [read.id, list.id, own.id] { store.grant("student", id, None).unwrap(); }
    let grants = store.grants_for_role("student");
    assert_eq!(grants.len(), 2);
    assert_eq!(grants[0], Grant::new("course", ["read", "list"]));
    assert_eq!(grants[1].resource, "favorite");
    assert_eq!(grants[1].conditions.len(), 1);
    assert!(store.grants_for_role("instructor").is_empty());
}

#[tokio::test]
async fn offline_store_fails_loads() {
    let store = MemoryPermissionStore::new();
    store.set_offline(true);
    let res = store.load_grants("student").await;
    assert!(matches!(res, Err(StoreError::Unavailable(_))));
    store.set_offline(false);
    assert!(store.load_grants("student").await.unwrap().is_empty());
    assert_eq!(store.load_count(), 2);
}
