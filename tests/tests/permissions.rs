use pretty_assertions::assert_eq;
use serde_json::json;
use sieve::{
    ast::Query,
    permissions::{AllowedSort, FetchPermissions},
    Access, Accountability, Action, Filter, Permission, Policy, Role,
};
use tests::{database, engine, store, MemoryStore};
use std::sync::Arc;

#[tokio::test]
async fn policies_follow_the_role_chain() {
    let store = Arc::new(MemoryStore::new());
    store.insert_role(Role::new("staff"));
    store.insert_role(Role::new("editor").parent("staff"));
    for id in ["p_user", "p_editor", "p_staff"] {
        store.insert_policy(Policy::new(id));
    }
    store.insert_access(Access::user("u1", "p_user"));
    store.insert_access(Access::role("editor", "p_editor"));
    store.insert_access(Access::role("staff", "p_staff"));
    let sieve = engine(store);

    let policies = sieve
        .fetch_policies(&Accountability::user("u1").with_role("editor"))
        .await
        .unwrap();

    assert_eq!(policies, vec!["p_staff", "p_editor", "p_user"]);
}

#[tokio::test]
async fn ip_restricted_policies_are_dropped() {
    let store = Arc::new(MemoryStore::new());
    store.insert_policy(Policy::new("anywhere"));
    store.insert_policy(Policy::new("office").ip_access(["10.0.0.0/8"]));
    store.insert_access(Access::user("u1", "anywhere"));
    store.insert_access(Access::user("u1", "office"));
    let sieve = engine(store);

    let inside = Accountability::user("u1").with_ip("10.1.2.3".parse().unwrap());
    let outside = Accountability::user("u1").with_ip("192.168.1.1".parse().unwrap());

    assert_eq!(
        sieve.fetch_policies(&inside).await.unwrap(),
        vec!["anywhere", "office"]
    );
    assert_eq!(sieve.fetch_policies(&outside).await.unwrap(), vec!["anywhere"]);
}

#[tokio::test]
async fn store_writes_invalidate_cached_rules() {
    let store = store("u1", "p");
    store.insert_permission(Permission::new("p", "articles", Action::Read).fields(["id"]));
    let sieve = engine(store.clone());

    let policies = vec!["p".to_string()];
    let collections = vec!["articles".to_string()];
    let fetch = || {
        FetchPermissions::new(Action::Read, &policies).collections(&collections)
    };

    assert_eq!(sieve.fetch_permissions(fetch()).await.unwrap().len(), 1);

    store.insert_permission(Permission::new("p", "articles", Action::Read).fields(["title"]));
    assert_eq!(sieve.fetch_permissions(fetch()).await.unwrap().len(), 2);

    let id = store.insert_permission(Permission::new("p", "articles", Action::Read));
    store.remove_permission(id);
    sieve.clear_permission_cache();
    assert_eq!(sieve.fetch_permissions(fetch()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn dynamic_variables_resolve_per_caller() {
    let store = Arc::new(MemoryStore::new());
    store.insert_policy(Policy::new("authors"));
    store.insert_access(Access::user("2", "authors"));
    store.insert_user("2", json!({"id": "2", "email": "bob@example.com"}));
    store.insert_permission(
        Permission::new("authors", "articles", Action::Read)
            .fields(["id"])
            .filter(Filter::from_json(&json!({"author": {"_eq": "$CURRENT_USER"}})).unwrap()),
    );
    store.insert_permission(
        Permission::new("authors", "users", Action::Read)
            .fields(["id", "email"])
            .filter(Filter::from_json(&json!({"email": {"_eq": "$CURRENT_USER.email"}})).unwrap()),
    );
    let sieve = engine(store);
    let accountability = Accountability::user("2");

    let policies = vec!["authors".to_string()];
    let collections = vec!["users".to_string()];
    let resolved = sieve
        .fetch_permissions(
            FetchPermissions::new(Action::Read, &policies)
                .collections(&collections)
                .accountability(&accountability),
        )
        .await
        .unwrap();
    assert_eq!(
        resolved[0].permissions,
        Some(Filter::eq("email", "bob@example.com"))
    );

    let raw = sieve
        .fetch_permissions(
            FetchPermissions::new(Action::Read, &policies)
                .collections(&collections)
                .accountability(&accountability)
                .bypass_dynamic_variable_processing(),
        )
        .await
        .unwrap();
    assert_eq!(
        raw[0].permissions,
        Some(Filter::eq("email", "$CURRENT_USER.email"))
    );

    let mut db = database();
    let ast = sieve
        .ast("articles", &["id"], Query::default().sort(["id"]).unwrap())
        .unwrap();
    let rows = sieve.read(&mut db, ast, Some(&accountability)).await.unwrap();
    assert_eq!(rows, vec![json!({"id": 2}), json!({"id": 3})]);
}

#[tokio::test]
async fn allowed_fields_union_every_rule() {
    let store = store("u1", "p");
    store.insert_permission(
        Permission::new("p", "articles", Action::Read)
            .fields(["id", "title"])
            .filter(Filter::eq("status", "published")),
    );
    store.insert_permission(Permission::new("p", "articles", Action::Read).fields(["title", "body"]));
    let sieve = engine(store);

    let fields = sieve
        .get_allowed_fields("articles", Action::Read, &Accountability::user("u1"))
        .await
        .unwrap();
    assert_eq!(fields, vec!["id", "title", "body"]);

    let fields = sieve
        .get_allowed_fields("articles", Action::Read, &Accountability::admin())
        .await
        .unwrap();
    assert_eq!(fields, vec!["*"]);
}

#[tokio::test]
async fn allowed_sort_falls_back_to_a_readable_field() {
    let store = store("u1", "p");
    store.insert_permission(
        Permission::new("p", "articles", Action::Read).fields(["title", "status"]),
    );
    let sieve = engine(store);

    let sort = sieve
        .get_allowed_sort(AllowedSort::new("articles"), Some(&Accountability::user("u1")))
        .await
        .unwrap();
    assert_eq!(sort, Some(vec!["title".to_string()]));

    let sort = sieve
        .get_allowed_sort(AllowedSort::new("articles"), Some(&Accountability::admin()))
        .await
        .unwrap();
    assert_eq!(sort, Some(vec!["id".to_string()]));

    let sort = sieve
        .get_allowed_sort(AllowedSort::new("users"), Some(&Accountability::user("u1")))
        .await
        .unwrap();
    assert_eq!(sort, None);
}
