use pretty_assertions::assert_eq;
use serde_json::json;
use sieve::{ast::Query, Accountability, Sieve, SqlStore, Value};
use sieve_driver_sqlite::Connection;
use std::sync::Arc;
use tests::{database, init_tracing, schema};

async fn sql_store() -> Arc<SqlStore> {
    let store = SqlStore::new(Box::new(Connection::in_memory().unwrap()));
    store.install().await.unwrap();

    store
        .execute(
            r#"INSERT INTO "sieve_policies" ("id", "name", "admin_access", "app_access") VALUES (?1, ?2, 0, 1)"#,
            &[Value::from("editors"), Value::from("Editors")],
        )
        .await
        .unwrap();
    store
        .execute(
            r#"INSERT INTO "sieve_access" ("user", "policy") VALUES (?1, ?2)"#,
            &[Value::from("u1"), Value::from("editors")],
        )
        .await
        .unwrap();
    store
        .execute(
            r#"INSERT INTO "sieve_permissions" ("policy", "collection", "action", "permissions", "fields") VALUES (?1, ?2, ?3, ?4, ?5)"#,
            &[
                Value::from("editors"),
                Value::from("articles"),
                Value::from("read"),
                Value::from(r#"{"status":{"_eq":"published"}}"#),
                Value::from("id,title"),
            ],
        )
        .await
        .unwrap();

    Arc::new(store)
}

#[tokio::test]
async fn reads_rules_from_tables() {
    init_tracing();

    let store = sql_store().await;
    let sieve = Sieve::builder()
        .schema(schema())
        .store(store.clone())
        .build()
        .unwrap();
    let accountability = Accountability::user("u1");

    assert_eq!(
        sieve.fetch_policies(&accountability).await.unwrap(),
        vec!["editors"]
    );

    let mut db = database();
    let query = Query::default().sort(["id"]).unwrap();

    let ast = sieve.ast("articles", &["id", "title"], query.clone()).unwrap();
    let rows = sieve.read(&mut db, ast, Some(&accountability)).await.unwrap();
    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "title": "Hello"}),
            json!({"id": 3, "title": "News"}),
        ]
    );

    // Widening the rule through the store is picked up by the next read.
    store
        .execute(
            r#"UPDATE "sieve_permissions" SET "permissions" = NULL WHERE "collection" = ?1"#,
            &[Value::from("articles")],
        )
        .await
        .unwrap();

    let ast = sieve.ast("articles", &["id", "title"], query).unwrap();
    let rows = sieve.read(&mut db, ast, Some(&accountability)).await.unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn global_access_reads_policy_flags() {
    let store = sql_store().await;
    let sieve = Sieve::builder()
        .schema(schema())
        .store(store)
        .build()
        .unwrap();

    let access = sieve
        .fetch_global_access(&Accountability::user("u1"))
        .await
        .unwrap();
    assert!(!access.admin);
    assert!(access.app);
}
