use pretty_assertions::assert_eq;
use serde_json::json;
use sieve::{ast::Query, Accountability, Action, Filter, Permission};
use std::sync::Arc;
use tests::{database, engine, store, MemoryStore};

fn by_id() -> Query {
    Query::default().sort(["id"]).unwrap()
}

#[tokio::test]
async fn admin_reads_every_row() {
    let sieve = engine(store("u1", "p"));
    let mut db = database();

    let ast = sieve.ast("articles", &["id", "title"], by_id()).unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::admin()))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "title": "Hello"}),
            json!({"id": 2, "title": "Draft"}),
            json!({"id": 3, "title": "News"}),
        ]
    );
}

#[tokio::test]
async fn row_rules_hide_rows() {
    let store = store("u1", "p");
    store.insert_permission(
        Permission::new("p", "articles", Action::Read)
            .fields(["id", "title"])
            .filter(Filter::eq("status", "published")),
    );
    let sieve = engine(store);
    let mut db = database();

    let ast = sieve.ast("articles", &["id", "title"], by_id()).unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::user("u1")))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "title": "Hello"}),
            json!({"id": 3, "title": "News"}),
        ]
    );
}

#[tokio::test]
async fn unpermitted_field_rejects_the_read() {
    let store = store("u1", "p");
    store.insert_permission(
        Permission::new("p", "articles", Action::Read)
            .fields(["id", "title"])
            .filter(Filter::eq("status", "published")),
    );
    let sieve = engine(store);
    let mut db = database();

    let ast = sieve
        .ast("articles", &["id", "title", "author"], by_id())
        .unwrap();
    let err = sieve
        .read(&mut db, ast, Some(&Accountability::user("u1")))
        .await
        .unwrap_err();

    assert!(err.is_forbidden());
    assert_eq!(
        err.to_string(),
        "You don't have permission to access field \"author\" in collection \"articles\" or it does not exist. Queried in root."
    );
}

#[tokio::test]
async fn fields_are_exposed_per_row() {
    let store = store("u1", "p");
    store.insert_permission(
        Permission::new("p", "articles", Action::Read)
            .fields(["id", "title"])
            .filter(Filter::eq("status", "published")),
    );
    store.insert_permission(
        Permission::new("p", "articles", Action::Read)
            .fields(["id", "title", "body"])
            .filter(Filter::eq("author", 2)),
    );
    let sieve = engine(store);
    let mut db = database();

    let ast = sieve
        .ast("articles", &["id", "title", "body"], by_id())
        .unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::user("u1")))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "title": "Hello", "body": null}),
            json!({"id": 2, "title": "Draft", "body": "draft body"}),
            json!({"id": 3, "title": "News", "body": "news body"}),
        ]
    );
}

#[tokio::test]
async fn many_to_one_nests_an_object() {
    let store = store("u1", "p");
    store.insert_permission(
        Permission::new("p", "articles", Action::Read).fields(["id", "title", "author"]),
    );
    store.insert_permission(Permission::new("p", "users", Action::Read).fields(["name"]));
    let sieve = engine(store);
    let mut db = database();

    let ast = sieve
        .ast("articles", &["id", "author.name"], by_id())
        .unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::user("u1")))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "author": {"name": "Ann"}}),
            json!({"id": 2, "author": {"name": "Bob"}}),
            json!({"id": 3, "author": {"name": "Bob"}}),
        ]
    );
}

#[tokio::test]
async fn one_to_many_applies_nested_rules() {
    let store = store("u1", "p");
    store.insert_permission(Permission::new("p", "articles", Action::Read).fields(["*"]));
    store.insert_permission(
        Permission::new("p", "comments", Action::Read)
            .fields(["id", "body"])
            .filter(Filter::eq("approved", true)),
    );
    let sieve = engine(store);
    let mut db = database();

    let ast = sieve
        .ast("articles", &["id", "comments.body"], by_id())
        .unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::user("u1")))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "comments": [{"body": "first"}]}),
            json!({"id": 2, "comments": []}),
            json!({"id": 3, "comments": [{"body": "third"}]}),
        ]
    );
}

#[tokio::test]
async fn root_limit_counts_root_items() {
    let sieve = engine(store("u1", "p"));
    let mut db = database();

    let ast = sieve
        .ast("articles", &["id", "comments.body"], by_id().limit(1))
        .unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::admin()))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![json!({"id": 1, "comments": [{"body": "first"}, {"body": "second"}]})]
    );
}

#[tokio::test]
async fn any_to_one_reads_the_matching_branch() {
    let sieve = engine(store("u1", "p"));
    let mut db = database();

    let ast = sieve
        .ast(
            "blocks",
            &["id", "item:pages.title", "item:posts.body"],
            by_id(),
        )
        .unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::admin()))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "item": {"title": "Home"}}),
            json!({"id": 2, "item": {"body": "Post body"}}),
        ]
    );
}

#[tokio::test]
async fn inverse_any_to_one_is_not_lowered() {
    let sieve = engine(store("u1", "p"));
    let mut db = database();

    let ast = sieve.ast("pages", &["id", "blocks.id"], by_id()).unwrap();
    let err = sieve
        .read(&mut db, ast, Some(&Accountability::admin()))
        .await
        .unwrap_err();

    assert!(err.is_unsupported_node());
}

#[tokio::test]
async fn relational_filter() {
    let store = store("u1", "p");
    store.insert_permission(Permission::new("p", "articles", Action::Read).fields(["*"]));
    store.insert_permission(Permission::new("p", "users", Action::Read).fields(["*"]));
    let sieve = engine(store);
    let mut db = database();

    let filter = Filter::from_json(&json!({"author": {"name": {"_eq": "Bob"}}})).unwrap();
    let ast = sieve
        .ast("articles", &["id"], by_id().filter(filter))
        .unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::user("u1")))
        .await
        .unwrap();

    assert_eq!(rows, vec![json!({"id": 2}), json!({"id": 3})]);
}

#[tokio::test]
async fn grouped_aggregate() {
    let sieve = engine(store("u1", "p"));
    let mut db = database();

    let query = Query::default()
        .group(["status"])
        .aggregate(sieve::ast::AggregateFn::Count, &["*"])
        .sort(["status"])
        .unwrap();
    let ast = sieve::Ast::new("articles").query(query);
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::admin()))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"status": "draft", "count": 1}),
            json!({"status": "published", "count": 2}),
        ]
    );
}

#[tokio::test]
async fn public_callers_without_grants_are_denied() {
    let sieve = engine(Arc::new(MemoryStore::new()));
    let mut db = database();

    let ast = sieve.ast("articles", &["id"], by_id()).unwrap();
    let err = sieve
        .read(&mut db, ast, Some(&Accountability::public()))
        .await
        .unwrap_err();

    assert!(err.is_forbidden());
}

fn approved_comments_only() -> Arc<MemoryStore> {
    let store = store("u1", "p");
    store.insert_permission(Permission::new("p", "articles", Action::Read).fields(["*"]));
    store.insert_permission(
        Permission::new("p", "comments", Action::Read)
            .fields(["id", "body", "approved"])
            .filter(Filter::eq("approved", true)),
    );
    store
}

#[tokio::test]
async fn counts_skip_hidden_rows() {
    let sieve = engine(approved_comments_only());
    let mut db = database();

    let ast = sieve
        .ast("articles", &["id", "count(comments)"], by_id())
        .unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::user("u1")))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "count(comments)": 1}),
            json!({"id": 2, "count(comments)": 0}),
            json!({"id": 3, "count(comments)": 1}),
        ]
    );
}

#[tokio::test]
async fn relational_filters_skip_hidden_rows() {
    let sieve = engine(approved_comments_only());
    let mut db = database();
    let accountability = Accountability::user("u1");

    let hidden = Filter::from_json(&json!({"comments": {"_some": {"approved": {"_eq": false}}}})).unwrap();
    let ast = sieve.ast("articles", &["id"], by_id().filter(hidden)).unwrap();
    let rows = sieve.read(&mut db, ast, Some(&accountability)).await.unwrap();
    assert!(rows.is_empty());

    let visible = Filter::from_json(&json!({"comments": {"_some": {"approved": {"_eq": true}}}})).unwrap();
    let ast = sieve.ast("articles", &["id"], by_id().filter(visible)).unwrap();
    let rows = sieve.read(&mut db, ast, Some(&accountability)).await.unwrap();
    assert_eq!(rows, vec![json!({"id": 1}), json!({"id": 3})]);
}

#[tokio::test]
async fn nested_default_sort_uses_a_readable_field() {
    let store = store("u1", "p");
    store.insert_permission(Permission::new("p", "articles", Action::Read).fields(["*"]));
    store.insert_permission(Permission::new("p", "comments", Action::Read).fields(["body"]));
    let sieve = engine(store);
    let mut db = database();

    let ast = sieve
        .ast("articles", &["id", "comments.body"], by_id())
        .unwrap();
    let rows = sieve
        .read(&mut db, ast, Some(&Accountability::user("u1")))
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "comments": [{"body": "first"}, {"body": "second"}]}),
            json!({"id": 2, "comments": []}),
            json!({"id": 3, "comments": [{"body": "third"}]}),
        ]
    );
}
