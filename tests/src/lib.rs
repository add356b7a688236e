//! Fixtures shared by the end-to-end tests: a small blog schema, a seeded
//! in-memory SQLite database and engines over a [`MemoryStore`].

use sieve::{
    schema::{Collection, Field, FieldType, Relation},
    Access, Policy, SchemaOverview, Sieve,
};
use sieve_driver_sqlite::Connection;
use std::sync::Arc;

pub use sieve::MemoryStore;

const DATA: &str = r#"
CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT);
CREATE TABLE articles (id INTEGER PRIMARY KEY, title TEXT, status TEXT, body TEXT, author INTEGER);
CREATE TABLE comments (id INTEGER PRIMARY KEY, article INTEGER, body TEXT, approved INTEGER);
CREATE TABLE blocks (id INTEGER PRIMARY KEY, collection TEXT, item TEXT);
CREATE TABLE pages (id INTEGER PRIMARY KEY, title TEXT);
CREATE TABLE posts (id INTEGER PRIMARY KEY, body TEXT);

INSERT INTO users VALUES (1, 'Ann', 'ann@example.com'), (2, 'Bob', 'bob@example.com');
INSERT INTO articles VALUES
    (1, 'Hello', 'published', 'hello body', 1),
    (2, 'Draft', 'draft', 'draft body', 2),
    (3, 'News', 'published', 'news body', 2);
INSERT INTO comments VALUES (1, 1, 'first', 1), (2, 1, 'second', 0), (3, 3, 'third', 1);
INSERT INTO blocks VALUES (1, 'pages', '1'), (2, 'posts', '1');
INSERT INTO pages VALUES (1, 'Home');
INSERT INTO posts VALUES (1, 'Post body');
"#;

pub fn schema() -> SchemaOverview {
    SchemaOverview::builder()
        .collection(
            Collection::new("users", "id")
                .field(Field::new("id", FieldType::Integer))
                .field(Field::new("name", FieldType::String))
                .field(Field::new("email", FieldType::String)),
        )
        .collection(
            Collection::new("articles", "id")
                .field(Field::new("id", FieldType::Integer))
                .field(Field::new("title", FieldType::String))
                .field(Field::new("status", FieldType::String))
                .field(Field::new("body", FieldType::Text))
                .field(Field::new("author", FieldType::Integer))
                .field(Field::new("comments", FieldType::Alias)),
        )
        .collection(
            Collection::new("comments", "id")
                .field(Field::new("id", FieldType::Integer))
                .field(Field::new("article", FieldType::Integer))
                .field(Field::new("body", FieldType::Text))
                .field(Field::new("approved", FieldType::Boolean)),
        )
        .collection(
            Collection::new("blocks", "id")
                .field(Field::new("id", FieldType::Integer))
                .field(Field::new("collection", FieldType::String))
                .field(Field::new("item", FieldType::String)),
        )
        .collection(
            Collection::new("pages", "id")
                .field(Field::new("id", FieldType::Integer))
                .field(Field::new("title", FieldType::String))
                .field(Field::new("blocks", FieldType::Alias)),
        )
        .collection(
            Collection::new("posts", "id")
                .field(Field::new("id", FieldType::Integer))
                .field(Field::new("body", FieldType::Text)),
        )
        .relation(Relation::m2o("articles", "author", "users"))
        .relation(Relation::m2o("comments", "article", "articles").one_field("comments"))
        .relation(
            Relation::a2o("blocks", "item", "collection", ["pages", "posts"]).one_field("blocks"),
        )
        .build()
        .unwrap()
}

/// A fresh in-memory database holding the blog rows.
pub fn database() -> Connection {
    let mut connection = Connection::in_memory().unwrap();
    connection.execute_batch(DATA).unwrap();
    connection
}

/// A store where `user` holds the single policy `policy`.
pub fn store(user: &str, policy: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_policy(Policy::new(policy));
    store.insert_access(Access::user(user, policy));
    store
}

pub fn engine(store: Arc<MemoryStore>) -> Sieve {
    init_tracing();

    Sieve::builder()
        .schema(schema())
        .store(store)
        .build()
        .unwrap()
}

/// Routes engine logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
