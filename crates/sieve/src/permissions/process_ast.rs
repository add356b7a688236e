use super::{apply_default_sort, inject_cases, related_cases, validate_path, FetchPermissions, FieldMap};
use crate::{Accountability, Action, Ast, Error, Result, Sieve};

use tracing::debug;

impl Sieve {
    /// Checks `ast` against the caller's permissions for `action` and
    /// annotates every collection scope with its cases.
    ///
    /// Without an accountability, or for an admin, the AST only gets the
    /// default sort of its one-to-many scopes. Any scope the caller may not
    /// fully read fails the whole request with a forbidden error.
    pub async fn process_ast(
        &self,
        mut ast: Ast,
        action: Action,
        accountability: Option<&Accountability>,
    ) -> Result<Ast> {
        let schema = self.schema();

        let accountability = match accountability {
            Some(accountability) if !accountability.admin => accountability,
            _ => {
                apply_default_sort(&mut ast, &schema, None);
                return Ok(ast);
            }
        };

        let max = self.config().relational_nesting_max;
        if ast.depth() > max {
            return Err(Error::invalid_query(format!(
                "relational nesting exceeds the maximum depth of {max}"
            )));
        }

        let field_map = FieldMap::extract(&ast, &schema);
        let collections = field_map.collections();

        let policies = self.fetch_policies(accountability).await?;
        let options = FetchPermissions::new(action, &policies)
            .collections(&collections)
            .accountability(accountability);
        let permissions = self.fetch_permissions(options).await?;

        validate_path(&field_map.other, &permissions, &schema)?;

        let read = if action == Action::Read {
            permissions.clone()
        } else {
            self.fetch_permissions(FetchPermissions {
                action: Action::Read,
                ..options
            })
            .await?
        };
        validate_path(&field_map.read, &read, &schema)?;

        inject_cases(&mut ast, &permissions);
        ast.related = related_cases(&collections, &read);
        apply_default_sort(&mut ast, &schema, Some(&read));

        debug!(
            collection = %ast.name,
            action = %action,
            policies = policies.len(),
            rules = permissions.len(),
            "ast processed"
        );

        Ok(ast)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{FieldsBuilder, Query},
        schema::{Collection, Field, FieldType, Relation},
        Access, Accountability, Action, Ast, Filter, MemoryStore, Permission, Policy,
        SchemaOverview, Sieve,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> SchemaOverview {
        SchemaOverview::builder()
            .collection(
                Collection::new("articles", "id")
                    .field(Field::new("id", FieldType::Integer))
                    .field(Field::new("title", FieldType::String))
                    .field(Field::new("status", FieldType::String))
                    .field(Field::new("author", FieldType::Integer)),
            )
            .collection(
                Collection::new("users", "id")
                    .field(Field::new("id", FieldType::Integer))
                    .field(Field::new("name", FieldType::String)),
            )
            .relation(Relation::m2o("articles", "author", "users"))
            .build()
            .unwrap()
    }

    fn sieve(permissions: Vec<Permission>) -> Sieve {
        let store = Arc::new(MemoryStore::new());
        store.insert_policy(Policy::new("p"));
        store.insert_access(Access::user("u1", "p"));
        for permission in permissions {
            store.insert_permission(permission);
        }

        Sieve::builder()
            .schema(schema())
            .store(store)
            .build()
            .unwrap()
    }

    fn published() -> Filter {
        Filter::from_json(&json!({"status": {"_eq": "published"}})).unwrap()
    }

    fn ast(sieve: &Sieve, fields: &[&str]) -> Ast {
        FieldsBuilder::new(&sieve.schema())
            .build("articles", fields, Query::default())
            .unwrap()
    }

    #[tokio::test]
    async fn admin_and_internal_callers_bypass() {
        let sieve = sieve(vec![]);
        let input = ast(&sieve, &["id", "title", "author.name"]);

        let out = sieve
            .process_ast(input.clone(), Action::Read, Some(&Accountability::admin()))
            .await
            .unwrap();
        assert_eq!(out, input);

        let out = sieve
            .process_ast(input.clone(), Action::Read, None)
            .await
            .unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn forbidden_field_is_named() {
        let sieve = sieve(vec![Permission::new("p", "articles", Action::Read)
            .fields(["id", "title"])
            .filter(published())]);

        let err = sieve
            .process_ast(
                ast(&sieve, &["id", "title", "author"]),
                Action::Read,
                Some(&Accountability::user("u1")),
            )
            .await
            .unwrap_err();

        assert!(err.is_forbidden());
        assert_eq!(
            err.to_string(),
            "You don't have permission to access field \"author\" in collection \"articles\" or it does not exist. Queried in root."
        );
    }

    #[tokio::test]
    async fn permitted_fields_get_one_case() {
        let sieve = sieve(vec![Permission::new("p", "articles", Action::Read)
            .fields(["id", "title"])
            .filter(published())]);

        let out = sieve
            .process_ast(
                ast(&sieve, &["id", "title"]),
                Action::Read,
                Some(&Accountability::user("u1")),
            )
            .await
            .unwrap();

        let cases = out.cases.unwrap();
        assert_eq!(cases.cases.len(), 1);
        assert_eq!(cases.cases[0].rule, Filter::eq("status", "published"));
        assert_eq!(cases.case_map["id"], vec![0]);
        assert_eq!(cases.case_map["title"], vec![0]);
        assert!(cases.allowed_fields.is_empty());
    }

    #[tokio::test]
    async fn nested_collection_without_rules() {
        let sieve = sieve(vec![Permission::new("p", "articles", Action::Read)]);

        let err = sieve
            .process_ast(
                ast(&sieve, &["id", "author.name"]),
                Action::Read,
                Some(&Accountability::user("u1")),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "You don't have permission to access collection \"users\" or it does not exist. Queried in \"author\"."
        );
    }

    #[tokio::test]
    async fn public_caller_fails_closed() {
        let sieve = sieve(vec![Permission::new("p", "articles", Action::Read)]);

        let err = sieve
            .process_ast(
                ast(&sieve, &["id"]),
                Action::Read,
                Some(&Accountability::public()),
            )
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn filters_need_read_access() {
        let sieve = sieve(vec![
            Permission::new("p", "articles", Action::Update),
            Permission::new("p", "articles", Action::Read).fields(["id"]),
        ]);

        let query = Query::default().filter(published());
        let input = FieldsBuilder::new(&sieve.schema())
            .build("articles", &["title"], query)
            .unwrap();

        let err = sieve
            .process_ast(input, Action::Update, Some(&Accountability::user("u1")))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "You don't have permission to access field \"status\" in collection \"articles\" or it does not exist. Queried in root."
        );
    }

    #[tokio::test]
    async fn nesting_limit() {
        let sieve = Sieve::builder()
            .schema(schema())
            .config(crate::Config {
                relational_nesting_max: 0,
                ..crate::Config::default()
            })
            .build()
            .unwrap();

        let err = sieve
            .process_ast(
                ast(&sieve, &["author.name"]),
                Action::Read,
                Some(&Accountability::user("u1")),
            )
            .await
            .unwrap_err();
        assert!(err.is_invalid_query());

        let out = sieve
            .process_ast(
                ast(&sieve, &["author.name"]),
                Action::Read,
                Some(&Accountability::admin()),
            )
            .await
            .unwrap();
        assert_eq!(out.depth(), 1);
    }

    #[tokio::test]
    async fn filter_collections_carry_their_rules() {
        let sieve = sieve(vec![
            Permission::new("p", "articles", Action::Read).fields(["*"]),
            Permission::new("p", "users", Action::Read)
                .fields(["name"])
                .filter(Filter::eq("name", "Ann")),
        ]);

        let query = Query::default()
            .filter(Filter::from_json(&json!({"author": {"name": {"_eq": "Bob"}}})).unwrap());
        let input = FieldsBuilder::new(&sieve.schema())
            .build("articles", &["id"], query)
            .unwrap();

        let out = sieve
            .process_ast(input, Action::Read, Some(&Accountability::user("u1")))
            .await
            .unwrap();

        let users = &out.related["users"];
        assert_eq!(users.cases.len(), 1);
        assert_eq!(users.cases[0].rule, Filter::eq("name", "Ann"));
        assert!(out.related["articles"].cases.is_empty());
    }
}
