use crate::{
    ast::{FieldNode, Node},
    convert::{convert, ConvertOptions},
    Accountability, Action, Ast, Query, Result, Sieve,
};

impl Sieve {
    /// Builds a flag query over the root fields of `ast`.
    ///
    /// Relational fields are reduced to their root column, then the AST is
    /// processed like a regular request and converted in flag mode: every
    /// selected column reads `1` where the caller may see the field on that
    /// row and `NULL` where it may not. The flag query has the same shape and
    /// pagination as the full query.
    pub async fn fetch_permitted_ast_root_fields(
        &self,
        ast: &Ast,
        action: Action,
        accountability: Option<&Accountability>,
    ) -> Result<Query> {
        let mut root = ast.clone();
        root.children = ast.children.iter().map(flatten).collect();

        let root = self.process_ast(root, action, accountability).await?;

        let schema = self.schema();
        convert(&root, &schema, &ConvertOptions::new(self.config()).flags())
    }
}

fn flatten(node: &Node) -> Node {
    match node {
        Node::Field(_) | Node::FunctionField(_) => node.clone(),
        Node::M2o(_) | Node::O2m(_) | Node::A2o(_) | Node::O2a(_) => Node::Field(FieldNode {
            field_key: node.field_key().to_string(),
            alias: Some(node.key()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{Node, Query as AstQuery},
        schema::{Collection, Field, FieldType, Relation},
        Access, Accountability, Action, Filter, MemoryStore, Permission, Policy, SchemaOverview,
        Sieve,
    };
    use pretty_assertions::assert_eq;
    use sieve_sql::stmt::{Expr, ShapeKind};
    use std::sync::Arc;

    fn sieve() -> Sieve {
        let schema = SchemaOverview::builder()
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
            .unwrap();

        let store = Arc::new(MemoryStore::new());
        store.insert_policy(Policy::new("p"));
        store.insert_access(Access::user("u1", "p"));
        store.insert_permission(Permission::new("p", "articles", Action::Read).fields(["id"]));
        store.insert_permission(
            Permission::new("p", "articles", Action::Read)
                .fields(["title", "author"])
                .filter(Filter::eq("status", "published")),
        );

        Sieve::builder().schema(schema).store(store).build().unwrap()
    }

    #[tokio::test]
    async fn relational_fields_become_flags() {
        let sieve = sieve();
        let ast = sieve
            .ast("articles", &["id", "title", "author.name"], AstQuery::default())
            .unwrap();
        assert!(matches!(ast.children[2], Node::M2o(_)));

        let flags_query = sieve
            .fetch_permitted_ast_root_fields(&ast, Action::Read, Some(&Accountability::user("u1")))
            .await
            .unwrap();

        let outputs: Vec<_> = flags_query.paths.values().map(|path| path.join(".")).collect();
        assert_eq!(outputs, ["id", "title", "author"]);
        assert_eq!(flags_query.shapes.len(), 1);
        assert_eq!(flags_query.shapes[&Vec::<String>::new()].kind, ShapeKind::Root);
        assert!(flags_query.select.joins.is_empty());

        let flags: Vec<&Expr> = flags_query
            .select
            .columns
            .iter()
            .filter(|item| {
                item.alias
                    .as_ref()
                    .is_some_and(|alias| flags_query.paths.contains_key(alias))
            })
            .map(|item| &item.expr)
            .collect();
        assert_eq!(flags[0], &Expr::One);
        assert!(matches!(flags[1], Expr::Case { then, .. } if **then == Expr::One));
        assert!(matches!(flags[2], Expr::Case { then, .. } if **then == Expr::One));
    }

    #[tokio::test]
    async fn flag_query_is_still_validated() {
        let sieve = sieve();
        let ast = sieve
            .ast("articles", &["id", "status"], AstQuery::default())
            .unwrap();

        let err = sieve
            .fetch_permitted_ast_root_fields(&ast, Action::Read, Some(&Accountability::user("u1")))
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }
}
