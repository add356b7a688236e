use super::{resolve_allowed_sort, AllowedSort};
use crate::{
    ast::{self, visit_mut, Node, VisitMut},
    Ast, Permission, SchemaOverview,
};

use indexmap::IndexSet;

/// Fills in the sort of every one-to-many scope that does not sort itself.
///
/// With `permissions` set, the sort only falls on fields those rules let
/// the caller read.
pub(crate) fn apply_default_sort(
    ast: &mut Ast,
    schema: &SchemaOverview,
    permissions: Option<&[Permission]>,
) {
    ast.visit_mut(&mut DefaultSort {
        schema,
        permissions,
    });
}

struct DefaultSort<'a> {
    schema: &'a SchemaOverview,
    permissions: Option<&'a [Permission]>,
}

impl DefaultSort<'_> {
    fn allowed_fields(&self, collection: &str) -> Option<Vec<String>> {
        let permissions = self.permissions?;

        let fields: IndexSet<String> = permissions
            .iter()
            .filter(|permission| permission.collection == collection)
            .flat_map(|permission| permission.field_list())
            .collect();

        Some(fields.into_iter().collect())
    }
}

impl VisitMut for DefaultSort<'_> {
    fn visit_scope_mut(&mut self, scope: visit_mut::ScopeMut<'_>) {
        for child in scope.children.iter_mut() {
            let Node::O2m(nested) = child else {
                continue;
            };

            if nested.query.sort.is_some() {
                continue;
            }

            let allowed = self.allowed_fields(&nested.collection);
            let options = AllowedSort {
                collection: &nested.collection,
                relation: Some(&nested.relation),
                query: Some(&nested.query),
            };

            nested.query.sort = resolve_allowed_sort(self.schema, &options, allowed.as_deref())
                .map(|fields| fields.into_iter().map(ast::Sort::asc).collect());
        }

        visit_mut::visit_scope_mut(self, scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{FieldsBuilder, Query, Sort},
        schema::{Collection, Field, FieldType, Relation},
        Action,
    };
    use pretty_assertions::assert_eq;

    fn schema() -> SchemaOverview {
        SchemaOverview::builder()
            .collection(
                Collection::new("articles", "id")
                    .field(Field::new("id", FieldType::Integer))
                    .field(Field::new("comments", FieldType::Alias)),
            )
            .collection(
                Collection::new("comments", "id")
                    .field(Field::new("id", FieldType::Integer))
                    .field(Field::new("article", FieldType::Integer))
                    .field(Field::new("body", FieldType::Text)),
            )
            .relation(Relation::m2o("comments", "article", "articles").one_field("comments"))
            .build()
            .unwrap()
    }

    fn comments_sort(ast: &Ast) -> Option<Vec<Sort>> {
        ast.children.iter().find_map(|child| match child {
            Node::O2m(nested) => Some(nested.query.sort.clone()),
            _ => None,
        })?
    }

    fn ast(schema: &SchemaOverview) -> Ast {
        FieldsBuilder::new(schema)
            .build("articles", &["id", "comments.body"], Query::default())
            .unwrap()
    }

    #[test]
    fn primary_key_without_rules() {
        let schema = schema();
        let mut ast = ast(&schema);
        apply_default_sort(&mut ast, &schema, None);

        assert_eq!(comments_sort(&ast), Some(vec![Sort::asc("id")]));
    }

    #[test]
    fn falls_back_to_a_readable_field() {
        let schema = schema();
        let permissions =
            vec![Permission::new("p", "comments", Action::Read).fields(["body"])];

        let mut ast = ast(&schema);
        apply_default_sort(&mut ast, &schema, Some(&permissions));

        assert_eq!(comments_sort(&ast), Some(vec![Sort::asc("body")]));
    }

    #[test]
    fn explicit_sort_is_kept() {
        let schema = schema();
        let mut ast = FieldsBuilder::new(&schema)
            .deep("comments", Query::default().sort(["-body"]).unwrap())
            .build("articles", &["id", "comments.body"], Query::default())
            .unwrap();
        apply_default_sort(&mut ast, &schema, Some(&[]));

        assert_eq!(comments_sort(&ast), Some(vec![Sort::parse("-body").unwrap()]));
    }
}
