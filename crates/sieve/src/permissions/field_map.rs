use crate::{
    ast::{field_name, visit, FieldPath, Function, Node, Query, Visit},
    filter::Filter,
    schema::RelationType,
    Ast, SchemaOverview,
};

use indexmap::{IndexMap, IndexSet};

/// The collections and fields an AST touches, keyed by the scope they are
/// touched in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    /// Fields selected for output
    pub other: IndexMap<FieldPath, FieldMapEntry>,

    /// Fields read by query modifiers: filters, sorts, grouping,
    /// aggregation and `count()` functions
    pub read: IndexMap<FieldPath, FieldMapEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapEntry {
    pub collection: String,
    pub fields: Vec<String>,
}

impl FieldMap {
    /// Walks `ast` and collects, for every scope, the fields it selects and
    /// the fields its modifiers read.
    pub fn extract(ast: &Ast, schema: &SchemaOverview) -> FieldMap {
        let mut extractor = Extractor {
            schema,
            map: FieldMap::default(),
        };
        ast.visit(&mut extractor);

        let mut map = extractor.map;
        for entry in map.other.values_mut().chain(map.read.values_mut()) {
            entry.dedupe();
        }
        map
    }

    /// Every collection referenced by either map, in first-seen order.
    pub fn collections(&self) -> Vec<String> {
        self.other
            .values()
            .chain(self.read.values())
            .map(|entry| entry.collection.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }
}

impl FieldMapEntry {
    fn new(collection: &str) -> FieldMapEntry {
        FieldMapEntry {
            collection: collection.to_string(),
            fields: vec![],
        }
    }

    fn dedupe(&mut self) {
        let fields: IndexSet<String> = self.fields.drain(..).collect();
        self.fields = fields.into_iter().collect();
    }
}

struct Extractor<'a> {
    schema: &'a SchemaOverview,
    map: FieldMap,
}

impl Extractor<'_> {
    fn other(&mut self, path: &FieldPath, collection: &str) -> &mut FieldMapEntry {
        self.map
            .other
            .entry(path.clone())
            .or_insert_with(|| FieldMapEntry::new(collection))
    }

    fn read(&mut self, path: &FieldPath, collection: &str) -> &mut FieldMapEntry {
        self.map
            .read
            .entry(path.clone())
            .or_insert_with(|| FieldMapEntry::new(collection))
    }

    fn modifiers(&mut self, path: &FieldPath, collection: &str, query: &Query) {
        if let Some(filter) = &query.filter {
            self.filter(path, collection, filter);
        }

        let mut fields = vec![];

        for sort in query.sort.iter().flatten() {
            fields.push(field_name(&sort.field).to_string());
        }

        fields.extend(
            query
                .group
                .iter()
                .flatten()
                .map(|group| field_name(group).to_string()),
        );

        if let Some(aggregate) = &query.aggregate {
            for (_, targets) in &aggregate.functions {
                fields.extend(targets.iter().filter(|f| *f != "*").cloned());
            }
        }

        if !fields.is_empty() {
            self.read(path, collection).fields.extend(fields);
        }
    }

    fn filter(&mut self, path: &FieldPath, collection: &str, filter: &Filter) {
        let schema = self.schema;

        for condition in filter.field_filters() {
            let (key, scope) = match condition.key.split_once(':') {
                Some((key, scope)) => (key, Some(scope)),
                None => (condition.key.as_str(), None),
            };
            let field = field_name(key);

            self.read(path, collection).fields.push(field.to_string());

            if key.starts_with("count(") {
                self.related(path, collection, field);
            }

            let Some(nested) = condition.condition.nested() else {
                continue;
            };

            let Some((ty, relation)) = schema.relation(collection, field) else {
                continue;
            };

            let (child, target) = match (ty, scope) {
                (RelationType::M2o, _) => (
                    path.child(field),
                    relation.related_collection.clone().unwrap_or_default(),
                ),
                (RelationType::O2m, _) => (path.child(field), relation.collection.clone()),
                (RelationType::A2o, Some(scope)) => (path.scoped(field, scope), scope.to_string()),
                _ => continue,
            };

            self.read(&child, &target);
            self.filter(&child, &target, nested);
        }
    }

    /// Registers the collection counted by `count(<o2m field>)`.
    fn related(&mut self, path: &FieldPath, collection: &str, field: &str) {
        let schema = self.schema;
        if let Some((RelationType::O2m, relation)) = schema.relation(collection, field) {
            self.read(&path.child(field), &relation.collection);
        }
    }
}

impl Visit for Extractor<'_> {
    fn visit_scope(&mut self, scope: &visit::Scope<'_>) {
        let entry = self.other(&scope.path, scope.collection);

        for child in scope.children {
            entry.fields.push(child.field_key().to_string());
        }

        for child in scope.children {
            if let Node::FunctionField(node) = child {
                if node.call.function == Function::Count {
                    self.related(&scope.path, scope.collection, &node.call.field);
                }
            }
        }

        self.modifiers(&scope.path, scope.collection, scope.query);

        visit::visit_scope(self, scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::FieldsBuilder,
        schema::{Collection, Field, FieldType, Relation},
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

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
            .collection(
                Collection::new("comments", "id")
                    .field(Field::new("id", FieldType::Integer))
                    .field(Field::new("article", FieldType::Integer)),
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
                    .field(Field::new("title", FieldType::String)),
            )
            .collection(
                Collection::new("posts", "id")
                    .field(Field::new("id", FieldType::Integer))
                    .field(Field::new("body", FieldType::Text)),
            )
            .relation(Relation::m2o("articles", "author", "users"))
            .relation(Relation::m2o("comments", "article", "articles").one_field("comments"))
            .relation(Relation::a2o("blocks", "item", "collection", ["pages", "posts"]))
            .build()
            .unwrap()
    }

    fn entry(collection: &str, fields: &[&str]) -> FieldMapEntry {
        FieldMapEntry {
            collection: collection.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn keys(map: &IndexMap<FieldPath, FieldMapEntry>) -> Vec<String> {
        map.keys().map(ToString::to_string).collect()
    }

    #[test]
    fn nested_scopes() {
        let schema = schema();
        let ast = FieldsBuilder::new(&schema)
            .build(
                "articles",
                &["id", "title", "author.name", "comments.id"],
                Query::default(),
            )
            .unwrap();

        let map = FieldMap::extract(&ast, &schema);
        assert_eq!(keys(&map.other), ["", "author", "comments"]);
        assert_eq!(
            map.other[&FieldPath::root()],
            entry("articles", &["id", "title", "author", "comments"])
        );
        assert_eq!(
            map.other[&FieldPath::root().child("author")],
            entry("users", &["name"])
        );
        assert!(map.read.is_empty());
    }

    #[test]
    fn any_to_one_branches_get_their_own_paths() {
        let schema = schema();
        let ast = FieldsBuilder::new(&schema)
            .build("blocks", &["item:pages.title", "item:posts.body"], Query::default())
            .unwrap();

        let map = FieldMap::extract(&ast, &schema);
        assert_eq!(keys(&map.other), ["", "item:pages", "item:posts"]);
        assert!(!map.other.keys().any(|path| path.to_string() == "item"));
        assert_eq!(map.collections(), ["blocks", "pages", "posts"]);
    }

    #[test]
    fn duplicate_fields_collapse() {
        let schema = schema();
        let ast = Ast::new("articles")
            .child("id")
            .child("title")
            .child("id");

        let first = FieldMap::extract(&ast, &schema);
        assert_eq!(first.other[&FieldPath::root()], entry("articles", &["id", "title"]));

        let second = FieldMap::extract(&ast, &schema);
        assert_eq!(first, second);
    }

    #[test]
    fn modifiers_land_in_read() {
        let schema = schema();
        let filter = Filter::from_json(&json!({
            "status": {"_eq": "published"},
            "author": {"name": {"_eq": "Ada"}},
            "count(comments)": {"_gt": 1}
        }))
        .unwrap();
        let query = Query::default()
            .filter(filter)
            .sort(["-title"])
            .unwrap();
        let ast = Ast::new("articles").child("id").query(query);

        let map = FieldMap::extract(&ast, &schema);
        assert_eq!(keys(&map.read), ["", "author", "comments"]);
        assert_eq!(
            map.read[&FieldPath::root()],
            entry("articles", &["status", "author", "comments", "title"])
        );
        assert_eq!(
            map.read[&FieldPath::root().child("author")],
            entry("users", &["name"])
        );
        assert_eq!(
            map.read[&FieldPath::root().child("comments")],
            entry("comments", &[])
        );
        assert_eq!(map.collections(), ["articles", "users", "comments"]);
    }

    #[test]
    fn scoped_any_to_one_filter() {
        let schema = schema();
        let filter = Filter::from_json(&json!({"item:pages": {"title": {"_eq": "Home"}}})).unwrap();
        let ast = Ast::new("blocks")
            .child("id")
            .query(Query::default().filter(filter));

        let map = FieldMap::extract(&ast, &schema);
        assert_eq!(keys(&map.read), ["", "item:pages"]);
        assert_eq!(map.read[&FieldPath::root()], entry("blocks", &["item"]));
    }

    #[test]
    fn aggregate_and_group_fields() {
        let schema = schema();
        let query = Query::default()
            .group(["status"])
            .aggregate(crate::ast::AggregateFn::Count, &["*"])
            .aggregate(crate::ast::AggregateFn::Max, &["id"]);
        let ast = Ast::new("articles").query(query);

        let map = FieldMap::extract(&ast, &schema);
        assert_eq!(map.read[&FieldPath::root()], entry("articles", &["status", "id"]));
    }
}
