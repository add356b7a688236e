//! Read-only view of the live schema: collections, their fields and the
//! relations between them.
//!
//! The engine never mutates a [`SchemaOverview`]. A new snapshot is built
//! whenever the schema changes and swapped in by the owner of the engine.

mod builder;
pub use builder::Builder;

mod collection;
pub use collection::Collection;

mod field;
pub use field::{Field, FieldType};

mod relation;
pub use relation::{Relation, RelationMeta, RelationType};

mod verify;

use crate::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SchemaOverview {
    pub collections: IndexMap<String, Collection>,

    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl SchemaOverview {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Loads a snapshot from its JSON form.
    ///
    /// Collection and field names are taken from the map keys, alias fields
    /// for relation back-references are filled in and the result is
    /// verified.
    pub fn from_json(json: &str) -> Result<SchemaOverview> {
        let schema: SchemaOverview = serde_json::from_str(json)?;
        let mut builder = Builder::default();

        for (name, mut collection) in schema.collections {
            collection.name = name;
            for (field_name, field) in collection.fields.iter_mut() {
                field.name = field_name.clone();
            }
            builder = builder.collection(collection);
        }

        for relation in schema.relations {
            builder = builder.relation(relation);
        }

        builder.build()
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn field(&self, collection: &str, field: &str) -> Option<&Field> {
        self.collection(collection)?.fields.get(field)
    }

    /// Finds the relation that `field` of `collection` takes part in, and
    /// classifies it from the point of view of `collection`.
    pub fn relation(&self, collection: &str, field: &str) -> Option<(RelationType, &Relation)> {
        self.relations.iter().find_map(|relation| {
            relation
                .relation_type(collection, field)
                .map(|ty| (ty, relation))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_names_collections_and_fields() {
        let schema = SchemaOverview::from_json(
            r#"{
                "collections": {
                    "articles": {
                        "primary": "id",
                        "fields": {
                            "id": { "type": "integer", "nullable": false },
                            "title": { "type": "string" },
                            "author": { "type": "integer" }
                        }
                    },
                    "users": {
                        "primary": "id",
                        "fields": { "id": { "type": "integer" } }
                    }
                },
                "relations": [
                    {
                        "collection": "articles",
                        "field": "author",
                        "related_collection": "users",
                        "meta": { "one_field": "articles" }
                    }
                ]
            }"#,
        )
        .unwrap();

        let articles = schema.collection("articles").unwrap();
        assert_eq!(articles.name, "articles");
        assert_eq!(articles.fields["title"].name, "title");
        assert!(!articles.fields["id"].nullable);

        // The back-reference alias is filled in on the related collection.
        assert_eq!(
            schema.field("users", "articles").unwrap().ty,
            FieldType::Alias
        );

        let (ty, _) = schema.relation("users", "articles").unwrap();
        assert_eq!(ty, RelationType::O2m);
        let (ty, _) = schema.relation("articles", "author").unwrap();
        assert_eq!(ty, RelationType::M2o);
    }
}
