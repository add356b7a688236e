use super::{Collection, Field, FieldType, Relation, SchemaOverview};
use crate::Result;

use indexmap::IndexMap;

/// Assembles a [`SchemaOverview`] from collections and relations.
#[derive(Debug, Default)]
pub struct Builder {
    collections: IndexMap<String, Collection>,
    relations: Vec<Relation>,
}

impl Builder {
    pub fn collection(mut self, collection: Collection) -> Self {
        self.collections.insert(collection.name.clone(), collection);
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn build(mut self) -> Result<SchemaOverview> {
        // Back-references are alias fields on the "one" side. Snapshots often
        // leave them out, so add the ones that are missing.
        for relation in &self.relations {
            let Some(one_field) = relation.one_field_name() else {
                continue;
            };

            let targets: Vec<&str> = match &relation.related_collection {
                Some(related) => vec![related.as_str()],
                None => relation
                    .allowed_collections()
                    .iter()
                    .map(String::as_str)
                    .collect(),
            };

            for target in targets {
                if let Some(collection) = self.collections.get_mut(target) {
                    if !collection.has_field(one_field) {
                        collection
                            .fields
                            .insert(one_field.to_string(), Field::new(one_field, FieldType::Alias));
                    }
                }
            }
        }

        let schema = SchemaOverview {
            collections: self.collections,
            relations: self.relations,
        };

        schema.verify()?;
        Ok(schema)
    }
}
