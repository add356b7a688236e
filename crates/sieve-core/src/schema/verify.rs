use super::SchemaOverview;
use crate::{Error, Result};

impl SchemaOverview {
    pub(super) fn verify(&self) -> Result<()> {
        for collection in self.collections.values() {
            if !collection.has_field(&collection.primary) {
                return Err(Error::invalid_schema(format!(
                    "collection `{}` has no primary key field `{}`",
                    collection.name, collection.primary
                )));
            }
        }

        for relation in &self.relations {
            if self.field(&relation.collection, &relation.field).is_none() {
                return Err(Error::invalid_schema(format!(
                    "relation field `{}.{}` does not exist",
                    relation.collection, relation.field
                )));
            }

            if let Some(related) = &relation.related_collection {
                if self.collection(related).is_none() {
                    return Err(Error::invalid_schema(format!(
                        "relation `{}.{}` points at unknown collection `{related}`",
                        relation.collection, relation.field
                    )));
                }
            } else {
                let Some(discriminator) = relation.one_collection_field() else {
                    return Err(Error::invalid_schema(format!(
                        "relation `{}.{}` has neither a related collection nor a collection field",
                        relation.collection, relation.field
                    )));
                };

                if self.field(&relation.collection, discriminator).is_none() {
                    return Err(Error::invalid_schema(format!(
                        "collection field `{}.{discriminator}` does not exist",
                        relation.collection
                    )));
                }

                for allowed in relation.allowed_collections() {
                    if self.collection(allowed).is_none() {
                        return Err(Error::invalid_schema(format!(
                            "relation `{}.{}` allows unknown collection `{allowed}`",
                            relation.collection, relation.field
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
