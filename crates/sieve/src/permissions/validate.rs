use super::FieldMapEntry;
use crate::{ast::FieldPath, Error, Permission, Result, SchemaOverview};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// Checks every scope of `map` against `permissions`.
///
/// A scope whose collection has no rule, or does not exist, fails the whole
/// request. So does a scope requesting fields outside the union of its
/// rules' field lists, or fields the collection does not have.
pub(crate) fn validate_path(
    map: &IndexMap<FieldPath, FieldMapEntry>,
    permissions: &[Permission],
    schema: &SchemaOverview,
) -> Result<()> {
    for (path, entry) in map {
        let rules: Vec<&Permission> = permissions
            .iter()
            .filter(|permission| permission.collection == entry.collection)
            .collect();

        let Some(collection) = schema.collection(&entry.collection) else {
            debug!(collection = %entry.collection, path = %path, "unknown collection");
            return Err(Error::forbidden_collection(&entry.collection, path.to_string()));
        };

        if rules.is_empty() {
            debug!(collection = %entry.collection, path = %path, "no permission for collection");
            return Err(Error::forbidden_collection(&entry.collection, path.to_string()));
        }

        let allowed: IndexSet<String> = rules
            .iter()
            .flat_map(|permission| permission.field_list())
            .collect();
        let wildcard = allowed.contains("*");

        let forbidden: IndexSet<&str> = entry
            .fields
            .iter()
            .filter(|field| {
                !collection.has_field(field) || !(wildcard || allowed.contains(field.as_str()))
            })
            .map(String::as_str)
            .collect();

        if !forbidden.is_empty() {
            debug!(
                collection = %entry.collection,
                path = %path,
                fields = ?forbidden,
                "fields not permitted"
            );
            return Err(Error::forbidden_fields(
                &entry.collection,
                forbidden,
                path.to_string(),
            ));
        }
    }

    Ok(())
}
