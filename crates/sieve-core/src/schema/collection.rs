use super::Field;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub name: String,

    /// Name of the primary key field
    pub primary: String,

    #[serde(default)]
    pub singleton: bool,

    /// Field used for manual sorting, when configured
    #[serde(default)]
    pub sort_field: Option<String>,

    #[serde(default)]
    pub fields: IndexMap<String, Field>,
}

impl Collection {
    pub fn new(name: impl Into<String>, primary: impl Into<String>) -> Collection {
        Collection {
            name: name.into(),
            primary: primary.into(),
            singleton: false,
            sort_field: None,
            fields: IndexMap::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn sort_field(mut self, field: impl Into<String>) -> Self {
        self.sort_field = Some(field.into());
        self
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn primary_field(&self) -> Option<&Field> {
        self.fields.get(&self.primary)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Fields backed by a column, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &Field> {
        self.fields.values().filter(|field| !field.ty.is_alias())
    }
}
