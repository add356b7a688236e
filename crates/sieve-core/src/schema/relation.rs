use serde::{Deserialize, Serialize};

/// An edge between two collections.
///
/// `collection.field` always holds the foreign key. For many-to-any edges
/// `related_collection` is unset and the target collection is read per row
/// from `meta.one_collection_field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub collection: String,
    pub field: String,

    #[serde(default)]
    pub related_collection: Option<String>,

    #[serde(default)]
    pub meta: Option<RelationMeta>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationMeta {
    /// Alias field on the "one" side pointing back at the "many" side
    #[serde(default)]
    pub one_field: Option<String>,

    /// Discriminator column for many-to-any edges
    #[serde(default)]
    pub one_collection_field: Option<String>,

    #[serde(default)]
    pub one_allowed_collections: Option<Vec<String>>,

    #[serde(default)]
    pub junction_field: Option<String>,

    /// Field used to order the "many" side when read through `one_field`
    #[serde(default)]
    pub sort_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    M2o,
    O2m,
    A2o,
    O2a,
}

impl Relation {
    /// Many-to-one from `collection.field` to the primary key of `related`.
    pub fn m2o(
        collection: impl Into<String>,
        field: impl Into<String>,
        related: impl Into<String>,
    ) -> Relation {
        Relation {
            collection: collection.into(),
            field: field.into(),
            related_collection: Some(related.into()),
            meta: None,
        }
    }

    /// Many-to-any from `collection.field`, discriminated by
    /// `collection_field`, over `allowed` collections.
    pub fn a2o<I, S>(
        collection: impl Into<String>,
        field: impl Into<String>,
        collection_field: impl Into<String>,
        allowed: I,
    ) -> Relation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Relation {
            collection: collection.into(),
            field: field.into(),
            related_collection: None,
            meta: Some(RelationMeta {
                one_collection_field: Some(collection_field.into()),
                one_allowed_collections: Some(allowed.into_iter().map(Into::into).collect()),
                ..RelationMeta::default()
            }),
        }
    }

    /// Names the alias field on the other side of the edge.
    pub fn one_field(mut self, one_field: impl Into<String>) -> Self {
        self.meta.get_or_insert_with(RelationMeta::default).one_field = Some(one_field.into());
        self
    }

    pub fn sort_field(mut self, sort_field: impl Into<String>) -> Self {
        self.meta.get_or_insert_with(RelationMeta::default).sort_field = Some(sort_field.into());
        self
    }

    pub fn one_field_name(&self) -> Option<&str> {
        self.meta.as_ref()?.one_field.as_deref()
    }

    pub fn one_collection_field(&self) -> Option<&str> {
        self.meta.as_ref()?.one_collection_field.as_deref()
    }

    pub fn allowed_collections(&self) -> &[String] {
        self.meta
            .as_ref()
            .and_then(|meta| meta.one_allowed_collections.as_deref())
            .unwrap_or(&[])
    }

    pub fn meta_sort_field(&self) -> Option<&str> {
        self.meta.as_ref()?.sort_field.as_deref()
    }

    /// Classifies this edge as seen from `collection.field`, or `None` when
    /// the edge does not involve that field.
    pub fn relation_type(&self, collection: &str, field: &str) -> Option<RelationType> {
        if self.collection == collection && self.field == field {
            return match &self.related_collection {
                Some(_) => Some(RelationType::M2o),
                None if self.one_collection_field().is_some() => Some(RelationType::A2o),
                None => None,
            };
        }

        if self.one_field_name() != Some(field) {
            return None;
        }

        match &self.related_collection {
            Some(related) if related == collection => Some(RelationType::O2m),
            None if self.allowed_collections().iter().any(|c| c == collection) => {
                Some(RelationType::O2a)
            }
            _ => None,
        }
    }
}
