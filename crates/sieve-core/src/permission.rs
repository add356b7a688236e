use crate::filter::Filter;

use serde::{Deserialize, Serialize};

/// One rule binding a policy to an action on a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub id: Option<i64>,

    pub policy: String,
    pub collection: String,
    pub action: Action,

    /// Row filter. `None` and `{}` both match every row.
    #[serde(default)]
    pub permissions: Option<Filter>,

    #[serde(default)]
    pub validation: Option<Filter>,

    #[serde(default)]
    pub presets: Option<serde_json::Value>,

    /// Allowed fields. `None` or a list containing `*` allows every field.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Share,
}

impl Permission {
    pub fn new(policy: impl Into<String>, collection: impl Into<String>, action: Action) -> Self {
        Permission {
            id: None,
            policy: policy.into(),
            collection: collection.into(),
            action,
            permissions: None,
            validation: None,
            presets: None,
            fields: None,
        }
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.permissions = Some(filter);
        self
    }

    /// Returns `true` when the rule matches every row.
    pub fn is_unconditional(&self) -> bool {
        self.permissions
            .as_ref()
            .map_or(true, Filter::is_unconditional)
    }

    /// Field list with `None` normalized to `["*"]`.
    pub fn field_list(&self) -> Vec<String> {
        match &self.fields {
            Some(fields) => fields.clone(),
            None => vec!["*".to_string()],
        }
    }

    pub fn allows_all_fields(&self) -> bool {
        self.fields
            .as_ref()
            .map_or(true, |fields| fields.iter().any(|f| f == "*"))
    }
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Share => "share",
        }
    }

    pub fn parse(name: &str) -> Option<Action> {
        Some(match name {
            "read" => Action::Read,
            "create" => Action::Create,
            "update" => Action::Update,
            "delete" => Action::Delete,
            "share" => Action::Share,
            _ => return None,
        })
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
