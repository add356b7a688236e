use super::FetchPermissions;
use crate::{Accountability, Action, Result, Sieve};

use indexmap::IndexSet;

impl Sieve {
    /// Fields of `collection` the caller may use for `action`: the union of
    /// the field lists of every applicable rule. Admins get `["*"]`.
    pub async fn get_allowed_fields(
        &self,
        collection: &str,
        action: Action,
        accountability: &Accountability,
    ) -> Result<Vec<String>> {
        if accountability.admin {
            return Ok(vec!["*".to_string()]);
        }

        let policies = self.fetch_policies(accountability).await?;
        let collections = [collection.to_string()];
        let permissions = self
            .fetch_permissions(
                FetchPermissions::new(action, &policies)
                    .collections(&collections)
                    .accountability(accountability),
            )
            .await?;

        let fields: IndexSet<String> = permissions
            .iter()
            .flat_map(|permission| permission.field_list())
            .collect();

        Ok(fields.into_iter().collect())
    }
}
