use super::{cache::CacheKey, dynamic_variables::Variables};
use crate::{store::PermissionFilter, Accountability, Action, Permission, Result, Sieve};

use std::sync::Arc;
use tracing::debug;

/// Arguments of [`Sieve::fetch_permissions`].
#[derive(Debug, Clone, Copy)]
pub struct FetchPermissions<'a> {
    pub action: Action,
    pub policies: &'a [String],

    /// `None` reads the rules of every collection
    pub collections: Option<&'a [String]>,

    /// Caller the dynamic variables are resolved for
    pub accountability: Option<&'a Accountability>,

    /// Return rules with their dynamic variables untouched
    pub bypass_dynamic_variable_processing: bool,
}

impl<'a> FetchPermissions<'a> {
    pub fn new(action: Action, policies: &'a [String]) -> FetchPermissions<'a> {
        FetchPermissions {
            action,
            policies,
            collections: None,
            accountability: None,
            bypass_dynamic_variable_processing: false,
        }
    }

    pub fn collections(mut self, collections: &'a [String]) -> Self {
        self.collections = Some(collections);
        self
    }

    pub fn accountability(mut self, accountability: &'a Accountability) -> Self {
        self.accountability = Some(accountability);
        self
    }

    pub fn bypass_dynamic_variable_processing(mut self) -> Self {
        self.bypass_dynamic_variable_processing = true;
        self
    }
}

impl Sieve {
    /// Fetches the rules the given policies hold for an action, ordered by
    /// policy precedence and then by rule id.
    pub async fn fetch_permissions(&self, options: FetchPermissions<'_>) -> Result<Vec<Permission>> {
        if options.policies.is_empty() {
            return Ok(vec![]);
        }

        let store = self.store();
        let key = CacheKey::new(options.policies, options.action, options.collections);
        let generation = store.generation();

        let rules = match self.cache().get(&key, generation) {
            Some(rules) => {
                debug!(action = %options.action, rules = rules.len(), "permission cache hit");
                rules
            }
            None => {
                let filter = PermissionFilter {
                    policies: options.policies.to_vec(),
                    action: options.action,
                    collections: options.collections.map(<[String]>::to_vec),
                };

                let rules = Arc::new(store.permissions(&filter).await?);
                debug!(action = %options.action, rules = rules.len(), "permissions fetched");

                self.cache().insert(key, generation, rules.clone());
                rules
            }
        };

        let mut permissions = Vec::clone(&rules);
        permissions.sort_by_key(|permission| {
            options
                .policies
                .iter()
                .position(|policy| *policy == permission.policy)
        });

        if options.bypass_dynamic_variable_processing {
            return Ok(permissions);
        }

        let public = Accountability::public();
        let accountability = options.accountability.unwrap_or(&public);
        let variables =
            Variables::load(store.as_ref(), accountability, options.policies, &permissions).await?;

        for permission in &mut permissions {
            variables.apply(permission)?;
        }

        Ok(permissions)
    }
}
