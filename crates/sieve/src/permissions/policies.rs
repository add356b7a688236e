use super::ip;
use crate::{
    store::{AccessFilter, Store},
    Access, Accountability, Policy, Result, Sieve,
};

use indexmap::IndexSet;
use std::collections::HashSet;
use tracing::debug;

/// App-wide capabilities granted by the caller's policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalAccess {
    pub admin: bool,
    pub app: bool,
}

impl Sieve {
    /// Resolves the ids of the policies that apply to `accountability`, in
    /// precedence order.
    ///
    /// Admins bypass enforcement and get no policies. Policies resolved
    /// upstream are returned as-is.
    pub async fn fetch_policies(&self, accountability: &Accountability) -> Result<Vec<String>> {
        if accountability.admin {
            return Ok(vec![]);
        }

        if let Some(policies) = &accountability.policies {
            return Ok(policies.clone());
        }

        let policies = resolve(self.store().as_ref(), accountability).await?;

        debug!(
            user = ?accountability.user,
            role = ?accountability.role,
            policies = policies.len(),
            "policies resolved"
        );

        Ok(policies.into_iter().map(|policy| policy.id).collect())
    }

    pub async fn fetch_global_access(&self, accountability: &Accountability) -> Result<GlobalAccess> {
        if accountability.admin {
            return Ok(GlobalAccess {
                admin: true,
                app: true,
            });
        }

        let ids = self.fetch_policies(accountability).await?;
        let policies = self.store().policies(&ids).await?;

        let admin = policies.iter().any(|policy| policy.admin_access);
        Ok(GlobalAccess {
            admin,
            app: admin || policies.iter().any(|policy| policy.app_access),
        })
    }
}

async fn resolve(store: &dyn Store, accountability: &Accountability) -> Result<Vec<Policy>> {
    let roles = role_chain(store, accountability).await?;

    let filter = AccessFilter {
        roles: roles.clone(),
        user: accountability.user.clone(),
    };
    let grants = store.access(&filter).await?;
    let ids = order_grants(&grants, &roles, accountability.user.as_deref());

    let mut policies = store.policies(&ids).await?;
    policies.sort_by_key(|policy| ids.iter().position(|id| *id == policy.id));
    policies.retain(|policy| {
        ip::allows(
            policy.ip_access.as_deref().unwrap_or_default(),
            accountability.ip,
        )
    });

    Ok(policies)
}

/// Role ids from the root ancestor down to the caller's own role.
async fn role_chain(store: &dyn Store, accountability: &Accountability) -> Result<Vec<String>> {
    if !accountability.roles.is_empty() {
        return Ok(accountability.roles.clone());
    }

    let mut chain = vec![];
    let mut seen = HashSet::new();
    let mut next = accountability.role.clone();

    while let Some(id) = next {
        if !seen.insert(id.clone()) {
            break;
        }

        next = store.role(&id).await?.and_then(|role| role.parent);
        chain.push(id);
    }

    chain.reverse();
    Ok(chain)
}

/// Policy ids ordered by role chain position, then user grants last. Within
/// one holder, grants are ordered by their sort value.
fn order_grants(grants: &[Access], roles: &[String], user: Option<&str>) -> Vec<String> {
    fn sorted<'a>(mut grants: Vec<&'a Access>) -> Vec<&'a Access> {
        grants.sort_by_key(|access| access.sort.unwrap_or(i64::MAX));
        grants
    }

    let mut ordered = IndexSet::new();

    if roles.is_empty() && user.is_none() {
        for access in sorted(grants.iter().collect()) {
            ordered.insert(access.policy.clone());
        }
    }

    for role in roles {
        let held = grants
            .iter()
            .filter(|access| access.role.as_deref() == Some(role))
            .collect();
        for access in sorted(held) {
            ordered.insert(access.policy.clone());
        }
    }

    if let Some(user) = user {
        let held = grants
            .iter()
            .filter(|access| access.user.as_deref() == Some(user))
            .collect();
        for access in sorted(held) {
            ordered.insert(access.policy.clone());
        }
    }

    ordered.into_iter().collect()
}
