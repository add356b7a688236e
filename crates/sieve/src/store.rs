//! Sources of roles, policies, access grants and permission rules.

mod memory;
pub use memory::MemoryStore;

mod sql;
pub use sql::SqlStore;

use crate::{Access, Action, Permission, Policy, Result, Role};

use async_trait::async_trait;
use std::fmt::Debug;

/// Read side of the policy and permission tables.
#[async_trait]
pub trait Store: Debug + Send + Sync + 'static {
    async fn role(&self, id: &str) -> Result<Option<Role>>;

    /// Access grants matching `filter`, in no particular order.
    async fn access(&self, filter: &AccessFilter) -> Result<Vec<Access>>;

    /// Policies with the given ids, in no particular order. Unknown ids are
    /// skipped.
    async fn policies(&self, ids: &[String]) -> Result<Vec<Policy>>;

    /// Permission rules matching `filter`, ordered by id.
    async fn permissions(&self, filter: &PermissionFilter) -> Result<Vec<Permission>>;

    /// Record used to resolve dotted dynamic variables such as
    /// `$CURRENT_USER.department`.
    async fn context(&self, kind: ContextKind, id: &str) -> Result<Option<serde_json::Value>>;

    /// Counter that changes whenever a policy, grant or permission changes.
    fn generation(&self) -> u64;
}

/// Selects access grants: the ones given to any role in `roles` or to
/// `user`. With neither, the public grants (no role, no user).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessFilter {
    pub roles: Vec<String>,
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PermissionFilter {
    pub policies: Vec<String>,
    pub action: Action,

    /// `None` reads every collection
    pub collections: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    User,
    Role,
    Policy,
}

impl AccessFilter {
    pub fn is_public(&self) -> bool {
        self.roles.is_empty() && self.user.is_none()
    }

    pub fn matches(&self, access: &Access) -> bool {
        if self.is_public() {
            return access.role.is_none() && access.user.is_none();
        }

        let role = matches!(&access.role, Some(role) if self.roles.contains(role));
        let user = self.user.is_some() && access.user == self.user;
        role || user
    }
}

impl PermissionFilter {
    pub fn matches(&self, permission: &Permission) -> bool {
        permission.action == self.action
            && self.policies.contains(&permission.policy)
            && self
                .collections
                .as_ref()
                .map_or(true, |collections| collections.contains(&permission.collection))
    }
}
