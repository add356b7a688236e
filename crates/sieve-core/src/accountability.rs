use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Identity of the caller a query runs on behalf of.
///
/// Built upstream by the authentication layer and never modified by the
/// engine. `None` in place of an accountability means the query runs with
/// no enforcement at all (internal callers).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Accountability {
    pub user: Option<String>,

    /// The caller's own role
    pub role: Option<String>,

    /// Role chain from the root ancestor down to `role`. When empty, the
    /// chain is looked up from the store.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Policies already resolved upstream. When set they are used as-is.
    #[serde(default)]
    pub policies: Option<Vec<String>>,

    #[serde(default)]
    pub admin: bool,

    #[serde(default)]
    pub app: bool,

    #[serde(default)]
    pub ip: Option<IpAddr>,
}

impl Accountability {
    /// An anonymous caller.
    pub fn public() -> Accountability {
        Accountability::default()
    }

    /// A caller that bypasses all enforcement.
    pub fn admin() -> Accountability {
        Accountability {
            admin: true,
            app: true,
            ..Accountability::default()
        }
    }

    pub fn user(id: impl Into<String>) -> Accountability {
        Accountability {
            user: Some(id.into()),
            ..Accountability::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_policies<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policies = Some(policies.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn is_public(&self) -> bool {
        self.user.is_none() && self.role.is_none()
    }
}
