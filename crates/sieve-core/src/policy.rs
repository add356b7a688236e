use serde::{Deserialize, Serialize};

/// A named bundle of permission rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub admin_access: bool,

    #[serde(default)]
    pub app_access: bool,

    /// Addresses or CIDR ranges the policy is restricted to
    #[serde(default)]
    pub ip_access: Option<Vec<String>>,
}

/// Attaches a policy to a role, to a user, or to the public when neither is
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Access {
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    pub policy: String,

    #[serde(default)]
    pub sort: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub parent: Option<String>,
}

impl Policy {
    pub fn new(id: impl Into<String>) -> Policy {
        let id = id.into();
        Policy {
            name: id.clone(),
            id,
            admin_access: false,
            app_access: false,
            ip_access: None,
        }
    }

    pub fn admin(mut self) -> Self {
        self.admin_access = true;
        self
    }

    pub fn ip_access<I, S>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ip_access = Some(ranges.into_iter().map(Into::into).collect());
        self
    }
}

impl Access {
    pub fn role(role: impl Into<String>, policy: impl Into<String>) -> Access {
        Access {
            role: Some(role.into()),
            user: None,
            policy: policy.into(),
            sort: None,
        }
    }

    pub fn user(user: impl Into<String>, policy: impl Into<String>) -> Access {
        Access {
            role: None,
            user: Some(user.into()),
            policy: policy.into(),
            sort: None,
        }
    }

    pub fn public(policy: impl Into<String>) -> Access {
        Access {
            role: None,
            user: None,
            policy: policy.into(),
            sort: None,
        }
    }

    pub fn sort(mut self, sort: i64) -> Self {
        self.sort = Some(sort);
        self
    }
}

impl Role {
    pub fn new(id: impl Into<String>) -> Role {
        let id = id.into();
        Role {
            name: id.clone(),
            id,
            parent: None,
        }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}
