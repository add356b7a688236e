use super::{AccessFilter, ContextKind, PermissionFilter, Store};
use crate::{Access, Permission, Policy, Result, Role};

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

/// In-process store. Every write bumps the generation counter, which
/// invalidates cached permission sets.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    generation: AtomicU64,
}

#[derive(Debug, Default)]
struct Tables {
    roles: IndexMap<String, Role>,
    policies: IndexMap<String, Policy>,
    access: Vec<Access>,
    permissions: Vec<Permission>,
    users: IndexMap<String, serde_json::Value>,
    next_permission_id: i64,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn insert_role(&self, role: Role) {
        self.write().roles.insert(role.id.clone(), role);
        self.bump();
    }

    pub fn insert_policy(&self, policy: Policy) {
        self.write().policies.insert(policy.id.clone(), policy);
        self.bump();
    }

    pub fn insert_access(&self, access: Access) {
        self.write().access.push(access);
        self.bump();
    }

    /// Stores `permission`, assigning it the next id when it has none.
    /// Returns the id.
    pub fn insert_permission(&self, mut permission: Permission) -> i64 {
        let mut tables = self.write();
        let id = match permission.id {
            Some(id) => {
                tables.next_permission_id = tables.next_permission_id.max(id);
                id
            }
            None => {
                tables.next_permission_id += 1;
                tables.next_permission_id
            }
        };
        permission.id = Some(id);
        tables.permissions.push(permission);
        drop(tables);

        self.bump();
        id
    }

    pub fn remove_permission(&self, id: i64) -> Option<Permission> {
        let mut tables = self.write();
        let index = tables
            .permissions
            .iter()
            .position(|permission| permission.id == Some(id))?;
        let removed = tables.permissions.remove(index);
        drop(tables);

        self.bump();
        Some(removed)
    }

    /// Stores the record `$CURRENT_USER.<path>` variables read from.
    pub fn insert_user(&self, id: impl Into<String>, record: serde_json::Value) {
        self.write().users.insert(id.into(), record);
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn role(&self, id: &str) -> Result<Option<Role>> {
        Ok(self.read().roles.get(id).cloned())
    }

    async fn access(&self, filter: &AccessFilter) -> Result<Vec<Access>> {
        Ok(self
            .read()
            .access
            .iter()
            .filter(|access| filter.matches(access))
            .cloned()
            .collect())
    }

    async fn policies(&self, ids: &[String]) -> Result<Vec<Policy>> {
        let tables = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| tables.policies.get(id))
            .cloned()
            .collect())
    }

    async fn permissions(&self, filter: &PermissionFilter) -> Result<Vec<Permission>> {
        let mut permissions: Vec<_> = self
            .read()
            .permissions
            .iter()
            .filter(|permission| filter.matches(permission))
            .cloned()
            .collect();
        permissions.sort_by_key(|permission| permission.id);
        Ok(permissions)
    }

    async fn context(&self, kind: ContextKind, id: &str) -> Result<Option<serde_json::Value>> {
        let tables = self.read();
        let record = match kind {
            ContextKind::User => tables.users.get(id).cloned(),
            ContextKind::Role => tables.roles.get(id).map(serde_json::to_value).transpose()?,
            ContextKind::Policy => tables
                .policies
                .get(id)
                .map(serde_json::to_value)
                .transpose()?,
        };
        Ok(record)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
