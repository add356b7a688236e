use super::{AccessFilter, ContextKind, PermissionFilter, Store};
use crate::{Access, Action, Connection, Dialect, Filter, Permission, Policy, Result, Role};

use sieve_core::{
    stmt::{Record, Value},
    Error,
};
use sieve_sql::{
    stmt::{Condition, Direction, Expr, OrderBy, Parameters, Select, SelectItem, Source, TableRef},
    Query, Serializer,
};

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::trace;

const ROLES: &str = "sieve_roles";
const POLICIES: &str = "sieve_policies";
const ACCESS: &str = "sieve_access";
const PERMISSIONS: &str = "sieve_permissions";
const USERS: &str = "sieve_users";

const TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "sieve_roles" (
        "id" VARCHAR(255) PRIMARY KEY,
        "name" VARCHAR(255),
        "parent" VARCHAR(255)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "sieve_policies" (
        "id" VARCHAR(255) PRIMARY KEY,
        "name" VARCHAR(255),
        "admin_access" BOOLEAN NOT NULL DEFAULT FALSE,
        "app_access" BOOLEAN NOT NULL DEFAULT FALSE,
        "ip_access" TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "sieve_access" (
        "id" INTEGER PRIMARY KEY,
        "role" VARCHAR(255),
        "user" VARCHAR(255),
        "policy" VARCHAR(255) NOT NULL,
        "sort" INTEGER
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "sieve_permissions" (
        "id" INTEGER PRIMARY KEY,
        "policy" VARCHAR(255) NOT NULL,
        "collection" VARCHAR(255) NOT NULL,
        "action" VARCHAR(16) NOT NULL,
        "permissions" TEXT,
        "validation" TEXT,
        "presets" TEXT,
        "fields" TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "sieve_users" (
        "id" VARCHAR(255) PRIMARY KEY,
        "email" VARCHAR(255),
        "role" VARCHAR(255)
    )"#,
];

/// Store backed by `sieve_*` tables, read through a driver connection.
///
/// Writes made behind the store's back are not observed by the permission
/// cache until [`SqlStore::invalidate`] is called. Writes issued through
/// [`SqlStore::execute`] invalidate it automatically.
#[derive(Debug)]
pub struct SqlStore {
    connection: Mutex<Box<dyn Connection>>,
    generation: AtomicU64,
}

impl SqlStore {
    pub fn new(connection: Box<dyn Connection>) -> SqlStore {
        SqlStore {
            connection: Mutex::new(connection),
            generation: AtomicU64::new(0),
        }
    }

    /// Creates the `sieve_*` tables when they are missing.
    pub async fn install(&self) -> Result<()> {
        let mut connection = self.connection.lock().await;

        if connection.dialect() == Dialect::Mysql {
            sieve_core::bail!("installing the store tables is not supported on MySQL");
        }

        for ddl in TABLES {
            connection.execute(ddl, &[]).await?;
        }

        Ok(())
    }

    /// Runs a write statement against the store tables.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let count = self.connection.lock().await.execute(sql, params).await?;
        self.invalidate();
        Ok(count)
    }

    /// Marks every cached permission set as stale.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    async fn fetch(&self, query: Query) -> Result<Vec<Record>> {
        let mut connection = self.connection.lock().await;
        let (sql, params) = Serializer::for_dialect(connection.dialect()).render(&query);

        trace!(sql = %sql, params = params.len(), "store query");

        connection.query(&sql, &params).await
    }
}

#[async_trait]
impl Store for SqlStore {
    async fn role(&self, id: &str) -> Result<Option<Role>> {
        let mut params = Parameters::new();
        let id = params.push(id);

        let mut select = table(ROLES, &["id", "name", "parent"]);
        select.and_where(Condition::eq(Expr::column("t0", "id"), id));

        let rows = self.fetch(query(select, params)).await?;
        rows.first().map(role).transpose()
    }

    async fn access(&self, filter: &AccessFilter) -> Result<Vec<Access>> {
        let mut params = Parameters::new();
        let mut select = table(ACCESS, &["role", "user", "policy", "sort"]);

        let condition = if filter.is_public() {
            Condition::all(vec![
                Condition::is_null(Expr::column("t0", "role"), false),
                Condition::is_null(Expr::column("t0", "user"), false),
            ])
        } else {
            let mut any = vec![];

            if !filter.roles.is_empty() {
                any.push(Condition::In {
                    expr: Expr::column("t0", "role"),
                    list: filter
                        .roles
                        .iter()
                        .map(|role| params.push(role.as_str()).into())
                        .collect(),
                    negate: false,
                });
            }

            if let Some(user) = &filter.user {
                any.push(Condition::eq(
                    Expr::column("t0", "user"),
                    params.push(user.as_str()),
                ));
            }

            Condition::any(any)
        };
        select.and_where(condition);

        let rows = self.fetch(query(select, params)).await?;
        rows.iter().map(access).collect()
    }

    async fn policies(&self, ids: &[String]) -> Result<Vec<Policy>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut params = Parameters::new();
        let mut select = table(
            POLICIES,
            &["id", "name", "admin_access", "app_access", "ip_access"],
        );
        select.and_where(in_list(&mut params, "id", ids));

        let rows = self.fetch(query(select, params)).await?;
        rows.iter().map(policy).collect()
    }

    async fn permissions(&self, filter: &PermissionFilter) -> Result<Vec<Permission>> {
        if filter.policies.is_empty() {
            return Ok(vec![]);
        }

        let mut params = Parameters::new();
        let mut select = table(
            PERMISSIONS,
            &[
                "id",
                "policy",
                "collection",
                "action",
                "permissions",
                "validation",
                "presets",
                "fields",
            ],
        );

        select.and_where(in_list(&mut params, "policy", &filter.policies));
        select.and_where(Condition::eq(
            Expr::column("t0", "action"),
            params.push(filter.action.as_str()),
        ));
        if let Some(collections) = &filter.collections {
            select.and_where(in_list(&mut params, "collection", collections));
        }
        select.order_by.push(OrderBy {
            expr: Expr::column("t0", "id"),
            direction: Direction::Asc,
        });

        let rows = self.fetch(query(select, params)).await?;
        rows.iter().map(permission).collect()
    }

    async fn context(&self, kind: ContextKind, id: &str) -> Result<Option<serde_json::Value>> {
        let name = match kind {
            ContextKind::User => USERS,
            ContextKind::Role => ROLES,
            ContextKind::Policy => POLICIES,
        };

        let mut params = Parameters::new();
        let id = params.push(id);

        let mut select = Select::from(Source::Table(TableRef::new(name, "t0")));
        select.columns.push(SelectItem {
            expr: Expr::AllColumns("t0".to_string()),
            alias: None,
        });
        select.and_where(Condition::eq(Expr::column("t0", "id"), id));

        let rows = self.fetch(query(select, params)).await?;
        Ok(rows.first().map(|record| {
            serde_json::Value::Object(
                record
                    .iter()
                    .map(|(column, value)| (column.to_string(), value.to_json()))
                    .collect(),
            )
        }))
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

fn table(name: &str, columns: &[&str]) -> Select {
    let mut select = Select::from(Source::Table(TableRef::new(name, "t0")));
    for column in columns {
        select.column(Expr::column("t0", *column), *column);
    }
    select
}

fn query(select: Select, params: Parameters) -> Query {
    Query {
        select,
        parameters: params.into_vec(),
        paths: IndexMap::new(),
        shapes: IndexMap::new(),
    }
}

fn in_list(params: &mut Parameters, column: &str, values: &[String]) -> Condition {
    Condition::In {
        expr: Expr::column("t0", column),
        list: values
            .iter()
            .map(|value| params.push(value.as_str()).into())
            .collect(),
        negate: false,
    }
}

fn text(record: &Record, column: &str) -> Result<Option<String>> {
    match record.get(column) {
        Value::Null => Ok(None),
        Value::String(value) => Ok(Some(value.clone())),
        Value::I64(value) => Ok(Some(value.to_string())),
        other => Err(Error::type_conversion(other.clone(), "string")),
    }
}

fn required(record: &Record, column: &str) -> Result<String> {
    text(record, column)?.ok_or_else(|| sieve_core::err!("column `{column}` is null"))
}

/// JSON stored as text (SQLite) or as a native JSON value (PostgreSQL).
fn json(record: &Record, column: &str) -> Result<Option<serde_json::Value>> {
    match record.get(column) {
        Value::Null => Ok(None),
        Value::String(text) => match serde_json::from_str(text)? {
            serde_json::Value::Null => Ok(None),
            json => Ok(Some(json)),
        },
        other => Ok(Some(other.to_json())),
    }
}

fn filter(record: &Record, column: &str) -> Result<Option<Filter>> {
    json(record, column)?
        .map(|json| Filter::from_json(&json))
        .transpose()
}

/// A list stored as a JSON array or as comma separated text.
fn list(record: &Record, column: &str) -> Result<Option<Vec<String>>> {
    match record.get(column) {
        Value::String(text) if !text.trim_start().starts_with('[') => Ok(Some(
            text.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        _ => Ok(json(record, column)?
            .map(serde_json::from_value)
            .transpose()?),
    }
}

fn flag(record: &Record, column: &str) -> Result<bool> {
    match record.get(column) {
        Value::Null => Ok(false),
        value => value.to_bool(),
    }
}

fn role(record: &Record) -> Result<Role> {
    let id = required(record, "id")?;
    Ok(Role {
        name: text(record, "name")?.unwrap_or_else(|| id.clone()),
        parent: text(record, "parent")?,
        id,
    })
}

fn access(record: &Record) -> Result<Access> {
    Ok(Access {
        role: text(record, "role")?,
        user: text(record, "user")?,
        policy: required(record, "policy")?,
        sort: match record.get("sort") {
            Value::Null => None,
            value => Some(value.to_i64()?),
        },
    })
}

fn policy(record: &Record) -> Result<Policy> {
    let id = required(record, "id")?;
    Ok(Policy {
        name: text(record, "name")?.unwrap_or_else(|| id.clone()),
        admin_access: flag(record, "admin_access")?,
        app_access: flag(record, "app_access")?,
        ip_access: list(record, "ip_access")?,
        id,
    })
}

fn permission(record: &Record) -> Result<Permission> {
    let action = required(record, "action")?;

    Ok(Permission {
        id: match record.get("id") {
            Value::Null => None,
            value => Some(value.to_i64()?),
        },
        policy: required(record, "policy")?,
        collection: required(record, "collection")?,
        action: Action::parse(&action)
            .ok_or_else(|| Error::invalid_schema(format!("unknown permission action `{action}`")))?,
        permissions: filter(record, "permissions")?,
        validation: filter(record, "validation")?,
        presets: json(record, "presets")?,
        fields: list(record, "fields")?,
    })
}
