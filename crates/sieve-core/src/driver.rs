use crate::{async_trait, stmt, Result};

use std::{borrow::Cow, fmt::Debug};

/// SQL dialect spoken by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgresql,
    Sqlite,
    Mysql,
}

#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Connection URL this driver was created from
    fn url(&self) -> Cow<'_, str>;

    fn dialect(&self) -> Dialect;

    async fn connect(&self) -> Result<Box<dyn Connection>>;
}

#[async_trait]
pub trait Connection: Debug + Send {
    fn dialect(&self) -> Dialect;

    /// Runs a rendered statement and returns its rows keyed by column name.
    async fn query(&mut self, sql: &str, params: &[stmt::Value]) -> Result<Vec<stmt::Record>>;

    /// Runs a rendered statement and returns the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[stmt::Value]) -> Result<u64>;
}
