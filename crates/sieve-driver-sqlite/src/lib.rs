mod value;
pub(crate) use value::Value;

use rusqlite::Connection as RusqliteConnection;
use sieve_core::{
    async_trait,
    driver::{Dialect, Driver},
    stmt, Error, Result,
};
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};
use tracing::trace;
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver from a `sqlite:` connection URL.
    /// `sqlite::memory:` selects an in-memory database.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(Error::driver)?;

        if url.scheme() != "sqlite" {
            sieve_core::bail!("connection URL does not have a `sqlite` scheme; url={url_str}");
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn url(&self) -> Cow<'_, str> {
        match self {
            Sqlite::InMemory => Cow::Borrowed("sqlite::memory:"),
            Sqlite::File(path) => Cow::Owned(format!("sqlite:{}", path.display())),
        }
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    /// Every connection to an in-memory database sees a fresh database.
    async fn connect(&self) -> Result<Box<dyn sieve_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection = RusqliteConnection::open_in_memory().map_err(Error::driver)?;
        Ok(Self { connection })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver)?;
        Ok(Self { connection })
    }

    /// Runs several `;`-separated statements without parameters, such as a
    /// schema script.
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.connection.execute_batch(sql).map_err(Error::driver)
    }
}

#[async_trait]
impl sieve_core::Connection for Connection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query(&mut self, sql: &str, params: &[stmt::Value]) -> Result<Vec<stmt::Record>> {
        trace!(sql, params = params.len(), "sqlite query");

        let mut stmt = self.connection.prepare_cached(sql).map_err(Error::driver)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(Value::from)))
            .map_err(Error::driver)?;

        let mut ret = vec![];

        while let Some(row) = rows.next().map_err(Error::driver)? {
            let mut record = stmt::Record::new();

            for (index, column) in columns.iter().enumerate() {
                let value = row.get_ref(index).map_err(Error::driver)?;
                record.insert(column.as_str(), Value::from_sql(value));
            }

            ret.push(record);
        }

        Ok(ret)
    }

    async fn execute(&mut self, sql: &str, params: &[stmt::Value]) -> Result<u64> {
        trace!(sql, params = params.len(), "sqlite execute");

        let mut stmt = self.connection.prepare_cached(sql).map_err(Error::driver)?;
        let count = stmt
            .execute(rusqlite::params_from_iter(params.iter().map(Value::from)))
            .map_err(Error::driver)?;

        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sieve_core::Connection as _;

    #[test]
    fn parses_urls() {
        assert!(matches!(Sqlite::new("sqlite::memory:").unwrap(), Sqlite::InMemory));
        assert!(matches!(
            Sqlite::new("sqlite:/tmp/app.db").unwrap(),
            Sqlite::File(path) if path == Path::new("/tmp/app.db")
        ));
        assert!(Sqlite::new("postgresql://localhost/app").is_err());
    }

    #[tokio::test]
    async fn query_returns_named_columns() {
        let mut connection = Connection::in_memory().unwrap();
        connection
            .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();

        let inserted = connection
            .execute(
                "INSERT INTO users (id, name) VALUES (?1, ?2)",
                &[stmt::Value::I64(1), stmt::Value::from("Ann")],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let rows = connection
            .query(
                r#"SELECT "id" AS "c0", "name" AS "c1" FROM "users" WHERE "id" = ?1;"#,
                &[stmt::Value::I64(1)],
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("c0"), &stmt::Value::I64(1));
        assert_eq!(rows[0].get("c1"), &stmt::Value::from("Ann"));
    }

    #[tokio::test]
    async fn driver_errors_are_reported() {
        let mut connection = Connection::in_memory().unwrap();
        let err = connection.query("SELECT * FROM missing", &[]).await.unwrap_err();
        assert!(err.is_driver());
    }
}
