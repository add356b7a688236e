#[macro_use]
mod fmt;
use fmt::ToSql;

mod condition;

mod delim;
use delim::{Comma, Delimited};

mod expr;

mod flavor;
use flavor::Flavor;

mod ident;
use ident::Ident;

mod params;
pub use params::{Params, Placeholder};

mod select;

use crate::stmt::{ParameterIndex, Query};
use sieve_core::{stmt::Value, Dialect};

/// Serialize a query plan to a SQL string
#[derive(Debug)]
pub struct Serializer {
    /// The database flavor handles the differences between SQL dialects and
    /// supported features.
    flavor: Flavor,
}

struct Formatter<'a, T> {
    /// Handle to the serializer
    serializer: &'a Serializer,

    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Operands of the plan being serialized
    parameters: &'a [Value],

    /// Where to store parameters, in placeholder order
    params: &'a mut T,
}

impl Serializer {
    pub fn for_dialect(dialect: Dialect) -> Serializer {
        let flavor = match dialect {
            Dialect::Postgresql => Flavor::Postgresql,
            Dialect::Sqlite => Flavor::Sqlite,
            Dialect::Mysql => Flavor::Mysql,
        };

        Serializer { flavor }
    }

    /// Serializes `query`, pushing its operands into `params` in the order
    /// their placeholders appear.
    pub fn serialize(&self, query: &Query, params: &mut impl Params) -> String {
        let mut ret = String::new();

        let mut fmt = Formatter {
            serializer: self,
            dst: &mut ret,
            parameters: &query.parameters,
            params,
        };

        query.select.to_sql(&mut fmt);

        ret.push(';');
        ret
    }

    /// Serializes `query` and returns the SQL with its bound operands.
    pub fn render(&self, query: &Query) -> (String, Vec<Value>) {
        let mut params = Vec::<Value>::new();
        let sql = self.serialize(query, &mut params);
        (sql, params)
    }

    fn is_mysql(&self) -> bool {
        matches!(self.flavor, Flavor::Mysql)
    }

    fn is_sqlite(&self) -> bool {
        matches!(self.flavor, Flavor::Sqlite)
    }
}

impl<T: Params> Formatter<'_, T> {
    fn param(&mut self, index: ParameterIndex) -> Placeholder {
        static NULL: Value = Value::Null;
        let value = self.parameters.get(index.0).unwrap_or(&NULL);
        self.params.push(value)
    }
}
