//! Permission-aware query engine.
//!
//! A [`Sieve`] takes a query [`Ast`] built against a live
//! [`SchemaOverview`], checks every requested collection and field against
//! the caller's permissions, annotates each collection scope with the row
//! rules ("cases") that legitimize its fields and lowers the result into a
//! dialect-neutral [`Query`] plan.

mod config;
pub use config::Config;

pub mod convert;

pub mod expand;
pub use expand::expand;

pub mod permissions;

mod sieve;
pub use sieve::{Builder, Sieve};

pub mod store;
pub use store::{MemoryStore, SqlStore, Store};

pub use sieve_core::{
    accountability::Accountability,
    ast::{self, Ast},
    filter::{self, Filter},
    permission::{Action, Permission},
    policy::{Access, Policy, Role},
    schema::{self, SchemaOverview},
    stmt::{Record, Value},
    Connection, Dialect, Error, Result,
};
pub use sieve_sql::{Query, Serializer};
