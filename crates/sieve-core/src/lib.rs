#[macro_use]
mod error;
pub use error::{Error, IntoError};

pub mod accountability;
pub use accountability::Accountability;

pub mod ast;
pub use ast::Ast;

pub mod driver;
pub use driver::{Connection, Dialect, Driver};

pub mod filter;
pub use filter::Filter;

pub mod permission;
pub use permission::{Action, Permission};

pub mod policy;
pub use policy::{Access, Policy, Role};

pub mod schema;
pub use schema::SchemaOverview;

pub mod stmt;

/// A Result type alias that uses sieve's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
