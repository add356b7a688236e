//! Permission enforcement.
//!
//! A request goes through the stages in this order: the caller's policies
//! are resolved, the rules those policies hold for the touched collections
//! are fetched, every scope of the AST is validated against them and the
//! surviving rules are injected into the AST as cases.

mod allowed_fields;

mod allowed_sort;
pub use allowed_sort::{resolve_allowed_sort, AllowedSort};

mod cache;
pub(crate) use cache::PermissionCache;

mod cases;
use cases::{inject_cases, related_cases};

mod default_sort;
use default_sort::apply_default_sort;

mod dynamic_variables;

mod fetch;
pub use fetch::FetchPermissions;

mod field_map;
pub use field_map::{FieldMap, FieldMapEntry};

mod ip;

mod policies;
pub use policies::GlobalAccess;

mod process_ast;

mod root_fields;

mod validate;
use validate::validate_path;
