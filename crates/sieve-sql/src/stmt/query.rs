use super::Select;
use sieve_core::stmt::Value;

use indexmap::IndexMap;

/// A converted query: the statement, its operands and what is needed to
/// fold the flat rows back into nested objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub select: Select,

    /// Operands, addressed by [`super::ParameterIndex`]
    pub parameters: Vec<Value>,

    /// Column alias to the result path it fills. Selected columns missing
    /// from this map are internal (identity keys) and are not output.
    pub paths: IndexMap<String, Vec<String>>,

    /// How each nested path of the result is built. The root is `[]`.
    pub shapes: IndexMap<Vec<String>, ResultShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultShape {
    pub kind: ShapeKind,

    /// Column alias holding the row identity of this scope
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Root,

    /// A single related object, `null` when no row joined
    One,

    /// A list of related objects, paginated after grouping
    Many { limit: Option<usize>, offset: usize },

    /// The branch of the any-to-one field `field` for one target collection.
    /// The branch whose key is not null provides the value.
    Union { field: String },
}
