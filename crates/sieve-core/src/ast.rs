//! The query AST.
//!
//! An [`Ast`] is rooted at one collection and holds the requested fields as
//! a tree of [`Node`]s. Relational nodes open a new collection scope with
//! their own children and query modifiers. Permission processing annotates
//! every scope with its [`Cases`] before the tree is lowered to SQL.

mod builder;
pub use builder::FieldsBuilder;

mod cases;
pub use cases::{AllowedFields, Case, CaseMap, Cases};

mod function;
pub use function::{field_name, Function, FunctionCall};

mod node;
pub use node::{Branch, FieldNode, FunctionNode, NestedNode, Node, UnionNode};

mod path;
pub use path::{FieldPath, PathSegment};

mod query;
pub use query::{Aggregate, AggregateFn, Direction, Query, Sort};

pub mod visit;
pub use visit::Visit;

pub mod visit_mut;
pub use visit_mut::VisitMut;

use indexmap::IndexMap;

/// Root of a query AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// Root collection
    pub name: String,

    pub children: Vec<Node>,

    pub query: Query,

    pub cases: Option<Cases>,

    /// Cases of the collections read only by filter and `count()`
    /// subqueries, keyed by collection. Empty until permissions are
    /// processed.
    pub related: IndexMap<String, Cases>,
}

impl Ast {
    pub fn new(name: impl Into<String>) -> Ast {
        Ast {
            name: name.into(),
            children: vec![],
            query: Query::default(),
            cases: None,
            related: IndexMap::new(),
        }
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Number of relational levels below the root.
    pub fn depth(&self) -> usize {
        node::depth(&self.children)
    }
}
