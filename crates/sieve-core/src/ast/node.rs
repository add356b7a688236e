use super::{Cases, FunctionCall, Query};
use crate::schema::Relation;

use indexmap::IndexMap;

/// A node of the query AST. One variant per node kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Field(FieldNode),
    FunctionField(FunctionNode),
    M2o(NestedNode),
    O2m(NestedNode),
    A2o(UnionNode),
    O2a(UnionNode),
}

/// A plain column of the current collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    /// Schema field name
    pub field_key: String,

    /// Output key, when different from `field_key`
    pub alias: Option<String>,
}

/// A function applied to a field: `year(date_created)`, `count(comments)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub call: FunctionCall,

    pub alias: Option<String>,

    /// Collection counted by `count()` over a one-to-many field
    pub related_collection: Option<String>,

    /// Relation counted by `count()`
    pub relation: Option<Relation>,
}

/// A many-to-one or one-to-many field and the scope it opens.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedNode {
    pub field_key: String,
    pub alias: Option<String>,

    /// Related collection
    pub collection: String,

    pub relation: Relation,
    pub children: Vec<Node>,
    pub query: Query,
    pub cases: Option<Cases>,
}

/// An any-to-one field (or its inverse). Each possible target collection
/// opens its own scope.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionNode {
    pub field_key: String,
    pub alias: Option<String>,
    pub relation: Relation,

    /// Target collection to the scope read for it
    pub branches: IndexMap<String, Branch>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branch {
    pub children: Vec<Node>,
    pub query: Query,
    pub cases: Option<Cases>,
}

impl Node {
    /// Key of the node in the result object.
    pub fn key(&self) -> String {
        match self {
            Node::Field(node) => node.key().to_string(),
            Node::FunctionField(node) => node.key(),
            Node::M2o(node) | Node::O2m(node) => node.key().to_string(),
            Node::A2o(node) | Node::O2a(node) => node.key().to_string(),
        }
    }

    /// Field of the current collection this node reads.
    pub fn field_key(&self) -> &str {
        match self {
            Node::Field(node) => &node.field_key,
            Node::FunctionField(node) => &node.call.field,
            Node::M2o(node) | Node::O2m(node) => &node.field_key,
            Node::A2o(node) | Node::O2a(node) => &node.field_key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Field(_) => "field",
            Node::FunctionField(_) => "functionField",
            Node::M2o(_) => "m2o",
            Node::O2m(_) => "o2m",
            Node::A2o(_) => "a2o",
            Node::O2a(_) => "o2a",
        }
    }
}

impl FieldNode {
    pub fn new(field_key: impl Into<String>) -> FieldNode {
        FieldNode {
            field_key: field_key.into(),
            alias: None,
        }
    }

    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field_key)
    }
}

impl FunctionNode {
    pub fn new(call: FunctionCall) -> FunctionNode {
        FunctionNode {
            call,
            alias: None,
            related_collection: None,
            relation: None,
        }
    }

    pub fn key(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.call.to_string(),
        }
    }
}

impl NestedNode {
    pub fn new(
        field_key: impl Into<String>,
        collection: impl Into<String>,
        relation: Relation,
    ) -> NestedNode {
        NestedNode {
            field_key: field_key.into(),
            alias: None,
            collection: collection.into(),
            relation,
            children: vec![],
            query: Query::default(),
            cases: None,
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

    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field_key)
    }
}

impl UnionNode {
    pub fn new(field_key: impl Into<String>, relation: Relation) -> UnionNode {
        UnionNode {
            field_key: field_key.into(),
            alias: None,
            relation,
            branches: IndexMap::new(),
        }
    }

    /// Adds the branch read when the discriminator names `collection`.
    pub fn branch(mut self, collection: impl Into<String>, children: Vec<Node>) -> Self {
        self.branches.insert(
            collection.into(),
            Branch {
                children,
                ..Branch::default()
            },
        );
        self
    }

    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field_key)
    }
}

impl From<FieldNode> for Node {
    fn from(value: FieldNode) -> Self {
        Node::Field(value)
    }
}

impl From<FunctionNode> for Node {
    fn from(value: FunctionNode) -> Self {
        Node::FunctionField(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Field(FieldNode::new(value))
    }
}

pub(super) fn depth(children: &[Node]) -> usize {
    children
        .iter()
        .map(|child| match child {
            Node::M2o(node) | Node::O2m(node) => 1 + depth(&node.children),
            Node::A2o(node) | Node::O2a(node) => {
                1 + node
                    .branches
                    .values()
                    .map(|branch| depth(&branch.children))
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        })
        .max()
        .unwrap_or(0)
}
