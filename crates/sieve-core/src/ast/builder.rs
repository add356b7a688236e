use super::{
    Ast, Branch, FieldNode, FieldPath, FunctionCall, FunctionNode, NestedNode, Node, Query,
    UnionNode,
};
use crate::{
    schema::{RelationType, SchemaOverview},
    Error, Result,
};

use indexmap::IndexMap;

/// Builds an [`Ast`] from a dotted field list such as
/// `["id", "author.name", "item:pages.title", "year(date_created)"]`.
///
/// `*` expands to every column of the collection it appears in. Nested
/// query modifiers are attached per relational path with [`Self::deep`].
#[derive(Debug)]
pub struct FieldsBuilder<'a> {
    schema: &'a SchemaOverview,
    deep: IndexMap<String, Query>,
}

impl<'a> FieldsBuilder<'a> {
    pub fn new(schema: &'a SchemaOverview) -> FieldsBuilder<'a> {
        FieldsBuilder {
            schema,
            deep: IndexMap::new(),
        }
    }

    /// Sets the modifiers of the relational scope at `path` (`comments`,
    /// `author.articles`, `item:pages`).
    pub fn deep(mut self, path: impl Into<String>, query: Query) -> Self {
        self.deep.insert(path.into(), query);
        self
    }

    pub fn build<S: AsRef<str>>(&self, collection: &str, fields: &[S], query: Query) -> Result<Ast> {
        if self.schema.collection(collection).is_none() {
            return Err(Error::forbidden_collection(collection, ""));
        }

        let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        let children = self.parse_fields(collection, &fields, &FieldPath::root())?;

        Ok(Ast {
            name: collection.to_string(),
            children,
            query,
            cases: None,
            related: IndexMap::new(),
        })
    }

    fn parse_fields(&self, collection: &str, fields: &[String], path: &FieldPath) -> Result<Vec<Node>> {
        let fields = self.expand_wildcards(collection, fields);
        let mut children = vec![];
        let mut relational: IndexMap<String, Vec<String>> = IndexMap::new();

        for field in &fields {
            let (head, rest) = split_field(field);

            match rest {
                Some(rest) => relational
                    .entry(head.to_string())
                    .or_default()
                    .push(rest.to_string()),
                None => children.push(self.parse_leaf(collection, head, path)?),
            }
        }

        for (head, nested_fields) in relational {
            let (field, scope) = match head.split_once(':') {
                Some((field, scope)) => (field, Some(scope)),
                None => (head.as_str(), None),
            };

            let Some((ty, relation)) = self.schema.relation(collection, field) else {
                return Err(Error::forbidden_fields(collection, [field], path.to_string()));
            };

            match (ty, scope) {
                (RelationType::M2o, None) | (RelationType::O2m, None) => {
                    let related = match ty {
                        RelationType::M2o => relation.related_collection.clone().unwrap_or_default(),
                        _ => relation.collection.clone(),
                    };
                    let child_path = path.child(field);
                    let mut node = NestedNode::new(field, related.as_str(), relation.clone());
                    node.children = self.parse_fields(&related, &nested_fields, &child_path)?;
                    node.query = self.deep_query(&child_path);

                    if ty == RelationType::O2m {
                        // Grouping the many side always includes the key that
                        // links it back to the parent.
                        if let Some(group) = node.query.group.as_mut() {
                            if !group.contains(&relation.field) {
                                group.insert(0, relation.field.clone());
                            }
                        }
                        children.push(Node::O2m(node));
                    } else {
                        children.push(Node::M2o(node));
                    }
                }
                (RelationType::A2o, Some(target)) => {
                    if !relation.allowed_collections().iter().any(|c| c == target) {
                        return Err(Error::forbidden_collection(
                            target,
                            path.scoped(field, target).to_string(),
                        ));
                    }

                    let branch_path = path.scoped(field, target);
                    let branch = Branch {
                        children: self.parse_fields(target, &nested_fields, &branch_path)?,
                        query: self.deep_query(&branch_path),
                        cases: None,
                    };

                    match children.iter_mut().find_map(|child| match child {
                        Node::A2o(union) if union.field_key == field => Some(union),
                        _ => None,
                    }) {
                        Some(union) => {
                            union.branches.insert(target.to_string(), branch);
                        }
                        None => {
                            let mut union = UnionNode::new(field, relation.clone());
                            union.branches.insert(target.to_string(), branch);
                            children.push(Node::A2o(union));
                        }
                    }
                }
                (RelationType::A2o, None) => {
                    return Err(Error::invalid_query(format!(
                        "any-to-one field `{field}` needs a collection scope, as in `{field}:<collection>`"
                    )));
                }
                (RelationType::O2a, None) => {
                    let target = relation.collection.clone();
                    let branch_path = path.scoped(field, &target);
                    let branch = Branch {
                        children: self.parse_fields(&target, &nested_fields, &branch_path)?,
                        query: self.deep_query(&branch_path),
                        cases: None,
                    };
                    let mut union = UnionNode::new(field, relation.clone());
                    union.branches.insert(target, branch);
                    children.push(Node::O2a(union));
                }
                (_, Some(_)) => {
                    return Err(Error::invalid_query(format!(
                        "field `{field}` is not an any-to-one field and cannot be scoped"
                    )));
                }
            }
        }

        Ok(children)
    }

    fn parse_leaf(&self, collection: &str, field: &str, path: &FieldPath) -> Result<Node> {
        if let Some(call) = FunctionCall::parse(field)? {
            let mut node = FunctionNode::new(call);

            if let Some((RelationType::O2m, relation)) =
                self.schema.relation(collection, &node.call.field)
            {
                node.related_collection = Some(relation.collection.clone());
                node.relation = Some(relation.clone());
            }

            return Ok(Node::FunctionField(node));
        }

        // A relational field without nested fields reads the related keys.
        match self.schema.relation(collection, field) {
            Some((RelationType::O2m, relation)) => {
                let related = relation.collection.as_str();
                let primary = self.primary(related)?;
                let child_path = path.child(field);
                Ok(Node::O2m(
                    NestedNode::new(field, related, relation.clone())
                        .child(FieldNode::new(primary))
                        .query(self.deep_query(&child_path)),
                ))
            }
            _ => Ok(Node::Field(FieldNode::new(field))),
        }
    }

    fn expand_wildcards(&self, collection: &str, fields: &[String]) -> Vec<String> {
        let mut out: Vec<String> = vec![];

        for field in fields {
            if field == "*" {
                if let Some(collection) = self.schema.collection(collection) {
                    for column in collection.columns() {
                        if !out.contains(&column.name) {
                            out.push(column.name.clone());
                        }
                    }
                }
            } else if !out.contains(field) {
                out.push(field.clone());
            }
        }

        out
    }

    fn primary(&self, collection: &str) -> Result<&'a str> {
        self.schema
            .collection(collection)
            .map(|c| c.primary.as_str())
            .ok_or_else(|| Error::invalid_schema(format!("unknown collection `{collection}`")))
    }

    fn deep_query(&self, path: &FieldPath) -> Query {
        self.deep.get(&path.to_string()).cloned().unwrap_or_default()
    }
}

/// Splits `head.rest` at the first dot outside of parentheses.
fn split_field(field: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, c) in field.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => return (&field[..i], Some(&field[i + 1..])),
            _ => {}
        }
    }
    (field, None)
}
