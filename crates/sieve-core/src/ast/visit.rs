#![allow(unused_variables)]

use super::{Ast, Cases, FieldPath, Node, Query};

/// One collection scope of the AST: the root, a nested node or one branch
/// of a union node.
#[derive(Debug)]
pub struct Scope<'a> {
    pub path: FieldPath,
    pub collection: &'a str,
    pub children: &'a [Node],
    pub query: &'a Query,
    pub cases: Option<&'a Cases>,
}

pub trait Visit {
    fn visit_scope(&mut self, scope: &Scope<'_>) {
        visit_scope(self, scope);
    }

    fn visit_node(&mut self, scope: &Scope<'_>, node: &Node) {
        visit_node(self, scope, node);
    }
}

impl Ast {
    pub fn scope(&self) -> Scope<'_> {
        Scope {
            path: FieldPath::root(),
            collection: &self.name,
            children: &self.children,
            query: &self.query,
            cases: self.cases.as_ref(),
        }
    }

    pub fn visit(&self, visitor: &mut impl Visit) {
        visitor.visit_scope(&self.scope());
    }
}

pub fn visit_scope<V>(v: &mut V, scope: &Scope<'_>)
where
    V: Visit + ?Sized,
{
    for child in scope.children {
        v.visit_node(scope, child);
    }
}

pub fn visit_node<V>(v: &mut V, scope: &Scope<'_>, node: &Node)
where
    V: Visit + ?Sized,
{
    match node {
        Node::M2o(nested) | Node::O2m(nested) => {
            v.visit_scope(&Scope {
                path: scope.path.child(nested.key()),
                collection: &nested.collection,
                children: &nested.children,
                query: &nested.query,
                cases: nested.cases.as_ref(),
            });
        }
        Node::A2o(union) | Node::O2a(union) => {
            for (collection, branch) in &union.branches {
                v.visit_scope(&Scope {
                    path: scope.path.scoped(union.key(), collection),
                    collection,
                    children: &branch.children,
                    query: &branch.query,
                    cases: branch.cases.as_ref(),
                });
            }
        }
        Node::Field(_) | Node::FunctionField(_) => {}
    }
}
