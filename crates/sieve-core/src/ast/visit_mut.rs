#![allow(unused_variables)]

use super::{Ast, Cases, FieldPath, Node, Query};

/// Mutable counterpart of [`super::visit::Scope`].
#[derive(Debug)]
pub struct ScopeMut<'a> {
    pub path: FieldPath,
    pub collection: &'a str,
    pub children: &'a mut Vec<Node>,
    pub query: &'a mut Query,
    pub cases: &'a mut Option<Cases>,
}

/// Walks every collection scope with exclusive access to it. Scopes are
/// visited parent first.
pub trait VisitMut {
    fn visit_scope_mut(&mut self, scope: ScopeMut<'_>) {
        visit_scope_mut(self, scope);
    }
}

impl Ast {
    pub fn visit_mut(&mut self, visitor: &mut impl VisitMut) {
        visitor.visit_scope_mut(ScopeMut {
            path: FieldPath::root(),
            collection: &self.name,
            children: &mut self.children,
            query: &mut self.query,
            cases: &mut self.cases,
        });
    }
}

pub fn visit_scope_mut<V>(v: &mut V, scope: ScopeMut<'_>)
where
    V: VisitMut + ?Sized,
{
    let ScopeMut { path, children, .. } = scope;

    for child in children.iter_mut() {
        match child {
            Node::M2o(nested) | Node::O2m(nested) => {
                let path = path.child(nested.key());
                v.visit_scope_mut(ScopeMut {
                    path,
                    collection: &nested.collection,
                    children: &mut nested.children,
                    query: &mut nested.query,
                    cases: &mut nested.cases,
                });
            }
            Node::A2o(union) | Node::O2a(union) => {
                let key = union.key().to_string();
                for (collection, branch) in union.branches.iter_mut() {
                    v.visit_scope_mut(ScopeMut {
                        path: path.scoped(&key, collection),
                        collection,
                        children: &mut branch.children,
                        query: &mut branch.query,
                        cases: &mut branch.cases,
                    });
                }
            }
            Node::Field(_) | Node::FunctionField(_) => {}
        }
    }
}
