use crate::ast::Cases;

use sieve_sql::stmt::{Condition, Expr};

/// Cases of one collection scope, with each rule already lowered against
/// the table alias of that scope.
#[derive(Debug)]
pub(super) struct Guard<'a> {
    cases: Option<&'a Cases>,
    rules: Vec<Condition>,
}

/// How a field of a guarded scope reaches the output.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Exposure {
    /// Readable on every visible row
    Plain,

    /// Readable on no row
    Never,

    /// Readable on the rows matching the condition
    When(Condition),
}

impl<'a> Guard<'a> {
    /// A scope without cases is not restricted at all.
    pub(super) fn new(cases: Option<&'a Cases>, rules: Vec<Condition>) -> Guard<'a> {
        Guard { cases, rules }
    }

    /// Condition a row must match to be returned at all.
    pub(super) fn visibility(&self) -> Condition {
        match self.cases {
            None => Condition::And(vec![]),
            Some(cases) if cases.is_unrestricted() => Condition::And(vec![]),
            Some(_) => Condition::any(self.rules.clone()),
        }
    }

    pub(super) fn exposure(&self, field: &str) -> Exposure {
        let Some(cases) = self.cases else {
            return Exposure::Plain;
        };

        if cases.allows_field(field) {
            return Exposure::Plain;
        }

        let indices = cases.cases_for(field);
        if indices.is_empty() {
            return Exposure::Never;
        }

        // Visibility already requires one of the cases to match.
        if cases.allowed_fields.is_empty() && indices.len() == cases.cases.len() {
            return Exposure::Plain;
        }

        Exposure::When(Condition::any(
            indices
                .iter()
                .filter_map(|index| self.rules.get(*index).cloned())
                .collect(),
        ))
    }
}

impl Exposure {
    pub(super) fn wrap(self, expr: Expr) -> Expr {
        match self {
            Exposure::Plain => expr,
            Exposure::Never => Expr::Null,
            Exposure::When(condition) => Expr::case(condition, expr),
        }
    }

    /// Condition under which the field is readable, `None` when always.
    pub(super) fn condition(self) -> Option<Condition> {
        match self {
            Exposure::Plain => None,
            Exposure::Never => Some(Condition::Or(vec![])),
            Exposure::When(condition) => Some(condition),
        }
    }
}
