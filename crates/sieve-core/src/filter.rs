//! Boolean filter trees used for permission rules and query modifiers.
//!
//! A filter is parsed from its JSON form (`{"status": {"_eq": "published"}}`)
//! into a [`Filter`] tree. Field-level logical operators are shifted up
//! during parsing so that every `And`/`Or` node sits above the field
//! conditions it combines.

mod operator;
pub use operator::Operator;

mod parse;

mod serialize;

use crate::{stmt::Value, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// All operands must match. An empty list matches every row.
    And(Vec<Filter>),

    /// At least one operand must match. An empty list matches no row.
    Or(Vec<Filter>),

    /// A condition on one field of the current collection.
    Field(FieldFilter),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// Field name, possibly wrapped in a function (`year(date_created)`) or
    /// scoped to an any-to-one target (`item:pages`).
    pub key: String,

    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Compare the field against an operand.
    Compare { op: Operator, value: Value },

    /// Filter the related row(s) reached through the field.
    Related(Box<Filter>),

    /// At least one related row matches.
    Some(Box<Filter>),

    /// No related row matches.
    None(Box<Filter>),
}

impl Filter {
    /// The filter matching every row.
    pub fn all() -> Filter {
        Filter::And(vec![])
    }

    pub fn and(operands: impl IntoIterator<Item = Filter>) -> Filter {
        Filter::And(operands.into_iter().collect())
    }

    pub fn or(operands: impl IntoIterator<Item = Filter>) -> Filter {
        Filter::Or(operands.into_iter().collect())
    }

    pub fn compare(key: impl Into<String>, op: Operator, value: impl Into<Value>) -> Filter {
        Filter::Field(FieldFilter {
            key: key.into(),
            condition: Condition::Compare {
                op,
                value: value.into(),
            },
        })
    }

    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::compare(key, Operator::Eq, value)
    }

    pub fn related(key: impl Into<String>, filter: Filter) -> Filter {
        Filter::Field(FieldFilter {
            key: key.into(),
            condition: Condition::Related(Box::new(filter)),
        })
    }

    /// Returns `true` when the filter matches every row regardless of its
    /// contents, as `{}` does.
    pub fn is_unconditional(&self) -> bool {
        match self {
            Filter::And(operands) => operands.iter().all(Filter::is_unconditional),
            Filter::Or(operands) => operands.iter().any(Filter::is_unconditional),
            Filter::Field(_) => false,
        }
    }

    /// Returns `true` when some operand references a request-time variable
    /// such as `$CURRENT_USER` or `$NOW`.
    pub fn has_dynamic_variables(&self) -> bool {
        let mut found = false;
        self.for_each_value(&mut |value| {
            found |= is_dynamic_variable(value);
        });
        found
    }

    /// Visits every operand in the tree.
    pub fn for_each_value(&self, f: &mut impl FnMut(&Value)) {
        match self {
            Filter::And(operands) | Filter::Or(operands) => {
                for operand in operands {
                    operand.for_each_value(f);
                }
            }
            Filter::Field(field) => match &field.condition {
                Condition::Compare { value, .. } => visit_value(value, f),
                Condition::Related(filter) | Condition::Some(filter) | Condition::None(filter) => {
                    filter.for_each_value(f)
                }
            },
        }
    }

    /// Visits every operand in the tree mutably, stopping at the first error.
    pub fn try_for_each_value_mut(
        &mut self,
        f: &mut impl FnMut(&mut Value) -> Result<()>,
    ) -> Result<()> {
        match self {
            Filter::And(operands) | Filter::Or(operands) => {
                for operand in operands {
                    operand.try_for_each_value_mut(f)?;
                }
                Ok(())
            }
            Filter::Field(field) => match &mut field.condition {
                Condition::Compare { value, .. } => f(value),
                Condition::Related(filter) | Condition::Some(filter) | Condition::None(filter) => {
                    filter.try_for_each_value_mut(f)
                }
            },
        }
    }

    /// Field conditions at this level, skipping through `And`/`Or` nodes.
    pub fn field_filters(&self) -> Vec<&FieldFilter> {
        let mut out = vec![];
        self.collect_field_filters(&mut out);
        out
    }

    fn collect_field_filters<'a>(&'a self, out: &mut Vec<&'a FieldFilter>) {
        match self {
            Filter::And(operands) | Filter::Or(operands) => {
                for operand in operands {
                    operand.collect_field_filters(out);
                }
            }
            Filter::Field(field) => out.push(field),
        }
    }
}

impl Condition {
    /// The nested filter of a relational condition.
    pub fn nested(&self) -> Option<&Filter> {
        match self {
            Condition::Compare { .. } => None,
            Condition::Related(filter) | Condition::Some(filter) | Condition::None(filter) => {
                Some(filter)
            }
        }
    }
}

fn visit_value(value: &Value, f: &mut impl FnMut(&Value)) {
    match value {
        Value::List(items) => {
            for item in items {
                visit_value(item, f);
            }
        }
        value => f(value),
    }
}

fn is_dynamic_variable(value: &Value) -> bool {
    match value {
        Value::String(s) => s.starts_with("$CURRENT_") || s.starts_with("$NOW"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_unconditional() {
        let filter = Filter::from_json(&json!({})).unwrap();
        assert!(filter.is_unconditional());
    }

    #[test]
    fn or_with_empty_branch_is_unconditional() {
        let filter =
            Filter::from_json(&json!({"_or": [{"status": {"_eq": "draft"}}, {}]})).unwrap();
        assert!(filter.is_unconditional());
    }

    #[test]
    fn field_condition_is_conditional() {
        let filter = Filter::eq("status", "published");
        assert!(!filter.is_unconditional());
        assert!(!Filter::or([]).is_unconditional());
    }

    #[test]
    fn dynamic_variables_are_detected() {
        let filter = Filter::from_json(&json!({
            "_and": [
                {"owner": {"_eq": "$CURRENT_USER"}},
                {"tags": {"_in": ["a", "b"]}}
            ]
        }))
        .unwrap();
        assert!(filter.has_dynamic_variables());

        let filter = Filter::from_json(&json!({"date": {"_lt": "$NOW(-1 day)"}})).unwrap();
        assert!(filter.has_dynamic_variables());

        assert!(!Filter::eq("status", "published").has_dynamic_variables());
    }
}
