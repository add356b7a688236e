use sieve_core::stmt::Value;

/// Position of an operand in [`super::Query::parameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterIndex(pub usize);

/// Allocates parameter slots for one statement.
///
/// Every operand of the statement (filters, limit, offset, join
/// conditions) takes its slot from the same instance, so indices never
/// collide.
#[derive(Debug, Default, Clone)]
pub struct Parameters {
    values: Vec<Value>,
}

impl Parameters {
    pub fn new() -> Parameters {
        Parameters::default()
    }

    pub fn push(&mut self, value: impl Into<Value>) -> ParameterIndex {
        self.values.push(value.into());
        ParameterIndex(self.values.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }
}
