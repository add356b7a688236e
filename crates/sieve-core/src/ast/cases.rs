use crate::filter::Filter;

use indexmap::{IndexMap, IndexSet};

/// A row-level predicate taken from one conditional permission rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub index: usize,
    pub rule: Filter,
}

/// Field key to the indices of the cases that legitimize it.
pub type CaseMap = IndexMap<String, Vec<usize>>;

/// Fields legitimized by a rule with no row filter.
pub type AllowedFields = IndexSet<String>;

/// Permission annotations attached to one collection scope of the AST.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cases {
    pub cases: Vec<Case>,
    pub case_map: CaseMap,
    pub allowed_fields: AllowedFields,
}

impl Cases {
    /// Returns `true` when at least one unconditional rule applies, which
    /// makes every row of the collection visible.
    pub fn is_unrestricted(&self) -> bool {
        !self.allowed_fields.is_empty()
    }

    /// Returns `true` when `field` is readable on every visible row.
    pub fn allows_field(&self, field: &str) -> bool {
        self.allowed_fields.contains("*") || self.allowed_fields.contains(field)
    }

    /// Indices of the cases that make `field` readable, including the ones
    /// granted through `*`. Sorted and free of duplicates.
    pub fn cases_for(&self, field: &str) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .case_map
            .get(field)
            .into_iter()
            .chain(self.case_map.get("*"))
            .flatten()
            .copied()
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn rules(&self, indices: &[usize]) -> Vec<&Filter> {
        indices
            .iter()
            .filter_map(|index| self.cases.get(*index))
            .map(|case| &case.rule)
            .collect()
    }
}
