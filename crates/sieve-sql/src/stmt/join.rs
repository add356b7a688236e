use super::{Condition, TableRef};

/// `LEFT JOIN <table> AS <alias> ON <on>`
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: TableRef,
    pub on: Condition,
}
