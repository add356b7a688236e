use super::{Expr, Select};

/// Boolean condition tree of a `WHERE` or `ON` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Empty means true
    And(Vec<Condition>),

    /// Empty means false
    Or(Vec<Condition>),

    Not(Box<Condition>),

    Compare {
        lhs: Expr,
        op: CompareOp,
        rhs: Expr,
    },

    In {
        expr: Expr,
        list: Vec<Expr>,
        negate: bool,
    },

    InSubquery {
        expr: Expr,
        query: Box<Select>,
        negate: bool,
    },

    Between {
        expr: Expr,
        low: Expr,
        high: Expr,
        negate: bool,
    },

    IsNull {
        expr: Expr,
        negate: bool,
    },

    Like {
        expr: Expr,
        pattern: Expr,
        case_insensitive: bool,
        negate: bool,
    },

    Intersects {
        expr: Expr,
        geometry: Expr,
        bbox: bool,
        negate: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Condition {
    pub fn compare(lhs: impl Into<Expr>, op: CompareOp, rhs: impl Into<Expr>) -> Condition {
        Condition::Compare {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
        }
    }

    pub fn eq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Condition {
        Condition::compare(lhs, CompareOp::Eq, rhs)
    }

    pub fn is_null(expr: impl Into<Expr>, negate: bool) -> Condition {
        Condition::IsNull {
            expr: expr.into(),
            negate,
        }
    }

    pub fn not(condition: Condition) -> Condition {
        Condition::Not(Box::new(condition))
    }

    /// Conjunction of `operands`, without wrapping a single operand.
    pub fn all(operands: Vec<Condition>) -> Condition {
        Self::flatten(operands, Condition::And)
    }

    /// Disjunction of `operands`, without wrapping a single operand.
    pub fn any(operands: Vec<Condition>) -> Condition {
        Self::flatten(operands, Condition::Or)
    }

    fn flatten(mut operands: Vec<Condition>, wrap: fn(Vec<Condition>) -> Condition) -> Condition {
        if operands.len() == 1 {
            operands.remove(0)
        } else {
            wrap(operands)
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Condition::And(operands) if operands.is_empty())
    }
}
