use super::{Condition, ParameterIndex, Select};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),

    /// `alias.*`
    AllColumns(String),

    Param(ParameterIndex),

    /// Literal `1`, used as a visibility flag
    One,

    Null,

    /// `CASE WHEN <when> THEN <then> ELSE NULL END`
    Case {
        when: Box<Condition>,
        then: Box<Expr>,
    },

    Extract {
        part: DatePart,
        expr: Box<Expr>,
    },

    /// Text value at `path` inside a JSON column. Segments are restricted to
    /// `[A-Za-z0-9_-]` before they reach the plan.
    JsonPath {
        expr: Box<Expr>,
        path: Vec<String>,
    },

    Aggregate {
        function: AggregateFunction,
        /// `None` counts rows
        expr: Option<Box<Expr>>,
        distinct: bool,
    },

    CastText(Box<Expr>),

    Lower(Box<Expr>),

    /// Geometry rendered as well-known text
    GeometryText(Box<Expr>),

    /// Scalar subquery
    Subquery(Box<Select>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Week,
    Day,
    Weekday,
    Hour,
    Minute,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Expr {
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Expr {
        Expr::Column(ColumnRef {
            table: table.into(),
            column: column.into(),
        })
    }

    pub fn case(when: Condition, then: Expr) -> Expr {
        Expr::Case {
            when: Box::new(when),
            then: Box::new(then),
        }
    }

    pub fn count_rows() -> Expr {
        Expr::Aggregate {
            function: AggregateFunction::Count,
            expr: None,
            distinct: false,
        }
    }

    pub fn lower(expr: Expr) -> Expr {
        Expr::Lower(Box::new(expr))
    }
}

impl From<ParameterIndex> for Expr {
    fn from(value: ParameterIndex) -> Self {
        Expr::Param(value)
    }
}

impl From<ColumnRef> for Expr {
    fn from(value: ColumnRef) -> Self {
        Expr::Column(value)
    }
}
