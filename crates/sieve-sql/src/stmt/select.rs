use super::{Condition, Expr, Join, OrderBy, ParameterIndex};

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub columns: Vec<SelectItem>,
    pub from: Source,
    pub joins: Vec<Join>,
    pub filter: Option<Condition>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<ParameterIndex>,
    pub offset: Option<ParameterIndex>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table(TableRef),

    /// `(<select>) AS <alias>`
    Derived { select: Box<Select>, alias: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: String,
}

impl Select {
    pub fn from(source: Source) -> Select {
        Select {
            columns: vec![],
            from: source,
            joins: vec![],
            filter: None,
            group_by: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn column(&mut self, expr: Expr, alias: impl Into<String>) {
        self.columns.push(SelectItem {
            expr,
            alias: Some(alias.into()),
        });
    }

    /// Adds `condition` to the `WHERE` clause with `AND`.
    pub fn and_where(&mut self, condition: Condition) {
        if condition.is_true() {
            return;
        }

        self.filter = Some(match self.filter.take() {
            None => condition,
            Some(Condition::And(mut operands)) => {
                operands.push(condition);
                Condition::And(operands)
            }
            Some(existing) => Condition::And(vec![existing, condition]),
        });
    }
}

impl TableRef {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> TableRef {
        TableRef {
            name: name.into(),
            alias: alias.into(),
        }
    }
}

impl Source {
    pub fn alias(&self) -> &str {
        match self {
            Source::Table(table) => &table.alias,
            Source::Derived { alias, .. } => alias,
        }
    }
}
