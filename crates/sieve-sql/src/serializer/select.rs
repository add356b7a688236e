use super::{Comma, Flavor, Formatter, Ident, Params, ToSql};

use crate::stmt::{self, Direction};

impl ToSql for &stmt::Select {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, "SELECT ");

        if self.columns.is_empty() {
            fmt!(f, "1");
        } else {
            fmt!(f, Comma(&self.columns));
        }

        let from = &self.from;
        fmt!(f, " FROM " from);

        for join in &self.joins {
            let on = &join.on;
            fmt!(
                f,
                " LEFT JOIN " Ident(&join.table.name) " AS " Ident(&join.table.alias)
                " ON " on
            );
        }

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }

        if !self.group_by.is_empty() {
            fmt!(f, " GROUP BY " Comma(&self.group_by));
        }

        if !self.order_by.is_empty() {
            fmt!(f, " ORDER BY " Comma(&self.order_by));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                let limit = f.param(limit);
                fmt!(f, " LIMIT " limit);
                let offset = f.param(offset);
                fmt!(f, " OFFSET " offset);
            }
            (Some(limit), None) => {
                let limit = f.param(limit);
                fmt!(f, " LIMIT " limit);
            }
            (None, Some(offset)) => {
                // SQLite and MySQL only accept OFFSET after a LIMIT.
                match f.serializer.flavor {
                    Flavor::Postgresql => {}
                    Flavor::Sqlite => fmt!(f, " LIMIT -1"),
                    Flavor::Mysql => fmt!(f, " LIMIT 18446744073709551615"),
                }
                let offset = f.param(offset);
                fmt!(f, " OFFSET " offset);
            }
            (None, None) => {}
        }
    }
}

impl ToSql for &stmt::SelectItem {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let expr = &self.expr;
        fmt!(f, expr);

        if let Some(alias) = &self.alias {
            fmt!(f, " AS " Ident(alias));
        }
    }
}

impl ToSql for &stmt::Source {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            stmt::Source::Table(table) => {
                fmt!(f, Ident(&table.name) " AS " Ident(&table.alias))
            }
            stmt::Source::Derived { select, alias } => {
                fmt!(f, "(" select.as_ref() ") AS " Ident(alias))
            }
        }
    }
}

impl ToSql for &stmt::OrderBy {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let direction = match self.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        };
        let expr = &self.expr;
        fmt!(f, expr direction);
    }
}
