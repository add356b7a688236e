use super::{Flavor, Formatter, Ident, Params, ToSql};

use crate::stmt::{self, AggregateFunction, DatePart};

impl ToSql for &stmt::Expr {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        use stmt::Expr::*;

        match self {
            Column(column) => fmt!(f, Ident(&column.table) "." Ident(&column.column)),
            AllColumns(alias) => fmt!(f, Ident(alias) ".*"),
            Param(index) => {
                let placeholder = f.param(*index);
                fmt!(f, placeholder)
            }
            One => fmt!(f, "1"),
            Null => fmt!(f, "NULL"),
            Case { when, then } => {
                fmt!(f, "CASE WHEN " when.as_ref() " THEN " then.as_ref() " ELSE NULL END")
            }
            Extract { part, expr } => extract(*part, expr, f),
            JsonPath { expr, path } => json_path(expr, path, f),
            Aggregate {
                function,
                expr,
                distinct,
            } => {
                let name = match function {
                    AggregateFunction::Count => "COUNT",
                    AggregateFunction::Sum => "SUM",
                    AggregateFunction::Avg => "AVG",
                    AggregateFunction::Min => "MIN",
                    AggregateFunction::Max => "MAX",
                };
                let distinct = if *distinct { "DISTINCT " } else { "" };

                match expr {
                    Some(expr) => fmt!(f, name "(" distinct expr.as_ref() ")"),
                    None => fmt!(f, name "(*)"),
                }
            }
            CastText(expr) => {
                let ty = if f.serializer.is_mysql() {
                    "CHAR"
                } else {
                    "TEXT"
                };
                fmt!(f, "CAST(" expr.as_ref() " AS " ty ")")
            }
            Lower(expr) => fmt!(f, "LOWER(" expr.as_ref() ")"),
            GeometryText(expr) => {
                let func = if f.serializer.is_sqlite() {
                    "AsText("
                } else {
                    "ST_AsText("
                };
                fmt!(f, func expr.as_ref() ")")
            }
            Subquery(select) => fmt!(f, "(" select.as_ref() ")"),
        }
    }
}

fn extract<P: Params>(part: DatePart, expr: &stmt::Expr, f: &mut Formatter<'_, P>) {
    match f.serializer.flavor {
        Flavor::Postgresql => {
            let part = match part {
                DatePart::Year => "YEAR",
                DatePart::Month => "MONTH",
                DatePart::Week => "WEEK",
                DatePart::Day => "DAY",
                DatePart::Weekday => "DOW",
                DatePart::Hour => "HOUR",
                DatePart::Minute => "MINUTE",
                DatePart::Second => "SECOND",
            };
            fmt!(f, "EXTRACT(" part " FROM " expr ")")
        }
        Flavor::Sqlite => {
            let format = match part {
                DatePart::Year => "%Y",
                DatePart::Month => "%m",
                DatePart::Week => "%W",
                DatePart::Day => "%d",
                DatePart::Weekday => "%w",
                DatePart::Hour => "%H",
                DatePart::Minute => "%M",
                DatePart::Second => "%S",
            };
            fmt!(f, "CAST(strftime('" format "', " expr ") AS INTEGER)")
        }
        Flavor::Mysql => {
            let func = match part {
                DatePart::Year => "YEAR",
                DatePart::Month => "MONTH",
                DatePart::Week => "WEEK",
                DatePart::Day => "DAYOFMONTH",
                DatePart::Weekday => "DAYOFWEEK",
                DatePart::Hour => "HOUR",
                DatePart::Minute => "MINUTE",
                DatePart::Second => "SECOND",
            };
            fmt!(f, func "(" expr ")")
        }
    }
}

fn json_path<P: Params>(expr: &stmt::Expr, path: &[String], f: &mut Formatter<'_, P>) {
    match f.serializer.flavor {
        Flavor::Postgresql => {
            let path = path.join(",");
            fmt!(f, "(" expr ")::jsonb #>> '{" path.as_str() "}'")
        }
        Flavor::Sqlite => {
            let path = json_selector(path);
            fmt!(f, "json_extract(" expr ", '" path.as_str() "')")
        }
        Flavor::Mysql => {
            let path = json_selector(path);
            fmt!(f, "JSON_UNQUOTE(JSON_EXTRACT(" expr ", '" path.as_str() "'))")
        }
    }
}

/// `$.a[0]."b-c"` style selector shared by SQLite and MySQL.
fn json_selector(path: &[String]) -> String {
    let mut selector = String::from("$");
    for segment in path {
        if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
            selector.push('[');
            selector.push_str(segment);
            selector.push(']');
        } else if segment.contains('-') {
            selector.push_str(".\"");
            selector.push_str(segment);
            selector.push('"');
        } else {
            selector.push('.');
            selector.push_str(segment);
        }
    }
    selector
}
