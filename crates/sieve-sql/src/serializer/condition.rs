use super::{Comma, Delimited, Flavor, Formatter, Params, ToSql};

use crate::stmt::{self, CompareOp};

impl ToSql for &stmt::Condition {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        use stmt::Condition::*;

        match self {
            And(operands) if operands.is_empty() => fmt!(f, "1 = 1"),
            And(operands) => fmt!(f, "(" Delimited(operands, " AND ") ")"),
            Or(operands) if operands.is_empty() => fmt!(f, "1 = 0"),
            Or(operands) => fmt!(f, "(" Delimited(operands, " OR ") ")"),
            Not(condition) => fmt!(f, "NOT (" condition.as_ref() ")"),
            Compare { lhs, op, rhs } => fmt!(f, lhs " " op " " rhs),
            In { list, negate, .. } if list.is_empty() => {
                let constant = if *negate { "1 = 1" } else { "1 = 0" };
                fmt!(f, constant)
            }
            In { expr, list, negate } => {
                let not = if *negate { " NOT" } else { "" };
                fmt!(f, expr not " IN (" Comma(list) ")")
            }
            InSubquery {
                expr,
                query,
                negate,
            } => {
                let not = if *negate { " NOT" } else { "" };
                fmt!(f, expr not " IN (" query.as_ref() ")")
            }
            Between {
                expr,
                low,
                high,
                negate,
            } => {
                let not = if *negate { " NOT" } else { "" };
                fmt!(f, expr not " BETWEEN " low " AND " high)
            }
            IsNull { expr, negate } => {
                let check = if *negate { " IS NOT NULL" } else { " IS NULL" };
                fmt!(f, expr check)
            }
            Like {
                expr,
                pattern,
                case_insensitive,
                negate,
            } => {
                let not = if *negate { " NOT" } else { "" };

                match (*case_insensitive, f.serializer.flavor) {
                    (false, _) => fmt!(f, expr not " LIKE " pattern),
                    (true, Flavor::Postgresql) => fmt!(f, expr not " ILIKE " pattern),
                    (true, _) => fmt!(f, "LOWER(" expr ")" not " LIKE LOWER(" pattern ")"),
                }
            }
            Intersects {
                expr,
                geometry,
                bbox,
                negate,
            } => {
                if *negate {
                    fmt!(f, "NOT ");
                }

                match (f.serializer.flavor, *bbox) {
                    (Flavor::Postgresql, true) => {
                        fmt!(f, expr " && ST_GeomFromText(" geometry ")")
                    }
                    (Flavor::Postgresql, false) | (Flavor::Mysql, false) => {
                        fmt!(f, "ST_Intersects(" expr ", ST_GeomFromText(" geometry "))")
                    }
                    (Flavor::Mysql, true) => {
                        fmt!(f, "MBRIntersects(" expr ", ST_GeomFromText(" geometry "))")
                    }
                    (Flavor::Sqlite, false) => {
                        fmt!(f, "Intersects(" expr ", GeomFromText(" geometry "))")
                    }
                    (Flavor::Sqlite, true) => {
                        fmt!(f, "MbrIntersects(" expr ", GeomFromText(" geometry "))")
                    }
                }
            }
        }
    }
}

impl ToSql for &CompareOp {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push_str(match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        })
    }
}
