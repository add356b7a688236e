use super::{
    value::{coerce, flag, text, wkt},
    Converter, Target,
};
use crate::{
    ast::FieldPath,
    filter::{Condition as Rule, FieldFilter, Filter, Operator},
    schema::{FieldType, RelationType},
    Error, Result, Value,
};

use sieve_sql::stmt::{CompareOp, Condition, Expr, Select, SelectItem, Source, TableRef};

impl Converter<'_> {
    /// Lowers a filter on `collection`, read through `table`.
    pub(super) fn filter(
        &mut self,
        table: &str,
        collection: &str,
        filter: &Filter,
        path: &FieldPath,
    ) -> Result<Condition> {
        match filter {
            Filter::And(operands) => Ok(Condition::all(
                operands
                    .iter()
                    .map(|operand| self.filter(table, collection, operand, path))
                    .collect::<Result<_>>()?,
            )),
            Filter::Or(operands) => Ok(Condition::any(
                operands
                    .iter()
                    .map(|operand| self.filter(table, collection, operand, path))
                    .collect::<Result<_>>()?,
            )),
            Filter::Field(field) => self.field_filter(table, collection, field, path),
        }
    }

    fn field_filter(
        &mut self,
        table: &str,
        collection: &str,
        filter: &FieldFilter,
        path: &FieldPath,
    ) -> Result<Condition> {
        let (key, scope) = match filter.key.split_once(':') {
            Some((key, scope)) => (key, Some(scope)),
            None => (filter.key.as_str(), None),
        };

        match &filter.condition {
            Rule::Compare { op, value } => {
                let target = self.target(table, collection, key, path)?;
                self.compare(target, *op, value)
            }
            Rule::Related(nested) | Rule::Some(nested) => {
                self.related(table, collection, key, scope, nested, false, path)
            }
            Rule::None(nested) => self.related(table, collection, key, scope, nested, true, path),
        }
    }

    /// Lowers a filter through a relational field to an `IN` subquery.
    #[allow(clippy::too_many_arguments)]
    fn related(
        &mut self,
        table: &str,
        collection: &str,
        field: &str,
        scope: Option<&str>,
        nested: &Filter,
        negate: bool,
        path: &FieldPath,
    ) -> Result<Condition> {
        let schema = self.schema;

        let Some((ty, relation)) = schema.relation(collection, field) else {
            if schema.field(collection, field).is_none() {
                return Err(Error::forbidden_fields(collection, [field], path.to_string()));
            }
            return Err(Error::invalid_query(format!(
                "field `{field}` of `{collection}` is not relational"
            )));
        };

        match (ty, scope) {
            (RelationType::M2o, None) => {
                let related = relation.related_collection.as_deref().unwrap_or_default();
                let child_path = path.child(field);
                let primary = self.primary(related, &child_path)?;
                let alias = self.table_alias();

                let mut select = Select::from(Source::Table(TableRef::new(related, &alias)));
                select.columns.push(SelectItem {
                    expr: Expr::column(&alias, primary),
                    alias: None,
                });
                select.and_where(self.filter(&alias, related, nested, &child_path)?);
                select.and_where(self.restriction(&alias, related, &child_path)?);

                Ok(Condition::InSubquery {
                    expr: Expr::column(table, field),
                    query: Box::new(select),
                    negate,
                })
            }
            (RelationType::O2m, None) => {
                let related = relation.collection.as_str();
                let child_path = path.child(field);
                let primary = self.primary(collection, path)?;
                let alias = self.table_alias();

                let mut select = Select::from(Source::Table(TableRef::new(related, &alias)));
                select.columns.push(SelectItem {
                    expr: Expr::column(&alias, &relation.field),
                    alias: None,
                });
                select.and_where(self.filter(&alias, related, nested, &child_path)?);
                select.and_where(self.restriction(&alias, related, &child_path)?);
                if negate {
                    // NOT IN over a list holding NULL matches nothing.
                    select.and_where(Condition::is_null(
                        Expr::column(&alias, &relation.field),
                        true,
                    ));
                }

                Ok(Condition::InSubquery {
                    expr: Expr::column(table, primary),
                    query: Box::new(select),
                    negate,
                })
            }
            (RelationType::A2o, Some(target)) => {
                if !relation.allowed_collections().iter().any(|c| c == target) {
                    return Err(Error::forbidden_collection(
                        target,
                        path.scoped(field, target).to_string(),
                    ));
                }

                let Some(discriminator) = relation.one_collection_field() else {
                    return Err(Error::invalid_schema(format!(
                        "any-to-one field `{field}` has no collection field"
                    )));
                };

                let child_path = path.scoped(field, target);
                let primary = self.primary(target, &child_path)?;
                let alias = self.table_alias();

                let mut select = Select::from(Source::Table(TableRef::new(target, &alias)));
                select.columns.push(SelectItem {
                    expr: Expr::CastText(Box::new(Expr::column(&alias, primary))),
                    alias: None,
                });
                select.and_where(self.filter(&alias, target, nested, &child_path)?);
                select.and_where(self.restriction(&alias, target, &child_path)?);

                let collection_param = self.params.push(target);
                let condition = Condition::all(vec![
                    Condition::eq(Expr::column(table, discriminator), collection_param),
                    Condition::InSubquery {
                        expr: Expr::column(table, field),
                        query: Box::new(select),
                        negate: false,
                    },
                ]);

                Ok(if negate {
                    Condition::not(condition)
                } else {
                    condition
                })
            }
            (RelationType::A2o, None) => Err(Error::invalid_query(format!(
                "filters on any-to-one field `{field}` need a collection scope, as in `{field}:<collection>`"
            ))),
            _ => Err(Error::invalid_query(format!(
                "filtering through `{field}` is not supported"
            ))),
        }
    }

    fn compare(&mut self, target: Target, op: Operator, value: &Value) -> Result<Condition> {
        use Operator::*;

        let Target { expr, ty, .. } = target;

        Ok(match op {
            Null | Nnull => Condition::is_null(expr, (op == Null) != flag(value)?),
            Eq | Neq if value.is_null() => Condition::is_null(expr, op == Neq),
            Eq | Neq if value.is_list() => return self.compare_list(expr, ty, value, op == Neq),
            Eq => Condition::eq(expr, self.param(value, ty)?),
            Neq => Condition::compare(expr, CompareOp::Ne, self.param(value, ty)?),
            Ieq | Nieq => {
                let operand = self.push(text(value)?);
                let op = if op == Ieq { CompareOp::Eq } else { CompareOp::Ne };
                Condition::compare(Expr::lower(expr), op, Expr::lower(operand))
            }
            Lt => Condition::compare(expr, CompareOp::Lt, self.param(value, ty)?),
            Lte => Condition::compare(expr, CompareOp::Le, self.param(value, ty)?),
            Gt => Condition::compare(expr, CompareOp::Gt, self.param(value, ty)?),
            Gte => Condition::compare(expr, CompareOp::Ge, self.param(value, ty)?),
            In | Nin => return self.compare_list(expr, ty, value, op == Nin),
            Contains | Ncontains | Icontains | Nicontains | StartsWith | NstartsWith
            | IstartsWith | NistartsWith | EndsWith | NendsWith | IendsWith | NiendsWith => {
                let text = text(value)?;
                let pattern = match op {
                    Contains | Ncontains | Icontains | Nicontains => format!("%{text}%"),
                    StartsWith | NstartsWith | IstartsWith | NistartsWith => format!("{text}%"),
                    _ => format!("%{text}"),
                };

                Condition::Like {
                    expr,
                    pattern: self.push(pattern),
                    case_insensitive: matches!(
                        op,
                        Icontains | Nicontains | IstartsWith | NistartsWith | IendsWith | NiendsWith
                    ),
                    negate: matches!(
                        op,
                        Ncontains | Nicontains | NstartsWith | NistartsWith | NendsWith | NiendsWith
                    ),
                }
            }
            Between | Nbetween => {
                let Some([low, high]) = value.as_list() else {
                    return Err(Error::invalid_query(format!(
                        "`{op}` expects a list of two values"
                    )));
                };

                Condition::Between {
                    expr,
                    low: self.param(low, ty)?,
                    high: self.param(high, ty)?,
                    negate: op == Nbetween,
                }
            }
            Empty | Nempty => {
                let blank = self.push("");

                if (op == Empty) == flag(value)? {
                    Condition::any(vec![
                        Condition::is_null(expr.clone(), false),
                        Condition::eq(expr, blank),
                    ])
                } else {
                    Condition::all(vec![
                        Condition::is_null(expr.clone(), true),
                        Condition::compare(expr, CompareOp::Ne, blank),
                    ])
                }
            }
            Intersects | Nintersects | IntersectsBbox | NintersectsBbox => {
                let geometry = match value {
                    Value::Json(json) => wkt(json)?,
                    Value::String(wkt) => wkt.clone(),
                    other => {
                        return Err(Error::invalid_query(format!(
                            "`{op}` expects a geometry, got {}",
                            other.to_json()
                        )))
                    }
                };

                Condition::Intersects {
                    expr,
                    geometry: self.push(geometry),
                    bbox: matches!(op, IntersectsBbox | NintersectsBbox),
                    negate: matches!(op, Nintersects | NintersectsBbox),
                }
            }
        })
    }

    fn compare_list(
        &mut self,
        expr: Expr,
        ty: Option<FieldType>,
        value: &Value,
        negate: bool,
    ) -> Result<Condition> {
        let list = match value {
            Value::List(items) => items
                .iter()
                .map(|item| self.param(item, ty))
                .collect::<Result<Vec<_>>>()?,
            other => vec![self.param(other, ty)?],
        };

        Ok(Condition::In { expr, list, negate })
    }

    /// Binds `value` converted to `ty`.
    fn param(&mut self, value: &Value, ty: Option<FieldType>) -> Result<Expr> {
        Ok(self.push(coerce(value, ty)?))
    }

    fn push(&mut self, value: impl Into<Value>) -> Expr {
        Expr::Param(self.params.push(value))
    }
}
