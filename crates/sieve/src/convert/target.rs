use super::Converter;
use crate::{
    ast::{FieldPath, Function, FunctionCall},
    schema::{FieldType, RelationType},
    Error, Result,
};

use sieve_sql::stmt::{Condition, DatePart, Expr, Select, SelectItem, Source, TableRef};

/// A field reference lowered to an expression: a column, a function applied
/// to a column, or a correlated count.
#[derive(Debug)]
pub(super) struct Target {
    pub(super) expr: Expr,

    /// Field of the scope's collection the expression reads
    pub(super) field: String,

    /// Type operands compared to the expression are converted to
    pub(super) ty: Option<FieldType>,
}

impl Converter<'_> {
    /// Lowers a field key (`title`, `year(date_created)`, `count(comments)`)
    /// of `collection`, read through `table`.
    pub(super) fn target(
        &mut self,
        table: &str,
        collection: &str,
        key: &str,
        path: &FieldPath,
    ) -> Result<Target> {
        match FunctionCall::parse(key)? {
            Some(call) => self.call(table, collection, &call, path),
            None => self.plain(table, collection, key, path),
        }
    }

    pub(super) fn call(
        &mut self,
        table: &str,
        collection: &str,
        call: &FunctionCall,
        path: &FieldPath,
    ) -> Result<Target> {
        if call.function == Function::Count {
            return self.count(table, collection, &call.field, path);
        }

        let column = self.plain(table, collection, &call.field, path)?;

        let (expr, ty) = match date_part(call.function) {
            Some(part) => (
                Expr::Extract {
                    part,
                    expr: Box::new(column.expr),
                },
                Some(FieldType::Integer),
            ),
            None => (
                Expr::JsonPath {
                    expr: Box::new(column.expr),
                    path: call.json_path().into_iter().map(str::to_string).collect(),
                },
                None,
            ),
        };

        Ok(Target {
            expr,
            field: column.field,
            ty,
        })
    }

    fn plain(
        &mut self,
        table: &str,
        collection: &str,
        field: &str,
        path: &FieldPath,
    ) -> Result<Target> {
        let Some(schema_field) = self.schema.field(collection, field) else {
            return Err(Error::forbidden_fields(collection, [field], path.to_string()));
        };

        if schema_field.ty.is_alias() {
            return Err(Error::invalid_query(format!(
                "field `{field}` of `{collection}` has no column"
            )));
        }

        Ok(Target {
            expr: Expr::column(table, field),
            field: field.to_string(),
            ty: Some(schema_field.ty),
        })
    }

    /// `count(<one-to-many field>)`: correlated count of the related rows.
    fn count(
        &mut self,
        table: &str,
        collection: &str,
        field: &str,
        path: &FieldPath,
    ) -> Result<Target> {
        let schema = self.schema;

        let Some((RelationType::O2m, relation)) = schema.relation(collection, field) else {
            if schema.field(collection, field).is_none() {
                return Err(Error::forbidden_fields(collection, [field], path.to_string()));
            }
            return Err(Error::invalid_query(format!(
                "count() applies to one-to-many fields, `{field}` is not one"
            )));
        };

        let primary = self.primary(collection, path)?;
        let alias = self.table_alias();

        let mut select = Select::from(Source::Table(TableRef::new(&relation.collection, &alias)));
        select.columns.push(SelectItem {
            expr: Expr::count_rows(),
            alias: None,
        });
        select.and_where(Condition::eq(
            Expr::column(&alias, &relation.field),
            Expr::column(table, primary),
        ));
        select.and_where(self.restriction(&alias, &relation.collection, &path.child(field))?);

        Ok(Target {
            expr: Expr::Subquery(Box::new(select)),
            field: field.to_string(),
            ty: Some(FieldType::Integer),
        })
    }
}

fn date_part(function: Function) -> Option<DatePart> {
    Some(match function {
        Function::Year => DatePart::Year,
        Function::Month => DatePart::Month,
        Function::Week => DatePart::Week,
        Function::Day => DatePart::Day,
        Function::Weekday => DatePart::Weekday,
        Function::Hour => DatePart::Hour,
        Function::Minute => DatePart::Minute,
        Function::Second => DatePart::Second,
        Function::Count | Function::Json => return None,
    })
}
