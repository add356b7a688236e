use super::{Converter, Guard, Target};
use crate::{
    ast::{AggregateFn, FieldPath, Query},
    Error, Result,
};

use sieve_sql::stmt::{AggregateFunction, Expr};

impl Converter<'_> {
    /// Selects the group keys and aggregates of the root scope instead of
    /// its rows. Aggregated values only include the rows and fields the
    /// caller may read.
    pub(super) fn aggregate(
        &mut self,
        table: &str,
        collection: &str,
        guard: &Guard<'_>,
        query: &Query,
        path: &FieldPath,
    ) -> Result<()> {
        for group in query.group.iter().flatten() {
            let Target { expr, field, .. } = self.target(table, collection, group, path)?;
            let expr = guard.exposure(&field).wrap(expr);

            self.select.group_by.push(expr.clone());
            self.column(expr, Some(vec![group.clone()]));
        }

        let Some(aggregate) = &query.aggregate else {
            return Ok(());
        };

        for (function, fields) in &aggregate.functions {
            let name = function.as_str().to_string();

            if *function == AggregateFn::CountAll {
                self.column(Expr::count_rows(), Some(vec![name]));
                continue;
            }

            for field in fields {
                if field == "*" {
                    if *function != AggregateFn::Count {
                        return Err(Error::invalid_query(format!(
                            "`{name}` needs a field, `*` only works with `count`"
                        )));
                    }

                    self.column(Expr::count_rows(), Some(vec![name.clone()]));
                    continue;
                }

                let Target { expr, field: read, .. } = self.target(table, collection, field, path)?;
                let expr = guard.exposure(&read).wrap(expr);

                let (aggregate, distinct) = match function {
                    AggregateFn::Count => (AggregateFunction::Count, false),
                    AggregateFn::CountDistinct => (AggregateFunction::Count, true),
                    AggregateFn::Sum => (AggregateFunction::Sum, false),
                    AggregateFn::SumDistinct => (AggregateFunction::Sum, true),
                    AggregateFn::Avg => (AggregateFunction::Avg, false),
                    AggregateFn::AvgDistinct => (AggregateFunction::Avg, true),
                    AggregateFn::Min => (AggregateFunction::Min, false),
                    AggregateFn::Max => (AggregateFunction::Max, false),
                    AggregateFn::CountAll => (AggregateFunction::Count, false),
                };

                self.column(
                    Expr::Aggregate {
                        function: aggregate,
                        expr: Some(Box::new(expr)),
                        distinct,
                    },
                    Some(vec![name.clone(), field.clone()]),
                );
            }
        }

        Ok(())
    }
}
