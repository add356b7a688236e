//! Lowering of a processed AST into an abstract [`Query`].
//!
//! The whole tree becomes one `SELECT`: every relational node is a
//! `LEFT JOIN` on a fresh table alias, every output field a select column
//! on a fresh column alias. Row visibility and per-row field exposure come
//! from the cases attached to each scope. [`crate::expand`] folds the flat
//! rows back into the nested shape of the AST.

mod aggregate;

mod filter;

mod guard;
use guard::Guard;

mod scope;

mod target;
use target::Target;

mod value;

use crate::{
    ast::{self, Cases, FieldPath, Node},
    Ast, Config, Error, Query, Result, SchemaOverview,
};

use indexmap::IndexMap;
use sieve_sql::stmt::{
    Condition, Direction, Expr, OrderBy, Parameters, ResultShape, Select, SelectItem, ShapeKind,
    Source, TableRef,
};
use tracing::debug;

/// Settings of one conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    config: Config,
    flags: bool,
}

impl ConvertOptions {
    pub fn new(config: &Config) -> ConvertOptions {
        ConvertOptions {
            config: config.clone(),
            flags: false,
        }
    }

    /// Selects `1` or `NULL` for every field instead of its value, telling
    /// whether the caller may read the field on each row.
    pub fn flags(mut self) -> Self {
        self.flags = true;
        self
    }
}

/// Converts `ast` into a query against `schema`.
pub fn convert(ast: &Ast, schema: &SchemaOverview, options: &ConvertOptions) -> Result<Query> {
    if schema.collection(&ast.name).is_none() {
        return Err(Error::forbidden_collection(&ast.name, ""));
    }

    let mut cx = Converter {
        schema,
        options,
        related: &ast.related,
        in_rule: false,
        params: Parameters::new(),
        tables: 0,
        columns: 0,
        select: Select::from(Source::Table(TableRef::new(&ast.name, "t0"))),
        nested_order: vec![],
        paths: IndexMap::new(),
        shapes: IndexMap::new(),
    };

    cx.root(ast)?;

    debug!(
        collection = %ast.name,
        joins = cx.select.joins.len(),
        columns = cx.columns,
        params = cx.params.len(),
        "ast converted"
    );

    Ok(Query {
        select: cx.select,
        parameters: cx.params.into_vec(),
        paths: cx.paths,
        shapes: cx.shapes,
    })
}

struct Converter<'a> {
    schema: &'a SchemaOverview,
    options: &'a ConvertOptions,

    /// Cases restricting the rows filter and count subqueries see
    related: &'a IndexMap<String, Cases>,

    /// Set while a permission rule is lowered. Rules are not restricted
    /// by other rules.
    in_rule: bool,

    /// Operands of the whole statement
    params: Parameters,

    /// Next table alias
    tables: usize,

    /// Next column alias
    columns: usize,

    select: Select,

    /// Sorts of one-to-many scopes, ordered after the root sort
    nested_order: Vec<OrderBy>,

    paths: IndexMap<String, Vec<String>>,
    shapes: IndexMap<Vec<String>, ResultShape>,
}

impl<'a> Converter<'a> {
    fn root(&mut self, ast: &Ast) -> Result<()> {
        let path = FieldPath::root();
        let table = self.table_alias();
        let guard = self.guard(&table, &ast.name, ast.cases.as_ref(), &path)?;

        let mut filter = vec![guard.visibility()];
        if let Some(query_filter) = &ast.query.filter {
            filter.insert(0, self.filter(&table, &ast.name, query_filter, &path)?);
        }
        let filter = all(filter);

        let sort = self.sort(&table, &ast.name, &guard, &ast.query, &path)?;
        let (limit, offset) = self.pagination(&ast.query)?;

        let aggregated = ast.query.aggregate.is_some() || ast.query.group.is_some();
        if aggregated && !self.options.flags {
            self.aggregate(&table, &ast.name, &guard, &ast.query, &path)?;
            self.shapes.insert(
                vec![],
                ResultShape {
                    kind: ShapeKind::Root,
                    key: None,
                },
            );

            self.select.and_where(filter);
            self.select.order_by = sort;
            self.select.limit = limit.map(|limit| self.params.push(limit));
            self.select.offset = offset.map(|offset| self.params.push(offset));
            return Ok(());
        }

        // Joined one-to-many rows would count against the root limit.
        if (limit.is_some() || offset.is_some()) && has_many(&ast.children) {
            let mut inner = Select::from(Source::Table(TableRef::new(&ast.name, &table)));
            inner.columns.push(SelectItem {
                expr: Expr::AllColumns(table.clone()),
                alias: None,
            });
            inner.and_where(filter);
            inner.order_by = sort.clone();
            inner.limit = limit.map(|limit| self.params.push(limit));
            inner.offset = offset.map(|offset| self.params.push(offset));

            self.select.from = Source::Derived {
                select: Box::new(inner),
                alias: table.clone(),
            };
        } else {
            self.select.and_where(filter);
            self.select.limit = limit.map(|limit| self.params.push(limit));
            self.select.offset = offset.map(|offset| self.params.push(offset));
        }

        self.scope(
            &table,
            &ast.name,
            &guard,
            &ast.children,
            &[],
            ShapeKind::Root,
            &path,
        )?;

        let mut order_by = sort;
        if order_by.is_empty() && !self.nested_order.is_empty() {
            // Keeps the rows of one root item together in a stable order.
            let primary = self.primary(&ast.name, &path)?;
            order_by.push(OrderBy {
                expr: Expr::column(&table, primary),
                direction: Direction::Asc,
            });
        }
        order_by.append(&mut self.nested_order);
        self.select.order_by = order_by;

        Ok(())
    }

    /// Lowers the case rules of one scope against its table alias.
    fn guard<'c>(
        &mut self,
        table: &str,
        collection: &str,
        cases: Option<&'c ast::Cases>,
        path: &FieldPath,
    ) -> Result<Guard<'c>> {
        let outer = std::mem::replace(&mut self.in_rule, true);
        let rules = match cases {
            Some(cases) => cases
                .cases
                .iter()
                .map(|case| self.filter(table, collection, &case.rule, path))
                .collect::<Result<Vec<_>>>(),
            None => Ok(vec![]),
        };
        self.in_rule = outer;

        Ok(Guard::new(cases, rules?))
    }

    /// Condition limiting a subquery over `collection`, read through
    /// `table`, to the rows the caller may see.
    pub(super) fn restriction(
        &mut self,
        table: &str,
        collection: &str,
        path: &FieldPath,
    ) -> Result<Condition> {
        if self.in_rule {
            return Ok(Condition::And(vec![]));
        }

        let related = self.related;
        let guard = self.guard(table, collection, related.get(collection), path)?;
        Ok(guard.visibility())
    }

    fn sort(
        &mut self,
        table: &str,
        collection: &str,
        guard: &Guard<'_>,
        query: &ast::Query,
        path: &FieldPath,
    ) -> Result<Vec<OrderBy>> {
        let mut order_by = vec![];

        for sort in query.sort.iter().flatten() {
            let Target { expr, field, .. } = self.target(table, collection, &sort.field, path)?;

            order_by.push(OrderBy {
                expr: guard.exposure(&field).wrap(expr),
                direction: match sort.direction {
                    ast::Direction::Asc => Direction::Asc,
                    ast::Direction::Desc => Direction::Desc,
                },
            });
        }

        Ok(order_by)
    }

    /// Limit and offset of a scope. `None` means unbounded.
    fn pagination(&self, query: &ast::Query) -> Result<(Option<i64>, Option<i64>)> {
        let limit = self.options.config.effective_limit(query.limit);

        let offset = match (query.offset, query.page) {
            (Some(offset), _) if offset < 0 => {
                return Err(Error::invalid_query(format!(
                    "offset must not be negative, got {offset}"
                )))
            }
            (Some(offset), _) => Some(offset),
            (None, Some(page)) if page < 1 => {
                return Err(Error::invalid_query(format!(
                    "page must be 1 or greater, got {page}"
                )))
            }
            (None, Some(page)) if page > 1 => match limit {
                Some(limit) => Some(limit.checked_mul(page - 1).ok_or_else(|| {
                    Error::invalid_query(format!("page {page} is out of range"))
                })?),
                None => None,
            },
            _ => None,
        };

        Ok((limit, offset))
    }

    fn table_alias(&mut self) -> String {
        let alias = format!("t{}", self.tables);
        self.tables += 1;
        alias
    }

    /// Adds a select column. Columns without an output path are internal.
    fn column(&mut self, expr: Expr, path: Option<Vec<String>>) -> String {
        let alias = format!("c{}", self.columns);
        self.columns += 1;

        self.select.column(expr, alias.clone());
        if let Some(path) = path {
            self.paths.insert(alias.clone(), path);
        }
        alias
    }

    fn primary(&self, collection: &str, path: &FieldPath) -> Result<&'a str> {
        let schema = self.schema;
        schema
            .collection(collection)
            .map(|collection| collection.primary.as_str())
            .ok_or_else(|| Error::forbidden_collection(collection, path.to_string()))
    }
}

/// Conjunction skipping operands that are always true.
fn all(operands: Vec<Condition>) -> Condition {
    Condition::all(
        operands
            .into_iter()
            .filter(|operand| !operand.is_true())
            .collect(),
    )
}

fn has_many(children: &[Node]) -> bool {
    children.iter().any(|child| match child {
        Node::O2m(_) => true,
        Node::M2o(nested) => has_many(&nested.children),
        Node::A2o(union) | Node::O2a(union) => union
            .branches
            .values()
            .any(|branch| has_many(&branch.children)),
        Node::Field(_) | Node::FunctionField(_) => false,
    })
}
