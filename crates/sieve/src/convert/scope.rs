use super::{all, Converter, Guard};
use crate::{
    ast::{FieldPath, NestedNode, Node, UnionNode},
    schema::FieldType,
    Error, Result,
};

use sieve_sql::stmt::{Condition, Expr, Join, ResultShape, ShapeKind, TableRef};

impl Converter<'_> {
    /// Selects the children of one collection scope read through `table`.
    /// Their values land under `out` in the result.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn scope(
        &mut self,
        table: &str,
        collection: &str,
        guard: &Guard<'_>,
        children: &[Node],
        out: &[String],
        kind: ShapeKind,
        path: &FieldPath,
    ) -> Result<()> {
        let schema = self.schema;

        let primary = self.primary(collection, path)?;
        let key = self.column(Expr::column(table, primary), None);
        self.shapes.insert(
            out.to_vec(),
            ResultShape {
                kind,
                key: Some(key),
            },
        );

        for child in children {
            if self.options.flags {
                let flag = guard.exposure(child.field_key()).wrap(Expr::One);
                self.column(flag, Some(output(out, &child.key())));
                continue;
            }

            match child {
                Node::Field(node) => {
                    let Some(field) = schema.field(collection, &node.field_key) else {
                        return Err(Error::forbidden_fields(
                            collection,
                            [node.field_key.as_str()],
                            path.to_string(),
                        ));
                    };

                    let column = Expr::column(table, &node.field_key);
                    let expr = match field.ty {
                        FieldType::Alias => Expr::Null,
                        FieldType::Geometry => Expr::GeometryText(Box::new(column)),
                        _ => column,
                    };

                    let expr = guard.exposure(&node.field_key).wrap(expr);
                    self.column(expr, Some(output(out, node.key())));
                }
                Node::FunctionField(node) => {
                    let target = self.call(table, collection, &node.call, path)?;
                    let expr = guard.exposure(&target.field).wrap(target.expr);
                    self.column(expr, Some(output(out, &node.key())));
                }
                Node::M2o(nested) => self.many_to_one(table, guard, nested, out, path)?,
                Node::O2m(nested) => self.one_to_many(table, collection, guard, nested, out, path)?,
                Node::A2o(union) => self.any_to_one(table, guard, union, out, path)?,
                Node::O2a(union) => return Err(Error::unsupported_node("o2a", &union.field_key)),
            }
        }

        Ok(())
    }

    fn many_to_one(
        &mut self,
        table: &str,
        guard: &Guard<'_>,
        nested: &NestedNode,
        out: &[String],
        path: &FieldPath,
    ) -> Result<()> {
        let child_path = path.child(nested.key());
        let primary = self.primary(&nested.collection, &child_path)?;
        let alias = self.table_alias();
        let nested_guard = self.guard(&alias, &nested.collection, nested.cases.as_ref(), &child_path)?;

        let mut on = vec![Condition::eq(
            Expr::column(table, &nested.relation.field),
            Expr::column(&alias, primary),
        )];
        if let Some(filter) = &nested.query.filter {
            on.push(self.filter(&alias, &nested.collection, filter, &child_path)?);
        }
        on.push(nested_guard.visibility());
        on.extend(guard.exposure(&nested.field_key).condition());

        self.join(&nested.collection, &alias, on);
        self.scope(
            &alias,
            &nested.collection,
            &nested_guard,
            &nested.children,
            &output(out, nested.key()),
            ShapeKind::One,
            &child_path,
        )
    }

    fn one_to_many(
        &mut self,
        table: &str,
        collection: &str,
        guard: &Guard<'_>,
        nested: &NestedNode,
        out: &[String],
        path: &FieldPath,
    ) -> Result<()> {
        if nested.query.aggregate.is_some() || nested.query.group.is_some() {
            return Err(Error::invalid_query(format!(
                "aggregation is only supported on the root collection, not on `{}`",
                nested.field_key
            )));
        }

        let child_path = path.child(nested.key());
        let primary = self.primary(collection, path)?;
        let alias = self.table_alias();
        let nested_guard = self.guard(&alias, &nested.collection, nested.cases.as_ref(), &child_path)?;

        let mut on = vec![Condition::eq(
            Expr::column(&alias, &nested.relation.field),
            Expr::column(table, primary),
        )];
        if let Some(filter) = &nested.query.filter {
            on.push(self.filter(&alias, &nested.collection, filter, &child_path)?);
        }
        on.push(nested_guard.visibility());
        on.extend(guard.exposure(&nested.field_key).condition());

        let sort = self.sort(&alias, &nested.collection, &nested_guard, &nested.query, &child_path)?;
        self.nested_order.extend(sort);

        let (limit, offset) = self.pagination(&nested.query)?;
        let kind = ShapeKind::Many {
            limit: limit.and_then(|limit| usize::try_from(limit).ok()),
            offset: offset
                .and_then(|offset| usize::try_from(offset).ok())
                .unwrap_or(0),
        };

        self.join(&nested.collection, &alias, on);
        self.scope(
            &alias,
            &nested.collection,
            &nested_guard,
            &nested.children,
            &output(out, nested.key()),
            kind,
            &child_path,
        )
    }

    /// One join per target collection, each matching on the discriminator
    /// column before comparing keys.
    fn any_to_one(
        &mut self,
        table: &str,
        guard: &Guard<'_>,
        union: &UnionNode,
        out: &[String],
        path: &FieldPath,
    ) -> Result<()> {
        let Some(discriminator) = union.relation.one_collection_field() else {
            return Err(Error::invalid_schema(format!(
                "any-to-one field `{}` has no collection field",
                union.field_key
            )));
        };

        let exposure = guard.exposure(&union.field_key).condition();

        for (target, branch) in &union.branches {
            let branch_path = path.scoped(union.key(), target);
            let primary = self.primary(target, &branch_path)?;
            let alias = self.table_alias();
            let branch_guard = self.guard(&alias, target, branch.cases.as_ref(), &branch_path)?;

            let collection = self.params.push(target.as_str());
            let mut on = vec![
                Condition::eq(Expr::column(table, discriminator), collection),
                Condition::eq(
                    Expr::column(table, &union.field_key),
                    Expr::CastText(Box::new(Expr::column(&alias, primary))),
                ),
            ];
            if let Some(filter) = &branch.query.filter {
                on.push(self.filter(&alias, target, filter, &branch_path)?);
            }
            on.push(branch_guard.visibility());
            on.extend(exposure.clone());

            self.join(target, &alias, on);
            self.scope(
                &alias,
                target,
                &branch_guard,
                &branch.children,
                &output(out, &format!("{}:{target}", union.key())),
                ShapeKind::Union {
                    field: union.key().to_string(),
                },
                &branch_path,
            )?;
        }

        Ok(())
    }

    fn join(&mut self, collection: &str, alias: &str, on: Vec<Condition>) {
        self.select.joins.push(Join {
            table: TableRef::new(collection, alias),
            on: all(on),
        });
    }
}

fn output(out: &[String], key: &str) -> Vec<String> {
    let mut path = out.to_vec();
    path.push(key.to_string());
    path
}
