//! Folding of flat result rows back into nested objects.
//!
//! Every select column with an output path belongs to the deepest result
//! shape whose path is a strict prefix of its own. Rows are grouped by the
//! key column of each shape, so the duplicates produced by joins collapse
//! into one object per related row.

use crate::{Query, Record, Result};

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};
use sieve_sql::stmt::{ResultShape, ShapeKind};
use std::collections::HashMap;

/// Expands the rows returned for `query` into one JSON object per root item.
pub fn expand(rows: &[Record], query: &Query) -> Result<Vec<Json>> {
    let Some(root) = query.shapes.get(&Vec::<String>::new()) else {
        sieve_core::bail!("query has no root result shape");
    };

    let positions: HashMap<&str, usize> = query
        .select
        .columns
        .iter()
        .enumerate()
        .filter_map(|(position, item)| Some((item.alias.as_deref()?, position)))
        .collect();

    let plan = Plan {
        query,
        positions: &positions,
    };
    let root = plan.scope(&[], root);

    let rows: Vec<&Record> = rows.iter().collect();
    Ok(root.objects(&rows).into_iter().map(Json::Object).collect())
}

struct Plan<'q> {
    query: &'q Query,
    positions: &'q HashMap<&'q str, usize>,
}

struct Scope<'q> {
    kind: &'q ShapeKind,
    key: Option<&'q str>,

    /// Key of the scope's value in the parent object
    name: &'q str,

    /// Ordered by select position
    entries: Vec<Entry<'q>>,
}

enum Entry<'q> {
    Value {
        column: &'q str,

        /// Relative to the owning scope
        path: &'q [String],
    },
    Scope(Scope<'q>),
}

impl<'q> Plan<'q> {
    fn scope(&self, path: &'q [String], shape: &'q ResultShape) -> Scope<'q> {
        let query = self.query;
        let mut entries = vec![];

        for (column, column_path) in &query.paths {
            if self.owner(column_path) == Some(path) {
                entries.push((
                    self.position(column),
                    Entry::Value {
                        column,
                        path: &column_path[path.len()..],
                    },
                ));
            }
        }

        for (shape_path, child) in &query.shapes {
            if self.owner(shape_path) == Some(path) {
                let position = child.key.as_deref().map_or(usize::MAX, |key| self.position(key));
                entries.push((position, Entry::Scope(self.scope(shape_path, child))));
            }
        }

        entries.sort_by_key(|(position, _)| *position);

        Scope {
            kind: &shape.kind,
            key: shape.key.as_deref(),
            name: match &shape.kind {
                ShapeKind::Union { field } => field.as_str(),
                _ => path.last().map_or("", String::as_str),
            },
            entries: entries.into_iter().map(|(_, entry)| entry).collect(),
        }
    }

    /// Path of the deepest shape strictly containing `path`.
    fn owner(&self, path: &[String]) -> Option<&'q [String]> {
        let query = self.query;
        query
            .shapes
            .keys()
            .filter(|shape| shape.len() < path.len() && path.starts_with(shape))
            .max_by_key(|shape| shape.len())
            .map(Vec::as_slice)
    }

    fn position(&self, column: &str) -> usize {
        self.positions.get(column).copied().unwrap_or(usize::MAX)
    }
}

impl Scope<'_> {
    /// One object per distinct key among `rows`. Rows with a null key did
    /// not join and produce nothing. Without a key every row is an object.
    fn objects(&self, rows: &[&Record]) -> Vec<Map<String, Json>> {
        let Some(key) = self.key else {
            return rows
                .iter()
                .map(|row| self.object(std::slice::from_ref(row)))
                .collect();
        };

        let mut groups: IndexMap<String, Vec<&Record>> = IndexMap::new();
        for row in rows {
            if let Some(identity) = row.get(key).identity_key() {
                groups.entry(identity).or_default().push(row);
            }
        }

        groups.values().map(|rows| self.object(rows)).collect()
    }

    fn object(&self, rows: &[&Record]) -> Map<String, Json> {
        let mut object = Map::new();
        let Some(first) = rows.first() else {
            return object;
        };

        for entry in &self.entries {
            match entry {
                Entry::Value { column, path } => insert(&mut object, path, first.get(column).to_json()),
                Entry::Scope(scope) => scope.fill(&mut object, rows),
            }
        }

        object
    }

    /// Sets this scope's value on the parent `object`.
    fn fill(&self, object: &mut Map<String, Json>, rows: &[&Record]) {
        let mut objects = self.objects(rows).into_iter().map(Json::Object);

        match self.kind {
            ShapeKind::Many { limit, offset } => {
                let items = objects.skip(*offset).take(limit.unwrap_or(usize::MAX)).collect();
                object.insert(self.name.to_string(), Json::Array(items));
            }
            ShapeKind::Union { .. } => {
                // Branches share the field, the first one that joined wins.
                let value = objects.next();
                match object.get_mut(self.name) {
                    Some(existing) if existing.is_null() => {
                        if let Some(value) = value {
                            *existing = value;
                        }
                    }
                    Some(_) => {}
                    None => {
                        object.insert(self.name.to_string(), value.unwrap_or(Json::Null));
                    }
                }
            }
            ShapeKind::One | ShapeKind::Root => {
                object.insert(self.name.to_string(), objects.next().unwrap_or(Json::Null));
            }
        }
    }
}

fn insert(object: &mut Map<String, Json>, path: &[String], value: Json) {
    match path {
        [] => {}
        [last] => {
            object.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let nested = object
                .entry(head.clone())
                .or_insert_with(|| Json::Object(Map::new()));
            if let Json::Object(nested) = nested {
                insert(nested, rest, value);
            }
        }
    }
}
