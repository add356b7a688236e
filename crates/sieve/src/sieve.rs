mod builder;
pub use builder::Builder;

use crate::{
    ast::{self, FieldsBuilder},
    convert::{self, ConvertOptions},
    expand,
    permissions::PermissionCache,
    Accountability, Action, Ast, Config, Connection, Dialect, Query, Result, SchemaOverview,
    Serializer, Store, Value,
};

use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

/// Handle to the query engine. Cheap to clone; clones share the store, the
/// schema snapshot and the permission cache.
#[derive(Debug, Clone)]
pub struct Sieve {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    store: Arc<dyn Store>,
    schema: RwLock<Arc<SchemaOverview>>,
    config: Config,
    cache: PermissionCache,
}

impl Sieve {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The current schema snapshot.
    pub fn schema(&self) -> Arc<SchemaOverview> {
        self.shared
            .schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swaps in a new schema snapshot. Queries already running keep the
    /// snapshot they started with.
    pub fn set_schema(&self, schema: SchemaOverview) {
        *self
            .shared
            .schema
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(schema);
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.shared.store
    }

    pub(crate) fn cache(&self) -> &PermissionCache {
        &self.shared.cache
    }

    /// Drops every cached permission set.
    pub fn clear_permission_cache(&self) {
        self.shared.cache.clear();
    }

    /// Builds an AST from a field list against the current schema.
    pub fn ast<S: AsRef<str>>(
        &self,
        collection: &str,
        fields: &[S],
        query: ast::Query,
    ) -> Result<Ast> {
        let schema = self.schema();
        FieldsBuilder::new(&schema).build(collection, fields, query)
    }

    /// Lowers a processed AST into an abstract query.
    pub fn convert(&self, ast: &Ast) -> Result<Query> {
        let schema = self.schema();
        convert::convert(ast, &schema, &ConvertOptions::new(&self.shared.config))
    }

    /// Renders `query` for `dialect`.
    pub fn render(&self, query: &Query, dialect: Dialect) -> (String, Vec<Value>) {
        Serializer::for_dialect(dialect).render(query)
    }

    /// Processes, converts and runs a read, returning the nested result
    /// objects.
    pub async fn read(
        &self,
        connection: &mut dyn Connection,
        ast: Ast,
        accountability: Option<&Accountability>,
    ) -> Result<Vec<serde_json::Value>> {
        let ast = self.process_ast(ast, Action::Read, accountability).await?;
        let query = self.convert(&ast)?;
        let (sql, params) = self.render(&query, connection.dialect());

        debug!(collection = %ast.name, params = params.len(), "executing read");
        trace!(sql = %sql);

        let rows = connection.query(&sql, &params).await?;
        expand(&rows, &query)
    }
}
