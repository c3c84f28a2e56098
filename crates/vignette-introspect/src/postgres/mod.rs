use sqlx::PgPool;

use vignette_core::{Result, SchemaSnapshot};

use crate::catalog::SchemaCatalog;
use crate::options::CatalogOptions;

mod mapper;
mod queries;

/// Catalog for PostgreSQL databases.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Create a catalog using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SchemaCatalog for PostgresCatalog {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn snapshot(&self, opts: &CatalogOptions) -> Result<SchemaSnapshot> {
        snapshot(&self.pool, opts).await
    }
}

/// Snapshot a Postgres schema according to the provided options.
pub async fn snapshot(pool: &PgPool, opts: &CatalogOptions) -> Result<SchemaSnapshot> {
    let database = queries::fetch_database_name(pool).await?;
    let raw_tables = queries::list_tables(pool, &opts.schema).await?;
    let mut tables = mapper::map_tables(raw_tables, opts);

    for table in &mut tables {
        let primary_key = queries::primary_key_columns(pool, &opts.schema, &table.name).await?;
        let raw_columns = queries::list_columns(pool, &opts.schema, &table.name).await?;
        let raw_fks = queries::list_foreign_keys(pool, &opts.schema, &table.name).await?;

        table.columns = mapper::map_columns(raw_columns, &primary_key);
        table.primary_key = primary_key;
        table.foreign_keys = mapper::map_foreign_keys(raw_fks);
    }

    tables.sort_by(|left, right| left.name.cmp(&right.name));

    Ok(SchemaSnapshot {
        engine: "postgres".to_string(),
        database: Some(database),
        tables,
    })
}
