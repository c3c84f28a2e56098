use async_trait::async_trait;

use vignette_core::{Result, SchemaSnapshot};

use crate::options::CatalogOptions;

/// Trait implemented by database adapters that can snapshot a schema.
///
/// A snapshot is taken once per run and treated as immutable afterwards.
#[async_trait]
pub trait SchemaCatalog {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Capture table, column, and key metadata as one immutable snapshot.
    async fn snapshot(&self, opts: &CatalogOptions) -> Result<SchemaSnapshot>;
}
