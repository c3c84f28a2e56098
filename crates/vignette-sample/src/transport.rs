use std::path::Path;

use async_trait::async_trait;

use crate::errors::Result;
use crate::query::SampleQuery;

/// A row of text-rendered column values; `None` is SQL null.
pub type Row = Vec<Option<String>>;

/// Moves rows between the databases and the per-table artifacts.
#[async_trait]
pub trait DataTransport {
    /// Execute an extraction query against the source, returning matched
    /// rows in the query's column order.
    async fn stream_query(&self, query: &SampleQuery) -> Result<Vec<Row>>;

    /// Load a CSV artifact (header row first) into the destination table.
    /// Returns the number of rows loaded.
    async fn bulk_load(&self, table: &str, artifact: &Path) -> Result<u64>;
}
