use thiserror::Error;

/// Errors emitted while sampling and loading.
///
/// Per-table query, read, and write failures are fatal for the whole run:
/// an incompletely sampled parent would break referential closure for every
/// descendant, so there is no skip-and-continue here.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("core error: {0}")]
    Core(#[from] vignette_core::Error),
    #[error("query execution failed for {table}: {message}")]
    Query { table: String, message: String },
    #[error("bulk load failed for {table}: {message}")]
    Load { table: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("schema replication exited with status {status}")]
    Replication { status: i32 },
    #[error("key store does not track {0}")]
    UnknownKeys(String),
}

/// Result type for sampling operations.
pub type Result<T> = std::result::Result<T, SampleError>;
