use thiserror::Error;

/// Core error type shared across vignette crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error or catalog failure.
    #[error("database error: {0}")]
    Db(String),
    /// The relation graph is not acyclic.
    #[error("relation graph contains a cycle through: {}", nodes.join(", "))]
    CyclicGraph { nodes: Vec<String> },
    /// The schema snapshot violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// The configuration document cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A `table.column` reference that does not exist in the snapshot.
    #[error("unknown column reference: {0}")]
    UnknownColumn(String),
}

/// Convenience alias for results returned by vignette crates.
pub type Result<T> = std::result::Result<T, Error>;
