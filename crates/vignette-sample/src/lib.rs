//! Dependent sampling: key store, per-table extraction, orchestration.
//!
//! Tables are visited strictly in topological order; every table's query is
//! restricted to the parent keys already sampled, so each artifact's
//! foreign keys point only at rows present in the sample (or are null).

pub mod artifact;
pub mod errors;
pub mod keystore;
pub mod orchestrator;
pub mod postgres;
pub mod query;
pub mod replicate;
pub mod sampler;
pub mod transport;

pub use errors::{Result, SampleError};
pub use keystore::KeyStore;
pub use orchestrator::{Manifest, ManifestEntry, SampleRun};
pub use postgres::PgTransport;
pub use query::{KeyRestriction, SampleQuery, render_sql};
pub use replicate::{ReplicateOptions, replicate_schema};
pub use sampler::{SampleOutcome, TableSampler};
pub use transport::{DataTransport, Row};
