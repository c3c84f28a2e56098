//! Core contracts for vignette.
//!
//! This crate defines the schema snapshot types, the foreign-key relation
//! graph with its derived artifacts, the reduced key schema, and the
//! configuration surface shared by the catalog, sampler, and CLI crates.

pub mod config;
pub mod error;
pub mod graph;
pub mod keys;
pub mod redaction;
pub mod schema;
pub mod validation;

pub use config::{
    DEFAULT_LIMIT, DEFAULT_MODIFIER_KEY, QueryModifier, RelationSpec, ResolvedModifier, Settings,
    resolve_modifiers,
};
pub use error::{Error, Result};
pub use graph::{GraphArtifacts, Relation, RelationGraph};
pub use keys::{KeyColumn, KeyKind, KeySchema};
pub use redaction::redact_url;
pub use schema::{Column, ColumnRef, ForeignKeyRef, SchemaSnapshot, Table};
pub use validation::validate_snapshot;
