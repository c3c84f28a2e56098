//! Schema catalog adapters.

pub mod catalog;
pub mod options;
pub mod postgres;

pub use catalog::SchemaCatalog;
pub use options::CatalogOptions;
pub use postgres::PostgresCatalog;

pub use vignette_core::SchemaSnapshot;
