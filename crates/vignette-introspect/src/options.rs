/// Options that control what the catalog snapshot covers.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Namespace to snapshot.
    pub schema: String,
    /// Include partitioned tables alongside plain tables.
    pub include_partitioned: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            include_partitioned: true,
        }
    }
}
