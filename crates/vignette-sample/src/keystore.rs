use std::collections::{BTreeMap, BTreeSet};

use vignette_core::KeySchema;

use crate::errors::{Result, SampleError};

/// Ephemeral per-run store of the key columns of sampled rows.
///
/// Instantiated empty from the key schema at run start and discarded at run
/// end. A table's keys are written once, after its own sampling completes,
/// and read only by tables later in topological order; under the strictly
/// sequential walk this needs no synchronization.
#[derive(Debug, Default)]
pub struct KeyStore {
    tables: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl KeyStore {
    /// Create the store with an empty value set per key column.
    pub fn from_schema(schema: &KeySchema) -> Self {
        let mut tables = BTreeMap::new();
        for name in schema.table_names() {
            let columns: BTreeMap<String, BTreeSet<String>> = schema
                .columns(name)
                .unwrap_or(&[])
                .iter()
                .map(|column| (column.name.clone(), BTreeSet::new()))
                .collect();
            tables.insert(name.to_string(), columns);
        }
        Self { tables }
    }

    /// Bulk-append key values for a table. Nulls are not keys and are
    /// skipped; values not belonging to a tracked column are ignored.
    pub fn insert_keys(
        &mut self,
        table: &str,
        rows: &[BTreeMap<String, Option<String>>],
    ) -> Result<()> {
        let columns = self
            .tables
            .get_mut(table)
            .ok_or_else(|| SampleError::UnknownKeys(table.to_string()))?;

        for row in rows {
            for (column, value) in row {
                if let (Some(values), Some(value)) = (columns.get_mut(column), value) {
                    values.insert(value.clone());
                }
            }
        }
        Ok(())
    }

    /// All values recorded for a key column, with set semantics.
    pub fn select_keys(&self, table: &str, column: &str) -> Result<&BTreeSet<String>> {
        self.tables
            .get(table)
            .and_then(|columns| columns.get(column))
            .ok_or_else(|| SampleError::UnknownKeys(format!("{table}.{column}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vignette_core::{RelationGraph, SchemaSnapshot};
    use vignette_core::schema::{Column, ForeignKeyRef, Table};

    fn schema() -> KeySchema {
        let column = |name: &str, pk: bool| Column {
            name: name.to_string(),
            data_type: "int8".to_string(),
            ordinal_position: 1,
            is_nullable: !pk,
            is_primary_key: pk,
        };
        let snapshot = SchemaSnapshot {
            engine: "postgres".to_string(),
            database: None,
            tables: vec![
                Table {
                    name: "account".to_string(),
                    columns: vec![column("id", true)],
                    primary_key: vec!["id".to_string()],
                    foreign_keys: Vec::new(),
                },
                Table {
                    name: "order".to_string(),
                    columns: vec![column("id", true), column("account_id", false)],
                    primary_key: vec!["id".to_string()],
                    foreign_keys: vec![ForeignKeyRef {
                        column: "account_id".to_string(),
                        referenced_table: "account".to_string(),
                        referenced_column: "id".to_string(),
                    }],
                },
            ],
        };
        let graph = RelationGraph::build(&snapshot, &[], &[], &[]).unwrap();
        KeySchema::derive(&graph)
    }

    fn row(pairs: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.map(str::to_string)))
            .collect()
    }

    #[test]
    fn inserted_keys_come_back_as_a_set() {
        let mut store = KeyStore::from_schema(&schema());
        store
            .insert_keys(
                "account",
                &[
                    row(&[("id", Some("1"))]),
                    row(&[("id", Some("2"))]),
                    row(&[("id", Some("1"))]),
                ],
            )
            .unwrap();

        let keys = store.select_keys("account", "id").unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("1") && keys.contains("2"));
    }

    #[test]
    fn nulls_are_not_recorded_as_keys() {
        let mut store = KeyStore::from_schema(&schema());
        store
            .insert_keys(
                "order",
                &[row(&[("id", Some("10")), ("account_id", None)])],
            )
            .unwrap();

        assert!(store.select_keys("order", "account_id").unwrap().is_empty());
        assert_eq!(store.select_keys("order", "id").unwrap().len(), 1);
    }

    #[test]
    fn untracked_lookups_are_errors() {
        let store = KeyStore::from_schema(&schema());
        assert!(store.select_keys("ghost", "id").is_err());
        assert!(store.select_keys("account", "email").is_err());
    }
}
