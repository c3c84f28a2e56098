use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::schema::SchemaSnapshot;

/// Validate internal consistency of a schema snapshot.
///
/// This checks:
/// - duplicate table and column names
/// - primary key columns exist
/// - foreign key columns and referenced targets exist
///
/// Runs eagerly, before any graph derivation or database I/O.
pub fn validate_snapshot(snapshot: &SchemaSnapshot) -> Result<()> {
    let mut catalog: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for table in &snapshot.tables {
        if catalog.contains_key(&table.name) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.name
            )));
        }

        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.clone()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}",
                    table.name, column.name
                )));
            }
        }

        catalog.insert(table.name.clone(), columns);
    }

    for table in &snapshot.tables {
        let columns = &catalog[&table.name];

        for pk_column in &table.primary_key {
            if !columns.contains(pk_column) {
                return Err(Error::InvalidSchema(format!(
                    "primary key column does not exist: {}.{}",
                    table.name, pk_column
                )));
            }
        }

        for fk in &table.foreign_keys {
            if !columns.contains(&fk.column) {
                return Err(Error::InvalidSchema(format!(
                    "foreign key column does not exist: {}.{}",
                    table.name, fk.column
                )));
            }

            let referenced = catalog.get(&fk.referenced_table).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "foreign key {}.{} references missing table {}",
                    table.name, fk.column, fk.referenced_table
                ))
            })?;

            if !referenced.contains(&fk.referenced_column) {
                return Err(Error::InvalidSchema(format!(
                    "foreign key {}.{} references missing column {}.{}",
                    table.name, fk.column, fk.referenced_table, fk.referenced_column
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ForeignKeyRef, Table};

    fn column(name: &str, is_primary_key: bool) -> Column {
        Column {
            name: name.to_string(),
            data_type: "int8".to_string(),
            ordinal_position: 1,
            is_nullable: !is_primary_key,
            is_primary_key,
        }
    }

    fn snapshot(tables: Vec<Table>) -> SchemaSnapshot {
        SchemaSnapshot {
            engine: "postgres".to_string(),
            database: Some("db".to_string()),
            tables,
        }
    }

    #[test]
    fn accepts_consistent_snapshot() {
        let snapshot = snapshot(vec![
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
        ]);

        assert!(validate_snapshot(&snapshot).is_ok());
    }

    #[test]
    fn rejects_missing_referenced_table() {
        let snapshot = snapshot(vec![Table {
            name: "order".to_string(),
            columns: vec![column("id", true), column("account_id", false)],
            primary_key: vec!["id".to_string()],
            foreign_keys: vec![ForeignKeyRef {
                column: "account_id".to_string(),
                referenced_table: "account".to_string(),
                referenced_column: "id".to_string(),
            }],
        }]);

        assert!(matches!(
            validate_snapshot(&snapshot),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let snapshot = snapshot(vec![Table {
            name: "account".to_string(),
            columns: vec![column("id", true), column("id", false)],
            primary_key: vec!["id".to_string()],
            foreign_keys: Vec::new(),
        }]);

        assert!(matches!(
            validate_snapshot(&snapshot),
            Err(Error::InvalidSchema(_))
        ));
    }
}
