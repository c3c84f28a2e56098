use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Immutable snapshot of the source database schema.
///
/// Produced once per run by the catalog and threaded through every
/// component by parameter; nothing downstream reflects the database again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Database engine identifier (e.g. `postgres`).
    pub engine: String,
    /// Database name when available.
    pub database: Option<String>,
    /// Tables captured from the database, sorted by name.
    pub tables: Vec<Table>,
}

impl SchemaSnapshot {
    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Look up a column through a qualified reference.
    pub fn column(&self, reference: &ColumnRef) -> Option<&Column> {
        self.table(&reference.table)
            .and_then(|table| table.column(&reference.column))
    }
}

/// A table with its columns and key metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// Columns in declared (ordinal) order.
    pub columns: Vec<Column>,
    /// Primary key columns in key order. Only the first is used downstream.
    pub primary_key: Vec<String>,
    /// One entry per referencing column of each foreign-key constraint.
    pub foreign_keys: Vec<ForeignKeyRef>,
}

impl Table {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Column names in declared order, as written to artifact headers.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }
}

/// Column metadata for a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Underlying type name as reported by the catalog (e.g. `int8`, `uuid`).
    pub data_type: String,
    pub ordinal_position: i16,
    pub is_nullable: bool,
    pub is_primary_key: bool,
}

/// A single referencing-column pair of a foreign-key constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeyRef {
    /// Referencing column on this table.
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Fully qualified `table.column` reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

impl FromStr for ColumnRef {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Ok(Self::new(table, column))
            }
            _ => Err(Error::InvalidConfig(format!(
                "expected a table.column reference, got `{value}`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_ref_parses_qualified_name() {
        let reference: ColumnRef = "orders.account_id".parse().unwrap();
        assert_eq!(reference.table, "orders");
        assert_eq!(reference.column, "account_id");
        assert_eq!(reference.to_string(), "orders.account_id");
    }

    #[test]
    fn column_ref_rejects_unqualified_name() {
        assert!("orders".parse::<ColumnRef>().is_err());
        assert!(".account_id".parse::<ColumnRef>().is_err());
        assert!("orders.".parse::<ColumnRef>().is_err());
    }
}
