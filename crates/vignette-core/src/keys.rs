use std::collections::BTreeMap;

use tracing::warn;

use crate::graph::RelationGraph;
use crate::schema::ColumnRef;

/// Portable classification of key column types.
///
/// Anything that is not an integer or a UUID is unexpected for a key but
/// still carried through, opaquely, with its reported type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    Integer,
    Uuid,
    Opaque(String),
}

impl KeyKind {
    /// Classify a catalog type name.
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type {
            "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" | "serial"
            | "smallserial" | "bigserial" => Self::Integer,
            "uuid" => Self::Uuid,
            other => Self::Opaque(other.to_string()),
        }
    }
}

/// A column of the reduced per-table key schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: String,
    pub kind: KeyKind,
    pub is_primary: bool,
    /// Referenced parent column, present on foreign-key columns.
    pub references: Option<ColumnRef>,
}

/// Reduced schema holding only the primary and foreign key columns of each
/// table, used to track which identifiers a run has sampled.
#[derive(Debug, Clone, Default)]
pub struct KeySchema {
    tables: BTreeMap<String, Vec<KeyColumn>>,
}

impl KeySchema {
    /// Derive the key schema from a validated relation graph.
    ///
    /// Per table: the first primary-key column (composite primary keys are
    /// unsupported; extra columns are logged and dropped) plus one column
    /// per relation where the table is the referencing side.
    pub fn derive(graph: &RelationGraph) -> Self {
        let mut tables = BTreeMap::new();

        for table in graph.tables() {
            let mut columns: Vec<KeyColumn> = Vec::new();

            if let Some(pk_name) = table.primary_key.first() {
                if table.primary_key.len() > 1 {
                    warn!(
                        table = %table.name,
                        kept = %pk_name,
                        "composite primary key is unsupported; keeping only the first column"
                    );
                }
                columns.push(KeyColumn {
                    name: pk_name.clone(),
                    kind: key_kind(graph, &table.name, pk_name),
                    is_primary: true,
                    references: None,
                });
            }

            for relation in graph.referencing(&table.name) {
                let name = &relation.fk.column;
                if let Some(existing) =
                    columns.iter_mut().find(|column| column.name == *name)
                {
                    // A primary key that doubles as a foreign key gets its
                    // reference attached rather than a second column.
                    if existing.references.is_none() {
                        existing.references = Some(relation.pk.clone());
                    }
                    continue;
                }
                columns.push(KeyColumn {
                    name: name.clone(),
                    kind: key_kind(graph, &table.name, name),
                    is_primary: false,
                    references: Some(relation.pk.clone()),
                });
            }

            tables.insert(table.name.clone(), columns);
        }

        Self { tables }
    }

    /// Key columns of a table, primary key first.
    pub fn columns(&self, table: &str) -> Option<&[KeyColumn]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// The reduced primary-key column of a table, when one exists.
    pub fn primary_key(&self, table: &str) -> Option<&KeyColumn> {
        self.tables
            .get(table)?
            .iter()
            .find(|column| column.is_primary)
    }

    /// Tables covered by the key schema, by name.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

fn key_kind(graph: &RelationGraph, table: &str, column: &str) -> KeyKind {
    let data_type = graph
        .table(table)
        .and_then(|table| table.column(column))
        .map(|column| column.data_type.as_str())
        .unwrap_or("unknown");

    let kind = KeyKind::from_data_type(data_type);
    if let KeyKind::Opaque(type_name) = &kind {
        warn!(
            column = %format!("{table}.{column}"),
            data_type = %type_name,
            "key column has unexpected type"
        );
    }
    kind
}
