use vignette_core::{Column, ForeignKeyRef, Table};

use crate::options::CatalogOptions;
use crate::postgres::queries::{RawColumn, RawForeignKey, RawTable};

const RELKIND_TABLE: i8 = b'r' as i8;
const RELKIND_PARTITIONED: i8 = b'p' as i8;

pub fn map_tables(raw: Vec<RawTable>, opts: &CatalogOptions) -> Vec<Table> {
    raw.into_iter()
        .filter(|table| match table.relkind {
            RELKIND_TABLE => true,
            RELKIND_PARTITIONED => opts.include_partitioned,
            _ => false,
        })
        .map(|table| Table {
            name: table.name,
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        })
        .collect()
}

pub fn map_columns(raw: Vec<RawColumn>, primary_key: &[String]) -> Vec<Column> {
    raw.into_iter()
        .map(|column| Column {
            is_primary_key: primary_key.contains(&column.name),
            name: column.name,
            data_type: column.data_type,
            ordinal_position: column.ordinal_position,
            is_nullable: column.is_nullable,
        })
        .collect()
}

pub fn map_foreign_keys(raw: Vec<RawForeignKey>) -> Vec<ForeignKeyRef> {
    raw.into_iter()
        .map(|fk| ForeignKeyRef {
            column: fk.column_name,
            referenced_table: fk.referenced_table,
            referenced_column: fk.referenced_column,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitioned_tables_follow_the_option() {
        let raw = || {
            vec![
                RawTable {
                    name: "events".to_string(),
                    relkind: RELKIND_PARTITIONED,
                },
                RawTable {
                    name: "account".to_string(),
                    relkind: RELKIND_TABLE,
                },
            ]
        };

        let all = map_tables(raw(), &CatalogOptions::default());
        assert_eq!(all.len(), 2);

        let plain_only = map_tables(
            raw(),
            &CatalogOptions {
                include_partitioned: false,
                ..CatalogOptions::default()
            },
        );
        assert_eq!(plain_only.len(), 1);
        assert_eq!(plain_only[0].name, "account");
    }

    #[test]
    fn primary_key_membership_is_flagged_on_columns() {
        let columns = map_columns(
            vec![
                RawColumn {
                    ordinal_position: 1,
                    name: "id".to_string(),
                    data_type: "int8".to_string(),
                    is_nullable: false,
                },
                RawColumn {
                    ordinal_position: 2,
                    name: "email".to_string(),
                    data_type: "text".to_string(),
                    is_nullable: true,
                },
            ],
            &["id".to_string()],
        );

        assert!(columns[0].is_primary_key);
        assert!(!columns[1].is_primary_key);
    }
}
