use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use vignette_core::{GraphArtifacts, ResolvedModifier, Table};

use crate::artifact;
use crate::errors::Result;
use crate::keystore::KeyStore;
use crate::query::{KeyRestriction, SampleQuery};
use crate::transport::{DataTransport, Row};

/// Samples one table: builds the restricted extraction query, streams
/// matched rows to the per-table artifact, and records the table's keys so
/// later tables can restrict on them.
pub struct TableSampler<'a> {
    table: &'a Table,
    modifier: &'a ResolvedModifier,
    artifacts: &'a GraphArtifacts,
}

/// What a single table visit produced.
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub path: PathBuf,
    pub rows: u64,
}

impl<'a> TableSampler<'a> {
    pub fn new(
        table: &'a Table,
        modifier: &'a ResolvedModifier,
        artifacts: &'a GraphArtifacts,
    ) -> Self {
        Self {
            table,
            modifier,
            artifacts,
        }
    }

    /// Build the extraction query restricted to already-sampled parent keys.
    ///
    /// Entrypoints have no foreign-key columns in the key schema, so their
    /// query carries conditions and limit only. For every other table, each
    /// foreign-key column is restricted to the keys its parent sampled; an
    /// empty parent sample leaves only null references valid.
    pub fn build_query(&self, keys: &KeyStore) -> Result<SampleQuery> {
        let mut restrictions = Vec::new();

        for key_column in self
            .artifacts
            .key_schema
            .columns(&self.table.name)
            .unwrap_or(&[])
        {
            let Some(parent) = &key_column.references else {
                continue;
            };
            let sampled = keys.select_keys(&parent.table, &parent.column)?;
            restrictions.push(KeyRestriction {
                column: key_column.name.clone(),
                kind: key_column.kind.clone(),
                keys: sampled.iter().cloned().collect(),
            });
        }

        Ok(SampleQuery {
            table: self.table.name.clone(),
            columns: self.table.column_names(),
            conditions: self.modifier.conditions.clone(),
            restrictions,
            limit: self.modifier.limit,
        })
    }

    /// Execute the query, persist the artifact, and record the keys.
    pub async fn sample(
        &self,
        transport: &dyn DataTransport,
        keys: &mut KeyStore,
        directory: &Path,
    ) -> Result<SampleOutcome> {
        let query = self.build_query(keys)?;
        let rows = transport.stream_query(&query).await?;

        let path = directory.join(format!("{}.csv", self.table.name));
        artifact::append_rows(&path, &query.columns, &rows)?;

        let projected = self.project_keys(&query.columns, &rows);
        keys.insert_keys(&self.table.name, &projected)?;

        debug!(table = %self.table.name, rows = rows.len(), "table sampled");
        Ok(SampleOutcome {
            path,
            rows: rows.len() as u64,
        })
    }

    /// Project sampled rows onto the table's key-schema columns.
    fn project_keys(
        &self,
        columns: &[String],
        rows: &[Row],
    ) -> Vec<BTreeMap<String, Option<String>>> {
        let indices: Vec<(String, usize)> = self
            .artifacts
            .key_schema
            .columns(&self.table.name)
            .unwrap_or(&[])
            .iter()
            .filter_map(|key_column| {
                columns
                    .iter()
                    .position(|column| *column == key_column.name)
                    .map(|index| (key_column.name.clone(), index))
            })
            .collect();

        rows.iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|(name, index)| (name.clone(), row.get(*index).cloned().flatten()))
                    .collect()
            })
            .collect()
    }
}
