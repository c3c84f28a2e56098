use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use vignette_core::{GraphArtifacts, RelationGraph, ResolvedModifier};

use crate::errors::Result;
use crate::keystore::KeyStore;
use crate::sampler::TableSampler;
use crate::transport::DataTransport;

/// Artifact record for one sampled table.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub table: String,
    pub path: PathBuf,
    pub rows: u64,
}

/// What a run produced: artifacts in visitation order, plus the tables that
/// were skipped for lack of a usable query modifier.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
    pub skipped: Vec<String>,
}

/// Sequences a whole sampling run.
///
/// Initializes the key store from the key schema, then drives the sampler
/// over every table strictly in topological order, so each table's parents
/// have fully extracted and persisted their keys before its query is built.
pub struct SampleRun<'a> {
    graph: &'a RelationGraph,
    artifacts: &'a GraphArtifacts,
    modifiers: &'a BTreeMap<String, ResolvedModifier>,
    directory: PathBuf,
}

impl<'a> SampleRun<'a> {
    pub fn new(
        graph: &'a RelationGraph,
        artifacts: &'a GraphArtifacts,
        modifiers: &'a BTreeMap<String, ResolvedModifier>,
        directory: PathBuf,
    ) -> Self {
        Self {
            graph,
            artifacts,
            modifiers,
            directory,
        }
    }

    /// Walk the topological order and sample every table.
    ///
    /// A table without a usable modifier is skipped non-fatally: it leaves
    /// no artifact and no keys, so its descendants see an empty parent
    /// sample and keep only null references. Any extraction or write
    /// failure aborts the run.
    pub async fn execute(&self, transport: &dyn DataTransport) -> Result<Manifest> {
        let mut keys = KeyStore::from_schema(&self.artifacts.key_schema);
        let mut manifest = Manifest::default();

        for name in &self.artifacts.topo_order {
            let Some(table) = self.graph.table(name) else {
                continue;
            };
            let Some(modifier) = self.modifiers.get(name) else {
                warn!(table = %name, "no usable query modifier; skipping table");
                manifest.skipped.push(name.clone());
                continue;
            };

            let sampler = TableSampler::new(table, modifier, self.artifacts);
            let outcome = sampler.sample(transport, &mut keys, &self.directory).await?;

            info!(table = %name, rows = outcome.rows, "sampled");
            manifest.entries.push(ManifestEntry {
                table: name.clone(),
                path: outcome.path,
                rows: outcome.rows,
            });
        }

        Ok(manifest)
    }
}
