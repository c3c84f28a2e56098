use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::graph::{Relation, RelationGraph};
use crate::schema::{ColumnRef, SchemaSnapshot};

/// Fallback row cap when the configuration carries no usable default.
pub const DEFAULT_LIMIT: u64 = 30;

/// Key reserved in `QUERY_MODIFIERS` for run-wide defaults.
pub const DEFAULT_MODIFIER_KEY: &str = "_default";

/// Recognized configuration document for a sampling run.
///
/// Field names mirror the on-disk JSON keys exactly. The document is
/// validated eagerly at load time, before any database connection is
/// opened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "SOURCE_DATABASE_URL")]
    pub source_database_url: String,
    #[serde(rename = "TARGET_DATABASE_URL")]
    pub target_database_url: String,
    #[serde(rename = "QUERY_MODIFIERS", default)]
    pub query_modifiers: BTreeMap<String, QueryModifier>,
    #[serde(rename = "IGNORE_TABLES", default)]
    pub ignore_tables: Vec<String>,
    #[serde(rename = "EXTEND_RELATIONS", default)]
    pub extend_relations: Vec<RelationSpec>,
    #[serde(rename = "IGNORE_RELATIONS", default)]
    pub ignore_relations: Vec<RelationSpec>,
    #[serde(
        rename = "OUTPUT_DIRECTORY",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_directory: Option<PathBuf>,
}

/// Per-table extraction override: raw predicates and/or a row cap.
///
/// An entry carrying neither is malformed; the table is skipped with a
/// warning at resolution time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryModifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// A configured relation endpoint pair, as written in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSpec {
    /// Referenced column, `table.column`.
    pub pk: String,
    /// Referencing column, `table.column`.
    pub fk: String,
}

impl RelationSpec {
    /// Resolve against a snapshot; both endpoints must exist.
    pub fn resolve(&self, snapshot: &SchemaSnapshot) -> Result<Relation> {
        let pk: ColumnRef = self.pk.parse()?;
        let fk: ColumnRef = self.fk.parse()?;

        for reference in [&pk, &fk] {
            if snapshot.column(reference).is_none() {
                return Err(Error::UnknownColumn(reference.to_string()));
            }
        }

        Ok(Relation::new(pk, fk))
    }
}

impl Settings {
    /// Load and eagerly validate a configuration document.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            Error::InvalidConfig(format!("can't read {}: {err}", path.display()))
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|err| {
            Error::InvalidConfig(format!("can't parse {}: {err}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Structural validation, run before any connection is opened.
    ///
    /// Whether configured relations resolve against the actual schema is
    /// checked later, non-fatally, once a snapshot exists.
    pub fn validate(&self) -> Result<()> {
        if self.source_database_url.is_empty() {
            return Err(Error::InvalidConfig(
                "SOURCE_DATABASE_URL must not be empty".to_string(),
            ));
        }
        if self.target_database_url.is_empty() {
            return Err(Error::InvalidConfig(
                "TARGET_DATABASE_URL must not be empty".to_string(),
            ));
        }

        for spec in self.extend_relations.iter().chain(&self.ignore_relations) {
            spec.pk.parse::<ColumnRef>()?;
            spec.fk.parse::<ColumnRef>()?;
        }

        Ok(())
    }

    /// Template document for `empty-config`, with every recognized key.
    pub fn template() -> Self {
        let mut query_modifiers = BTreeMap::new();
        query_modifiers.insert(
            DEFAULT_MODIFIER_KEY.to_string(),
            QueryModifier {
                conditions: Some(Vec::new()),
                limit: Some(300),
            },
        );
        query_modifiers.insert(
            "users".to_string(),
            QueryModifier {
                conditions: Some(vec!["email ilike '%@example.com'".to_string()]),
                limit: None,
            },
        );

        Self {
            source_database_url: String::new(),
            target_database_url: String::new(),
            query_modifiers,
            ignore_tables: vec!["example1".to_string(), "migrations".to_string()],
            extend_relations: vec![RelationSpec {
                pk: "product.id".to_string(),
                fk: "product_ownership.product_id".to_string(),
            }],
            ignore_relations: vec![RelationSpec {
                pk: "product.id".to_string(),
                fk: "client.favorite_product_id".to_string(),
            }],
            output_directory: None,
        }
    }

    /// Pretty-printed JSON rendering of the document.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| Error::InvalidConfig(err.to_string()))
    }

    /// Resolve configured relation specs against the snapshot.
    ///
    /// Specs referencing a nonexistent table or column are dropped with a
    /// warning; the run continues without them.
    pub fn resolved_relations(
        &self,
        snapshot: &SchemaSnapshot,
    ) -> (Vec<Relation>, Vec<Relation>) {
        (
            resolve_specs(&self.extend_relations, snapshot),
            resolve_specs(&self.ignore_relations, snapshot),
        )
    }
}

fn resolve_specs(specs: &[RelationSpec], snapshot: &SchemaSnapshot) -> Vec<Relation> {
    let mut relations = Vec::new();
    for spec in specs {
        match spec.resolve(snapshot) {
            Ok(relation) => relations.push(relation),
            Err(err) => {
                warn!(pk = %spec.pk, fk = %spec.fk, %err, "can't match relation; skipping");
            }
        }
    }
    relations
}

/// Per-table extraction settings after defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModifier {
    pub conditions: Vec<String>,
    pub limit: u64,
}

/// Resolve query modifiers for every table in the graph.
///
/// A table with its own entry uses it, filling the missing side from the
/// `_default` entry; an entry with neither limit nor conditions and no
/// defaults to fall back on is malformed and the table is skipped (absent
/// from the result). Tables without an entry use the defaults. Entrypoints without an explicit
/// entry are worth a warning: they define what the sample looks like.
pub fn resolve_modifiers(
    settings: &Settings,
    graph: &RelationGraph,
) -> BTreeMap<String, ResolvedModifier> {
    let defaults = settings.query_modifiers.get(DEFAULT_MODIFIER_KEY);
    let default_limit = defaults.and_then(|entry| entry.limit).unwrap_or(DEFAULT_LIMIT);
    let default_conditions = defaults
        .and_then(|entry| entry.conditions.clone())
        .unwrap_or_default();

    for entrypoint in graph.entrypoints() {
        if !settings.query_modifiers.contains_key(&entrypoint) {
            warn!(
                table = %entrypoint,
                "entrypoint has no query modifier; defaults decide what the sample looks like"
            );
        }
    }

    let mut resolved = BTreeMap::new();
    for table in graph.tables() {
        let modifier = match settings.query_modifiers.get(&table.name) {
            None => ResolvedModifier {
                conditions: default_conditions.clone(),
                limit: default_limit,
            },
            Some(entry) => {
                if entry.limit.is_none() && entry.conditions.is_none() && defaults.is_none() {
                    warn!(table = %table.name, "query modifier is malformed; skipping table");
                    continue;
                }
                ResolvedModifier {
                    conditions: entry
                        .conditions
                        .clone()
                        .unwrap_or_else(|| default_conditions.clone()),
                    limit: entry.limit.unwrap_or(default_limit),
                }
            }
        };
        resolved.insert(table.name.clone(), modifier);
    }

    resolved
}
