use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use vignette_core::{
    Error as CoreError, GraphArtifacts, RelationGraph, Settings, redact_url, resolve_modifiers,
    validate_snapshot,
};
use vignette_introspect::{CatalogOptions, postgres};
use vignette_sample::{
    PgTransport, ReplicateOptions, SampleError, SampleRun, DataTransport, replicate_schema,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("sampling error: {0}")]
    Sample(#[from] SampleError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "vignette", version, about = "Referentially-consistent database sampling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replicate the schema, sample the source, and load the target.
    Sample(SampleArgs),
    /// Print a template configuration document.
    EmptyConfig,
    /// Write the relation graph as DOT, for inspection with graphviz.
    Graph(GraphArgs),
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// Path to the configuration document.
    config: PathBuf,
    /// Skip the schema replication step.
    #[arg(long, default_value_t = false)]
    skip_schema: bool,
    /// Skip loading artifacts into the target database.
    #[arg(long, default_value_t = false)]
    skip_load: bool,
    /// Continue when schema replication exits non-zero.
    #[arg(long, default_value_t = false)]
    allow_replication_failure: bool,
}

#[derive(Args, Debug)]
struct GraphArgs {
    /// Path to the configuration document.
    config: PathBuf,
    /// Output path for the DOT file.
    #[arg(long, default_value = "graph.dot")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Sample(args) => run_sample(args).await,
        Command::EmptyConfig => {
            println!("{}", Settings::template().to_json_pretty()?);
            Ok(())
        }
        Command::Graph(args) => run_graph(args).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn connect(url: &str) -> Result<PgPool, CliError> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url)
        .await
        .map_err(CliError::Database)
}

/// Snapshot the source and precompute the graph artifacts, once per run.
async fn prepare(
    settings: &Settings,
    pool: &PgPool,
) -> Result<(RelationGraph, GraphArtifacts), CliError> {
    tracing::info!(event = "snapshot_started");
    let snapshot = postgres::snapshot(pool, &CatalogOptions::default()).await?;
    validate_snapshot(&snapshot)?;
    tracing::info!(event = "snapshot_finished", tables = snapshot.tables.len());

    let (extend, ignore) = settings.resolved_relations(&snapshot);
    let graph = RelationGraph::build(&snapshot, &extend, &ignore, &settings.ignore_tables)?;
    let artifacts = graph.artifacts();
    tracing::info!(
        event = "graph_built",
        tables = artifacts.topo_order.len(),
        entrypoints = artifacts.entrypoints.len()
    );

    Ok((graph, artifacts))
}

fn resolve_output_directory(settings: &Settings, run_id: &str) -> Result<PathBuf, CliError> {
    match &settings.output_directory {
        Some(directory) => {
            fs::create_dir(directory).map_err(|err| {
                CliError::InvalidConfig(format!(
                    "can't create output directory {}: {err}; make sure there's nothing there",
                    directory.display()
                ))
            })?;
            Ok(directory.clone())
        }
        None => {
            let directory = std::env::temp_dir().join(format!("sample-{run_id}"));
            fs::create_dir_all(&directory)?;
            tracing::info!(
                event = "output_directory_defaulted",
                path = %directory.display()
            );
            Ok(directory)
        }
    }
}

async fn run_sample(args: SampleArgs) -> Result<(), CliError> {
    init_logging();
    let settings = Settings::load(&args.config)?;

    let run_id = Uuid::new_v4().to_string();
    let timer = Instant::now();
    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        source = %redact_url(&settings.source_database_url),
        target = %redact_url(&settings.target_database_url)
    );

    let source = connect(&settings.source_database_url).await?;
    let (graph, artifacts) = prepare(&settings, &source).await?;
    let modifiers = resolve_modifiers(&settings, &graph);
    let directory = resolve_output_directory(&settings, &run_id)?;

    if args.skip_schema {
        tracing::info!(event = "schema_replication_skipped");
    } else {
        let opts = ReplicateOptions {
            allow_failure: args.allow_replication_failure,
        };
        replicate_schema(
            &settings.source_database_url,
            &settings.target_database_url,
            &opts,
        )
        .await?;
        tracing::info!(event = "schema_replicated");
    }

    let transport = PgTransport::new(source);
    let run = SampleRun::new(&graph, &artifacts, &modifiers, directory.clone());
    let manifest = run.execute(&transport).await?;

    let manifest_path = directory.join("manifest.json");
    fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;
    tracing::info!(event = "manifest_written", path = %manifest_path.display());

    if args.skip_load {
        tracing::info!(event = "load_skipped");
    } else {
        let target = PgTransport::new(connect(&settings.target_database_url).await?);
        for entry in &manifest.entries {
            let loaded = target.bulk_load(&entry.table, &entry.path).await?;
            tracing::info!(event = "table_loaded", table = %entry.table, rows = loaded);
        }
    }

    tracing::info!(
        event = "run_finished",
        status = "success",
        tables = manifest.entries.len(),
        skipped = manifest.skipped.len(),
        duration_ms = timer.elapsed().as_millis() as u64
    );
    Ok(())
}

async fn run_graph(args: GraphArgs) -> Result<(), CliError> {
    init_logging();
    let settings = Settings::load(&args.config)?;

    let source = connect(&settings.source_database_url).await?;
    let (graph, _artifacts) = prepare(&settings, &source).await?;

    fs::write(&args.out, graph.to_dot())?;
    tracing::info!(event = "graph_written", path = %args.out.display());
    Ok(())
}
