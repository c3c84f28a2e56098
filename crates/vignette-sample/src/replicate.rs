use tokio::process::Command;
use tracing::{debug, warn};

use vignette_core::redact_url;

use crate::errors::{Result, SampleError};

/// Options for the external schema replication step.
#[derive(Debug, Clone, Default)]
pub struct ReplicateOptions {
    /// Continue on a non-zero pipeline exit instead of failing the run.
    pub allow_failure: bool,
}

/// Clone DDL only (no data) from source to target.
///
/// Shells out to `pg_dump | pg_restore`; the orchestrated run awaits this
/// as an opaque step before sampling begins. A non-zero exit is fatal
/// unless `allow_failure` is set.
pub async fn replicate_schema(
    source_url: &str,
    target_url: &str,
    opts: &ReplicateOptions,
) -> Result<()> {
    let pipeline = format!(
        "pg_dump --format=custom --no-owner --schema-only {} \
         | pg_restore --format=custom --no-owner --schema-only --no-acl -d {}",
        shell_quote(source_url),
        shell_quote(target_url)
    );

    debug!(
        source = %redact_url(source_url),
        target = %redact_url(target_url),
        "replicating schema"
    );

    let output = Command::new("sh").arg("-c").arg(&pipeline).output().await?;

    for line in String::from_utf8_lossy(&output.stdout)
        .lines()
        .chain(String::from_utf8_lossy(&output.stderr).lines())
    {
        debug!(target: "vignette::replicate", "{line}");
    }

    let status = output.status.code().unwrap_or(-1);
    if status != 0 {
        if opts.allow_failure {
            warn!(status, "schema replication exited non-zero; continuing");
        } else {
            return Err(SampleError::Replication { status });
        }
    }
    Ok(())
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
