mod fetch;
mod sources;

use std::process::ExitCode;

use qrand_audit::{AuditLog, AuditLogConfig};
use qrand_core::{SourceCatalog, SourceHealth};
use tracing::{debug, warn};

use crate::cli::Cli;
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    if cli.list_sources {
        return sources::run(cli);
    }
    fetch::run(cli).await
}

/// Built-in catalog narrowed by `--only` / `--skip`.
fn catalog(cli: &Cli) -> Result<SourceCatalog, CliError> {
    let catalog = SourceCatalog::builtin();
    if !cli.only.is_empty() {
        return Ok(catalog.only(&cli.only)?);
    }
    if !cli.skip.is_empty() {
        return Ok(catalog.without(&cli.skip)?);
    }
    Ok(catalog)
}

fn open_audit(cli: &Cli) -> Result<Option<AuditLog>, CliError> {
    if cli.no_audit {
        return Ok(None);
    }

    let mut config = AuditLogConfig::default();
    if let Some(db) = &cli.db {
        config = config.with_db_path(db);
    }
    Ok(Some(AuditLog::open(config)?))
}

/// Health ledger seeded from the failure history in the audit store.
fn source_health(cli: &Cli, audit: Option<&AuditLog>) -> SourceHealth {
    let health = SourceHealth::default();
    if cli.no_quarantine {
        return health;
    }
    let Some(audit) = audit else {
        return health;
    };

    match audit.failure_streaks(health.config().open_timeout) {
        Ok(streaks) => {
            for streak in streaks {
                debug!(
                    source = %streak.source,
                    streak = streak.streak,
                    since_secs = streak.since_last_failure.as_secs(),
                    "seeding failure streak"
                );
                health.seed_failures(&streak.source, streak.streak, streak.since_last_failure);
            }
        }
        Err(error) => {
            warn!(%error, "could not read failure history, no source is quarantined");
        }
    }
    health
}
