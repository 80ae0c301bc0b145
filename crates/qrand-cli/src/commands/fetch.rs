use std::process::ExitCode;
use std::sync::Arc;

use qrand_audit::AuditLog;
use qrand_core::{
    AuditSink, FailoverController, FailoverSuccess, FetchConfig, HttpClient, NoopAuditSink,
    ReqwestHttpClient, RequestedCount, Sleeper, SourceFetcher, TokioSleeper,
};
use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::CliError;
use crate::output;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let count = RequestedCount::parse(cli.count.as_deref().unwrap_or_default())?;
    let config = cli.fetch_config().validate()?;

    let client = Arc::new(ReqwestHttpClient::new(config.timeouts));
    let success = execute(cli, count, config, client, Arc::new(TokioSleeper)).await?;

    output::write_stdout(&output::render_numbers(&success, cli.format)?)?;
    Ok(ExitCode::SUCCESS)
}

async fn execute(
    cli: &Cli,
    count: RequestedCount,
    config: FetchConfig,
    client: Arc<dyn HttpClient>,
    sleeper: Arc<dyn Sleeper>,
) -> Result<FailoverSuccess, CliError> {
    let catalog = super::catalog(cli)?;
    let audit = super::open_audit(cli)?;
    let health = Arc::new(super::source_health(cli, audit.as_ref()));
    let sink: Arc<dyn AuditSink> = match &audit {
        Some(log) => Arc::new(log.clone()),
        None => Arc::new(NoopAuditSink),
    };

    let fetcher = SourceFetcher::new(client, config.retry, config.timeouts).with_sleeper(sleeper);
    let controller = FailoverController::new(fetcher, health, sink);

    info!(
        %count,
        catalog_version = catalog.version(),
        max_attempts = config.retry.max_attempts,
        "requesting random numbers"
    );
    let outcome = controller.obtain(count, &catalog).await;

    if let Some(log) = &audit {
        summarize(log);
    }
    Ok(outcome?)
}

fn summarize(log: &AuditLog) {
    match log.record_count() {
        Ok(rows) => info!(rows, db_path = %log.db_path().display(), "audit log total"),
        Err(error) => warn!(%error, "could not count audit records"),
    }
}
