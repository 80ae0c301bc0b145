use std::process::ExitCode;

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::{self, SourceRow, SourceStatus};

pub fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let catalog = super::catalog(cli)?;
    let audit = super::open_audit(cli)?;
    let health = super::source_health(cli, audit.as_ref());

    let rows = catalog
        .sources()
        .iter()
        .map(|source| {
            let status = if !source.enabled() {
                SourceStatus::Disabled
            } else if health.is_quarantined(source.name()) {
                SourceStatus::Quarantined
            } else {
                SourceStatus::Active
            };
            let failures = health
                .snapshot()
                .into_iter()
                .find(|snapshot| snapshot.source == source.name())
                .map_or(0, |snapshot| snapshot.consecutive_failures);

            SourceRow {
                name: source.name().to_owned(),
                status,
                circuit_state: health.state(source.name()),
                consecutive_failures: failures,
                endpoint_template: source.endpoint_template().to_owned(),
                data_field: source.data_field().to_owned(),
            }
        })
        .collect::<Vec<_>>();

    output::write_stdout(&output::render_sources(
        catalog.version(),
        &rows,
        cli.format,
    )?)?;
    Ok(ExitCode::SUCCESS)
}
