use std::io::Write;

use qrand_core::{CircuitState, FailoverSuccess};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct NumbersDocument<'a> {
    numbers: &'a [i64],
    source: &'a str,
    sources_tried: &'a [String],
}

/// One catalog entry as shown by `--list-sources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRow {
    pub name: String,
    pub status: SourceStatus,
    pub circuit_state: CircuitState,
    pub consecutive_failures: u32,
    pub endpoint_template: String,
    pub data_field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Active,
    Disabled,
    Quarantined,
}

impl SourceStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Quarantined => "quarantined",
        }
    }
}

#[derive(Debug, Serialize)]
struct CatalogDocument<'a> {
    catalog_version: u32,
    sources: &'a [SourceRow],
}

pub fn render_numbers(success: &FailoverSuccess, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok(success
            .numbers
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ")),
        OutputFormat::Json => Ok(serde_json::to_string(&NumbersDocument {
            numbers: &success.numbers,
            source: &success.source_name,
            sources_tried: &success.sources_tried,
        })?),
    }
}

pub fn render_sources(
    catalog_version: u32,
    rows: &[SourceRow],
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => {
            let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(0);
            Ok(rows
                .iter()
                .map(|row| {
                    format!(
                        "{:<width$}  {:<11}  {}",
                        row.name,
                        row.status.as_str(),
                        row.endpoint_template
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&CatalogDocument {
            catalog_version,
            sources: rows,
        })?),
    }
}

pub fn write_stdout(rendered: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    stdout.flush()?;
    Ok(())
}
