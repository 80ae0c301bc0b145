use ::duckdb::Connection;

use crate::AuditLogError;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_runs",
        sql: r#"
CREATE TABLE IF NOT EXISTS runs (
    id BIGINT PRIMARY KEY,
    ts TEXT NOT NULL,
    api_name TEXT,
    count BIGINT,
    numbers TEXT,
    success BOOLEAN,
    error_msg TEXT,
    run_id TEXT
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_runs_api_name ON runs(api_name);
"#,
    },
];

/// Column families the audit log reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Text,
    Boolean,
}

impl ColumnKind {
    fn accepts(self, data_type: &str) -> bool {
        let data_type = data_type.to_ascii_uppercase();
        match self {
            Self::Integer => matches!(
                data_type.as_str(),
                "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "HUGEINT"
            ),
            Self::Text => data_type == "VARCHAR" || data_type.starts_with("VARCHAR("),
            Self::Boolean => data_type == "BOOLEAN",
        }
    }
}

const REQUIRED_COLUMNS: [(&str, ColumnKind); 7] = [
    ("id", ColumnKind::Integer),
    ("ts", ColumnKind::Text),
    ("api_name", ColumnKind::Text),
    ("count", ColumnKind::Integer),
    ("numbers", ColumnKind::Text),
    ("success", ColumnKind::Boolean),
    ("error_msg", ColumnKind::Text),
];

const OPTIONAL_COLUMNS: [(&str, ColumnKind); 1] = [("run_id", ColumnKind::Text)];

/// Shape of an existing `runs` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunsSchema {
    pub has_run_id: bool,
}

/// Check a pre-existing `runs` table before touching it.
///
/// Returns `None` when the table does not exist yet. Extra columns are
/// allowed; missing or mistyped required columns are not.
pub(crate) fn inspect_runs_table(
    connection: &Connection,
) -> Result<Option<RunsSchema>, AuditLogError> {
    let mut statement = connection.prepare(
        "SELECT column_name, data_type FROM information_schema.columns \
         WHERE table_schema = 'main' AND table_name = 'runs'",
    )?;
    let columns = statement
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Ok(None);
    }

    let find = |name: &str| {
        columns
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(name))
            .map(|(_, data_type)| data_type.as_str())
    };

    for (name, kind) in REQUIRED_COLUMNS {
        match find(name) {
            None => {
                return Err(AuditLogError::IncompatibleSchema(format!(
                    "runs table is missing column '{name}'"
                )))
            }
            Some(data_type) if !kind.accepts(data_type) => {
                return Err(AuditLogError::IncompatibleSchema(format!(
                    "runs.{name} has type {data_type}, expected {kind:?}"
                )))
            }
            Some(_) => {}
        }
    }

    let mut has_run_id = false;
    for (name, kind) in OPTIONAL_COLUMNS {
        if let Some(data_type) = find(name) {
            if !kind.accepts(data_type) {
                return Err(AuditLogError::IncompatibleSchema(format!(
                    "runs.{name} has type {data_type}, expected {kind:?}"
                )));
            }
            has_run_id = true;
        }
    }

    Ok(Some(RunsSchema { has_run_id }))
}

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let connection = Connection::open_in_memory().expect("in-memory db");

        apply_migrations(&connection).expect("first run");
        apply_migrations(&connection).expect("second run");

        let applied: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(applied, MIGRATIONS.len() as i64);
        assert_eq!(
            inspect_runs_table(&connection).expect("inspect"),
            Some(RunsSchema { has_run_id: true })
        );
    }

    #[test]
    fn absent_table_is_reported_as_none() {
        let connection = Connection::open_in_memory().expect("in-memory db");
        assert_eq!(inspect_runs_table(&connection).expect("inspect"), None);
    }

    #[test]
    fn legacy_table_without_run_id_is_accepted() {
        let connection = Connection::open_in_memory().expect("in-memory db");
        connection
            .execute_batch(
                "CREATE TABLE runs (id INTEGER, ts TEXT, api_name TEXT, count INTEGER, \
                 numbers TEXT, success BOOLEAN, error_msg TEXT, note TEXT)",
            )
            .expect("legacy table");

        assert_eq!(
            inspect_runs_table(&connection).expect("inspect"),
            Some(RunsSchema { has_run_id: false })
        );
    }

    #[test]
    fn mistyped_column_is_incompatible() {
        let connection = Connection::open_in_memory().expect("in-memory db");
        connection
            .execute_batch(
                "CREATE TABLE runs (id INTEGER, ts TEXT, api_name TEXT, count INTEGER, \
                 numbers TEXT, success TEXT, error_msg TEXT)",
            )
            .expect("bad table");

        let error = inspect_runs_table(&connection).expect_err("incompatible");
        assert!(matches!(error, AuditLogError::IncompatibleSchema(_)));
        assert!(error.to_string().contains("runs.success"));
    }
}
