// Schema inspection
// Reads back tables, columns and the schema version to verify what migrations produced

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::migrations::{get_schema_version, SCHEMA_VERSION};
use super::DatabaseManager;

/// Columns the repository reads and writes
pub const EXPECTED_COLUMNS: &[&str] = &[
    "id",
    "date_key",
    "created_at",
    "audio_uri",
    "duration_ms",
    "lat",
    "lng",
    "accuracy",
    "memo",
    "waveform_blob",
    "waveform_length",
    "recording_title",
];

/// One row of `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    pub column_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub tables: Vec<String>,
    pub user_version: u32,
    pub columns: Vec<ColumnInfo>,
    pub missing_columns: Vec<String>,
}

impl SchemaReport {
    /// Latest version with every expected column present
    pub fn is_current(&self) -> bool {
        self.user_version == SCHEMA_VERSION && self.missing_columns.is_empty()
    }
}

impl DatabaseManager {
    /// Inspect the live schema
    pub fn schema_report(&self) -> Result<SchemaReport> {
        self.with_connection(inspect_schema)
    }
}

/// Collect user tables, schema version and the recordings columns
pub fn inspect_schema(conn: &Connection) -> Result<SchemaReport> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
    ).context("Failed to prepare table listing")?;
    let tables = stmt.query_map([], |row| row.get(0))
        .context("Failed to list tables")?
        .collect::<std::result::Result<Vec<String>, _>>()
        .context("Failed to collect table names")?;

    let user_version = get_schema_version(conn)?;
    let columns = table_columns(conn, "recordings")?;

    let missing_columns = EXPECTED_COLUMNS
        .iter()
        .filter(|expected| !columns.iter().any(|c| c.name == **expected))
        .map(|name| name.to_string())
        .collect();

    Ok(SchemaReport {
        tables,
        user_version,
        columns,
        missing_columns,
    })
}

/// Column info for `table`; empty if the table does not exist
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(
        "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?)"
    ).context("Failed to prepare table_info query")?;

    let columns = stmt.query_map([table], |row| {
        Ok(ColumnInfo {
            cid: row.get(0)?,
            name: row.get(1)?,
            column_type: row.get(2)?,
            not_null: row.get(3)?,
            default_value: row.get(4)?,
            primary_key: row.get::<_, i64>(5)? > 0,
        })
    }).with_context(|| format!("Failed to query columns of {}", table))?;

    columns.collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to collect columns of {}", table))
}
