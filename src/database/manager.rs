// Database Manager for the voice memo store
// Owns the SQLite connection; repositories borrow it through `with_connection`

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::config::StoreConfig;
use super::migrations;
use super::schema::inspect_schema;

/// Database manager that owns the SQLite connection.
///
/// Opening a manager runs the migrations, so every repository call issued
/// through it sees the current schema.
pub struct DatabaseManager {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DatabaseManager {
    /// Create a new DatabaseManager with the database at the specified path
    pub fn new(db_path: PathBuf) -> Result<Self> {
        Self::open(&StoreConfig::new(db_path))
    }

    /// Open the store described by `config` and migrate it
    pub fn open(config: &StoreConfig) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create database directory")?;
        }

        let conn = Connection::open(&config.db_path)
            .context("Failed to open database")?;

        config.apply(&conn)?;

        migrations::run_migrations(&conn)
            .context("Failed to run database migrations")?;

        match inspect_schema(&conn) {
            Ok(report) => {
                if !report.is_current() {
                    log::warn!("Schema check failed, missing columns: {:?}", report.missing_columns);
                }
                match serde_json::to_string(&report) {
                    Ok(json) => log::debug!("Schema report: {}", json),
                    Err(e) => log::debug!("Failed to serialize schema report: {}", e),
                }
            }
            Err(e) => log::warn!("Failed to inspect schema: {:#}", e),
        }

        log::info!("Database initialized at: {:?}", config.db_path);

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: config.db_path.clone(),
        })
    }

    /// Execute a function with access to the database connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock database connection: {}", e))?;
        f(&conn)
    }

    /// Get the database path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Close the connection, surfacing any error SQLite reports on close
    pub fn close(self) -> Result<()> {
        let conn = self.conn.into_inner()
            .map_err(|e| anyhow::anyhow!("Database connection mutex poisoned: {}", e))?;
        conn.close()
            .map_err(|(_, e)| e)
            .context("Failed to close database")?;
        log::info!("Database closed: {:?}", self.db_path);
        Ok(())
    }
}
