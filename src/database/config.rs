// Store configuration
// Where the database lives and which connection pragmas are applied on open

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Directory created under the platform data dir
const APP_DIR_NAME: &str = "voice-memo";

/// Database file name
pub const DB_FILE_NAME: &str = "app_db.sqlite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Wal,
    Delete,
}

impl JournalMode {
    fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
    #[serde(with = "duration_millis")]
    pub busy_timeout: Duration,
}

impl StoreConfig {
    /// Defaults for a database at `db_path`
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            journal_mode: JournalMode::Wal,
            foreign_keys: true,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Database inside the platform data directory
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir().context("Failed to resolve platform data directory")?;
        Ok(Self::new(data_dir.join(APP_DIR_NAME).join(DB_FILE_NAME)))
    }

    /// Apply the connection-level pragmas
    pub(crate) fn apply(&self, conn: &Connection) -> Result<()> {
        conn.busy_timeout(self.busy_timeout)
            .context("Failed to set busy timeout")?;

        // journal_mode returns the resulting mode as a row
        let mode: String = conn
            .query_row(
                &format!("PRAGMA journal_mode = {}", self.journal_mode.as_pragma()),
                [],
                |row| row.get(0),
            )
            .context("Failed to set journal mode")?;
        log::debug!("SQLite journal mode: {}", mode);

        conn.execute_batch(if self.foreign_keys {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        })
        .context("Failed to configure foreign keys")?;

        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
