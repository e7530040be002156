// Database migrations for the voice memo store
// Brings any previously shipped schema revision forward to the current one

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: u32 = 5;

/// Creates the current schema in one go on a brand-new store.
/// Must stay equivalent to applying every step in `MIGRATIONS` in order.
pub const BASELINE_SCHEMA_SQL: &str = r#"
    CREATE TABLE recordings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date_key TEXT NOT NULL,
        created_at TEXT NOT NULL,
        audio_uri TEXT NOT NULL,
        duration_ms INTEGER,
        lat REAL,
        lng REAL,
        accuracy REAL,
        memo TEXT,
        waveform_blob BLOB,
        waveform_length INTEGER,
        recording_title TEXT
    );
"#;

/// One forward schema step, tagged with the version it produces
#[derive(Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub apply: fn(&Connection) -> Result<()>,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("description", &self.description)
            .finish()
    }
}

/// Every shipped step, ascending by version
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Recordings table",
        apply: migrate_v1,
    },
    Migration {
        version: 2,
        description: "Duration, location and memo",
        apply: migrate_v2,
    },
    Migration {
        version: 3,
        description: "Waveform blob",
        apply: migrate_v3,
    },
    Migration {
        version: 4,
        description: "Recording title",
        apply: migrate_v4,
    },
    Migration {
        version: 5,
        description: "Drop waveform sample interval",
        apply: migrate_v5,
    },
];

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    Migrator::new(MIGRATIONS).run(conn)
}

/// Read `PRAGMA user_version`; a fresh store reports 0
pub fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to read schema version")?;
    u32::try_from(version).with_context(|| format!("Invalid schema version: {}", version))
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
    conn.pragma_update(None, "user_version", version)
        .with_context(|| format!("Failed to stamp schema version {}", version))
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?",
        [name],
        |row| row.get(0),
    )
    .with_context(|| format!("Failed to check for table {}", name))
}

/// Applies an ordered step list, or the baseline script on an empty store
pub struct Migrator<'a> {
    steps: &'a [Migration],
    baseline_sql: &'a str,
}

impl<'a> Migrator<'a> {
    pub fn new(steps: &'a [Migration]) -> Self {
        Self {
            steps,
            baseline_sql: BASELINE_SCHEMA_SQL,
        }
    }

    /// Version the last step produces
    pub fn latest_version(&self) -> u32 {
        self.steps.last().map(|step| step.version).unwrap_or(0)
    }

    /// Bring the store to `latest_version()`. Safe to call on every start.
    pub fn run(&self, conn: &Connection) -> Result<()> {
        self.check_step_order()?;

        let current_version = get_schema_version(conn)?;
        let latest_version = self.latest_version();

        if current_version > latest_version {
            bail!(
                "Database schema version {} is newer than supported version {}",
                current_version,
                latest_version
            );
        }

        if current_version == latest_version {
            log::debug!("Database schema is current (v{})", current_version);
            return Ok(());
        }

        if current_version == 0 {
            if table_exists(conn, "recordings")? {
                // Stores written before versioning existed carry the v1 table unstamped
                log::warn!("Unversioned recordings table found, replaying migrations from v0");
                self.replay_steps(conn, 0)?;
            } else {
                self.apply_baseline(conn)?;
            }
            return Ok(());
        }

        self.replay_steps(conn, current_version)?;
        Ok(())
    }

    /// Apply every step above `from_version` in order, each in its own transaction.
    /// Stops at the first failure; returns the version reached.
    pub fn replay_steps(&self, conn: &Connection, from_version: u32) -> Result<u32> {
        self.check_step_order()?;

        let mut version = from_version;
        for step in self.steps.iter().filter(|step| step.version > from_version) {
            log::info!("Running database migration v{} - {}", step.version, step.description);

            let tx = conn.unchecked_transaction()
                .with_context(|| format!("Failed to start transaction for migration v{}", step.version))?;
            (step.apply)(&tx)
                .with_context(|| format!("Failed to run migration v{}", step.version))?;
            set_schema_version(&tx, step.version)?;
            tx.commit()
                .with_context(|| format!("Failed to commit migration v{}", step.version))?;

            version = step.version;
            log::info!("Migration v{} completed successfully", step.version);
        }

        Ok(version)
    }

    fn apply_baseline(&self, conn: &Connection) -> Result<()> {
        let latest_version = self.latest_version();
        log::info!("Creating database schema v{} from baseline", latest_version);

        let tx = conn.unchecked_transaction()
            .context("Failed to start transaction for baseline schema")?;
        tx.execute_batch(self.baseline_sql)
            .context("Failed to create baseline schema")?;
        set_schema_version(&tx, latest_version)?;
        tx.commit().context("Failed to commit baseline schema")?;

        log::info!("Baseline schema v{} created successfully", latest_version);
        Ok(())
    }

    fn check_step_order(&self) -> Result<()> {
        if let Some(pair) = self.steps.windows(2).find(|pair| pair[0].version >= pair[1].version) {
            bail!(
                "Migration steps out of order: v{} listed before v{}",
                pair[0].version,
                pair[1].version
            );
        }
        Ok(())
    }
}

/// Initial recordings table (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(r#"
        CREATE TABLE IF NOT EXISTS recordings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date_key TEXT NOT NULL,
            created_at TEXT NOT NULL,
            audio_uri TEXT NOT NULL
        );
    "#)?;
    Ok(())
}

/// Recording metadata (version 2)
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(r#"
        ALTER TABLE recordings ADD COLUMN duration_ms INTEGER;
        ALTER TABLE recordings ADD COLUMN lat REAL;
        ALTER TABLE recordings ADD COLUMN lng REAL;
        ALTER TABLE recordings ADD COLUMN accuracy REAL;
        ALTER TABLE recordings ADD COLUMN memo TEXT;
    "#)?;
    Ok(())
}

/// Waveform storage (version 3)
fn migrate_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(r#"
        ALTER TABLE recordings ADD COLUMN waveform_blob BLOB;
        ALTER TABLE recordings ADD COLUMN waveform_length INTEGER;
        ALTER TABLE recordings ADD COLUMN waveform_sample_interval_ms INTEGER;
    "#)?;
    Ok(())
}

/// Recording title (version 4)
fn migrate_v4(conn: &Connection) -> Result<()> {
    conn.execute_batch(r#"
        ALTER TABLE recordings ADD COLUMN recording_title TEXT DEFAULT 'Untitled';
    "#)?;
    Ok(())
}

/// Rebuild recordings without waveform_sample_interval_ms (version 5)
fn migrate_v5(conn: &Connection) -> Result<()> {
    conn.execute_batch(r#"
        ALTER TABLE recordings RENAME TO recordings_old;

        CREATE TABLE recordings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date_key TEXT NOT NULL,
            created_at TEXT NOT NULL,
            audio_uri TEXT NOT NULL,
            duration_ms INTEGER,
            lat REAL,
            lng REAL,
            accuracy REAL,
            memo TEXT,
            waveform_blob BLOB,
            waveform_length INTEGER,
            recording_title TEXT
        );

        INSERT INTO recordings (
            id, date_key, created_at, audio_uri, duration_ms, lat, lng, accuracy,
            memo, waveform_blob, waveform_length, recording_title
        )
        SELECT
            id, date_key, created_at, audio_uri, duration_ms, lat, lng, accuracy,
            memo, waveform_blob, waveform_length, recording_title
        FROM recordings_old;

        DROP TABLE recordings_old;
    "#)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::inspect_schema;
    use rusqlite::params;
    use tempfile::tempdir;

    fn open_test_conn(dir: &tempfile::TempDir) -> Connection {
        Connection::open(dir.path().join("test.db")).unwrap()
    }

    /// Bring a store to `version` by replaying only the first steps
    fn prepare_at_version(conn: &Connection, version: u32) {
        let steps: Vec<Migration> = MIGRATIONS.iter().copied().filter(|m| m.version <= version).collect();
        Migrator::new(&steps).replay_steps(conn, 0).unwrap();
        assert_eq!(get_schema_version(conn).unwrap(), version);
    }

    fn failing_step(conn: &Connection) -> Result<()> {
        // Partially apply, then fail inside the same transaction
        conn.execute_batch("ALTER TABLE recordings ADD COLUMN waveform_blob BLOB;")?;
        bail!("injected fault")
    }

    fn column_names(conn: &Connection) -> Vec<String> {
        inspect_schema(conn).unwrap().columns.into_iter().map(|c| c.name).collect()
    }

    #[test]
    fn test_fresh_store_uses_baseline() {
        let dir = tempdir().unwrap();
        let conn = open_test_conn(&dir);

        run_migrations(&conn).unwrap();

        let report = inspect_schema(&conn).unwrap();
        assert_eq!(report.user_version, SCHEMA_VERSION);
        assert!(report.missing_columns.is_empty());
        assert!(report.is_current());
    }

    #[test]
    fn test_baseline_matches_replayed_steps() {
        let dir = tempdir().unwrap();

        let baseline = Connection::open(dir.path().join("baseline.db")).unwrap();
        run_migrations(&baseline).unwrap();

        let stepped = Connection::open(dir.path().join("stepped.db")).unwrap();
        stepped.execute_batch(r#"
            CREATE TABLE recordings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date_key TEXT NOT NULL,
                created_at TEXT NOT NULL,
                audio_uri TEXT NOT NULL
            );
        "#).unwrap();
        let reached = Migrator::new(MIGRATIONS).replay_steps(&stepped, 0).unwrap();
        assert_eq!(reached, SCHEMA_VERSION);

        let baseline_report = inspect_schema(&baseline).unwrap();
        let stepped_report = inspect_schema(&stepped).unwrap();
        assert_eq!(baseline_report.tables, stepped_report.tables);
        assert_eq!(baseline_report.columns, stepped_report.columns);
        assert_eq!(baseline_report.user_version, stepped_report.user_version);
    }

    #[test]
    fn test_run_twice_is_noop() {
        let dir = tempdir().unwrap();
        let conn = open_test_conn(&dir);

        run_migrations(&conn).unwrap();
        let first = inspect_schema(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let second = inspect_schema(&conn).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.user_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_upgrade_preserves_rows() {
        let dir = tempdir().unwrap();
        let conn = open_test_conn(&dir);
        prepare_at_version(&conn, 2);

        conn.execute(
            "INSERT INTO recordings (date_key, created_at, audio_uri, duration_ms, memo) VALUES (?1, ?2, ?3, ?4, ?5)",
            params!["2024-05-01", "2024-05-01T08:00:00Z", "file:///a.m4a", 1500, "old memo"],
        ).unwrap();

        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!column_names(&conn).contains(&"waveform_sample_interval_ms".to_string()));

        let (id, memo, title, duration): (i64, String, String, i64) = conn.query_row(
            "SELECT id, memo, recording_title, duration_ms FROM recordings",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        ).unwrap();
        assert_eq!(id, 1);
        assert_eq!(memo, "old memo");
        assert_eq!(title, "Untitled");
        assert_eq!(duration, 1500);
    }

    #[test]
    fn test_rebuild_keeps_existing_ids() {
        let dir = tempdir().unwrap();
        let conn = open_test_conn(&dir);
        prepare_at_version(&conn, 4);

        for _ in 0..3 {
            conn.execute(
                "INSERT INTO recordings (date_key, created_at, audio_uri) VALUES ('2024-05-01', '2024-05-01T08:00:00Z', 'a')",
                [],
            ).unwrap();
        }
        conn.execute("DELETE FROM recordings WHERE id = 3", []).unwrap();

        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO recordings (date_key, created_at, audio_uri) VALUES ('2024-05-02', '2024-05-02T08:00:00Z', 'b')",
            [],
        ).unwrap();
        assert!(conn.last_insert_rowid() >= 3);

        let ids: Vec<i64> = conn
            .prepare("SELECT id FROM recordings ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(&ids[..2], &[1, 2]);
    }

    #[test]
    fn test_failed_step_rolls_back_and_resumes() {
        let dir = tempdir().unwrap();
        let conn = open_test_conn(&dir);
        prepare_at_version(&conn, 1);

        let faulty = [
            MIGRATIONS[0],
            MIGRATIONS[1],
            Migration {
                version: 3,
                description: "Fails halfway",
                apply: failing_step,
            },
            MIGRATIONS[3],
        ];

        let err = Migrator::new(&faulty).run(&conn).unwrap_err();
        assert!(format!("{:#}", err).contains("injected fault"));

        // Step 2 committed, step 3 left nothing behind, step 4 never ran
        assert_eq!(get_schema_version(&conn).unwrap(), 2);
        let columns = column_names(&conn);
        assert!(columns.contains(&"memo".to_string()));
        assert!(!columns.contains(&"waveform_blob".to_string()));
        assert!(!columns.contains(&"recording_title".to_string()));

        run_migrations(&conn).unwrap();
        let report = inspect_schema(&conn).unwrap();
        assert_eq!(report.user_version, SCHEMA_VERSION);
        assert!(report.is_current());
    }

    #[test]
    fn test_failed_baseline_leaves_version_zero() {
        let dir = tempdir().unwrap();
        let conn = open_test_conn(&dir);

        let mut migrator = Migrator::new(MIGRATIONS);
        migrator.baseline_sql = "CREATE TABLE broken (id INTEGER); CREATE TABLE broken (id INTEGER);";

        assert!(migrator.run(&conn).is_err());
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
        assert!(!table_exists(&conn, "broken").unwrap());
    }

    #[test]
    fn test_unversioned_legacy_table_is_upgraded() {
        let dir = tempdir().unwrap();
        let conn = open_test_conn(&dir);
        conn.execute_batch(r#"
            CREATE TABLE recordings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date_key TEXT NOT NULL,
                created_at TEXT NOT NULL,
                audio_uri TEXT NOT NULL
            );
            INSERT INTO recordings (date_key, created_at, audio_uri)
            VALUES ('2023-12-31', '2023-12-31T23:59:00Z', 'legacy.wav');
        "#).unwrap();

        run_migrations(&conn).unwrap();

        assert!(inspect_schema(&conn).unwrap().is_current());
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM recordings", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_newer_store_is_rejected() {
        let dir = tempdir().unwrap();
        let conn = open_test_conn(&dir);
        run_migrations(&conn).unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();

        let err = run_migrations(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION + 1);
    }

    #[test]
    fn test_out_of_order_steps_are_rejected() {
        let dir = tempdir().unwrap();
        let conn = open_test_conn(&dir);
        let steps = [MIGRATIONS[1], MIGRATIONS[0]];

        assert!(Migrator::new(&steps).run(&conn).is_err());
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
    }
}
