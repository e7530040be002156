//! Persistence core of a local voice memo recorder.
//!
//! Lifecycle: [`open_store`] (or [`DatabaseManager::open`]) opens the SQLite
//! file and migrates it to [`SCHEMA_VERSION`]; the returned handle then
//! serves the recording repository calls until it is closed.

pub mod audio;
pub mod database;
pub mod date_key;

pub use database::{
    DatabaseManager, GeoPoint, RecordingDetail, RecordingDraft, RecordingEdit, RecordingListItem,
    StoreConfig, SCHEMA_VERSION,
};

use anyhow::Result;

/// Initialize env_logger to output to stderr (reads RUST_LOG env var).
/// Calling it more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Open and migrate the store at its default platform location
pub fn open_store() -> Result<DatabaseManager> {
    let config = StoreConfig::default_location()?;
    DatabaseManager::open(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_lifecycle() {
        init_logging();
        init_logging();

        let dir = tempdir().unwrap();
        let db = DatabaseManager::open(&StoreConfig::new(dir.path().join("memos.sqlite"))).unwrap();

        let draft = RecordingDraft::new("2024-06-01T09:15:00Z", "memo.wav", 30000, vec![0.5; 8]).unwrap();
        let id = db.insert_recording(&draft).unwrap();
        assert_eq!(db.list_recordings().unwrap().len(), 1);
        assert!(db.delete_recording(id).unwrap());

        db.close().unwrap();
    }
}
