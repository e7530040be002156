// Database module for the voice memo store
// SQLite persistence for recordings, schema migrations and schema diagnostics

pub mod config;
pub mod manager;
pub mod migrations;
pub mod models;
pub mod recordings_repo;
pub mod schema;

pub use config::{JournalMode, StoreConfig};
pub use manager::DatabaseManager;
pub use migrations::{run_migrations, Migration, Migrator, SCHEMA_VERSION};
pub use models::*;
pub use schema::{inspect_schema, ColumnInfo, SchemaReport};
