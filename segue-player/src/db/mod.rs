//! Database access layer
//!
//! SQLite-backed settings store and media catalog.

pub mod catalog;
pub mod init;
pub mod settings;

pub use catalog::SqliteCatalog;
pub use init::{initialize_database, open_database};
pub use settings::{MemorySettings, SqliteSettings};
