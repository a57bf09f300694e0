//! Storage backends.

pub mod file;
pub mod sqlite;

pub use file::FileKv;
pub use sqlite::SqliteStore;
