//! fentity Database Library
//!
//! SQLite persistence for file records and file types, plus the keyed lock
//! table used to serialize mutations of a single record.

pub mod db;

pub use db::{
    run_migrations, setup_database, setup_in_memory, FileRepository, FileTypeRepository,
    KeyedLocks,
};
pub use sqlx::SqlitePool;
