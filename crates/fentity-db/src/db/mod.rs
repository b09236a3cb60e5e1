//! Database repositories for the data access layer
//!
//! Each repository owns a clone of the SQLite pool and is responsible for one
//! table. Per-key locks used by the service layer live here as well.

pub mod file;
pub mod file_type;
pub mod locks;
pub mod setup;

pub use file::FileRepository;
pub use file_type::FileTypeRepository;
pub use locks::KeyedLocks;
pub use setup::{run_migrations, setup_database, setup_in_memory};
