//! Data models
//!
//! File records, file types and the interchange document used for export/import.

mod file;
mod file_type;
mod interchange;

pub use file::*;
pub use file_type::*;
pub use interchange::*;
