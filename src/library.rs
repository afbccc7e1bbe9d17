//! Track catalog: record types, SQLite persistence and the `Library` facade
//! that ties records to files in the private storage directory.

mod catalog;
mod display;
mod model;
mod store;

pub use catalog::Library;
pub use display::format_mmss;
pub use model::*;
pub use store::{InsertOutcome, SqliteCatalogStore};
