//! Database module

pub mod operations;
pub mod schema;

// Re-export for convenience
pub use operations::SqliteJobStore;
pub use schema::initialize_database;
