//! SQLite persistence for events, daily rollups and connections

mod storage;

pub use storage::SqliteStore;
