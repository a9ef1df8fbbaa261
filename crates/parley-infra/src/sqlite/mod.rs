//! SQLite storage layer.
//!
//! Message store implementation backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod message;
pub mod pool;
