//! Infrastructure implementations for Parley.
//!
//! Concrete adapters behind the `parley-core` ports: SQLite message storage
//! with split read/write pools, an in-memory store for tests and embedded use,
//! an OpenAI-compatible rubric evaluator, and the TOML config loader.

pub mod config;
pub mod llm;
pub mod memory;
pub mod sqlite;

pub use memory::InMemoryMessageStore;
pub use sqlite::message::SqliteMessageStore;
pub use sqlite::pool::StorePool;
