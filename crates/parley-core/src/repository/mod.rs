//! Storage port traits implemented by `parley-infra`.

pub mod message;

pub use message::MessageStore;
