//! Storage for persisted records

pub mod json;

pub use json::{JsonStore, StorageError};
