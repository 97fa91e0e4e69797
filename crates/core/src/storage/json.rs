//! JSON file-based storage

use crate::delivery::Delivery;
use crate::message::Message;
use crate::queue::JobQueue;
use crate::user::User;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found: {kind}/{id}")]
    NotFound { kind: String, id: String },
}

impl StorageError {
    /// True when the error is a plain missing-record lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// JSON file-based storage
#[derive(Clone)]
pub struct JsonStore {
    base_path: PathBuf,
}

impl JsonStore {
    /// Open a store at the given path
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Open a temporary store for testing
    pub fn open_temp() -> Result<Self, StorageError> {
        let temp_dir = std::env::temp_dir().join(format!("courier-test-{}", uuid::Uuid::new_v4()));
        Self::open(temp_dir)
    }

    /// Save a value to storage
    pub fn save<T: Serialize>(&self, kind: &str, id: &str, data: &T) -> Result<(), StorageError> {
        let path = self.path_for(kind, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&path, json)?;
        Ok(())
    }

    /// Load a value from storage
    pub fn load<T: DeserializeOwned>(&self, kind: &str, id: &str) -> Result<T, StorageError> {
        let path = self.path_for(kind, id);
        if !path.exists() {
            return Err(StorageError::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Delete a value from storage (no-op if missing)
    pub fn delete(&self, kind: &str, id: &str) -> Result<(), StorageError> {
        let path = self.path_for(kind, id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// List all IDs of a given kind
    pub fn list(&self, kind: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.base_path.join(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    ids.push(stem.to_string_lossy().to_string());
                }
            }
        }
        Ok(ids)
    }

    /// Check if a value exists
    pub fn exists(&self, kind: &str, id: &str) -> bool {
        self.path_for(kind, id).exists()
    }

    fn path_for(&self, kind: &str, id: &str) -> PathBuf {
        self.base_path.join(kind).join(format!("{}.json", id))
    }

    // Convenience methods for common types

    /// Save a message
    pub fn save_message(&self, message: &Message) -> Result<(), StorageError> {
        self.save("messages", &message.id.0, message)
    }

    /// Load a message
    pub fn load_message(&self, id: &str) -> Result<Message, StorageError> {
        self.load("messages", id)
    }

    /// Delete a message
    pub fn delete_message(&self, id: &str) -> Result<(), StorageError> {
        self.delete("messages", id)
    }

    /// Save a delivery
    pub fn save_delivery(&self, delivery: &Delivery) -> Result<(), StorageError> {
        self.save("deliveries", &delivery.id.0, delivery)
    }

    /// Load a delivery
    pub fn load_delivery(&self, id: &str) -> Result<Delivery, StorageError> {
        self.load("deliveries", id)
    }

    /// Delete a delivery
    pub fn delete_delivery(&self, id: &str) -> Result<(), StorageError> {
        self.delete("deliveries", id)
    }

    /// List all deliveries
    pub fn list_deliveries(&self) -> Result<Vec<String>, StorageError> {
        self.list("deliveries")
    }

    /// Save a user
    pub fn save_user(&self, user: &User) -> Result<(), StorageError> {
        self.save("users", &user.id, user)
    }

    /// Load a user
    pub fn load_user(&self, id: &str) -> Result<User, StorageError> {
        self.load("users", id)
    }

    /// Save a queue
    pub fn save_queue(&self, name: &str, queue: &JobQueue) -> Result<(), StorageError> {
        self.save("queues", name, queue)
    }

    /// Load a queue
    pub fn load_queue(&self, name: &str) -> Result<JobQueue, StorageError> {
        self.load("queues", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{Delivery, DeliveryId};
    use crate::message::MessageId;
    use chrono::Utc;

    #[test]
    fn store_save_and_load() {
        let store = JsonStore::open_temp().unwrap();

        #[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
        struct TestData {
            name: String,
            value: i32,
        }

        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        store.save("test_kind", "test_id", &data).unwrap();
        let loaded: TestData = store.load("test_kind", "test_id").unwrap();

        assert_eq!(data, loaded);
    }

    #[test]
    fn store_load_not_found() {
        let store = JsonStore::open_temp().unwrap();
        let result: Result<String, _> = store.load("nonexistent", "id");
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn store_list_returns_ids() {
        let store = JsonStore::open_temp().unwrap();

        store.save("items", "a", &"data-a").unwrap();
        store.save("items", "b", &"data-b").unwrap();
        store.save("items", "c", &"data-c").unwrap();

        let mut ids = store.list("items").unwrap();
        ids.sort();

        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn store_delete_removes_file() {
        let store = JsonStore::open_temp().unwrap();

        store.save("items", "to_delete", &"data").unwrap();
        assert!(store.exists("items", "to_delete"));

        store.delete("items", "to_delete").unwrap();
        assert!(!store.exists("items", "to_delete"));
    }

    #[test]
    fn store_delete_missing_is_ok() {
        let store = JsonStore::open_temp().unwrap();
        store.delete("items", "never_existed").unwrap();
    }

    #[test]
    fn store_message_convenience_methods() {
        let store = JsonStore::open_temp().unwrap();

        let message = Message::new(MessageId("m-1".into()), "U123", "hello", Utc::now());
        store.save_message(&message).unwrap();

        let loaded = store.load_message("m-1").unwrap();
        assert_eq!(loaded.text, "hello");

        store.delete_message("m-1").unwrap();
        assert!(store.load_message("m-1").is_err());
    }

    #[test]
    fn store_delivery_convenience_methods() {
        let store = JsonStore::open_temp().unwrap();

        let delivery = Delivery::scheduled(
            DeliveryId("d-1".into()),
            MessageId("m-1".into()),
            "U123",
            "C456",
            Utc::now() + chrono::Duration::minutes(5),
            Utc::now(),
        );
        store.save_delivery(&delivery).unwrap();

        let loaded = store.load_delivery("d-1").unwrap();
        assert_eq!(loaded.channel_id, "C456");

        let ids = store.list_deliveries().unwrap();
        assert_eq!(ids, vec!["d-1"]);
    }

    #[test]
    fn store_queue_convenience_methods() {
        let store = JsonStore::open_temp().unwrap();

        let queue = JobQueue::new("deliveries");
        store.save_queue("deliveries", &queue).unwrap();

        let loaded = store.load_queue("deliveries").unwrap();
        assert_eq!(loaded.name, "deliveries");
    }
}
