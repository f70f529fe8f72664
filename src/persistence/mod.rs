//! Key-value persistence for the leaderboard and settings
//!
//! Backends:
//! - `MemoryStorage`: in-process map (tests, headless runs)
//! - `FileStorage`: one JSON file per key (native)
//! - `LocalStorage`: browser LocalStorage (wasm)
//!
//! Callers treat any error as "no data" and fall back to defaults.

use std::collections::HashMap;
use std::fmt;

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(target_arch = "wasm32")]
mod local;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;
#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

/// Storage failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend could not be reached (no window, permissions, ...)
    Unavailable(String),
    Io { key: String, message: String },
    Corrupt { key: String, message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
            Self::Io { key, message } => write!(f, "i/o error for key {key}: {message}"),
            Self::Corrupt { key, message } => write!(f, "corrupt data under key {key}: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// String key-value store
pub trait Storage {
    /// Read the value under `key` (`Ok(None)` if absent)
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Replace the value under `key`
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Decode JSON stored under `key`
pub fn load_json<T: serde::de::DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(json) = storage.read(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })
}

/// Encode `value` as JSON under `key`
pub fn save_json<T: serde::Serialize>(
    storage: &mut dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    storage.write(key, &json)
}

/// In-memory storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_roundtrip_and_absent() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.read("missing"), Ok(None));
        save_json(&mut storage, "numbers", &vec![3u32, 1, 2]).expect("save");
        let loaded: Option<Vec<u32>> = load_json(&storage, "numbers").expect("load");
        assert_eq!(loaded, Some(vec![3, 1, 2]));
    }

    #[test]
    fn test_corrupt_json_is_reported() {
        let mut storage = MemoryStorage::new();
        storage.write("bad", "{not json").expect("write");
        let result: Result<Option<Vec<u32>>, _> = load_json(&storage, "bad");
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }
}
