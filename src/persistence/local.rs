//! Browser LocalStorage backend (wasm only)

use super::{Storage, StoreError};

#[derive(Debug, Clone, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn backend() -> Result<web_sys::Storage, StoreError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| StoreError::Unavailable("no LocalStorage in this context".to_string()))
    }
}

impl Storage for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::backend()?.get_item(key).map_err(|e| StoreError::Io {
            key: key.to_string(),
            message: format!("{e:?}"),
        })
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::backend()?.set_item(key, value).map_err(|e| StoreError::Io {
            key: key.to_string(),
            message: format!("{e:?}"),
        })
    }
}
