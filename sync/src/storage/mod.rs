//! Device-local key/value persistence.
//!
//! Everything the device remembers is a string under a string key. Backends
//! implement [`LocalStorage`]; [`LocalStateStore`] layers the stats snapshot
//! codec on top.

mod file;
mod local;
mod memory;

pub use file::FileStorage;
pub use local::LocalStateStore;
pub use memory::MemoryStorage;

use crate::error::StorageError;

/// A synchronous string key/value store.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently present, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Write several keys. Backends that persist eagerly override this to
    /// write once.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove every key starting with `prefix`. Returns how many were removed.
    fn remove_prefixed(&self, prefix: &str) -> Result<usize, StorageError> {
        let matching: Vec<String> = self
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect();
        for key in &matching {
            self.remove(key)?;
        }
        Ok(matching.len())
    }
}
