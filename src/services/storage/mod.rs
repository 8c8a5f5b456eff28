pub mod memory;
pub mod sqlite;

use crate::errors::PersistenceError;

/// String key-value persistence the store writes its record list through.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}
