use rusqlite::Connection;

use super::KeyValueStore;
use crate::db::queries;
use crate::errors::PersistenceError;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(queries::get_value(&self.conn, key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        queries::set_value(&self.conn, key, value)?;
        Ok(())
    }
}
