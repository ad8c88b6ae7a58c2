use crate::error::StoreError;
use rusqlite::{Connection, ErrorCode, OptionalExtension};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(|e| match e.sqlite_error_code() {
                Some(code) if is_unavailable(code) => StoreError::Unavailable,
                _ => StoreError::Read {
                    key: key.to_string(),
                    reason: e.to_string(),
                },
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [key, value],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(code) if is_unavailable(code) => StoreError::Unavailable,
                _ => StoreError::Write {
                    key: key.to_string(),
                    reason: e.to_string(),
                },
            })?;
        Ok(())
    }
}

fn is_unavailable(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::CannotOpen | ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
    )
}

#[cfg(test)]
pub use fake::MemoryStore;
