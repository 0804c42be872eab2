//! Durable key/value storage for client state that must survive restarts.
//!
//! Values are kept in a single SQLite table. Multi-key writes run inside one
//! SQLite transaction so related entries are never left half written.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::{Connection, OptionalExtension};

use crate::Error;

/// A handle to the client's local storage.
///
/// Cloning the handle shares the underlying connection.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    connection: Arc<Mutex<Connection>>,
}

impl LocalStorage {
    /// Open (or create) the storage database at `path`.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the database cannot be opened or the
    /// table cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create a storage that lives only as long as the process.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the table cannot be created.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an existing connection, creating the storage table if needed.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the table cannot be created.
    pub fn from_connection(connection: Connection) -> Result<Self, Error> {
        create_local_storage_table(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Get the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.lock()?
            .query_row(
                "SELECT value FROM local_storage WHERE key = :key",
                &[(":key", key)],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::from)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.set_all(&[(key, value)])
    }

    /// Remove the value stored under `key`. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), Error> {
        self.remove_all(&[key])
    }

    /// Store every entry in `entries` or none of them.
    pub fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), Error> {
        let mut connection = self.lock()?;
        let transaction = connection.transaction()?;

        for (key, value) in entries {
            transaction.execute(
                "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (key, value),
            )?;
        }

        transaction.commit()?;

        Ok(())
    }

    /// Remove every key in `keys` or none of them.
    pub fn remove_all(&self, keys: &[&str]) -> Result<(), Error> {
        let mut connection = self.lock()?;
        let transaction = connection.transaction()?;

        for key in keys {
            transaction.execute("DELETE FROM local_storage WHERE key = ?1", (key,))?;
        }

        transaction.commit()?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire the local storage lock: {error}");
            Error::LockError
        })
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<(), Error> {
        self.lock()?.execute_batch(sql).map_err(Error::from)
    }
}

/// Create the local storage table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
fn create_local_storage_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}
