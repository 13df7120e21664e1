//! The `SQLite` database holding what only this device knows: the member's
//! signing identity and the private key material of every joined group.
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

pub mod profile;
pub mod schemas;
pub mod sessions;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    #[error("This path is invalid")]
    InvalidPath,
    #[error("Error with the SQLite connection: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("This data we attempted to retrieve is invalid/unexpected")]
    CorruptedData,
    #[error("This data is already present in the table")]
    AlreadyExists,
}

/// A `SQLite` connection
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Creates a Database object, opens a connection to the given folder
    /// (in memory if `None`), and upgrades the database schema if needed.
    pub fn new(database_path: Option<PathBuf>) -> Result<Self, DatabaseError> {
        let mut conn = Self::open_connection(database_path)?;

        Database::upgrade_database_version(&mut conn)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// A simple helper function to open a Database in-memory.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::new(None)
    }

    /// Acquires the mutex lock to the inner connection
    pub fn get_connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.connection.lock().expect("Mutex poisoning is safe")
    }

    /// Opens a new database connection.
    #[inline]
    fn open_connection(database_path: Option<PathBuf>) -> Result<Connection, DatabaseError> {
        if let Some(mut path) = database_path {
            if !path.is_dir() {
                return Err(DatabaseError::InvalidPath);
            }
            path.push("db.sqlite");
            Ok(Connection::open(path)?)
        } else {
            Ok(Connection::open_in_memory()?)
        }
    }
}
