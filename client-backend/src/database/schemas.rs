//! Schemas used to create the database
//! For backwards compatibility we keep all the schemas,
//! even the ones we end up reverting.
//!
//! We use an iterator to skip the migration schemas if necessary.
//! The `SQLite` database will keep a version number internally.
use rusqlite::{params, Connection};

use super::{Database, DatabaseError};

/// The latest version of the database. It's just an
/// integer increasing by one every time we add
/// a new schema.
pub const LATEST_DATABASE_VERSION: usize = 1;

pub const SCHEMAS: [&str; LATEST_DATABASE_VERSION] = ["
    CREATE TABLE info(
        database_version            INTEGER     NOT NULL
    );

    CREATE TABLE profile(
        identity                    BLOB        PRIMARY KEY
    );

    CREATE TABLE sessions(
        group_id                    BLOB        PRIMARY KEY,
        key_material                TEXT        NOT NULL,
        r1_value                    TEXT        NOT NULL,
        created_at                  INTEGER     NOT NULL
    );
    "];

/// If needed, execute the new schemas to upgrade
/// the database to the latest version
impl Database {
    pub fn upgrade_database_version(conn: &mut Connection) -> Result<(), DatabaseError> {
        // Read current database version.
        // If we can't read it somehow, we assume that
        // the database is empty and so return a version of 0.
        let current_database_version: usize = conn
            .query_row("SELECT database_version FROM info", (), |row| {
                Ok(row.get(0).unwrap_or(0))
            })
            .unwrap_or(0);

        if current_database_version == LATEST_DATABASE_VERSION {
            return Ok(());
        }

        let transaction = conn.transaction()?;

        for query in SCHEMAS.iter().skip(current_database_version) {
            transaction.execute_batch(query)?;
        }

        // Migration done, now we update database version
        if current_database_version > 0 {
            transaction.execute(
                "UPDATE info SET database_version = ?1",
                params![LATEST_DATABASE_VERSION],
            )?;
        } else {
            // The version hasn't been inserted yet
            transaction.execute(
                "INSERT INTO info (database_version) VALUES (?1)",
                [LATEST_DATABASE_VERSION],
            )?;
        }

        transaction.commit()?;

        Ok(())
    }
}
