use lib::crypto::identity::Identity;
use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

impl Database {
    pub fn set_identity(&self, identity: &Identity) -> Result<(), DatabaseError> {
        self.get_connection().execute(
            r"
            INSERT INTO profile
                (identity)
            VALUES (?1)",
            params![identity.to_bytes().to_vec()],
        )?;

        Ok(())
    }

    pub fn get_identity(&self) -> Result<Option<Identity>, DatabaseError> {
        let bytes: Option<Vec<u8>> = self
            .get_connection()
            .query_row("SELECT identity FROM profile", params![], |row| row.get(0))
            .optional()?;

        bytes
            .map(|bytes| {
                let bytes: [u8; 32] = bytes.try_into().map_err(|_| DatabaseError::CorruptedData)?;
                Ok(Identity::from_bytes(bytes))
            })
            .transpose()
    }

    /// Returns the stored identity, or generates and stores one.
    pub fn get_or_create_identity(&self) -> Result<Identity, DatabaseError> {
        if let Some(identity) = self.get_identity()? {
            return Ok(identity);
        }

        let identity = Identity::generate();
        self.set_identity(&identity)?;
        log::info!("Created a new identity {}", identity.address());

        Ok(identity)
    }
}
