use std::time::{SystemTime, UNIX_EPOCH};

use lib::{
    crypto::gdh::{KeyMaterial, Share},
    identifiers::GroupIdentifier,
};
use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

/// What this device remembers about a group it joined: the private key
/// material, and the round one value derived from it that was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub group_id: GroupIdentifier,
    pub key_material: KeyMaterial,
    pub r1_value: Share,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

impl Database {
    /// Stores a new session. A session is never replaced: the key material
    /// it holds may already be committed to on the ledger.
    pub fn save_session(&self, session: &Session) -> Result<(), DatabaseError> {
        let conn = self.get_connection();

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE group_id = ?)",
            params![session.group_id.to_bytes()],
            |row| row.get(0),
        )?;
        if exists {
            return Err(DatabaseError::AlreadyExists);
        }

        conn.execute(
            "INSERT INTO sessions
                    (group_id, key_material, r1_value, created_at)
                    VALUES (?, ?, ?, ?)",
            params![
                session.group_id.to_bytes(),
                session.key_material.as_token(),
                session.r1_value.as_str(),
                now_millis(),
            ],
        )?;

        Ok(())
    }

    pub fn recover_session(
        &self,
        group_id: &GroupIdentifier,
    ) -> Result<Option<Session>, DatabaseError> {
        let row: Option<(String, String)> = self
            .get_connection()
            .query_row(
                "SELECT key_material, r1_value FROM sessions WHERE group_id = ?",
                params![group_id.to_bytes()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.map(|(key_material, r1_value)| Session {
            group_id: *group_id,
            key_material: KeyMaterial::from_token(key_material),
            r1_value: Share::from_token(r1_value),
        }))
    }
}
