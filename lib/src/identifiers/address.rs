use std::str::FromStr;

use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use serde::{Deserialize, Serialize};

use crate::util::base64::{decode_array, Base64String};

use super::IdentifierError;

/// The printable identity of a participant: its Ed25519 verifying key,
/// encoded as unpadded URL-safe base64. The log attaches the address of
/// the signer to every input it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Address(Base64String::from_bytes(key.as_bytes()).into_string())
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey, IdentifierError> {
        let bytes = decode_array::<PUBLIC_KEY_LENGTH>(&self.0).ok_or(IdentifierError::InvalidAddress)?;

        VerifyingKey::from_bytes(&bytes).map_err(|_| IdentifierError::InvalidAddress)
    }

    /// Returns `true` if the address decodes to a usable verifying key.
    pub fn is_valid(&self) -> bool {
        self.verifying_key().is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let address = Address(s.trim().to_string());
        address.verifying_key()?;

        Ok(address)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
