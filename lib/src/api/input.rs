use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};
use signature::Verifier;

use crate::identifiers::Address;

use super::group::DeliveryStamp;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputVerificationError {
    #[error("The sender is not a valid address")]
    InvalidSender,
    #[error("The signature is malformed")]
    MalformedSignature,
    #[error("The signature does not match the sender")]
    InvalidSignature,
}

/// An entry submitted to the log: an opaque payload signed by its sender.
/// The log only accepts the payload on behalf of `sender` if the
/// signature verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInput {
    pub sender: Address,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedInput {
    /// Returns the authenticated sender and payload.
    pub fn verify(&self) -> Result<(&Address, &[u8]), InputVerificationError> {
        let key = self
            .sender
            .verifying_key()
            .map_err(|_| InputVerificationError::InvalidSender)?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| InputVerificationError::MalformedSignature)?;

        key.verify(&self.payload, &signature)
            .map_err(|_| InputVerificationError::InvalidSignature)?;

        Ok((&self.sender, &self.payload))
    }
}

/// What the log gives back for an accepted input: its position in the
/// total order, and the stamp it was stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub index: u64,
    pub stamp: DeliveryStamp,
}

impl Receipt {
    /// Number of confirmations the receipt has when the log is at `height`.
    /// The block holding the input counts as the first one.
    pub fn confirmations(&self, height: u64) -> u64 {
        height.saturating_sub(self.index)
    }
}
