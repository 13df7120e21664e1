use serde::{Deserialize, Serialize};

use crate::{
    crypto::gdh::Share,
    error::ProtoError,
    identifiers::{Address, GroupIdentifier},
};

/// Everything a member can append to the log.
///
/// Payloads are JSON objects carrying a `method` discriminator so the
/// ledger application can dispatch on them, e.g.
/// `{"method":"SubmitR1","id":"...","r1Value":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum Action {
    CreateGroup {
        members: Vec<Address>,
    },
    SubmitR1 {
        id: GroupIdentifier,
        #[serde(rename = "r1Value")]
        r1_value: Share,
    },
    SubmitR2 {
        id: GroupIdentifier,
        #[serde(rename = "r2Value")]
        r2_value: Share,
    },
    SubmitTransition {
        id: GroupIdentifier,
        action: String,
    },
}

impl Action {
    /// Canonical byte payload of the action. Field order is fixed by the
    /// type definition, so equal actions always encode to equal bytes.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Actions only contain strings and sequences")
    }

    /// The log's canonical decode.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtoError> {
        serde_json::from_slice(bytes).map_err(|_| ProtoError)
    }

    pub fn method(&self) -> &'static str {
        match self {
            Action::CreateGroup { .. } => "CreateGroup",
            Action::SubmitR1 { .. } => "SubmitR1",
            Action::SubmitR2 { .. } => "SubmitR2",
            Action::SubmitTransition { .. } => "SubmitTransition",
        }
    }
}
