use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ProtoError, ledger::Rejection};

use super::{
    input::{Receipt, SignedInput},
    query::Report,
};

/// The maximum hardcoded duration for which a connection to the ledger
/// can stay alive without sending any requests or pings. After this duration,
/// the connection will disconnect.
pub const MAX_CONNECTION_TIMEOUT: Duration = Duration::from_secs(40);
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Bye,
    Error(ServiceError),
    /// Append a signed input to the log.
    Submit(SignedInput),
    /// The input was accepted at the given position.
    Accepted(Receipt),
    /// A JSON encoded [`super::query::Query`].
    Inspect(String),
    Report(Report),
    GetHeight,
    Height(u64),
}

#[derive(thiserror::Error, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServiceError {
    #[error("The request was invalid and couldn't be performed")]
    InvalidRequest,
    #[error("This operation is unknown to the server")]
    InvalidOperation,
    #[error("The message couldn't be read by the server")]
    DecodeError,
    #[error("The ledger rejected the input: {0}")]
    Rejected(Rejection),
    #[error("Internal server error")]
    InternalError,
    #[error("The connection is closed")]
    ConnectionIsClosed,
    #[error("Unknown error")]
    UnknownError,
}

pub type ServiceResult = Result<Message, ServiceError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
/// This is a UUID that allows clients to concurrently determine which messages
/// they receive belongs to which specific request they've made.
///
/// The server *should not* rely on [`ClientRequestId`]'s uniqueness, because two
/// different clients can reuse the same [`ClientRequestId`].
pub struct ClientRequestId(Uuid);

impl Default for ClientRequestId {
    fn default() -> Self {
        Self::generate()
    }
}

impl ClientRequestId {
    /// Returns a `ClientRequestId` with a UUID of 0
    pub const fn nil() -> Self {
        ClientRequestId(Uuid::nil())
    }

    pub const fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ClientRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The message structure that is converted to bytes
/// and transmitted over the wire.
/// Messages that do not answer a particular request (ex. a ping)
/// carry a freshly generated id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageWire(pub ClientRequestId, pub Message);

impl From<Message> for MessageWire {
    fn from(value: Message) -> Self {
        Self(ClientRequestId::generate(), value)
    }
}

impl MessageWire {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtoError> {
        bincode::serialize(self).map_err(|_| ProtoError)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtoError> {
        bincode::deserialize(bytes).map_err(|_| ProtoError)
    }
}
