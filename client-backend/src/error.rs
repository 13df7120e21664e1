use lib::{
    api::connection::ServiceError,
    crypto::{cipher::CipherError, gdh::PrimitiveError},
    identifiers::GroupIdentifier,
    ledger::Rejection,
};

use crate::{database::DatabaseError, net::RequestError, protocol::MemberState};

/// Reading the log failed. Always transient: the next poll retries.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("The ledger could not be reached: {0}")]
    Connection(RequestError),
    #[error("The ledger returned a malformed payload")]
    Malformed,
    #[error("The ledger refused the query: {0}")]
    Refused(ServiceError),
}

impl From<RequestError> for QueryError {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::Service(e) => Self::Refused(e),
            e => Self::Connection(e),
        }
    }
}

/// Appending to the log failed. The action can be retried once its
/// precondition has been checked again against a fresh read.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("The ledger could not be reached: {0}")]
    Connection(RequestError),
    #[error("The ledger rejected the input: {0}")]
    Rejected(Rejection),
    #[error("The input at index {index} did not reach {expected} confirmations in time")]
    Timeout { index: u64, expected: u64 },
    #[error("The ledger failed to process the input: {0}")]
    Unexpected(ServiceError),
}

impl SubmissionError {
    /// The log refused to overwrite a slot we believed empty: our view of
    /// the group is behind the log, and must be re-read before acting.
    pub fn is_stale_view(&self) -> bool {
        matches!(self, Self::Rejected(Rejection::SlotAlreadyFilled { .. }))
    }
}

impl From<RequestError> for SubmissionError {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::Service(ServiceError::Rejected(rejection)) => Self::Rejected(rejection),
            RequestError::Service(e) => Self::Unexpected(e),
            e => Self::Connection(e),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("Our round one value is not (or not uniquely) in the record of {group}")]
    SessionMismatch { group: GroupIdentifier },
    #[error("{group} was never joined on this device")]
    NoSessionFound { group: GroupIdentifier },
    #[error("The key primitive failed: {0}")]
    Primitive(#[from] PrimitiveError),
    #[error("We are not a member of {group}")]
    NotAMember { group: GroupIdentifier },
    #[error("{group} does not exist on the ledger")]
    GroupNotFound { group: GroupIdentifier },
    #[error("This step is not possible for {group} while {state}")]
    NotReady {
        group: GroupIdentifier,
        state: MemberState,
    },
    #[error("Could not encrypt the transition: {0}")]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ProtocolError {
    /// Fatal errors stop progress for the group on this device. Retrying
    /// would either fail the same way or act on the wrong key material.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SessionMismatch { .. } | Self::NoSessionFound { .. } | Self::Primitive(_)
        )
    }
}
