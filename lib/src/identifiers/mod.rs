//! Identifiers used on the ledger: groups (assigned by the log) and
//! member addresses (derived from signing keys).
pub use uuid::Uuid;

pub mod address;
pub mod group;

pub use {address::Address, group::GroupIdentifier};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("The input cannot be converted to a UUID")]
    InvalidUuid,
    #[error("The input is not a valid member address")]
    InvalidAddress,
}
