use async_trait::async_trait;
use lib::api::{
    connection::ServiceError,
    input::{Receipt, SignedInput},
    query::{Query, Report},
};

pub mod connection;
pub mod local;
pub mod raw_connection;
pub mod websocket;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Could not open a connection")]
    CouldNotConnect,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("Could not reach the ledger: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Sending request failed because the connection closed")]
    SendConnectionClosed,
    #[error("Receiving request failed because the connection closed")]
    ReceiveConnectionClosed,
    #[error("The request timed out")]
    Timeout,
    #[error("The request gave an unexpected answer")]
    UnexpectedAnswer,
    #[error("The ledger answered with an error: {0}")]
    Service(ServiceError),
}

/// The append-only log as members see it: a submit operation, a query
/// operation and the current height. This is the layer where different
/// ledger backends (a remote node, an in-process log) are plugged in.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Appends a signed input. Returns once the log has accepted it.
    async fn submit(&self, input: SignedInput) -> Result<Receipt, RequestError>;

    /// Runs a read-only query against the log's current accepted state.
    async fn inspect(&self, query: &Query) -> Result<Report, RequestError>;

    /// Number of inputs the log has accepted so far.
    async fn height(&self) -> Result<u64, RequestError>;
}
