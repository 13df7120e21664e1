use lib::api::connection::ServiceError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Sled database error: {0}")]
    SledError(#[from] sled::Error),
    #[error("Bincode error: {0}")]
    BincodeError(#[from] bincode::Error),
    #[error("The stored input log does not replay: input {0} is rejected")]
    CorruptedLog(u64),
    #[error("Error processing request. Sending message back to client failed")]
    RequestError,
}

impl From<Error> for ServiceError {
    fn from(value: Error) -> Self {
        tracing::error!("Internal server error while processing WS request: {value}");
        ServiceError::InternalError
    }
}
