#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
#[error("The payload could not be deserialized (invalid data or unexpected output).")]
pub struct ProtoError;
