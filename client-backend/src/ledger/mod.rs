//! Reading from and appending to the log.
pub mod reader;
pub mod submitter;

pub use {reader::LedgerReader, submitter::Submitter};
