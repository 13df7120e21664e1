//! Services answering the requests of a connection.
pub mod ledger;
