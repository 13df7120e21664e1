//! Everything that crosses the boundary between members and the ledger:
//! the actions members append, the queries they read with, and the frames
//! both sides exchange.
pub mod action;
pub mod connection;
pub mod group;
pub mod input;
pub mod query;
pub mod server;
