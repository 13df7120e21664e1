pub mod client;
pub mod config;
pub mod database;
pub mod error;
/// Reading from and appending to the group ledger
pub mod ledger;
pub mod manager;
pub mod net;
pub mod protocol;
#[cfg(test)]
pub mod tests;
/// Structs for UI elements
pub mod ui;
