use std::time::Duration;

use lib::{
    api::server::Server,
    constants::{DEFAULT_CONFIRMATIONS, DEFAULT_POLL_INTERVAL},
};

/// Settings of a member profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// The ledger node profiles loaded from disk connect to.
    pub server: Server,
    /// How often the poll loop re-reads the log.
    pub poll_interval: Duration,
    /// Confirmations a submission needs before it is treated as durable.
    pub confirmations: u64,
    /// Whether the poll loop joins groups we are a member of on its own,
    /// or waits for an explicit `join`.
    pub auto_join: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: Server::localhost(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmations: DEFAULT_CONFIRMATIONS,
            auto_join: false,
        }
    }
}
