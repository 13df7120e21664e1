use std::time::Duration;

pub const LOCALHOST_DOMAIN: &str = "127.0.0.1";

pub const DEFAULT_LEDGER_PORT: u16 = 8640;

/// A submission is durable once the log reports this many confirmations.
/// Being accepted into the log counts as the first one.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// How often members re-read the ledger to progress their groups.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Upper bound on how long a submitter waits for extra confirmations.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
