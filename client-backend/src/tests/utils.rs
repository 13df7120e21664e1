use std::{path::PathBuf, sync::Arc, time::Duration};

use lib::{api::group::DeliveryStamp, identifiers::GroupIdentifier};

use crate::{
    config::ClientConfig,
    database::Database,
    manager::{groups::Progress, Member},
    net::local::LocalLedger,
    protocol::ActiveSession,
};

pub fn test_config() -> ClientConfig {
    ClientConfig {
        poll_interval: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

pub fn in_memory_member(ledger: &Arc<LocalLedger>, config: ClientConfig) -> Member {
    Member::open(
        Database::in_memory().expect("in-memory databases always open"),
        ledger.clone(),
        config,
    )
    .expect("a new identity is created")
}

/// A fresh folder under the system temporary directory.
pub fn temp_folder() -> PathBuf {
    let folder = std::env::temp_dir().join(format!(
        "gdh-ledger-test-{}",
        DeliveryStamp::generate().as_uuid()
    ));
    std::fs::create_dir_all(&folder).expect("the temporary directory is writable");

    folder
}

/// Calls `progress` for every member in turn until all of them derived
/// the group secret.
pub async fn establish_all(members: &[&Member], group_id: &GroupIdentifier) -> Vec<ActiveSession> {
    // Joining, signing and deriving take one pass each.
    for _ in 0..4 {
        let mut sessions = Vec::new();
        for member in members {
            if let Progress::Established(session) = member
                .progress(group_id)
                .await
                .expect("every step is legal in turn")
            {
                sessions.push(session);
            }
        }

        if sessions.len() == members.len() {
            return sessions;
        }
    }

    panic!("{group_id} should have been established by now");
}
