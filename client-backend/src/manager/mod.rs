pub mod groups;
pub mod notifications;
pub mod poller;

use std::{fmt::Debug, sync::Arc};

use lib::{
    crypto::{
        gdh::{BurmesterDesmedt, KeyPrimitive},
        identity::Identity,
    },
    identifiers::{Address, GroupIdentifier},
};

use crate::{
    config::ClientConfig,
    database::{sessions::Session, Database, DatabaseError},
    error::ProtocolError,
    ledger::{LedgerReader, Submitter},
    net::Ledger,
};

/// One member profile: an identity, the sessions it keeps on this device,
/// and the ledger it talks to.
pub struct Member {
    identity: Identity,
    address: Address,

    reader: LedgerReader,
    submitter: Submitter,

    primitive: Arc<dyn KeyPrimitive>,

    config: ClientConfig,

    database: Database,
}

impl Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Member {
    /// Loads the profile stored in `database`, creating its identity on
    /// first use.
    pub fn open(
        database: Database,
        ledger: Arc<dyn Ledger>,
        config: ClientConfig,
    ) -> Result<Self, DatabaseError> {
        Self::with_primitive(database, ledger, config, Arc::new(BurmesterDesmedt))
    }

    pub fn with_primitive(
        database: Database,
        ledger: Arc<dyn Ledger>,
        config: ClientConfig,
        primitive: Arc<dyn KeyPrimitive>,
    ) -> Result<Self, DatabaseError> {
        log::info!("Initialising: Loading identity...");
        let identity = database.get_or_create_identity()?;

        Ok(Self {
            address: identity.address(),
            reader: LedgerReader::new(ledger.clone()),
            submitter: Submitter::new(ledger, identity.clone(), config.confirmations),
            identity,
            primitive,
            config,
            database,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn reader(&self) -> &LedgerReader {
        &self.reader
    }

    /// Loads the session kept for `group_id`.
    pub fn recover(&self, group_id: &GroupIdentifier) -> Result<Session, ProtocolError> {
        self.database
            .recover_session(group_id)?
            .ok_or(ProtocolError::NoSessionFound { group: *group_id })
    }
}
