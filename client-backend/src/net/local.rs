//! An in-process log, used to run members without a ledger node.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use lib::{
    api::{
        connection::ServiceError,
        group::DeliveryStamp,
        input::{Receipt, SignedInput},
        query::{Query, Report},
    },
    ledger::LedgerState,
};

use super::{Ledger, RequestError};

#[derive(Debug, Default)]
struct LocalState {
    current: LedgerState,
    /// While lagging, queries are answered from this snapshot.
    snapshot: Option<LedgerState>,
}

/// Runs [`LedgerState`] in memory behind the [`Ledger`] interface.
///
/// In lagging mode queries keep answering from the state captured when
/// lagging started (or at the last [`LocalLedger::sync`]), while
/// submissions keep being applied. This reproduces a reader that does not
/// see its own writes yet.
#[derive(Debug)]
pub struct LocalLedger {
    state: Mutex<LocalState>,
    available: AtomicBool,
}

impl Default for LocalLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LocalState::default()),
            available: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().expect("Mutex poisoning is safe")
    }

    pub fn set_lagging(&self, lagging: bool) {
        let mut state = self.lock();
        let snapshot = lagging.then(|| state.current.clone());
        state.snapshot = snapshot;
    }

    /// Makes every accepted input visible to queries, without leaving
    /// lagging mode.
    pub fn sync(&self) {
        let mut state = self.lock();
        if state.snapshot.is_some() {
            let current = state.current.clone();
            state.snapshot = Some(current);
        }
    }

    /// An unavailable ledger refuses every request, like an unreachable node.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// A copy of the state every input has been applied to.
    pub fn state(&self) -> LedgerState {
        self.lock().current.clone()
    }

    fn check_available(&self) -> Result<(), RequestError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RequestError::SendConnectionClosed)
        }
    }
}

#[async_trait]
impl Ledger for LocalLedger {
    async fn submit(&self, input: SignedInput) -> Result<Receipt, RequestError> {
        self.check_available()?;
        let mut state = self.lock();

        let index = state.current.height();
        let stamp = DeliveryStamp::generate();
        state
            .current
            .advance(&input, stamp)
            .map_err(|rejection| RequestError::Service(ServiceError::Rejected(rejection)))?;

        Ok(Receipt { index, stamp })
    }

    async fn inspect(&self, query: &Query) -> Result<Report, RequestError> {
        self.check_available()?;
        let state = self.lock();

        state
            .snapshot
            .as_ref()
            .unwrap_or(&state.current)
            .inspect(query)
            .map_err(|rejection| RequestError::Service(ServiceError::Rejected(rejection)))
    }

    async fn height(&self) -> Result<u64, RequestError> {
        self.check_available()?;

        Ok(self.lock().current.height())
    }
}
