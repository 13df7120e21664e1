//! The log itself: accepted inputs are applied to a [`LedgerState`] and
//! persisted in order, so that replaying them rebuilds the same state.
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use lib::{
    api::{
        connection::{Message, ServiceError, ServiceResult},
        group::DeliveryStamp,
        input::{Receipt, SignedInput},
        query::Query,
    },
    ledger::LedgerState,
};
use sled::Tree;
use tracing::instrument;

use crate::{
    connection::RequestHandler,
    db::{deserialize_bytes, serialize_bytes},
    error::Error,
};

/// What is stored for each accepted input.
type StoredInput = (DeliveryStamp, SignedInput);

pub struct LedgerService {
    state: RwLock<LedgerState>,
    /// Accepted inputs, keyed by their big-endian index.
    inputs: Tree,
}

impl LedgerService {
    /// Opens the log stored in `inputs`, replaying it.
    pub fn open(inputs: Tree) -> Result<Self, Error> {
        let state = Self::replay(&inputs)?;

        Ok(Self {
            state: RwLock::new(state),
            inputs,
        })
    }

    fn replay(inputs: &Tree) -> Result<LedgerState, Error> {
        let mut state = LedgerState::new();

        for entry in inputs.iter() {
            let (_, value) = entry?;
            let (stamp, input): StoredInput = deserialize_bytes(value)?;

            if let Err(rejection) = state.advance(&input, stamp) {
                tracing::error!("A stored input does not apply anymore: {rejection}");
                return Err(Error::CorruptedLog(state.height()));
            }
        }

        Ok(state)
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().expect("Lock poisoning is safe")
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().expect("Lock poisoning is safe")
    }

    pub fn height(&self) -> u64 {
        self.read().height()
    }

    /// Applies `input` and persists it. The input only counts as accepted
    /// once it is flushed to disk.
    #[instrument(skip_all, fields(sender = %input.sender))]
    pub fn submit(&self, input: SignedInput) -> ServiceResult {
        let mut state = self.write();
        let index = state.height();
        let stamp = DeliveryStamp::generate();

        let applied = state.advance(&input, stamp).map_err(|rejection| {
            tracing::info!("Rejected input: {rejection}");
            ServiceError::Rejected(rejection)
        })?;

        if let Err(e) = self.persist(index, stamp, &input) {
            tracing::error!("Could not persist input {index}: {e}");
            // Go back to what is on disk.
            *state = Self::replay(&self.inputs)?;
            return Err(ServiceError::InternalError);
        }

        tracing::debug!("Accepted input {index}: {applied:?}");

        Ok(Message::Accepted(Receipt { index, stamp }))
    }

    fn persist(&self, index: u64, stamp: DeliveryStamp, input: &SignedInput) -> Result<(), Error> {
        self.inputs
            .insert(index.to_be_bytes(), serialize_bytes((stamp, input))?)?;
        self.inputs.flush()?;

        Ok(())
    }

    pub fn inspect(&self, query: &str) -> ServiceResult {
        let query = Query::from_json(query).map_err(|_| ServiceError::DecodeError)?;

        self.read()
            .inspect(&query)
            .map(Message::Report)
            .map_err(ServiceError::Rejected)
    }

    pub async fn handle_request(
        &self,
        request: &mut impl RequestHandler,
        message: Message,
    ) -> Result<(), Error> {
        match message {
            Message::Submit(input) => {
                request
                    .map_service_result(|input| self.submit(input), input)
                    .await
            }
            Message::Inspect(query) => {
                request
                    .map_service_result(|query: String| self.inspect(&query), query)
                    .await
            }
            Message::GetHeight => request.message(Message::Height(self.height())).await,
            Message::Ping(bytes) => request.message(Message::Pong(bytes)).await,
            Message::Bye => Ok(()),
            _ => request.error(ServiceError::InvalidOperation).await,
        }
    }
}
