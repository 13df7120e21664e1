use std::{sync::Arc, time::Duration};

use lib::{
    api::{action::Action, input::Receipt},
    constants::CONFIRMATION_TIMEOUT,
    crypto::identity::Identity,
};
use tokio::time::{sleep, Instant};

use crate::{error::SubmissionError, net::Ledger};

const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Encodes actions, signs them with the member identity and appends them
/// to the log. A submission returns once it is durable.
#[derive(Clone)]
pub struct Submitter {
    ledger: Arc<dyn Ledger>,
    identity: Identity,
    confirmations: u64,
    confirmation_timeout: Duration,
}

impl Submitter {
    pub fn new(ledger: Arc<dyn Ledger>, identity: Identity, confirmations: u64) -> Self {
        Self {
            ledger,
            identity,
            confirmations,
            confirmation_timeout: CONFIRMATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub async fn submit(&self, action: &Action) -> Result<Receipt, SubmissionError> {
        let input = self.identity.sign_input(action.encode());

        let receipt = self.ledger.submit(input).await.map_err(|e| {
            let e = SubmissionError::from(e);
            log::warn!("{} was not accepted: {e}", action.method());
            e
        })?;
        log::debug!("{} accepted at index {}", action.method(), receipt.index);

        self.wait_for_confirmations(&receipt).await?;

        Ok(receipt)
    }

    /// Acceptance counts as the first confirmation, so there is nothing to
    /// wait for unless more are required.
    async fn wait_for_confirmations(&self, receipt: &Receipt) -> Result<(), SubmissionError> {
        if self.confirmations <= 1 {
            return Ok(());
        }

        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            let height = self.ledger.height().await?;
            if receipt.confirmations(height) >= self.confirmations {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SubmissionError::Timeout {
                    index: receipt.index,
                    expected: self.confirmations,
                });
            }

            sleep(CONFIRMATION_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use lib::ledger::Rejection;

    use crate::net::local::LocalLedger;

    use super::*;

    fn create_group(identity: &Identity) -> Action {
        Action::CreateGroup {
            members: vec![identity.address(), Identity::generate().address()],
        }
    }

    #[tokio::test]
    async fn accepted_actions_return_a_receipt() {
        let ledger = Arc::new(LocalLedger::new());
        let alice = Identity::generate();
        let submitter = Submitter::new(ledger.clone(), alice.clone(), 1);

        let receipt = submitter
            .submit(&create_group(&alice))
            .await
            .expect("a valid group is accepted");

        assert_eq!(receipt.index, 0);
        assert_eq!(ledger.state().height(), 1, "The input reached the log");
    }

    #[tokio::test]
    async fn rejections_are_surfaced() {
        let ledger = Arc::new(LocalLedger::new());
        let alice = Identity::generate();
        let submitter = Submitter::new(ledger, alice.clone(), 1);

        let result = submitter
            .submit(&Action::CreateGroup {
                members: vec![alice.address()],
            })
            .await;

        assert_eq!(
            result,
            Err(SubmissionError::Rejected(Rejection::InvalidMembers)),
            "The rejection reason must reach the caller"
        );
    }

    #[tokio::test]
    async fn waits_for_extra_confirmations() {
        let ledger = Arc::new(LocalLedger::new());
        let alice = Identity::generate();
        let bob = Identity::generate();
        let submitter = Submitter::new(ledger.clone(), alice.clone(), 2);

        // Another input lands on the log while alice waits.
        let other = ledger.clone();
        let later = tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            other
                .submit(bob.sign_input(create_group(&bob).encode()))
                .await
                .expect("accepted");
        });

        let receipt = submitter
            .submit(&create_group(&alice))
            .await
            .expect("confirmed once the next input is accepted");
        later.await.expect("task completes");

        assert_eq!(receipt.confirmations(ledger.state().height()), 2);
    }

    #[tokio::test]
    async fn confirmations_time_out() {
        let ledger = Arc::new(LocalLedger::new());
        let alice = Identity::generate();
        let submitter = Submitter::new(ledger, alice.clone(), 3)
            .with_confirmation_timeout(Duration::from_millis(300));

        assert_eq!(
            submitter.submit(&create_group(&alice)).await,
            Err(SubmissionError::Timeout {
                index: 0,
                expected: 3
            }),
            "Nothing else is submitted, so the input never gets deep enough"
        );
    }
}
