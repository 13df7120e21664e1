use std::sync::Arc;

use lib::{
    api::{
        group::{GroupRecords, Transition},
        query::Query,
    },
    identifiers::GroupIdentifier,
};

use crate::{error::QueryError, net::Ledger};

/// Pure reads of the log's current accepted state. The view may lag
/// behind what was just submitted.
#[derive(Clone)]
pub struct LedgerReader {
    ledger: Arc<dyn Ledger>,
}

impl LedgerReader {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn list_groups(&self) -> Result<GroupRecords, QueryError> {
        let report = self.ledger.inspect(&Query::Groups).await?;
        let groups: GroupRecords = report.decode().map_err(|_| QueryError::Malformed)?;

        if let Some((id, _)) = groups.iter().find(|(_, group)| !group.is_well_formed()) {
            log::warn!("The ledger returned an inconsistent record for {id}");
            return Err(QueryError::Malformed);
        }

        Ok(groups)
    }

    pub async fn list_transitions(
        &self,
        group_id: &GroupIdentifier,
    ) -> Result<Vec<Transition>, QueryError> {
        let report = self
            .ledger
            .inspect(&Query::Transitions { id: *group_id })
            .await?;

        report.decode().map_err(|_| QueryError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use lib::{
        api::{action::Action, connection::ServiceError, group::DeliveryStamp},
        crypto::identity::Identity,
        ledger::Rejection,
    };

    use crate::net::{local::LocalLedger, RequestError};

    use super::*;

    #[tokio::test]
    async fn reads_groups_and_transitions() {
        let ledger = Arc::new(LocalLedger::new());
        let reader = LedgerReader::new(ledger.clone());
        let alice = Identity::generate();

        assert!(
            reader.list_groups().await.expect("available").is_empty(),
            "A new ledger has no group"
        );

        let action = Action::CreateGroup {
            members: vec![alice.address(), Identity::generate().address()],
        };
        let receipt = ledger
            .submit(alice.sign_input(action.encode()))
            .await
            .expect("accepted");
        let id = GroupIdentifier::from(receipt.stamp);

        let groups = reader.list_groups().await.expect("available");
        assert!(groups.contains_key(&id), "The new group is listed");
        assert_eq!(
            reader.list_transitions(&id).await,
            Ok(Vec::new()),
            "No transition yet"
        );
    }

    #[tokio::test]
    async fn failures_are_query_errors() {
        let ledger = Arc::new(LocalLedger::new());
        let reader = LedgerReader::new(ledger.clone());
        let missing = GroupIdentifier::from(DeliveryStamp::generate());

        assert_eq!(
            reader.list_transitions(&missing).await,
            Err(QueryError::Refused(ServiceError::Rejected(
                Rejection::GroupNotFound(missing)
            )))
        );

        ledger.set_available(false);
        assert_eq!(
            reader.list_groups().await,
            Err(QueryError::Connection(RequestError::SendConnectionClosed)),
            "An unreachable ledger is a transient query error"
        );
    }
}
