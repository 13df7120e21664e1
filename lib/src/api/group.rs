use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    crypto::gdh::Share,
    identifiers::{Address, GroupIdentifier},
};

/// A stamp uniquely identifying an accepted input and the moment the log
/// accepted it. It is a Uuid v7, which is a Uuid containing a unix
/// millisecond timestamp + some randomness.
///
/// The log generates one for every input it accepts and stores the input
/// under it. Two inputs A and B are such that if B's stamp is greater than
/// A's, then B was accepted *after* A.
///
/// The stamp of a `CreateGroup` input becomes the group's identifier, and
/// the stamp of a `SubmitTransition` input provides its timestamp.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeliveryStamp(Uuid);

impl DeliveryStamp {
    pub fn generate() -> Self {
        DeliveryStamp(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the representing bytes. Note that UUID V7
    /// stores the timestamp as a big-endian, so this output
    /// can be considered to be big-endian.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Milliseconds since the Unix epoch at which the stamp was generated.
    pub fn unix_millis(&self) -> u64 {
        self.0
            .get_timestamp()
            .map(|ts| {
                let (secs, nanos) = ts.to_unix();
                secs * 1000 + u64::from(nanos) / 1_000_000
            })
            .unwrap_or_default()
    }
}

impl TryFrom<&[u8]> for DeliveryStamp {
    type Error = ();

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let uuid = Uuid::from_slice(value).map_err(|_| ())?;
        Self::try_from(uuid)
    }
}

impl TryFrom<Uuid> for DeliveryStamp {
    // Returns Err if the UUID does not have a timestamp (= isn't v1, v6, or v7)
    type Error = ();

    fn try_from(value: Uuid) -> Result<Self, Self::Error> {
        if value.get_timestamp().is_some() {
            Ok(DeliveryStamp(value))
        } else {
            Err(())
        }
    }
}

/// A group record as the log keeps it. `R1` and `R2` are positionally
/// aligned with `Members`; an absent share is `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    pub members: Vec<Address>,
    #[serde(rename = "R1")]
    pub r1: Vec<Option<Share>>,
    #[serde(rename = "R2")]
    pub r2: Vec<Option<Share>>,
}

impl Group {
    /// An empty record for `members`: no share submitted in either round.
    pub fn new(members: Vec<Address>) -> Self {
        let size = members.len();

        Self {
            members,
            r1: vec![None; size],
            r2: vec![None; size],
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn position_of(&self, address: &Address) -> Option<usize> {
        self.members.iter().position(|member| member == address)
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.position_of(address).is_some()
    }

    /// A record read from the log is only usable if its three sequences
    /// have the same length.
    pub fn is_well_formed(&self) -> bool {
        self.members.len() >= 2 && self.r1.len() == self.size() && self.r2.len() == self.size()
    }

    pub fn is_round_one_complete(&self) -> bool {
        self.r1.iter().all(Option::is_some)
    }

    pub fn is_round_two_complete(&self) -> bool {
        self.r2.iter().all(Option::is_some)
    }

    /// The complete round one list, or `None` while a share is missing.
    pub fn round_one(&self) -> Option<Vec<Share>> {
        self.r1.iter().cloned().collect()
    }

    /// The complete round two list, or `None` while a share is missing.
    pub fn round_two(&self) -> Option<Vec<Share>> {
        self.r2.iter().cloned().collect()
    }
}

/// An encrypted application message appended to a completed group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transition {
    pub action: String,
    pub author: Address,
    pub timestamp: u64,
}

/// Every group the log knows of, as returned by a `groups` query.
pub type GroupRecords = BTreeMap<GroupIdentifier, Group>;

#[cfg(test)]
mod tests {
    use crate::crypto::identity::Identity;

    use super::*;

    #[test]
    fn group_json_follows_the_ledger_shape() {
        let members = vec![Identity::generate().address(), Identity::generate().address()];
        let mut group = Group::new(members.clone());
        group.r1[1] = Some(Share::from_token("abc"));

        let json = serde_json::to_value(&group).expect("serializes");

        assert_eq!(
            json,
            serde_json::json!({
                "Members": [members[0].as_str(), members[1].as_str()],
                "R1": [null, "abc"],
                "R2": [null, null],
            }),
            "Records should keep the PascalCase keys and null placeholders"
        );
    }

    #[test]
    fn rounds_complete_only_when_every_share_is_present() {
        let mut group = Group::new(vec![
            Identity::generate().address(),
            Identity::generate().address(),
        ]);

        assert!(!group.is_round_one_complete(), "A fresh group has no shares");
        assert_eq!(group.round_one(), None);

        group.r1[0] = Some(Share::from_token("a"));
        assert!(!group.is_round_one_complete(), "One share is still missing");

        group.r1[1] = Some(Share::from_token("b"));
        assert!(group.is_round_one_complete(), "Every share is present");
        assert_eq!(
            group.round_one(),
            Some(vec![Share::from_token("a"), Share::from_token("b")])
        );
    }

    #[test]
    fn stamps_carry_their_time() {
        let before = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock is after the epoch")
            .as_millis() as u64;
        let stamp = DeliveryStamp::generate();

        assert!(
            stamp.unix_millis() >= before,
            "The stamp should not predate its creation"
        );
        assert!(
            DeliveryStamp::try_from(Uuid::new_v4()).is_err(),
            "A random uuid carries no timestamp"
        );
    }
}
