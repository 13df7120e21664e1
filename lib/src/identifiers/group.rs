use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::group::DeliveryStamp;

use super::IdentifierError;

/// `GroupIdentifier` is the unique identifier used to handle groups.
///
/// It is assigned by the log when it accepts the `CreateGroup` input: the
/// delivery stamp of that input becomes the group's identifier. Since the
/// stamp is stored with the input, replaying the log yields the same
/// identifiers. Members never generate one themselves.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct GroupIdentifier(Uuid);

impl GroupIdentifier {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.into_bytes()
    }
}

impl AsRef<[u8]> for GroupIdentifier {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<Uuid> for GroupIdentifier {
    fn from(value: Uuid) -> Self {
        GroupIdentifier(value)
    }
}

impl From<DeliveryStamp> for GroupIdentifier {
    fn from(value: DeliveryStamp) -> Self {
        GroupIdentifier(value.as_uuid())
    }
}

impl TryFrom<&[u8]> for GroupIdentifier {
    type Error = IdentifierError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let uuid: Uuid = Uuid::from_slice(value).map_err(|_| IdentifierError::InvalidUuid)?;

        Ok(GroupIdentifier::from(uuid))
    }
}

impl FromStr for GroupIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s)
            .map(GroupIdentifier)
            .map_err(|_| IdentifierError::InvalidUuid)
    }
}

impl std::fmt::Display for GroupIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Group({})", self.0)
    }
}
