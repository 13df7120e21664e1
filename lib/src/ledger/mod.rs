//! The deterministic application driven by the log.
//!
//! Every node that replays the same accepted inputs in the same order ends
//! up with the same [`LedgerState`]. Inputs are verified and applied one at
//! a time; a rejected input leaves the state untouched and does not count
//! towards the height.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    api::{
        action::Action,
        group::{DeliveryStamp, Group, GroupRecords, Transition},
        input::SignedInput,
        query::{Query, Report},
    },
    crypto::gdh::Share,
    identifiers::{Address, GroupIdentifier},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Round {
    One,
    Two,
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Round::One => f.write_str("R1"),
            Round::Two => f.write_str("R2"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    #[error("The input signature does not match its sender")]
    InvalidSignature,
    #[error("The payload is not a known action")]
    MalformedPayload,
    #[error("A group needs at least two distinct, valid members")]
    InvalidMembers,
    #[error("{0} already exists")]
    GroupAlreadyExists(GroupIdentifier),
    #[error("{0} does not exist")]
    GroupNotFound(GroupIdentifier),
    #[error("{address} is not a member of {group}")]
    NotAMember {
        group: GroupIdentifier,
        address: Address,
    },
    #[error("The {round} slot of {address} is already filled")]
    SlotAlreadyFilled { round: Round, address: Address },
    #[error("Round one of {0} is not complete")]
    RoundOneIncomplete(GroupIdentifier),
    #[error("Round two of {0} is not complete")]
    RoundTwoIncomplete(GroupIdentifier),
}

/// What an accepted input changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    GroupCreated(GroupIdentifier),
    ShareRecorded {
        group: GroupIdentifier,
        round: Round,
        index: usize,
    },
    TransitionAppended(GroupIdentifier),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    groups: GroupRecords,
    transitions: BTreeMap<GroupIdentifier, Vec<Transition>>,
    height: u64,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accepted inputs.
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn groups(&self) -> &GroupRecords {
        &self.groups
    }

    pub fn group(&self, id: &GroupIdentifier) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn transitions(&self, id: &GroupIdentifier) -> Option<&[Transition]> {
        self.transitions.get(id).map(Vec::as_slice)
    }

    /// Verifies, decodes and applies `input`, accepted by the log under `stamp`.
    pub fn advance(
        &mut self,
        input: &SignedInput,
        stamp: DeliveryStamp,
    ) -> Result<Applied, Rejection> {
        let (sender, payload) = input.verify().map_err(|_| Rejection::InvalidSignature)?;
        let action = Action::decode(payload).map_err(|_| Rejection::MalformedPayload)?;

        let applied = match action {
            Action::CreateGroup { members } => self.create_group(members, stamp)?,
            Action::SubmitR1 { id, r1_value } => {
                self.record_share(id, sender, Round::One, r1_value)?
            }
            Action::SubmitR2 { id, r2_value } => {
                self.record_share(id, sender, Round::Two, r2_value)?
            }
            Action::SubmitTransition { id, action } => {
                self.append_transition(id, sender, action, stamp)?
            }
        };

        self.height += 1;

        Ok(applied)
    }

    pub fn inspect(&self, query: &Query) -> Result<Report, Rejection> {
        match query {
            Query::Groups => Ok(Report::from_value(&self.groups)),
            Query::Transitions { id } => {
                if !self.groups.contains_key(id) {
                    return Err(Rejection::GroupNotFound(*id));
                }
                let transitions = self.transitions(id).unwrap_or_default();

                Ok(Report::from_value(&transitions))
            }
        }
    }

    fn create_group(
        &mut self,
        members: Vec<Address>,
        stamp: DeliveryStamp,
    ) -> Result<Applied, Rejection> {
        let distinct: BTreeSet<&Address> = members.iter().collect();
        if members.len() < 2
            || distinct.len() != members.len()
            || !members.iter().all(Address::is_valid)
        {
            return Err(Rejection::InvalidMembers);
        }

        let id = GroupIdentifier::from(stamp);
        if self.groups.contains_key(&id) {
            return Err(Rejection::GroupAlreadyExists(id));
        }

        self.groups.insert(id, Group::new(members));

        Ok(Applied::GroupCreated(id))
    }

    fn record_share(
        &mut self,
        id: GroupIdentifier,
        sender: &Address,
        round: Round,
        share: Share,
    ) -> Result<Applied, Rejection> {
        let group = self
            .groups
            .get_mut(&id)
            .ok_or(Rejection::GroupNotFound(id))?;
        let index = group
            .position_of(sender)
            .ok_or_else(|| Rejection::NotAMember {
                group: id,
                address: sender.clone(),
            })?;

        if round == Round::Two && !group.is_round_one_complete() {
            return Err(Rejection::RoundOneIncomplete(id));
        }

        let slot = match round {
            Round::One => &mut group.r1[index],
            Round::Two => &mut group.r2[index],
        };
        if slot.is_some() {
            return Err(Rejection::SlotAlreadyFilled {
                round,
                address: sender.clone(),
            });
        }
        *slot = Some(share);

        Ok(Applied::ShareRecorded {
            group: id,
            round,
            index,
        })
    }

    fn append_transition(
        &mut self,
        id: GroupIdentifier,
        sender: &Address,
        action: String,
        stamp: DeliveryStamp,
    ) -> Result<Applied, Rejection> {
        let group = self.groups.get(&id).ok_or(Rejection::GroupNotFound(id))?;
        if !group.is_member(sender) {
            return Err(Rejection::NotAMember {
                group: id,
                address: sender.clone(),
            });
        }
        if !group.is_round_two_complete() {
            return Err(Rejection::RoundTwoIncomplete(id));
        }

        self.transitions.entry(id).or_default().push(Transition {
            action,
            author: sender.clone(),
            timestamp: stamp.unix_millis(),
        });

        Ok(Applied::TransitionAppended(id))
    }
}
