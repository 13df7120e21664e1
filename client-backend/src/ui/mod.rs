use core::fmt::Display;
use std::{hash::Hash, sync::Arc};

use lib::{
    api::group::Group,
    crypto::cipher::CipherError,
    identifiers::{Address, GroupIdentifier},
};

use crate::protocol::MemberState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub group_id: GroupIdentifier,
    pub author: Address,
    /// Unix milliseconds at which the log accepted the message.
    pub timestamp: u64,
    message: MessageInner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MessageInner {
    PlainText(Arc<String>),
    Undecryptable(CipherError),
}

impl MessageView {
    pub fn plain_text(
        group_id: GroupIdentifier,
        author: Address,
        timestamp: u64,
        message: String,
    ) -> Self {
        Self {
            group_id,
            author,
            timestamp,
            message: MessageInner::PlainText(Arc::new(message)),
        }
    }

    pub fn undecryptable(
        group_id: GroupIdentifier,
        author: Address,
        timestamp: u64,
        error: CipherError,
    ) -> Self {
        Self {
            group_id,
            author,
            timestamp,
            message: MessageInner::Undecryptable(error),
        }
    }

    /// The plaintext, or `None` if the transition could not be decrypted.
    pub fn msg(&self) -> Option<&str> {
        match &self.message {
            MessageInner::PlainText(string) => Some(string),
            MessageInner::Undecryptable(_) => None,
        }
    }
}

impl Display for MessageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            MessageInner::PlainText(string) => write!(f, "{}: {}", self.author, string),
            MessageInner::Undecryptable(e) => write!(f, "{}: <{e}>", self.author),
        }
    }
}

/// Messages read from a group, and where the next read should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBatch {
    pub messages: Vec<MessageView>,
    pub next_position: usize,
}

/// A struct used for displaying group information
/// to the client interface.
#[derive(Debug, Clone)]
pub struct GroupView {
    pub group_identifier: GroupIdentifier,
    pub members: Vec<Address>,
    /// `None` if we are not a member.
    pub state: Option<MemberState>,
    pub round_one_submitted: usize,
    pub round_two_submitted: usize,
    /// Our round one share is missing.
    pub can_join: bool,
    /// Round one is complete, our round two share is missing, and this
    /// device holds the key material to compute it.
    pub can_sign: bool,
    /// Both rounds are complete and this device can derive the secret.
    pub can_visit: bool,
}

impl Hash for GroupView {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.group_identifier.hash(state);
    }
}

impl PartialEq for GroupView {
    fn eq(&self, other: &Self) -> bool {
        // GroupIdentifier is enough since the ledger assigns it uniquely.
        self.group_identifier == other.group_identifier
    }
}

impl Eq for GroupView {}

impl GroupView {
    pub fn new(
        group_identifier: GroupIdentifier,
        group: &Group,
        state: Option<MemberState>,
        own_address: &Address,
        has_session: bool,
    ) -> Self {
        let position = group.position_of(own_address);
        let own_r1_missing = position.is_some_and(|i| group.r1[i].is_none());
        let own_r2_missing = position.is_some_and(|i| group.r2[i].is_none());

        Self {
            group_identifier,
            members: group.members.clone(),
            state,
            round_one_submitted: group.r1.iter().flatten().count(),
            round_two_submitted: group.r2.iter().flatten().count(),
            can_join: own_r1_missing,
            can_sign: has_session && group.is_round_one_complete() && own_r2_missing,
            can_visit: has_session && position.is_some() && group.is_round_two_complete(),
        }
    }

    pub fn formatted_id(&self) -> String {
        self.group_identifier.as_uuid().to_string()
    }

    // RGB-encoded color value "#123abc"
    // generated using the GroupIdentifier
    pub fn color(&self) -> String {
        let mut color_string = self.group_identifier.as_uuid().simple().to_string();
        color_string.truncate(6);

        format!("#{color_string}")
    }
}
