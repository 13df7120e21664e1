use lib::{
    api::{action::Action, group::Group, input::Receipt},
    crypto::{
        cipher::{decrypt_transition, encrypt_transition},
        gdh::SEED_LENGTH,
        random_bytes,
    },
    identifiers::{Address, GroupIdentifier},
};

use crate::{
    database::sessions::Session,
    error::ProtocolError,
    protocol::{
        self, compute_round_two, derive_group_secret, ActiveSession, Evaluation, MemberState,
        NextStep,
    },
    ui::{GroupView, MessageBatch, MessageView},
};

use super::Member;

/// What [`Member::progress`] did for a group.
#[derive(Debug, Clone)]
pub enum Progress {
    Joined,
    /// An interrupted join was completed with the stored share.
    RoundOneResubmitted,
    RoundTwoSubmitted,
    Established(ActiveSession),
    /// Nothing to do until other members act.
    Waiting(MemberState),
}

impl Progress {
    /// Our state in the group as it was read before acting.
    pub fn observed_state(&self) -> MemberState {
        match self {
            Progress::Joined | Progress::RoundOneResubmitted => MemberState::NotJoined,
            Progress::RoundTwoSubmitted => MemberState::AwaitingR2Completion,
            Progress::Established(_) => MemberState::SecretEstablished,
            Progress::Waiting(state) => *state,
        }
    }
}

impl Member {
    /// Creates a group with `members`. We are added to the end of the
    /// list if missing. The group is identified by the delivery stamp of
    /// the creating input.
    pub async fn create_group(
        &self,
        mut members: Vec<Address>,
    ) -> Result<GroupIdentifier, ProtocolError> {
        if !members.contains(&self.address) {
            members.push(self.address.clone());
        }

        let receipt = self
            .submitter
            .submit(&Action::CreateGroup { members })
            .await?;
        let group_id = GroupIdentifier::from(receipt.stamp);
        log::info!("Created {group_id}");

        Ok(group_id)
    }

    async fn fetch_group(&self, group_id: &GroupIdentifier) -> Result<Group, ProtocolError> {
        self.reader
            .list_groups()
            .await?
            .remove(group_id)
            .ok_or(ProtocolError::GroupNotFound { group: *group_id })
    }

    /// Where we stand in `group`, from the record and the session kept on
    /// this device.
    pub fn evaluate(
        &self,
        group_id: &GroupIdentifier,
        group: &Group,
    ) -> Result<Evaluation, ProtocolError> {
        let session = self.database.recover_session(group_id)?;

        protocol::evaluate(group_id, group, &self.address, session.as_ref())
    }

    /// Submits our round one share. If a session already exists for the
    /// group but its share never reached the log, the stored share is
    /// submitted again instead of generating new key material.
    pub async fn join(&self, group_id: &GroupIdentifier) -> Result<Receipt, ProtocolError> {
        let group = self.fetch_group(group_id).await?;
        self.join_with(group_id, &group).await
    }

    async fn join_with(
        &self,
        group_id: &GroupIdentifier,
        group: &Group,
    ) -> Result<Receipt, ProtocolError> {
        let evaluation = self.evaluate(group_id, group)?;

        let r1_value = match evaluation.next {
            NextStep::Join => {
                let (key_material, r1_value) =
                    self.primitive.generate(&random_bytes::<SEED_LENGTH>());

                // The session has to be durable before its share can reach the log.
                self.database.save_session(&Session {
                    group_id: *group_id,
                    key_material,
                    r1_value: r1_value.clone(),
                })?;
                log::info!("Joining {group_id}");

                r1_value
            }
            NextStep::ResubmitRoundOne(r1_value) => {
                log::info!("Resubmitting our round one value for {group_id}");
                r1_value
            }
            _ => {
                return Err(ProtocolError::NotReady {
                    group: *group_id,
                    state: evaluation.state,
                })
            }
        };

        Ok(self
            .submitter
            .submit(&Action::SubmitR1 {
                id: *group_id,
                r1_value,
            })
            .await?)
    }

    /// Computes and submits our round two share. Only legal once round one
    /// is complete and before our round two share is recorded.
    pub async fn sign(&self, group_id: &GroupIdentifier) -> Result<Receipt, ProtocolError> {
        let group = self.fetch_group(group_id).await?;
        self.sign_with(group_id, &group).await
    }

    async fn sign_with(
        &self,
        group_id: &GroupIdentifier,
        group: &Group,
    ) -> Result<Receipt, ProtocolError> {
        let evaluation = self.evaluate(group_id, group)?;
        if evaluation.next != NextStep::SubmitRoundTwo {
            return Err(ProtocolError::NotReady {
                group: *group_id,
                state: evaluation.state,
            });
        }

        let session = self.recover(group_id)?;
        let r2_value = compute_round_two(self.primitive.as_ref(), group_id, group, &session)?;
        log::info!("Signing {group_id}");

        Ok(self
            .submitter
            .submit(&Action::SubmitR2 {
                id: *group_id,
                r2_value,
            })
            .await?)
    }

    /// Derives the group secret once both rounds are complete.
    pub async fn establish(
        &self,
        group_id: &GroupIdentifier,
    ) -> Result<ActiveSession, ProtocolError> {
        let group = self.fetch_group(group_id).await?;
        self.establish_with(group_id, &group)
    }

    fn establish_with(
        &self,
        group_id: &GroupIdentifier,
        group: &Group,
    ) -> Result<ActiveSession, ProtocolError> {
        let evaluation = self.evaluate(group_id, group)?;
        if evaluation.state != MemberState::SecretEstablished {
            return Err(ProtocolError::NotReady {
                group: *group_id,
                state: evaluation.state,
            });
        }

        let session = self.recover(group_id)?;
        let secret = derive_group_secret(self.primitive.as_ref(), group_id, group, &session)?;
        log::debug!("Established {group_id} with key {}", secret.fingerprint());

        Ok(ActiveSession {
            group_id: *group_id,
            members: group.members.clone(),
            secret,
        })
    }

    /// Reads the group and takes whatever step is legal next.
    pub async fn progress(&self, group_id: &GroupIdentifier) -> Result<Progress, ProtocolError> {
        let group = self.fetch_group(group_id).await?;
        self.advance(group_id, &group, true).await
    }

    /// Takes the next legal step for an already read `group`. A fresh join
    /// only happens when `allow_join` is set.
    pub(crate) async fn advance(
        &self,
        group_id: &GroupIdentifier,
        group: &Group,
        allow_join: bool,
    ) -> Result<Progress, ProtocolError> {
        let evaluation = self.evaluate(group_id, group)?;

        match evaluation.next {
            NextStep::Join if allow_join => {
                self.join_with(group_id, group).await?;
                Ok(Progress::Joined)
            }
            NextStep::ResubmitRoundOne(_) => {
                self.join_with(group_id, group).await?;
                Ok(Progress::RoundOneResubmitted)
            }
            NextStep::SubmitRoundTwo => {
                self.sign_with(group_id, group).await?;
                Ok(Progress::RoundTwoSubmitted)
            }
            NextStep::DeriveSecret => Ok(Progress::Established(
                self.establish_with(group_id, group)?,
            )),
            NextStep::Join | NextStep::Wait => Ok(Progress::Waiting(evaluation.state)),
        }
    }

    /// Encrypts `text` under the group secret and appends it to the group.
    pub async fn send(
        &self,
        session: &ActiveSession,
        text: &str,
    ) -> Result<Receipt, ProtocolError> {
        let action = encrypt_transition(&session.secret, &session.group_id, &self.address, text)?;

        Ok(self
            .submitter
            .submit(&Action::SubmitTransition {
                id: session.group_id,
                action,
            })
            .await?)
    }

    /// Reads the group's messages starting at position `from`. Messages
    /// that fail to decrypt are kept in the batch as undecryptable.
    pub async fn read_messages(
        &self,
        session: &ActiveSession,
        from: usize,
    ) -> Result<MessageBatch, ProtocolError> {
        let transitions = self.reader.list_transitions(&session.group_id).await?;
        let next_position = transitions.len().max(from);

        let messages = transitions
            .into_iter()
            .skip(from)
            .map(|transition| {
                match decrypt_transition(
                    &session.secret,
                    &session.group_id,
                    &transition.author,
                    &transition.action,
                ) {
                    Ok(text) => MessageView::plain_text(
                        session.group_id,
                        transition.author,
                        transition.timestamp,
                        text,
                    ),
                    Err(e) => {
                        log::warn!(
                            "Could not decrypt a message from {} in {}: {e}",
                            transition.author,
                            session.group_id
                        );
                        MessageView::undecryptable(
                            session.group_id,
                            transition.author,
                            transition.timestamp,
                            e,
                        )
                    }
                }
            })
            .collect();

        Ok(MessageBatch {
            messages,
            next_position,
        })
    }

    /// Every group on the ledger, as seen by this member.
    pub async fn group_views(&self) -> Result<Vec<GroupView>, ProtocolError> {
        let groups = self.reader.list_groups().await?;

        groups
            .iter()
            .map(|(group_id, group)| {
                let session = self.database.recover_session(group_id)?;
                let state = protocol::evaluate(group_id, group, &self.address, session.as_ref())
                    .ok()
                    .map(|evaluation| evaluation.state);

                Ok(GroupView::new(
                    *group_id,
                    group,
                    state,
                    &self.address,
                    session.is_some(),
                ))
            })
            .collect()
    }
}
