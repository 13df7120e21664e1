//! Drives every group a member belongs to forward in the background.
//!
//! Each tick reads the log once, takes the next legal step in every group
//! we are a member of, and forwards new messages of established groups as
//! notifications. A group whose session turns out unusable is halted and
//! left alone until the poller is restarted.
use std::{collections::HashMap, sync::Arc};

use lib::identifiers::GroupIdentifier;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    error::ProtocolError,
    protocol::{ActiveSession, MemberState},
};

use super::{
    groups::Progress,
    notifications::{Notification, NotificationSender},
    Member,
};

struct EstablishedGroup {
    session: ActiveSession,
    /// Position of the first message not yet forwarded.
    next_position: usize,
}

#[derive(Default)]
pub struct PollState {
    established: HashMap<GroupIdentifier, EstablishedGroup>,
    halted: HashMap<GroupIdentifier, String>,
    last_states: HashMap<GroupIdentifier, MemberState>,
}

impl PollState {
    pub fn active_session(&self, group_id: &GroupIdentifier) -> Option<&ActiveSession> {
        self.established.get(group_id).map(|group| &group.session)
    }

    /// Why progress in the group stopped, if it did.
    pub fn halted(&self, group_id: &GroupIdentifier) -> Option<&str> {
        self.halted.get(group_id).map(String::as_str)
    }

    pub fn state(&self, group_id: &GroupIdentifier) -> Option<MemberState> {
        self.last_states.get(group_id).copied()
    }

    pub async fn tick(&mut self, member: &Member, notifications: &NotificationSender) {
        let groups = match member.reader().list_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                log::warn!("Skipping poll: {e}");
                return;
            }
        };

        for (group_id, group) in groups
            .iter()
            .filter(|(_, group)| group.is_member(member.address()))
        {
            if self.halted.contains_key(group_id) {
                continue;
            }

            if !self.established.contains_key(group_id) {
                match member
                    .advance(group_id, group, member.config().auto_join)
                    .await
                {
                    Ok(progress) => {
                        self.update_state(*group_id, progress.observed_state(), notifications);

                        if let Progress::Established(session) = progress {
                            self.established.insert(
                                *group_id,
                                EstablishedGroup {
                                    session,
                                    next_position: 0,
                                },
                            );
                        }
                    }
                    Err(e) => {
                        self.handle_error(group_id, e, notifications);
                        continue;
                    }
                }
            }

            self.forward_messages(member, group_id, notifications)
                .await;
        }
    }

    async fn forward_messages(
        &mut self,
        member: &Member,
        group_id: &GroupIdentifier,
        notifications: &NotificationSender,
    ) {
        let Some(established) = self.established.get_mut(group_id) else {
            return;
        };

        match member
            .read_messages(&established.session, established.next_position)
            .await
        {
            Ok(batch) => {
                established.next_position = batch.next_position;
                for message in batch.messages {
                    notifications.send_notification(Notification::Message(message));
                }
            }
            Err(e) => log::warn!("Could not read the messages of {group_id}: {e}"),
        }
    }

    fn update_state(
        &mut self,
        group_id: GroupIdentifier,
        state: MemberState,
        notifications: &NotificationSender,
    ) {
        if self.last_states.insert(group_id, state) != Some(state) {
            notifications.send_notification(Notification::GroupUpdate {
                group: group_id,
                state,
            });
        }
    }

    fn handle_error(
        &mut self,
        group_id: &GroupIdentifier,
        error: ProtocolError,
        notifications: &NotificationSender,
    ) {
        match &error {
            e if e.is_fatal() => {
                log::error!("Halting {group_id}: {e}");
                self.halted.insert(*group_id, e.to_string());
                notifications.send_notification(Notification::Halted {
                    group: *group_id,
                    reason: e.to_string(),
                });
            }
            ProtocolError::Submission(e) if e.is_stale_view() => {
                log::info!("Our view of {group_id} was behind the ledger, reading it again");
            }
            e => log::warn!("Could not progress {group_id}: {e}"),
        }
    }
}

/// A running poll loop. Dropping it leaves the task running; call
/// [`Poller::stop`].
pub struct Poller {
    cancellation_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn start(member: Arc<Member>, notifications: Arc<NotificationSender>) -> Self {
        let cancellation_token = CancellationToken::new();
        let cancelled = cancellation_token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(member.config().poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut state = PollState::default();

            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    _ = interval.tick() => state.tick(&member, &notifications).await,
                }
            }

            log::debug!("Stopped polling for {}", member.address());
        });

        Self {
            cancellation_token,
            handle,
        }
    }

    pub async fn stop(self) {
        self.cancellation_token.cancel();
        // Wait for the current tick to finish.
        let _ = self.handle.await;
    }
}
