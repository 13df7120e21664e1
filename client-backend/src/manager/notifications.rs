pub use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender};
use lib::identifiers::GroupIdentifier;

use crate::{protocol::MemberState, ui::MessageView};

/// Basic notifications.
/// We use an mpsc channel to add new notifications; the embedding
/// application reads the receiver and acts accordingly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Our state in a group changed.
    GroupUpdate {
        group: GroupIdentifier,
        state: MemberState,
    },
    Message(MessageView),
    /// Progress in the group stopped on this device and needs manual
    /// recovery.
    Halted {
        group: GroupIdentifier,
        reason: String,
    },
}

#[derive(Debug)]
pub struct NotificationSender {
    tx: UnboundedSender<Notification>,
}

impl NotificationSender {
    pub fn new(tx: UnboundedSender<Notification>) -> Self {
        Self { tx }
    }

    pub fn send_notification(&self, notification: Notification) {
        if self.tx.unbounded_send(notification).is_err() {
            log::debug!("Notification dropped: nobody is listening anymore");
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use lib::api::group::DeliveryStamp;

    use super::*;

    #[tokio::test]
    async fn notifications_reach_the_receiver() {
        let (tx, mut rx) = futures_channel::mpsc::unbounded();
        let sender = NotificationSender::new(tx);
        let group = GroupIdentifier::from(DeliveryStamp::generate());

        sender.send_notification(Notification::GroupUpdate {
            group,
            state: MemberState::AwaitingR1Completion,
        });

        assert_eq!(
            rx.next().await,
            Some(Notification::GroupUpdate {
                group,
                state: MemberState::AwaitingR1Completion
            })
        );

        drop(rx);
        // Sending without a receiver is not an error.
        sender.send_notification(Notification::Halted {
            group,
            reason: String::new(),
        });
    }
}
