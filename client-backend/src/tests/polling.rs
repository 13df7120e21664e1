use std::{sync::Arc, time::Duration};

use futures_channel::mpsc::UnboundedReceiver;
use futures_util::StreamExt;
use lib::{api::action::Action, crypto::identity::Identity};

use crate::{
    client::Client,
    config::ClientConfig,
    ledger::Submitter,
    manager::{
        notifications::{Notification, NotificationSender},
        poller::PollState,
    },
    net::local::LocalLedger,
    protocol::MemberState,
    tests::utils::{in_memory_member, test_config},
};

fn auto_join() -> ClientConfig {
    ClientConfig {
        auto_join: true,
        ..test_config()
    }
}

fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut notifications = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        notifications.push(notification);
    }

    notifications
}

#[tokio::test]
async fn polling_establishes_groups_and_forwards_messages() {
    let ledger = Arc::new(LocalLedger::new());
    let alice = in_memory_member(&ledger, auto_join());
    let bob = in_memory_member(&ledger, auto_join());
    let (tx, mut rx) = futures_channel::mpsc::unbounded();
    let notifications = NotificationSender::new(tx);

    let group_id = alice
        .create_group(vec![bob.address().clone()])
        .await
        .expect("group creation should have succeeded");

    let mut alice_poll = PollState::default();
    let mut bob_poll = PollState::default();
    // Joining, signing and deriving take one tick each.
    for _ in 0..3 {
        alice_poll.tick(&alice, &notifications).await;
        bob_poll.tick(&bob, &notifications).await;
    }

    assert_eq!(
        bob_poll.state(&group_id),
        Some(MemberState::SecretEstablished)
    );
    let updates: Vec<MemberState> = drain(&mut rx)
        .into_iter()
        .filter_map(|notification| match notification {
            Notification::GroupUpdate { group, state } if group == group_id => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        updates,
        vec![
            MemberState::NotJoined,
            MemberState::NotJoined,
            MemberState::AwaitingR2Completion,
            MemberState::AwaitingR2Completion,
            MemberState::SecretEstablished,
            MemberState::SecretEstablished,
        ],
        "Each member reports every state it acted in, once"
    );

    let session = alice_poll
        .active_session(&group_id)
        .expect("established")
        .clone();
    alice
        .send(&session, "hello, Bob")
        .await
        .expect("application message should have been sent");

    bob_poll.tick(&bob, &notifications).await;
    bob_poll.tick(&bob, &notifications).await;

    assert_eq!(
        messages(&mut rx),
        vec!["hello, Bob".to_owned()],
        "The message is forwarded exactly once"
    );
}

fn messages(rx: &mut UnboundedReceiver<Notification>) -> Vec<String> {
    drain(rx)
        .into_iter()
        .filter_map(|notification| match notification {
            Notification::Message(message) => message.msg().map(str::to_owned),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn three_polling_members_read_each_others_messages() {
    let ledger = Arc::new(LocalLedger::new());
    let alice = in_memory_member(&ledger, auto_join());
    let bob = in_memory_member(&ledger, auto_join());
    let carol = in_memory_member(&ledger, auto_join());
    let (alice_tx, _alice_rx) = futures_channel::mpsc::unbounded();
    let (bob_tx, mut bob_rx) = futures_channel::mpsc::unbounded();
    let (carol_tx, mut carol_rx) = futures_channel::mpsc::unbounded();
    let alice_notifications = NotificationSender::new(alice_tx);
    let bob_notifications = NotificationSender::new(bob_tx);
    let carol_notifications = NotificationSender::new(carol_tx);

    let group_id = alice
        .create_group(vec![bob.address().clone(), carol.address().clone()])
        .await
        .expect("group creation should have succeeded");

    let mut alice_poll = PollState::default();
    let mut bob_poll = PollState::default();
    let mut carol_poll = PollState::default();

    // Carol does not poll yet: round one stays open.
    for _ in 0..2 {
        alice_poll.tick(&alice, &alice_notifications).await;
        bob_poll.tick(&bob, &bob_notifications).await;
    }
    for state in [alice_poll.state(&group_id), bob_poll.state(&group_id)] {
        assert_eq!(
            state,
            Some(MemberState::AwaitingR1Completion),
            "Nobody signs before every member joined"
        );
    }
    assert_eq!(
        ledger.state().group(&group_id).expect("exists").r2,
        vec![None, None, None],
        "No round two share exists yet"
    );

    for _ in 0..3 {
        alice_poll.tick(&alice, &alice_notifications).await;
        bob_poll.tick(&bob, &bob_notifications).await;
        carol_poll.tick(&carol, &carol_notifications).await;
    }

    let sessions: Vec<_> = [&alice_poll, &bob_poll, &carol_poll]
        .into_iter()
        .map(|poll| {
            poll.active_session(&group_id)
                .expect("every member established the group")
                .clone()
        })
        .collect();
    assert!(
        sessions.windows(2).all(|pair| pair[0].secret == pair[1].secret),
        "Every member should derive the same secret"
    );

    drain(&mut bob_rx);
    drain(&mut carol_rx);
    alice
        .send(&sessions[0], "hi all")
        .await
        .expect("application message should have been sent");

    bob_poll.tick(&bob, &bob_notifications).await;
    carol_poll.tick(&carol, &carol_notifications).await;

    assert_eq!(
        messages(&mut bob_rx),
        vec!["hi all".to_owned()],
        "Bob decrypts the message"
    );
    assert_eq!(
        messages(&mut carol_rx),
        vec!["hi all".to_owned()],
        "Carol decrypts the message"
    );
}

#[tokio::test]
async fn polling_waits_for_an_explicit_join() {
    let ledger = Arc::new(LocalLedger::new());
    let alice = in_memory_member(&ledger, test_config());
    let bob = in_memory_member(&ledger, test_config());
    let (tx, _rx) = futures_channel::mpsc::unbounded();
    let notifications = NotificationSender::new(tx);

    let group_id = alice
        .create_group(vec![bob.address().clone()])
        .await
        .expect("group creation should have succeeded");

    let mut bob_poll = PollState::default();
    bob_poll.tick(&bob, &notifications).await;
    assert_eq!(bob_poll.state(&group_id), Some(MemberState::NotJoined));
    assert!(
        bob.recover(&group_id).is_err(),
        "Without auto_join nothing is generated for bob"
    );

    bob.join(&group_id).await.expect("bob is a member");
    bob_poll.tick(&bob, &notifications).await;
    assert_eq!(
        bob_poll.state(&group_id),
        Some(MemberState::AwaitingR1Completion)
    );
}

#[tokio::test]
async fn duplicated_shares_halt_the_group() {
    let ledger = Arc::new(LocalLedger::new());
    let alice = in_memory_member(&ledger, test_config());
    let bob = in_memory_member(&ledger, test_config());
    let mallory = Identity::generate();
    let (tx, mut rx) = futures_channel::mpsc::unbounded();
    let notifications = NotificationSender::new(tx);

    let group_id = alice
        .create_group(vec![bob.address().clone(), mallory.address()])
        .await
        .expect("group creation should have succeeded");
    bob.join(&group_id).await.expect("bob is a member");

    let groups = bob.reader().list_groups().await.expect("available");
    let bobs_share = groups[&group_id].r1[0].clone().expect("bob joined");
    Submitter::new(ledger.clone(), mallory, 1)
        .submit(&Action::SubmitR1 {
            id: group_id,
            r1_value: bobs_share,
        })
        .await
        .expect("the ledger does not compare share values");
    alice.join(&group_id).await.expect("alice is a member");

    let mut bob_poll = PollState::default();
    bob_poll.tick(&bob, &notifications).await;

    assert!(
        bob_poll.halted(&group_id).is_some(),
        "Two slots hold bob's share, so bob cannot know his index"
    );
    assert!(
        matches!(
            drain(&mut rx).as_slice(),
            [Notification::Halted { group, .. }] if *group == group_id
        ),
        "The halt is notified"
    );

    bob_poll.tick(&bob, &notifications).await;
    assert!(drain(&mut rx).is_empty(), "Halted groups are left alone");
    assert_eq!(
        ledger.state().group(&group_id).expect("exists").r2[0],
        None,
        "No round two share was computed from an ambiguous index"
    );
}

#[tokio::test]
async fn client_polls_loaded_profiles() {
    let ledger = Arc::new(LocalLedger::new());
    let (client, mut rx) = Client::new(auto_join());

    let alice = client
        .load_in_memory_profile("alice", ledger.clone())
        .await
        .expect("profile loads");
    let bob = client
        .load_in_memory_profile("bob", ledger.clone())
        .await
        .expect("profile loads");
    assert!(
        Arc::ptr_eq(
            &alice,
            &client
                .load_in_memory_profile("alice", ledger.clone())
                .await
                .expect("profile loads")
        ),
        "A profile is only loaded once"
    );
    assert!(
        client.start_polling("carol").await.is_err(),
        "Only loaded profiles can be polled"
    );

    let group_id = alice
        .create_group(vec![bob.address().clone()])
        .await
        .expect("group creation should have succeeded");

    client.start_polling("alice").await.expect("alice is loaded");
    client.start_polling("bob").await.expect("bob is loaded");

    let established = async {
        let mut established = 0;
        while let Some(notification) = rx.next().await {
            if notification
                == (Notification::GroupUpdate {
                    group: group_id,
                    state: MemberState::SecretEstablished,
                })
            {
                established += 1;
                if established == 2 {
                    break;
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), established)
        .await
        .expect("both members establish the group");

    client.stop_polling("alice").await;
    client.stop_polling("bob").await;
}
