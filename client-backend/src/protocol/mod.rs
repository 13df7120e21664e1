//! The group key agreement as seen by one member.
//!
//! Nothing here is stored: a member's state in a group is recomputed from
//! the latest group record read from the log, plus the session this device
//! kept for the group. Re-deriving on every read (instead of remembering
//! what was submitted) is what keeps members correct while their own
//! submissions are not visible to them yet.
use std::fmt::Display;

use lib::{
    api::group::Group,
    crypto::gdh::{GroupSecret, KeyPrimitive, Share},
    identifiers::{Address, GroupIdentifier},
};

use crate::{database::sessions::Session, error::ProtocolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberState {
    /// Our round one share is not on the log.
    NotJoined,
    /// Our round one share is on the log, others are missing.
    AwaitingR1Completion,
    /// Round one is complete, round two is not.
    AwaitingR2Completion,
    /// Both rounds are complete: the group secret can be derived.
    SecretEstablished,
}

impl Display for MemberState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MemberState::NotJoined => "not joined",
            MemberState::AwaitingR1Completion => "awaiting round one",
            MemberState::AwaitingR2Completion => "awaiting round two",
            MemberState::SecretEstablished => "established",
        };

        f.write_str(s)
    }
}

/// The action a member may legally take next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Generate key material and submit its round one share.
    Join,
    /// A session exists but its share never reached the log (the
    /// submission was interrupted): submit the stored share again.
    ResubmitRoundOne(Share),
    /// Compute and submit our round two share.
    SubmitRoundTwo,
    /// Derive the group secret.
    DeriveSecret,
    /// Other members have to act first.
    Wait,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub state: MemberState,
    /// Our position in `Members`.
    pub position: usize,
    pub next: NextStep,
}

/// Derives where `address` stands in `group`, and what it may do next.
pub fn evaluate(
    group_id: &GroupIdentifier,
    group: &Group,
    address: &Address,
    session: Option<&Session>,
) -> Result<Evaluation, ProtocolError> {
    let position = group
        .position_of(address)
        .ok_or(ProtocolError::NotAMember { group: *group_id })?;

    let (state, next) = if group.r1[position].is_none() {
        let next = match session {
            Some(session) => NextStep::ResubmitRoundOne(session.r1_value.clone()),
            None => NextStep::Join,
        };
        (MemberState::NotJoined, next)
    } else if !group.is_round_one_complete() {
        (MemberState::AwaitingR1Completion, NextStep::Wait)
    } else if !group.is_round_two_complete() {
        let next = if group.r2[position].is_none() {
            NextStep::SubmitRoundTwo
        } else {
            NextStep::Wait
        };
        (MemberState::AwaitingR2Completion, next)
    } else {
        (MemberState::SecretEstablished, NextStep::DeriveSecret)
    };

    Ok(Evaluation {
        state,
        position,
        next,
    })
}

/// Finds our index by looking up our round one value in the record.
///
/// Zero or several matches both mean the session cannot be trusted for
/// this group, and never fall back to a guess.
pub fn resolve_own_index(
    group_id: &GroupIdentifier,
    group: &Group,
    session: &Session,
) -> Result<usize, ProtocolError> {
    let mut matches = group
        .r1
        .iter()
        .enumerate()
        .filter(|(_, share)| share.as_ref() == Some(&session.r1_value))
        .map(|(index, _)| index);

    match (matches.next(), matches.next()) {
        (Some(index), None) => Ok(index),
        _ => Err(ProtocolError::SessionMismatch { group: *group_id }),
    }
}

/// Computes our round two share. Fails with `NotReady` while any round one
/// share is missing.
pub fn compute_round_two(
    primitive: &dyn KeyPrimitive,
    group_id: &GroupIdentifier,
    group: &Group,
    session: &Session,
) -> Result<Share, ProtocolError> {
    let round_one = group.round_one().ok_or(ProtocolError::NotReady {
        group: *group_id,
        state: MemberState::AwaitingR1Completion,
    })?;
    let own_index = resolve_own_index(group_id, group, session)?;

    Ok(primitive.combine(&session.key_material, own_index, &round_one)?)
}

/// Derives the group secret from the completed record.
pub fn derive_group_secret(
    primitive: &dyn KeyPrimitive,
    group_id: &GroupIdentifier,
    group: &Group,
    session: &Session,
) -> Result<GroupSecret, ProtocolError> {
    let not_ready = |state| ProtocolError::NotReady {
        group: *group_id,
        state,
    };
    let round_one = group
        .round_one()
        .ok_or_else(|| not_ready(MemberState::AwaitingR1Completion))?;
    let round_two = group
        .round_two()
        .ok_or_else(|| not_ready(MemberState::AwaitingR2Completion))?;
    let own_index = resolve_own_index(group_id, group, session)?;

    Ok(primitive.derive_secret(&session.key_material, own_index, &round_one, &round_two)?)
}

/// A group whose secret is known, ready to send and read transitions.
/// It only lives in memory, for as long as the caller keeps it.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub group_id: GroupIdentifier,
    pub members: Vec<Address>,
    pub secret: GroupSecret,
}

#[cfg(test)]
mod tests {
    use lib::{
        api::group::DeliveryStamp,
        crypto::{
            gdh::{BurmesterDesmedt, SEED_LENGTH},
            identity::Identity,
            random_bytes,
        },
    };

    use super::*;

    struct Fixture {
        id: GroupIdentifier,
        addresses: Vec<Address>,
        sessions: Vec<Session>,
        group: Group,
    }

    fn fixture(size: usize) -> Fixture {
        let id = GroupIdentifier::from(DeliveryStamp::generate());
        let addresses: Vec<Address> = (0..size).map(|_| Identity::generate().address()).collect();
        let sessions = (0..size)
            .map(|_| {
                let (key_material, r1_value) =
                    BurmesterDesmedt.generate(&random_bytes::<SEED_LENGTH>());
                Session {
                    group_id: id,
                    key_material,
                    r1_value,
                }
            })
            .collect();

        Fixture {
            id,
            group: Group::new(addresses.clone()),
            addresses,
            sessions,
        }
    }

    impl Fixture {
        fn state_of(&self, member: usize) -> MemberState {
            evaluate(
                &self.id,
                &self.group,
                &self.addresses[member],
                Some(&self.sessions[member]),
            )
            .expect("member of the group")
            .state
        }

        fn submit_r1(&mut self, member: usize) {
            self.group.r1[member] = Some(self.sessions[member].r1_value.clone());
        }

        fn submit_r2(&mut self, member: usize) {
            let share = compute_round_two(
                &BurmesterDesmedt,
                &self.id,
                &self.group,
                &self.sessions[member],
            )
            .expect("round one is complete");
            self.group.r2[member] = Some(share);
        }
    }

    #[test]
    fn states_follow_the_record() {
        let mut f = fixture(3);
        let outsider = Identity::generate().address();

        assert_eq!(
            evaluate(&f.id, &f.group, &f.addresses[0], None)
                .expect("member")
                .next,
            NextStep::Join,
            "A member without a session starts by joining"
        );
        assert!(matches!(
            evaluate(&f.id, &f.group, &outsider, None),
            Err(ProtocolError::NotAMember { .. })
        ));

        f.submit_r1(0);
        f.submit_r1(1);
        assert_eq!(f.state_of(0), MemberState::AwaitingR1Completion);
        assert_eq!(f.state_of(1), MemberState::AwaitingR1Completion);
        assert_eq!(f.state_of(2), MemberState::NotJoined);

        f.submit_r1(2);
        for member in 0..3 {
            assert_eq!(
                f.state_of(member),
                MemberState::AwaitingR2Completion,
                "Everyone moves on once round one is complete"
            );
        }

        f.submit_r2(0);
        let first = evaluate(&f.id, &f.group, &f.addresses[0], Some(&f.sessions[0]))
            .expect("member");
        assert_eq!(first.next, NextStep::Wait, "Round two was already submitted");

        f.submit_r2(1);
        f.submit_r2(2);
        assert_eq!(f.state_of(2), MemberState::SecretEstablished);
    }

    #[test]
    fn interrupted_join_resubmits_the_stored_share() {
        let f = fixture(2);

        let evaluation =
            evaluate(&f.id, &f.group, &f.addresses[0], Some(&f.sessions[0])).expect("member");

        assert_eq!(
            evaluation.next,
            NextStep::ResubmitRoundOne(f.sessions[0].r1_value.clone()),
            "Stored key material must be reused, not regenerated"
        );
    }

    #[test]
    fn round_two_waits_for_round_one() {
        let mut f = fixture(3);
        f.submit_r1(0);
        f.submit_r1(1);

        assert!(
            matches!(
                compute_round_two(&BurmesterDesmedt, &f.id, &f.group, &f.sessions[0]),
                Err(ProtocolError::NotReady {
                    state: MemberState::AwaitingR1Completion,
                    ..
                })
            ),
            "R2 must not be computed while an R1 share is missing"
        );
    }

    #[test]
    fn every_member_derives_the_same_secret() {
        let mut f = fixture(4);
        (0..4).for_each(|member| f.submit_r1(member));
        (0..4).for_each(|member| f.submit_r2(member));

        let secrets: Vec<GroupSecret> = f
            .sessions
            .iter()
            .map(|session| {
                derive_group_secret(&BurmesterDesmedt, &f.id, &f.group, session)
                    .expect("record is complete")
            })
            .collect();

        assert!(
            secrets.windows(2).all(|pair| pair[0] == pair[1]),
            "All members should agree on the secret"
        );
    }

    #[test]
    fn index_is_resolved_by_value() {
        let mut f = fixture(3);
        (0..3).for_each(|member| f.submit_r1(member));

        assert_eq!(
            resolve_own_index(&f.id, &f.group, &f.sessions[2]).expect("unique match"),
            2
        );

        let stranger = fixture(1).sessions.remove(0);
        assert!(
            matches!(
                resolve_own_index(&f.id, &f.group, &stranger),
                Err(ProtocolError::SessionMismatch { .. })
            ),
            "A session whose share is not in the record is a mismatch"
        );
    }

    #[test]
    fn duplicate_shares_fail_closed() {
        let mut f = fixture(3);
        (0..3).for_each(|member| f.submit_r1(member));
        f.group.r1[1] = f.group.r1[0].clone();

        assert!(
            matches!(
                resolve_own_index(&f.id, &f.group, &f.sessions[0]),
                Err(ProtocolError::SessionMismatch { .. })
            ),
            "Two matching shares must not resolve to the first one"
        );
        assert!(
            matches!(
                compute_round_two(&BurmesterDesmedt, &f.id, &f.group, &f.sessions[0]),
                Err(ProtocolError::SessionMismatch { .. })
            ),
            "No share may be computed from an ambiguous index"
        );
    }
}
