use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a state transition is not legal from the current
/// state. The messages match the user-facing wording of the API layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("account is already blocked")]
    AlreadyBlocked,
    #[error("account is already unblocked")]
    AlreadyUnblocked,
    #[error("account is already verified")]
    AlreadyVerified,
    #[error("account is already unverified")]
    AlreadyUnverified,
}

/// Account lifecycle state. Two orthogonal axes collapsed into one tag:
/// (unverified | verified | invited) x (blocked | not blocked).
///
/// All mutation goes through the transition methods below; every state is
/// transitional, there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    Unverified,
    Verified,
    Invited,
    BlockedUnverified,
    BlockedVerified,
    BlockedInvited,
}

impl AccountState {
    /// Initial state for a new account: invited accounts have no password
    /// yet, everyone else starts unverified.
    pub fn initial(invited: bool) -> Self {
        if invited {
            Self::Invited
        } else {
            Self::Unverified
        }
    }

    pub fn block(self) -> Result<Self, StateError> {
        match self {
            Self::Unverified => Ok(Self::BlockedUnverified),
            Self::Verified => Ok(Self::BlockedVerified),
            Self::Invited => Ok(Self::BlockedInvited),
            Self::BlockedUnverified | Self::BlockedVerified | Self::BlockedInvited => {
                Err(StateError::AlreadyBlocked)
            }
        }
    }

    pub fn unblock(self) -> Result<Self, StateError> {
        match self {
            Self::BlockedUnverified => Ok(Self::Unverified),
            Self::BlockedVerified => Ok(Self::Verified),
            Self::BlockedInvited => Ok(Self::Invited),
            Self::Unverified | Self::Verified | Self::Invited => Err(StateError::AlreadyUnblocked),
        }
    }

    pub fn verify(self) -> Result<Self, StateError> {
        match self {
            Self::Unverified | Self::Invited => Ok(Self::Verified),
            Self::BlockedUnverified | Self::BlockedInvited => Ok(Self::BlockedVerified),
            Self::Verified | Self::BlockedVerified => Err(StateError::AlreadyVerified),
        }
    }

    pub fn unverify(self) -> Result<Self, StateError> {
        match self {
            Self::Verified => Ok(Self::Unverified),
            Self::BlockedVerified => Ok(Self::BlockedUnverified),
            _ => Err(StateError::AlreadyUnverified),
        }
    }

    pub fn is_blocked(self) -> bool {
        matches!(
            self,
            Self::BlockedUnverified | Self::BlockedVerified | Self::BlockedInvited
        )
    }

    pub fn is_invited(self) -> bool {
        matches!(self, Self::Invited | Self::BlockedInvited)
    }

    pub fn is_verified(self) -> bool {
        matches!(self, Self::Verified | Self::BlockedVerified)
    }

    pub fn is_unverified(self) -> bool {
        matches!(self, Self::Unverified | Self::BlockedUnverified)
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Unverified => "unverified",
            Self::Verified => "verified",
            Self::Invited => "invited",
            Self::BlockedUnverified => "blocked_unverified",
            Self::BlockedVerified => "blocked_verified",
            Self::BlockedInvited => "blocked_invited",
        };
        f.write_str(tag)
    }
}

impl FromStr for AccountState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(Self::Unverified),
            "verified" => Ok(Self::Verified),
            "invited" => Ok(Self::Invited),
            "blocked_unverified" => Ok(Self::BlockedUnverified),
            "blocked_verified" => Ok(Self::BlockedVerified),
            "blocked_invited" => Ok(Self::BlockedInvited),
            other => Err(format!("unknown account state: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for AccountState {
        fn arbitrary(g: &mut Gen) -> Self {
            *g.choose(&[
                AccountState::Unverified,
                AccountState::Verified,
                AccountState::Invited,
                AccountState::BlockedUnverified,
                AccountState::BlockedVerified,
                AccountState::BlockedInvited,
            ])
            .expect("non-empty slice")
        }
    }

    #[quickcheck]
    fn block_then_unblock_round_trips(state: AccountState) -> bool {
        match state.block() {
            Ok(blocked) => blocked.unblock() == Ok(state),
            // Blocked inputs must fail loudly, not silently no-op.
            Err(err) => state.is_blocked() && err == StateError::AlreadyBlocked,
        }
    }

    #[quickcheck]
    fn string_form_round_trips(state: AccountState) -> bool {
        state.to_string().parse() == Ok(state)
    }

    #[test]
    fn verify_rejects_a_second_call() {
        let verified = AccountState::Unverified.verify().unwrap();
        assert_eq!(verified, AccountState::Verified);
        assert_eq!(verified.verify(), Err(StateError::AlreadyVerified));
    }

    #[test]
    fn verify_keeps_the_blocked_axis() {
        assert_eq!(
            AccountState::BlockedUnverified.verify(),
            Ok(AccountState::BlockedVerified)
        );
        assert_eq!(
            AccountState::BlockedInvited.verify(),
            Ok(AccountState::BlockedVerified)
        );
    }

    #[test]
    fn invited_verifies_to_verified() {
        assert_eq!(AccountState::Invited.verify(), Ok(AccountState::Verified));
    }

    #[test]
    fn unverify_only_applies_to_verified_states() {
        assert_eq!(
            AccountState::Verified.unverify(),
            Ok(AccountState::Unverified)
        );
        assert_eq!(
            AccountState::BlockedVerified.unverify(),
            Ok(AccountState::BlockedUnverified)
        );
        assert_eq!(
            AccountState::Invited.unverify(),
            Err(StateError::AlreadyUnverified)
        );
        assert_eq!(
            AccountState::Unverified.unverify(),
            Err(StateError::AlreadyUnverified)
        );
    }

    #[test]
    fn unblock_rejects_unblocked_states() {
        for state in [
            AccountState::Unverified,
            AccountState::Verified,
            AccountState::Invited,
        ] {
            assert_eq!(state.unblock(), Err(StateError::AlreadyUnblocked));
        }
    }

    #[test]
    fn predicates_partition_the_states() {
        for state in [
            AccountState::Unverified,
            AccountState::Verified,
            AccountState::Invited,
            AccountState::BlockedUnverified,
            AccountState::BlockedVerified,
            AccountState::BlockedInvited,
        ] {
            // Exactly one of the three axis predicates holds.
            let axes = [state.is_unverified(), state.is_verified(), state.is_invited()];
            assert_eq!(axes.iter().filter(|p| **p).count(), 1, "{state}");
        }
        assert!(AccountState::BlockedInvited.is_blocked());
        assert!(!AccountState::Invited.is_blocked());
    }
}
