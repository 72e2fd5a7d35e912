//! Claim status of a code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Observable state of a [`Code`](crate::Code).
///
/// Derived from the profile table rather than stored: a code is claimed
/// exactly when a profile row references it. `Claimed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClaimStatus {
    Unclaimed,
    Claimed {
        /// Account the code is bound to.
        claimed_by: AccountId,
        /// When the binding was recorded.
        claimed_at: DateTime<Utc>,
    },
}

impl ClaimStatus {
    /// Whether the code is bound to an account.
    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_claimed() {
        assert!(!ClaimStatus::Unclaimed.is_claimed());
        let claimed = ClaimStatus::Claimed {
            claimed_by: AccountId::generate(),
            claimed_at: Utc::now(),
        };
        assert!(claimed.is_claimed());
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(ClaimStatus::Unclaimed).unwrap();
        assert_eq!(json["state"], "unclaimed");
    }
}
