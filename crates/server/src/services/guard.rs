//! Per-account reentrancy guard.

use std::sync::Arc;

use dashmap::DashSet;

use qrtag_core::AccountId;

/// Set of accounts with an action in flight.
///
/// [`ActionGuard::try_acquire`] hands out at most one [`ActionPermit`] per
/// account; the account is released when the permit drops, including on
/// early returns and errors.
#[derive(Debug, Clone, Default)]
pub struct ActionGuard {
    active: Arc<DashSet<AccountId>>,
}

impl ActionGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `account` busy, or return `None` if it already is.
    #[must_use]
    pub fn try_acquire(&self, account: AccountId) -> Option<ActionPermit> {
        self.active.insert(account).then(|| ActionPermit {
            active: Arc::clone(&self.active),
            account,
        })
    }

    /// Whether `account` currently holds a permit.
    #[must_use]
    pub fn is_busy(&self, account: AccountId) -> bool {
        self.active.contains(&account)
    }
}

/// Proof that an account's action is in flight.
#[derive(Debug)]
pub struct ActionPermit {
    active: Arc<DashSet<AccountId>>,
    account: AccountId,
}

impl Drop for ActionPermit {
    fn drop(&mut self) {
        self.active.remove(&self.account);
    }
}
