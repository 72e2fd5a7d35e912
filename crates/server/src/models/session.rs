//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use qrtag_core::{AccountId, Email};

/// Session-stored account identity.
///
/// Passed explicitly into every account-scoped operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Account identifier issued by the auth provider.
    pub id: AccountId,
    /// Account email address.
    pub email: Email,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in account.
    pub const CURRENT_USER: &str = "current_user";
}
