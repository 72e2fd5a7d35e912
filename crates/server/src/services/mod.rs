//! Business logic for the claim lifecycle and profile editing.

pub mod auth;
pub mod binder;
pub mod claims;
pub mod editor;
pub mod guard;

pub use auth::{AuthError, AuthProvider, MemoryAuthProvider, PgAuthProvider, validate_password};
pub use binder::{BindError, CodeGenerator, ProfileBinder};
pub use claims::{ClaimError, ClaimLedger};
pub use editor::{EditError, ProfileEditor, ProfileForm};
pub use guard::{ActionGuard, ActionPermit};
