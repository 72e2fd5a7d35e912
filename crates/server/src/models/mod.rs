//! Domain models for the qrtag server.

pub mod profile;
pub mod session;

pub use profile::{ClaimRecord, NewProfile, Profile, ProfilePatch, PublicProfile, SocialLink};
pub use session::{CurrentUser, keys as session_keys};
