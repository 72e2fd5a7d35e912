//! Core types for qrtag.
//!
//! This module provides type-safe wrappers for the domain concepts shared by
//! the claim lifecycle and the profile editor.

pub mod code;
pub mod email;
pub mod id;
pub mod photo;
pub mod profile;
pub mod status;

pub use code::{Code, CodeError};
pub use email::{Email, EmailError};
pub use id::*;
pub use photo::PhotoRef;
pub use profile::{Age, AgeError, SocialHandle, SocialPlatform};
pub use status::ClaimStatus;
