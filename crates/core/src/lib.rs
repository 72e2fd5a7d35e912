//! qrtag core - shared domain types.
//!
//! This crate provides the types used across all qrtag components:
//! - `server` - HTTP service for claiming codes and editing profiles
//! - `cli` - Command-line tools for migrations and code generation
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for codes, IDs, emails, profile fields and
//!   claim status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
