//! qrtag server library.
//!
//! This crate provides the server functionality as a library, allowing it to
//! be tested and reused.
//!
//! # Layers
//!
//! - [`media`] - size-bounded JPEG encoding and photo replacement
//! - [`services`] - claim ledger, registration binder, profile editor, auth
//! - [`db`] / [`storage`] - data store and object store capabilities
//! - [`routes`] / [`middleware`] - the HTTP surface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
