//! Vitalis Core - Shared types library.
//!
//! This crate provides common types used across all Vitalis components:
//! - `storefront` - Public-facing shop, content pages and versioning API
//! - `cli` - Command-line tools for migrations and content checks
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, content keys and
//!   content versions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
