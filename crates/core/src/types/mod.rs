//! Core types for Vitalis.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod content;
pub mod email;
pub mod id;
pub mod price;
pub mod version;

pub use content::{ContentKey, ContentKeyError, ContentType};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use version::ContentVersion;
