//! Domain models for the storefront.
//!
//! Catalog records live in [`crate::content`] and cart/wishlist items in
//! [`crate::stores`]; this module holds the signed-in user and profile types.

pub mod profile;
pub mod session;

pub use profile::{ProfilePreferences, ProfileUpdate, SkinType, UserProfile};
pub use session::{CurrentUser, keys as session_keys};
