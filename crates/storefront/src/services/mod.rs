//! Business logic services for storefront.
//!
//! - `identity` - HTTP client for the identity provider's auth API
//! - `auth` - Sign-in, sign-up and auth callback on top of `identity`,
//!   including lazy profile creation

pub mod auth;
pub mod identity;

pub use auth::{AuthError, AuthService, Registration, SignedIn};
pub use identity::{IdentityClient, IdentityError};
