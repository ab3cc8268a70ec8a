//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use vitalis_core::{Email, UserId};

/// Session-stored user identity.
///
/// Written once the identity provider has accepted the sign-in. The auth gate
/// treats a request as authenticated only when this record exists in the
/// server-side session, a bare cookie is not enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity provider user ID (also the profile ID).
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Name shown in the header, if the profile has one.
    pub display_name: Option<String>,
}

impl CurrentUser {
    /// Name to greet the user with.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }
}

/// Session keys for authentication and visitor state.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the identity provider access token of the signed-in user.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Key for the PKCE code verifier issued at sign-up.
    pub const PKCE_VERIFIER: &str = "pkce_verifier";

    /// Key marking the session as an editorial dashboard session.
    pub const EDITOR: &str = "editor";

    /// Key for the serialized cart store.
    pub const CART: &str = "cart";

    /// Key for the serialized wishlist store.
    pub const WISHLIST: &str = "wishlist";
}
