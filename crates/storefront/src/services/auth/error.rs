//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::identity::IdentityError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] vitalis_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The provider refused the request for a reason the user can fix.
    #[error("rejected by identity provider: {0}")]
    Rejected(String),

    /// The confirmation link is invalid, expired or was already used.
    #[error("invalid or expired auth code")]
    InvalidCode,

    /// The provider returned a user without an email address.
    #[error("identity provider returned no email for user")]
    MissingEmail,

    /// The identity provider failed.
    #[error("identity provider error: {0}")]
    Identity(#[from] IdentityError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    /// Message safe to show on the login and register forms.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Ogiltig e-postadress".to_owned(),
            Self::InvalidCredentials => "Fel e-postadress eller lösenord".to_owned(),
            Self::UserAlreadyExists => "Det finns redan ett konto med den e-postadressen".to_owned(),
            Self::WeakPassword(msg) | Self::Rejected(msg) => msg.clone(),
            Self::InvalidCode => "Länken är ogiltig eller har gått ut".to_owned(),
            Self::MissingEmail | Self::Identity(_) | Self::Repository(_) => {
                "Inloggningen misslyckades, försök igen senare".to_owned()
            }
        }
    }

    /// Whether this is our fault (or the provider's) rather than the user's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::MissingEmail | Self::Identity(_) | Self::Repository(_)
        )
    }
}
