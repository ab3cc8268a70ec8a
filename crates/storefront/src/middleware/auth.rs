//! Authentication extractors and session helpers.
//!
//! The signed-in user lives in the server-side session under
//! [`session_keys::CURRENT_USER`]. Only that record authenticates a request;
//! a session cookie without it is anonymous.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// If nobody is signed in, page requests are redirected to the login page and
/// API requests get a 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hej, {}!", user.greeting_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when a request lacks the required session state.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to a login page (for HTML requests).
    RedirectTo(&'static str),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl AuthRejection {
    fn for_path(path: &str, login_page: &'static str) -> Self {
        if path.starts_with("/api/") {
            Self::Unauthorized
        } else {
            Self::RedirectTo(login_page)
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectTo(to) => Redirect::to(to).into_response(),
            Self::Unauthorized => {
                AppError::Unauthorized("Inloggning krävs".to_owned()).into_response()
            }
        }
    }
}

/// Read the signed-in user from a session. Backend errors count as
/// anonymous.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    match session.get::<CurrentUser>(session_keys::CURRENT_USER).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read current user from session");
            None
        }
    }
}

/// Whether the session belongs to a signed-in editor.
pub async fn is_editor(session: &Session) -> bool {
    session
        .get::<bool>(session_keys::EDITOR)
        .await
        .ok()
        .flatten()
        .unwrap_or(false)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let rejection = || AuthRejection::for_path(parts.uri.path(), "/login");

        let session = parts.extensions.get::<Session>().ok_or_else(rejection)?;
        let user = current_user(session).await.ok_or_else(rejection)?;

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the signed-in user.
///
/// Unlike `RequireAuth`, this does not reject anonymous requests.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Extractor that requires an editorial dashboard session.
pub struct RequireEditor;

impl<S> FromRequestParts<S> for RequireEditor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let rejection = AuthRejection::for_path(parts.uri.path(), "/editor/login");

        match parts.extensions.get::<Session>() {
            Some(session) if is_editor(session).await => Ok(Self),
            _ => Err(rejection),
        }
    }
}

/// Store the signed-in user and their access token in the session.
///
/// The session id is cycled first so a pre-login session id cannot be
/// reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
    access_token: &str,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    session.insert(session_keys::ACCESS_TOKEN, access_token).await
}

/// Remove the signed-in user from the session (logout). Returns the access
/// token that was stored, if any.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(
    session: &Session,
) -> Result<Option<String>, tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session.remove::<String>(session_keys::ACCESS_TOKEN).await
}

/// Mark the session as an editor session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_editor(session: &Session, editor: bool) -> Result<(), tower_sessions::session::Error> {
    if editor {
        session.cycle_id().await?;
        session.insert(session_keys::EDITOR, true).await
    } else {
        session.remove::<bool>(session_keys::EDITOR).await.map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use tower_sessions::MemoryStore;
    use vitalis_core::{Email, UserId};

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::generate(),
            email: Email::parse("maja@example.se").unwrap(),
            display_name: None,
        }
    }

    fn parts(path: &str, session: Option<Session>) -> Parts {
        let (mut parts, ()) = Request::builder().uri(path).body(()).unwrap().into_parts();
        if let Some(session) = session {
            parts.extensions.insert(session);
        }
        parts
    }

    #[tokio::test]
    async fn test_require_auth_redirects_pages_and_rejects_api() {
        let mut page = parts("/dashboard", Some(session()));
        let err = RequireAuth::from_request_parts(&mut page, &()).await.err().unwrap();
        assert!(matches!(err, AuthRejection::RedirectTo("/login")));

        let mut api = parts("/api/versioning", Some(session()));
        let err = RequireAuth::from_request_parts(&mut api, &()).await.err().unwrap();
        assert!(matches!(err, AuthRejection::Unauthorized));
    }

    #[tokio::test]
    async fn test_api_rejection_uses_error_envelope() {
        let response = AuthRejection::Unauthorized.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Inloggning krävs" }));
    }

    #[tokio::test]
    async fn test_set_and_clear_current_user() {
        let session = session();
        let user = user();
        set_current_user(&session, &user, "token-123").await.unwrap();

        let mut with_user = parts("/dashboard", Some(session.clone()));
        let RequireAuth(found) = RequireAuth::from_request_parts(&mut with_user, &())
            .await
            .ok()
            .unwrap();
        assert_eq!(found, user);

        assert_eq!(
            clear_current_user(&session).await.unwrap().as_deref(),
            Some("token-123")
        );
        let mut cleared = parts("/", Some(session));
        let OptionalAuth(found) = OptionalAuth::from_request_parts(&mut cleared, &())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_optional_auth_without_session_layer() {
        let mut bare = parts("/", None);
        let OptionalAuth(found) = OptionalAuth::from_request_parts(&mut bare, &()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_require_editor() {
        let session = session();
        let mut before = parts("/editor", Some(session.clone()));
        assert!(RequireEditor::from_request_parts(&mut before, &()).await.is_err());

        set_editor(&session, true).await.unwrap();
        assert!(is_editor(&session).await);
        let mut after = parts("/editor", Some(session.clone()));
        assert!(RequireEditor::from_request_parts(&mut after, &()).await.is_ok());

        set_editor(&session, false).await.unwrap();
        assert!(!is_editor(&session).await);
    }
}
