//! Identity provider client.
//!
//! Talks to a GoTrue-compatible auth API (the backend-as-a-service that owns
//! user accounts). Every request carries the project's public `apikey`;
//! user-scoped calls additionally send the user's access token as bearer.
//!
//! # Sign-up flow
//!
//! 1. [`pkce_pair`] creates a verifier/challenge pair; the verifier is stored
//!    in the visitor's session.
//! 2. [`IdentityClient::sign_up`] sends the challenge. The provider either
//!    signs the user in right away or mails a confirmation link.
//! 3. The link lands on `/auth/callback?code=...`, which calls
//!    [`IdentityClient::exchange_code`] with the stored verifier.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use thiserror::Error;

use vitalis_core::UserId;

use crate::config::BackendConfig;

/// Timeout for every identity provider request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Length of generated PKCE verifiers (RFC 7636 allows 43..=128).
const PKCE_VERIFIER_LENGTH: usize = 64;

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The request did not complete.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("identity provider rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
}

impl IdentityError {
    /// Status code of a rejection, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Http(_) => None,
        }
    }
}

/// A user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens for a signed-in user.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: IdentityUser,
}

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Email confirmation is disabled and the user is signed in.
    SignedIn(IdentitySession),
    /// A confirmation link was mailed to the user.
    ConfirmationSent(IdentityUser),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(IdentitySession),
    User(IdentityUser),
}

/// Error payloads differ between provider versions.
#[derive(Deserialize, Default)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    code_challenge: &'a str,
    code_challenge_method: &'a str,
}

#[derive(Serialize)]
struct PkceGrant<'a> {
    auth_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

/// A PKCE verifier and its S256 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

/// Generate a fresh PKCE pair.
#[must_use]
pub fn pkce_pair() -> PkcePair {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
    let mut rng = rand::rng();
    let verifier: String = (0..PKCE_VERIFIER_LENGTH)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())).copied())
        .map(char::from)
        .collect();
    let challenge = pkce_challenge(&verifier);
    PkcePair {
        verifier,
        challenge,
    }
}

/// S256 challenge for `verifier`.
#[must_use]
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Client for the identity provider's auth API.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.inner.base_url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl IdentityClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Http` if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("vitalis-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                base_url: config.url.trim_end_matches('/').to_owned(),
                anon_key: config.anon_key.clone(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{path}", self.inner.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str, bearer: Option<&str>) -> reqwest::RequestBuilder {
        let key = self.inner.anon_key.expose_secret();
        self.inner
            .client
            .request(method, self.url(path))
            .header("apikey", key)
            .bearer_auth(bearer.unwrap_or(key))
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Rejected` for wrong credentials (400/401/422)
    /// and other provider errors.
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let request = self
            .request(reqwest::Method::POST, "/token?grant_type=password", None)
            .json(&PasswordGrant { email, password });
        send(request).await
    }

    /// Register a new account. `code_challenge` is the S256 PKCE challenge and
    /// `redirect_to` the absolute callback URL used in the confirmation mail.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Rejected` if the provider refuses the sign-up
    /// (existing account, weak password, ...).
    #[tracing::instrument(skip(self, password, code_challenge))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        code_challenge: &str,
        redirect_to: &str,
    ) -> Result<SignUpOutcome, IdentityError> {
        let path = format!("/signup?redirect_to={}", urlencoding::encode(redirect_to));
        let request = self
            .request(reqwest::Method::POST, &path, None)
            .json(&SignUpRequest {
                email,
                password,
                code_challenge,
                code_challenge_method: "s256",
            });

        Ok(match send::<SignUpResponse>(request).await? {
            SignUpResponse::Session(session) => SignUpOutcome::SignedIn(session),
            SignUpResponse::User(user) => SignUpOutcome::ConfirmationSent(user),
        })
    }

    /// Exchange an auth code from a confirmation link for a session.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Rejected` if the code is invalid or expired.
    #[tracing::instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: Option<&str>,
    ) -> Result<IdentitySession, IdentityError> {
        let request = self
            .request(reqwest::Method::POST, "/token?grant_type=pkce", None)
            .json(&PkceGrant {
                auth_code,
                code_verifier,
            });
        send(request).await
    }

    /// Look up the user an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Rejected` (401) if the token is invalid.
    #[tracing::instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        send(self.request(reqwest::Method::GET, "/user", Some(access_token))).await
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached or refuses.
    #[tracing::instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .request(reqwest::Method::POST, "/logout", Some(access_token))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, IdentityError> {
    let response = check_status(request.send().await?).await?;
    Ok(response.json().await?)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or(text);
    tracing::debug!(%status, %message, "Identity provider rejected request");
    Err(IdentityError::Rejected { status, message })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    pub(crate) const USER_ID: &str = "3f2b6c1e-8d6a-4c3b-9a51-2f7e0d9c4b11";

    fn authorized(headers: &HeaderMap, token: &str) -> bool {
        headers.get("apikey").is_some_and(|v| v == "anon")
            && headers
                .get("authorization")
                .is_some_and(|v| v.to_str().unwrap() == format!("Bearer {token}"))
    }

    fn session_json(email: &str) -> Value {
        json!({
            "access_token": "token-123",
            "refresh_token": "refresh-123",
            "expires_in": 3600,
            "user": { "id": USER_ID, "email": email }
        })
    }

    async fn token(
        Query(params): Query<std::collections::HashMap<String, String>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers, "anon") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"message": "no key"})));
        }
        match params.get("grant_type").map(String::as_str) {
            Some("password") if body["password"] == "rätt-lösenord" => {
                (StatusCode::OK, Json(session_json(body["email"].as_str().unwrap())))
            }
            Some("password") => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
            ),
            Some("pkce") if body["auth_code"] == "good-code" && body["code_verifier"] == "verifier" => {
                (StatusCode::OK, Json(session_json("maja@example.se")))
            }
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({"msg": "invalid flow state"})),
            ),
        }
    }

    async fn signup(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        match body["email"].as_str() {
            Some("taken@example.se") => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"code": 422, "msg": "User already registered"})),
            ),
            Some("instant@example.se") => (StatusCode::OK, Json(session_json("instant@example.se"))),
            Some(email) => (StatusCode::OK, Json(json!({"id": USER_ID, "email": email}))),
            None => (StatusCode::BAD_REQUEST, Json(json!({}))),
        }
    }

    async fn user(headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if authorized(&headers, "token-123") {
            (StatusCode::OK, Json(json!({"id": USER_ID, "email": "maja@example.se"})))
        } else {
            (StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid JWT"})))
        }
    }

    /// Serve a fake identity provider and return its base URL.
    pub(crate) async fn spawn_fake_provider() -> String {
        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/user", get(user))
            .route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    pub(crate) fn client_for(url: String) -> IdentityClient {
        IdentityClient::new(&BackendConfig {
            url,
            anon_key: SecretString::from("anon"),
        })
        .unwrap()
    }

    #[test]
    fn test_pkce_challenge_matches_rfc_example() {
        // RFC 7636, appendix B
        assert_eq!(
            pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGwSJRMd2k"
        );
    }

    #[test]
    fn test_pkce_pair_shape() {
        let pair = pkce_pair();
        assert_eq!(pair.verifier.len(), PKCE_VERIFIER_LENGTH);
        assert_eq!(pair.challenge, pkce_challenge(&pair.verifier));
        assert_ne!(pair.verifier, pkce_pair().verifier);
    }

    #[tokio::test]
    async fn test_sign_in_with_password() {
        let client = client_for(spawn_fake_provider().await);
        let session = client
            .sign_in_with_password("maja@example.se", "rätt-lösenord")
            .await
            .unwrap();
        assert_eq!(session.access_token, "token-123");
        assert_eq!(session.user.id.to_string(), USER_ID);
    }

    #[tokio::test]
    async fn test_sign_in_rejected_carries_description() {
        let client = client_for(spawn_fake_provider().await);
        let err = client
            .sign_in_with_password("maja@example.se", "fel")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert!(err.to_string().contains("Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_sign_up_outcomes() {
        let client = client_for(spawn_fake_provider().await);
        let redirect = "https://vitalis.test/auth/callback";

        let outcome = client
            .sign_up("ny@example.se", "långt-lösenord", "challenge", redirect)
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::ConfirmationSent(_)));

        let outcome = client
            .sign_up("instant@example.se", "långt-lösenord", "challenge", redirect)
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));

        let err = client
            .sign_up("taken@example.se", "långt-lösenord", "challenge", redirect)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(err.to_string().contains("User already registered"));
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let client = client_for(spawn_fake_provider().await);
        assert!(client.exchange_code("good-code", Some("verifier")).await.is_ok());
        assert!(client.exchange_code("good-code", None).await.is_err());
    }

    #[tokio::test]
    async fn test_get_user_and_sign_out() {
        let client = client_for(spawn_fake_provider().await);
        let user = client.get_user("token-123").await.unwrap();
        assert_eq!(user.email.as_deref(), Some("maja@example.se"));
        assert!(client.get_user("stale").await.is_err());
        client.sign_out("token-123").await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_http_error() {
        let client = client_for("http://127.0.0.1:9".to_owned());
        let err = client.get_user("token").await.unwrap_err();
        assert!(matches!(err, IdentityError::Http(_)));
    }
}
