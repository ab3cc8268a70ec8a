//! Authentication route handlers.
//!
//! Handles login, registration, the confirmation link callback and logout
//! against the identity provider. Form failures redirect back to the form
//! with a short error code in the query string.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::db::CartRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::session_keys;
use crate::routes::{PageContext, safe_redirect_target};
use crate::services::identity::pkce_pair;
use crate::services::{AuthError, AuthService, Registration, SignedIn};
use crate::state::AppState;
use crate::stores::session::{load_cart, save_cart};

/// Where members land after signing in.
const DEFAULT_LANDING: &str = "/dashboard";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub redirect_to: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub redirect_to: Option<String>,
    pub error: Option<String>,
}

/// Query parameters for the register page.
#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

/// Query parameters of the confirmation link.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub redirect_to: Option<String>,
    pub error: Option<&'static str>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub error: Option<&'static str>,
}

/// "Check your inbox" page shown after a registration that needs email
/// confirmation.
#[derive(Template, WebTemplate)]
#[template(path = "auth/check_email.html")]
pub struct CheckEmailTemplate {
    pub ctx: PageContext,
    pub email: String,
}

// =============================================================================
// Error Codes
// =============================================================================

/// Query-string code for an auth failure.
const fn error_code(err: &AuthError) -> &'static str {
    match err {
        AuthError::InvalidEmail(_) => "email",
        AuthError::InvalidCredentials => "credentials",
        AuthError::UserAlreadyExists => "exists",
        AuthError::WeakPassword(_) => "password",
        AuthError::Rejected(_) => "rejected",
        AuthError::InvalidCode => "code",
        AuthError::MissingEmail | AuthError::Identity(_) | AuthError::Repository(_) => {
            "unavailable"
        }
    }
}

/// Text shown on the forms for an error code. Unknown codes show nothing.
fn error_message(code: Option<&str>) -> Option<&'static str> {
    let message = match code? {
        "credentials" => "Fel e-postadress eller lösenord",
        "email" => "Ogiltig e-postadress",
        "exists" => "Det finns redan ett konto med den e-postadressen",
        "password" => "Lösenordet måste vara minst 8 tecken",
        "mismatch" => "Lösenorden matchar inte",
        "code" => "Länken är ogiltig eller har gått ut",
        "rejected" => "Registreringen nekades, kontrollera uppgifterna",
        "unavailable" => "Inloggningen misslyckades, försök igen senare",
        _ => return None,
    };
    Some(message)
}

fn log_auth_failure(action: &'static str, err: &AuthError) {
    if err.is_server_error() {
        tracing::error!(action, error = %err, "Authentication failed");
    } else {
        tracing::info!(action, error = %err, "Authentication refused");
    }
}

fn login_error_redirect(code: &str, redirect_to: Option<&str>) -> Redirect {
    match redirect_to {
        Some(target) => Redirect::to(&format!(
            "/login?error={code}&redirect_to={}",
            urlencoding::encode(target)
        )),
        None => Redirect::to(&format!("/login?error={code}")),
    }
}

/// Put the member in the session and bring their remote cart in.
///
/// The remote cart is merged into the session cart and the merged result is
/// pushed back. If the remote cart cannot be read the session cart is kept
/// as is and nothing is pushed, so a database hiccup cannot wipe the stored
/// copy.
async fn complete_sign_in(state: &AppState, session: &Session, signed_in: &SignedIn) -> Result<()> {
    let user = &signed_in.user;
    set_current_user(session, user, &signed_in.access_token).await?;

    let mut cart = load_cart(session).await?;
    match CartRepository::new(state.pool()).load(user.id).await {
        Ok(remote) => {
            cart.merge_remote(remote);
            save_cart(session, &cart).await?;
            state.cart_sync().push(user.id, &cart);
        }
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Remote cart unavailable at sign-in");
        }
    }

    set_sentry_user(&user.id);
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(ctx: PageContext, Query(query): Query<LoginQuery>) -> impl IntoResponse {
    LoginTemplate {
        ctx,
        redirect_to: query.redirect_to,
        error: error_message(query.error.as_deref()),
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = AuthService::new(state.identity(), state.pool());
    let redirect_to = form.redirect_to.as_deref().filter(|t| !t.is_empty());

    let signed_in = match auth.login(&form.email, &form.password).await {
        Ok(signed_in) => signed_in,
        Err(e) => {
            log_auth_failure("login", &e);
            return login_error_redirect(error_code(&e), redirect_to).into_response();
        }
    };

    if let Err(e) = complete_sign_in(&state, &session, &signed_in).await {
        tracing::error!(error = %e, "Failed to store sign-in in session");
        return login_error_redirect("unavailable", redirect_to).into_response();
    }

    Redirect::to(safe_redirect_target(redirect_to, DEFAULT_LANDING)).into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(ctx: PageContext, Query(query): Query<ErrorQuery>) -> impl IntoResponse {
    RegisterTemplate {
        ctx,
        error: error_message(query.error.as_deref()),
    }
}

/// Handle registration form submission.
///
/// A PKCE pair is created per registration; the verifier stays in the
/// session until the confirmation link comes back to [`callback`].
pub async fn register(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.password_confirm {
        return Redirect::to("/register?error=mismatch").into_response();
    }

    let pkce = pkce_pair();
    if let Err(e) = session
        .insert(session_keys::PKCE_VERIFIER, &pkce.verifier)
        .await
    {
        tracing::error!(error = %e, "Failed to store PKCE verifier");
        return Redirect::to("/register?error=unavailable").into_response();
    }

    let callback_url = format!("{}/auth/callback", state.config().site_url);
    let auth = AuthService::new(state.identity(), state.pool());

    match auth
        .register(&form.email, &form.password, &pkce.challenge, &callback_url)
        .await
    {
        Ok(Registration::SignedIn(signed_in)) => {
            if let Err(e) = complete_sign_in(&state, &session, &signed_in).await {
                tracing::error!(error = %e, "Failed to store sign-in in session");
                return login_error_redirect("unavailable", None).into_response();
            }
            Redirect::to(DEFAULT_LANDING).into_response()
        }
        Ok(Registration::ConfirmationSent { email }) => {
            tracing::info!("Registration awaiting email confirmation");
            CheckEmailTemplate {
                ctx,
                email: email.to_string(),
            }
            .into_response()
        }
        Err(e) => {
            log_auth_failure("register", &e);
            Redirect::to(&format!("/register?error={}", error_code(&e))).into_response()
        }
    }
}

/// Landing page for confirmation and magic links.
///
/// Exchanges `code` (with the PKCE verifier from registration, if this
/// browser has one) for a session and signs the member in.
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        if let Some(description) = &query.error_description {
            tracing::info!(%description, "Auth callback without code");
        }
        return login_error_redirect("code", None).into_response();
    };

    let verifier = session
        .remove::<String>(session_keys::PKCE_VERIFIER)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read PKCE verifier");
            None
        });

    let auth = AuthService::new(state.identity(), state.pool());
    let signed_in = match auth.complete_callback(code, verifier.as_deref()).await {
        Ok(signed_in) => signed_in,
        Err(e) => {
            log_auth_failure("callback", &e);
            return login_error_redirect(error_code(&e), None).into_response();
        }
    };

    if let Err(e) = complete_sign_in(&state, &session, &signed_in).await {
        tracing::error!(error = %e, "Failed to store sign-in in session");
        return login_error_redirect("unavailable", None).into_response();
    }

    Redirect::to(safe_redirect_target(query.next.as_deref(), DEFAULT_LANDING)).into_response()
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out: drop the member from the session, revoke the provider session
/// and clear the local cart. The remote cart copy is kept for next time.
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    if let Some(token) = clear_current_user(&session).await? {
        AuthService::new(state.identity(), state.pool())
            .logout(&token)
            .await;
    }
    session.remove_value(session_keys::CART).await?;
    clear_sentry_user();

    Ok(Redirect::to("/"))
}
