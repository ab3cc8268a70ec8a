//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//!
//! # Catalog
//! GET  /products, /products/{slug}
//! GET  /treatments, /treatments/{slug}
//! GET  /courses, /courses/{slug}
//!
//! # Editorial
//! GET  /articles, /articles/{slug}
//! GET  /blog, /blog/{slug}
//! GET  /forum, /forum/{slug}
//!
//! # Cart and wishlist (forms, redirect back)
//! GET  /cart                   - Cart page
//! POST /cart/add, /cart/update, /cart/remove, /cart/clear
//! GET  /cart/count             - `{"count": n}`
//! GET  /wishlist
//! POST /wishlist/add, /wishlist/remove, /wishlist/toggle
//!
//! # Auth
//! GET  /login, POST /login
//! GET  /register, POST /register
//! POST /logout
//! GET  /auth/callback          - Confirmation / magic link landing
//!
//! # Members (auth gate)
//! GET  /dashboard
//! POST /profile
//!
//! # Editorial dashboard
//! GET  /editor, GET/POST /editor/login, POST /editor/logout
//!
//! # API
//! GET  /api/versioning, POST /api/versioning
//! ```

pub mod account;
pub mod api;
pub mod articles;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod editor;
pub mod forum;
pub mod home;
pub mod wishlist;

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::filters;
use crate::middleware::{auth_rate_limiter, current_user, is_editor};
use crate::models::CurrentUser;
use crate::state::AppState;
use crate::stores::session::{load_cart, load_wishlist};

/// Data every page needs for the header: who is signed in and how much is
/// in the cart and wishlist.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub wishlist_count: usize,
    pub is_editor: bool,
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        let cart_count = load_cart(session)
            .await
            .map(|cart| cart.total_quantity())
            .unwrap_or_default();
        let wishlist_count = load_wishlist(session)
            .await
            .map(|wishlist| wishlist.count())
            .unwrap_or_default();

        Ok(Self {
            user: current_user(session).await,
            cart_count,
            wishlist_count,
            is_editor: is_editor(session).await,
        })
    }
}

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub ctx: PageContext,
}

/// Render the 404 page.
#[must_use]
pub fn not_found(ctx: PageContext) -> Response {
    (StatusCode::NOT_FOUND, NotFoundTemplate { ctx }).into_response()
}

/// Fallback for unknown paths.
pub async fn fallback(ctx: PageContext) -> Response {
    not_found(ctx)
}

/// Create the catalog routes.
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::products))
        .route("/products/{slug}", get(catalog::product))
        .route("/treatments", get(catalog::treatments))
        .route("/treatments/{slug}", get(catalog::treatment))
        .route("/courses", get(catalog::courses))
        .route("/courses/{slug}", get(catalog::course))
}

/// Create the editorial content routes.
fn editorial_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(articles::article_index))
        .route("/articles/{slug}", get(articles::article))
        .route("/blog", get(articles::blog_index))
        .route("/blog/{slug}", get(articles::blog_post))
        .route("/forum", get(forum::index))
        .route("/forum/{slug}", get(forum::show))
}

/// Create the cart routes.
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the wishlist routes.
fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/add", post(wishlist::add))
        .route("/remove", post(wishlist::remove))
        .route("/toggle", post(wishlist::toggle))
}

/// Create the credential form routes (rate limited in production).
fn credential_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/editor/login", post(editor::login))
}

/// Create the member, auth and editor page routes.
fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .route("/auth/callback", get(auth::callback))
        .route("/dashboard", get(account::dashboard))
        .route("/profile", post(account::update_profile))
        .route("/editor", get(editor::index))
        .route("/editor/login", get(editor::login_page))
        .route("/editor/logout", post(editor::logout))
}

/// Create all page and API routes.
///
/// With `rate_limited` set, the API and the credential forms get per-IP
/// governor limits. The limiters key on proxy headers, so tests leave them
/// off.
pub fn routes(rate_limited: bool) -> Router<AppState> {
    let credentials = if rate_limited {
        credential_routes().layer(auth_rate_limiter())
    } else {
        credential_routes()
    };

    Router::new()
        .route("/", get(home::home))
        .merge(catalog_routes())
        .merge(editorial_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .merge(credentials)
        .merge(account_routes())
        .nest("/api", api::routes(rate_limited))
        .fallback(fallback)
}

/// Accept only same-site relative targets for redirects.
///
/// Anything else falls back to `default`: absolute URLs, protocol-relative
/// `//host` and `/\host`, backslashes, and any whitespace or control
/// character (browsers strip tabs and newlines before resolving, so
/// `/\t/host` would become `//host`).
#[must_use]
pub fn safe_redirect_target<'a>(target: Option<&'a str>, default: &'a str) -> &'a str {
    match target {
        Some(t) if is_local_path(t) => t,
        _ => default,
    }
}

fn is_local_path(target: &str) -> bool {
    let mut chars = target.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/' | '\\'))
        && !target
            .chars()
            .any(|c| c == '\\' || c.is_whitespace() || c.is_control())
}
