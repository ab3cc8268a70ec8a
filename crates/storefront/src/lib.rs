//! Vitalis storefront library.
//!
//! Catalog and editorial pages, the visitor cart and wishlist, member
//! accounts backed by an external identity provider and the content
//! versioning API. The binary in `main.rs` adds tracing, Sentry and the
//! `PostgreSQL` session store on top of [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stores;
pub mod versioning;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::services::ServeDir;
use tower_sessions::SessionStore;

use crate::state::AppState;

/// Build the application router over a session store.
///
/// Layers, outermost first: request id, canonical host, session, auth gate,
/// security headers. `rate_limited` switches on the per-IP limiters (see
/// [`routes::routes`]).
pub fn app<S>(state: AppState, store: S, rate_limited: bool) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = middleware::create_session_layer(store, state.config());
    let static_files = ServeDir::new(&state.config().static_dir);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(rate_limited))
        .nest_service("/static", static_files)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::auth_gate))
        .layer(session_layer)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::canonical_host_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
