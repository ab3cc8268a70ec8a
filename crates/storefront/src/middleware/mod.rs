//! HTTP middleware stack for the site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID
//! 4. Canonical host (`www.` redirect)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Auth gate (protected and auth-only routes)
//! 7. Security headers
//! 8. Rate limiting on `/api` and credential forms (governor)

pub mod auth;
pub mod canonical_host;
pub mod gate;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, RequireEditor, clear_current_user, current_user, is_editor,
    set_current_user, set_editor,
};
pub use canonical_host::canonical_host_middleware;
pub use gate::auth_gate;
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
