//! Route gate: sends anonymous visitors away from account pages and signed-in
//! users away from the login and registration forms.
//!
//! Runs after the session layer and before routing. Authentication is decided
//! by the session alone; the gate never calls the identity provider.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::auth::current_user;

/// Prefixes that need a signed-in user.
const PROTECTED_PREFIXES: &[&str] = &["/dashboard", "/profile", "/orders"];

/// Prefixes only meant for anonymous visitors.
const AUTH_ONLY_PREFIXES: &[&str] = &["/login", "/register"];

/// Where signed-in users land when they open an auth-only page.
pub const SIGNED_IN_HOME: &str = "/dashboard";

/// How the gate treats a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    AuthOnly,
    Public,
}

/// What the gate does with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    /// Redirect to the login page, remembering where the visitor was going.
    Login { redirect_to: String },
    /// Redirect a signed-in user to their dashboard.
    Dashboard,
}

/// Whether `path` is `prefix` or lies below it (`/dashboard/x` but not
/// `/dashboards`).
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Classify a request path.
#[must_use]
pub fn classify(path: &str) -> RouteClass {
    if PROTECTED_PREFIXES.iter().any(|prefix| under(path, prefix)) {
        RouteClass::Protected
    } else if AUTH_ONLY_PREFIXES.iter().any(|prefix| under(path, prefix)) {
        RouteClass::AuthOnly
    } else {
        RouteClass::Public
    }
}

/// Decide what to do with a request. `path_and_query` is what the visitor
/// asked for and is carried through the login page.
#[must_use]
pub fn decide(class: RouteClass, authenticated: bool, path_and_query: &str) -> GateDecision {
    match (class, authenticated) {
        (RouteClass::Protected, false) => GateDecision::Login {
            redirect_to: path_and_query.to_owned(),
        },
        (RouteClass::AuthOnly, true) => GateDecision::Dashboard,
        _ => GateDecision::Pass,
    }
}

/// Login URL that returns the visitor to `redirect_to` afterwards.
#[must_use]
pub fn login_url(redirect_to: &str) -> String {
    format!("/login?redirect_to={}", urlencoding::encode(redirect_to))
}

/// Middleware applying [`decide`] to every request.
///
/// Requests without a session (layer missing or session backend down) are
/// treated as anonymous.
pub async fn auth_gate(request: Request, next: Next) -> Response {
    let class = classify(request.uri().path());
    if class == RouteClass::Public {
        return next.run(request).await;
    }

    let authenticated = match request.extensions().get::<Session>() {
        Some(session) => current_user(session).await.is_some(),
        None => false,
    };

    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_owned(), |pq| pq.as_str().to_owned());

    match decide(class, authenticated, &path_and_query) {
        GateDecision::Pass => next.run(request).await,
        GateDecision::Login { redirect_to } => {
            tracing::debug!(path = %redirect_to, "Anonymous request to protected route");
            Redirect::to(&login_url(&redirect_to)).into_response()
        }
        GateDecision::Dashboard => Redirect::to(SIGNED_IN_HOME).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header::LOCATION},
        routing::get,
    };
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("/dashboard"), RouteClass::Protected);
        assert_eq!(classify("/dashboard/settings"), RouteClass::Protected);
        assert_eq!(classify("/profile"), RouteClass::Protected);
        assert_eq!(classify("/orders/17"), RouteClass::Protected);
        assert_eq!(classify("/login"), RouteClass::AuthOnly);
        assert_eq!(classify("/register"), RouteClass::AuthOnly);
        assert_eq!(classify("/"), RouteClass::Public);
        assert_eq!(classify("/products/retinol-serum"), RouteClass::Public);
        assert_eq!(classify("/dashboards"), RouteClass::Public);
        assert_eq!(classify("/logins"), RouteClass::Public);
        assert_eq!(classify("/logout"), RouteClass::Public);
    }

    #[test]
    fn test_decide() {
        assert_eq!(
            decide(RouteClass::Protected, false, "/orders?page=2"),
            GateDecision::Login {
                redirect_to: "/orders?page=2".to_owned()
            }
        );
        assert_eq!(decide(RouteClass::Protected, true, "/orders"), GateDecision::Pass);
        assert_eq!(decide(RouteClass::AuthOnly, true, "/login"), GateDecision::Dashboard);
        assert_eq!(decide(RouteClass::AuthOnly, false, "/login"), GateDecision::Pass);
        assert_eq!(decide(RouteClass::Public, false, "/"), GateDecision::Pass);
        assert_eq!(decide(RouteClass::Public, true, "/"), GateDecision::Pass);
    }

    #[test]
    fn test_login_url_encodes_target() {
        assert_eq!(
            login_url("/orders?page=2&sort=new"),
            "/login?redirect_to=%2Forders%3Fpage%3D2%26sort%3Dnew"
        );
    }

    fn app() -> Router {
        Router::new()
            .route("/dashboard", get(|| async { "panel" }))
            .route("/login", get(|| async { "login" }))
            .route("/", get(|| async { "home" }))
            .layer(axum::middleware::from_fn(auth_gate))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn test_anonymous_dashboard_redirects_to_login() {
        let response = app()
            .oneshot(axum::http::Request::get("/dashboard?tab=kurser").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "/login?redirect_to=%2Fdashboard%3Ftab%3Dkurser"
        );
    }

    #[tokio::test]
    async fn test_anonymous_login_and_public_pass() {
        for path in ["/login", "/"] {
            let response = app()
                .oneshot(axum::http::Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
    }

    #[tokio::test]
    async fn test_missing_session_layer_counts_as_anonymous() {
        let app = Router::new()
            .route("/dashboard", get(|| async { "panel" }))
            .layer(axum::middleware::from_fn(auth_gate));
        let response = app
            .oneshot(axum::http::Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
