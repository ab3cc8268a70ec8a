//! Canonical host redirect.
//!
//! Requests addressed to `www.<host>` are permanently redirected to `<host>`
//! with the same path and query, so every page has one public URL.

use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::state::AppState;

const WWW_PREFIX: &str = "www.";

/// Target URL for a request, or `None` when the host is already canonical.
///
/// The `www.` prefix is matched case-insensitively. Any port is kept.
#[must_use]
pub fn canonical_redirect(host: &str, scheme: &str, path_and_query: &str) -> Option<String> {
    let prefix = host.get(..WWW_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(WWW_PREFIX) {
        return None;
    }
    let bare = host.get(WWW_PREFIX.len()..)?;
    if bare.is_empty() {
        return None;
    }
    Some(format!("{scheme}://{bare}{path_and_query}"))
}

/// Middleware redirecting `www.` hosts with 308 Permanent Redirect.
pub async fn canonical_host_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().host());

    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());

    if let Some(target) =
        host.and_then(|h| canonical_redirect(h, state.config().site_scheme(), path_and_query))
    {
        tracing::debug!(%target, "Redirecting to canonical host");
        return Redirect::permanent(&target).into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_www_host_redirects() {
        assert_eq!(
            canonical_redirect("www.vitalis.se", "https", "/products?sort=price").as_deref(),
            Some("https://vitalis.se/products?sort=price")
        );
        assert_eq!(
            canonical_redirect("WWW.vitalis.se:8080", "http", "/").as_deref(),
            Some("http://vitalis.se:8080/")
        );
    }

    #[test]
    fn test_bare_host_passes() {
        assert_eq!(canonical_redirect("vitalis.se", "https", "/"), None);
        assert_eq!(canonical_redirect("wwwvitalis.se", "https", "/"), None);
        assert_eq!(canonical_redirect("shop.vitalis.se", "https", "/"), None);
        assert_eq!(canonical_redirect("www.", "https", "/"), None);
        assert_eq!(canonical_redirect("ww", "https", "/"), None);
    }
}
