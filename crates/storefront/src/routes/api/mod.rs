//! JSON API routes.

pub mod versioning;

use axum::extract::{FromRequest, FromRequestParts};
use axum::{Router, routing::get};

use crate::error::AppError;
use crate::middleware::api_rate_limiter;
use crate::state::AppState;

/// JSON body extractor whose rejections use the `{"error"}` envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the `{"error"}` envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Create the `/api` router.
pub fn routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new().route(
        "/versioning",
        get(versioning::query).post(versioning::command),
    );

    if rate_limited {
        router.layer(api_rate_limiter())
    } else {
        router
    }
}
