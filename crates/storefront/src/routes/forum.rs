//! Community forum pages (read-only).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::content::ForumThread;
use crate::filters;
use crate::routes::{PageContext, not_found};
use crate::state::AppState;

/// Thread listing template.
#[derive(Template, WebTemplate)]
#[template(path = "forum/index.html")]
pub struct ForumIndexTemplate {
    pub ctx: PageContext,
    pub threads: Vec<ForumThread>,
}

/// Thread template.
#[derive(Template, WebTemplate)]
#[template(path = "forum/show.html")]
pub struct ForumThreadTemplate {
    pub ctx: PageContext,
    pub thread: ForumThread,
}

/// Display all threads.
#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    ForumIndexTemplate {
        ctx,
        threads: state.content().threads().to_vec(),
    }
}

/// Display a thread with its replies.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
) -> Response {
    match state.content().thread(&slug) {
        Some(thread) => ForumThreadTemplate {
            ctx,
            thread: thread.clone(),
        }
        .into_response(),
        None => not_found(ctx),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::routes::tests::{body_text, get, test_app, test_state};

    #[tokio::test]
    async fn test_forum_thread_with_replies() {
        let (state, _rx) = test_state();
        let app = test_app(state);

        let response = app.clone().oneshot(get("/forum", None)).await.unwrap();
        assert!(
            body_text(response)
                .await
                .contains("/forum/retinol-och-c-vitamin-samtidigt")
        );

        let response = app
            .oneshot(get("/forum/retinol-och-c-vitamin-samtidigt", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("svar"));
    }
}
