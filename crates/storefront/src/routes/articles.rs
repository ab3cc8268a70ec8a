//! Article and blog route handlers.
//!
//! Both sections are markdown posts with front matter and share templates;
//! [`Section`] carries what differs.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::content::Post;
use crate::filters;
use crate::routes::{PageContext, not_found};
use crate::state::AppState;

/// Number of related posts shown under a post.
const RECENT_POSTS_COUNT: usize = 3;

/// Which editorial section a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub intro: &'static str,
    pub base_path: &'static str,
}

pub const ARTICLES: Section = Section {
    title: "Artiklar",
    intro: "Fördjupning om hud, sömn och näring från våra terapeuter.",
    base_path: "/articles",
};

pub const BLOG: Section = Section {
    title: "Blogg",
    intro: "Nyheter från salongen.",
    base_path: "/blog",
};

/// Post listing template.
#[derive(Template, WebTemplate)]
#[template(path = "articles/index.html")]
pub struct PostIndexTemplate {
    pub ctx: PageContext,
    pub section: Section,
    pub posts: Vec<Post>,
}

/// Single post template.
#[derive(Template, WebTemplate)]
#[template(path = "articles/show.html")]
pub struct PostTemplate {
    pub ctx: PageContext,
    pub section: Section,
    pub post: Post,
    pub recent: Vec<Post>,
}

fn show_post<'a>(
    ctx: PageContext,
    section: Section,
    post: Option<&Post>,
    all: impl Iterator<Item = &'a Post>,
) -> Response {
    let Some(post) = post else {
        return not_found(ctx);
    };

    let recent = all
        .filter(|p| p.slug != post.slug)
        .take(RECENT_POSTS_COUNT)
        .cloned()
        .collect();

    PostTemplate {
        ctx,
        section,
        post: post.clone(),
        recent,
    }
    .into_response()
}

/// Display published articles, newest first.
#[instrument(skip(state, ctx))]
pub async fn article_index(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    PostIndexTemplate {
        ctx,
        section: ARTICLES,
        posts: state.content().published_articles().cloned().collect(),
    }
}

/// Display one article. Drafts and unknown slugs are 404.
#[instrument(skip(state, ctx))]
pub async fn article(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
) -> Response {
    let content = state.content();
    show_post(ctx, ARTICLES, content.article(&slug), content.published_articles())
}

/// Display published blog posts, newest first.
#[instrument(skip(state, ctx))]
pub async fn blog_index(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    PostIndexTemplate {
        ctx,
        section: BLOG,
        posts: state.content().published_blog_posts().cloned().collect(),
    }
}

/// Display one blog post. Drafts and unknown slugs are 404.
#[instrument(skip(state, ctx))]
pub async fn blog_post(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
) -> Response {
    let content = state.content();
    show_post(ctx, BLOG, content.blog_post(&slug), content.published_blog_posts())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::routes::tests::{body_text, get, test_app, test_state};

    #[tokio::test]
    async fn test_article_index_lists_published() {
        let (state, _rx) = test_state();
        let response = test_app(state).oneshot(get("/articles", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("/articles/vitamin-c-guide"));
        assert!(body.contains("/articles/somn-och-hud"));
    }

    #[tokio::test]
    async fn test_article_renders_markdown() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(get("/articles/vitamin-c-guide", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("<h2"));
    }

    #[tokio::test]
    async fn test_blog_draft_is_404() {
        let (state, _rx) = test_state();
        let app = test_app(state);
        let response = app
            .clone()
            .oneshot(get("/blog/kommande-nyheter", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/blog", None)).await.unwrap();
        let body = body_text(response).await;
        assert!(body.contains("/blog/var-nya-salong"));
        assert!(!body.contains("kommande-nyheter"));
    }
}
