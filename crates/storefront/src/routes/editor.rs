//! Editorial dashboard.
//!
//! A shared password unlocks an editor session. Editors see the latest
//! content versions and the protected keys, and may bypass approval when
//! creating versions through `/api/versioning`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tower_sessions::Session;

use vitalis_core::{ContentKey, ContentType, ContentVersion};

use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireEditor, set_editor};
use crate::routes::PageContext;
use crate::state::AppState;
use crate::versioning::DEFAULT_LIST_LIMIT;

/// Editor login form data.
#[derive(Debug, Deserialize)]
pub struct EditorLoginForm {
    pub password: String,
}

/// Query parameters for the editor login page.
#[derive(Debug, Deserialize)]
pub struct EditorLoginQuery {
    pub error: Option<String>,
}

/// Editor login page template.
#[derive(Template, WebTemplate)]
#[template(path = "editor/login.html")]
pub struct EditorLoginTemplate {
    pub ctx: PageContext,
    pub error: bool,
}

/// Editorial dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "editor/index.html")]
pub struct EditorTemplate {
    pub ctx: PageContext,
    pub versions: Vec<ContentVersion>,
    pub protected: Vec<ContentKey>,
    pub counts: Vec<(ContentType, usize)>,
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Display the editor login page.
pub async fn login_page(ctx: PageContext, Query(query): Query<EditorLoginQuery>) -> impl IntoResponse {
    EditorLoginTemplate {
        ctx,
        error: query.error.is_some(),
    }
}

/// Check the dashboard password and open an editor session.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<EditorLoginForm>,
) -> Result<Redirect> {
    let expected = state.config().dashboard_password.expose_secret();
    if !constant_time_compare(expected, &form.password) {
        tracing::warn!("Editor login with wrong password");
        return Ok(Redirect::to("/editor/login?error=1"));
    }

    set_editor(&session, true).await?;
    tracing::info!("Editor session opened");
    Ok(Redirect::to("/editor"))
}

/// Display the editorial dashboard.
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    _editor: RequireEditor,
) -> impl IntoResponse {
    let versions = state.versions();
    EditorTemplate {
        ctx,
        versions: versions.list_all_versions(DEFAULT_LIST_LIMIT),
        protected: versions.list_protected_items(),
        counts: versions.counts_by_type(),
    }
}

/// Close the editor session.
pub async fn logout(session: Session) -> Result<Redirect> {
    set_editor(&session, false).await?;
    Ok(Redirect::to("/"))
}
