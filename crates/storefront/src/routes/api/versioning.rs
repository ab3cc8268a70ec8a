//! Content versioning API used by the editorial dashboard.
//!
//! `GET /api/versioning?action=...` reads, `POST /api/versioning` with a JSON
//! body tagged by `action` writes. Every error is a `{"error": "..."}`
//! envelope.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use vitalis_core::{ContentKey, ContentKeyError, VersionId};

use super::{ApiJson, ApiQuery};
use crate::error::{AppError, Result};
use crate::middleware::is_editor;
use crate::state::AppState;
use crate::versioning::{Approval, DEFAULT_LIST_LIMIT, NewVersion};

/// Largest `limit` accepted by `action=all`.
const MAX_LIST_LIMIT: usize = 500;

const MISSING_KEY: &str = "contentType och itemId krävs";

/// Query parameters for `GET /api/versioning`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersioningQuery {
    pub action: Option<String>,
    pub content_type: Option<String>,
    pub item_id: Option<String>,
    pub limit: Option<usize>,
}

/// Body of `POST /api/versioning`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum VersioningCommand {
    Create(CreateVersion),
    Restore(RestoreVersion),
    Cleanup(CleanupVersions),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersion {
    pub content_type: Option<String>,
    pub item_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub changes: String,
    pub author: Option<String>,
    #[serde(default)]
    pub bypass_approval: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreVersion {
    pub version_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupVersions {
    pub max_age_days: Option<u32>,
}

/// Build a content key from optional request fields.
fn content_key(content_type: Option<&str>, item_id: Option<&str>) -> Result<ContentKey> {
    let (Some(content_type), Some(item_id)) = (content_type, item_id) else {
        return Err(AppError::BadRequest(MISSING_KEY.to_owned()));
    };

    ContentKey::parse_parts(content_type, item_id).map_err(|e| match e {
        ContentKeyError::UnknownType(kind) => {
            AppError::BadRequest(format!("Okänd contentType: {kind}"))
        }
        ContentKeyError::EmptyItemId => AppError::BadRequest(MISSING_KEY.to_owned()),
        other => AppError::BadRequest(other.to_string()),
    })
}

/// Read versions.
///
/// - `list`: all versions of one item, newest first
/// - `latest`: the newest version of one item (`data` is null if none)
/// - `current`: the restored version of one item, or its newest
/// - `all`: the most recent versions across all items
/// - `protected`: the keys that need approval
#[instrument(skip(state))]
pub async fn query(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VersioningQuery>,
) -> Result<Json<Value>> {
    let versions = state.versions();

    match query.action.as_deref() {
        Some("list") => {
            let key = content_key(query.content_type.as_deref(), query.item_id.as_deref())?;
            Ok(Json(json!({
                "contentType": key.content_type,
                "itemId": key.item_id,
                "versions": versions.list_versions(&key),
            })))
        }
        Some("latest") => {
            let key = content_key(query.content_type.as_deref(), query.item_id.as_deref())?;
            Ok(Json(json!({
                "contentType": key.content_type,
                "itemId": key.item_id,
                "data": versions.latest_version(&key),
            })))
        }
        Some("current") => {
            let key = content_key(query.content_type.as_deref(), query.item_id.as_deref())?;
            Ok(Json(json!({
                "contentType": key.content_type,
                "itemId": key.item_id,
                "data": versions.current_version(&key),
            })))
        }
        Some("all") => {
            let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
            Ok(Json(json!({ "versions": versions.list_all_versions(limit) })))
        }
        Some("protected") => Ok(Json(json!({ "data": versions.list_protected_items() }))),
        Some(other) => Err(AppError::BadRequest(format!("Okänd action: {other}"))),
        None => Err(AppError::BadRequest("action krävs".to_owned())),
    }
}

/// Write versions: `create`, `restore` or `cleanup`.
///
/// `bypassApproval` on create is honored only for editor sessions.
#[instrument(skip(state, session, body))]
pub async fn command(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response> {
    let command: VersioningCommand = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Ogiltig begäran: {e}")))?;

    match command {
        VersioningCommand::Create(create) => {
            let key = content_key(create.content_type.as_deref(), create.item_id.as_deref())?;
            let (Some(title), Some(content)) = (create.title, create.content) else {
                return Err(AppError::BadRequest("title och content krävs".to_owned()));
            };
            if title.trim().is_empty() {
                return Err(AppError::BadRequest("title och content krävs".to_owned()));
            }

            let approval = if create.bypass_approval && is_editor(&session).await {
                Approval::Bypassed
            } else {
                Approval::Required
            };

            let version = state.versions().create_version(
                NewVersion {
                    key,
                    title,
                    content,
                    changes: create.changes,
                    author: create
                        .author
                        .filter(|a| !a.trim().is_empty())
                        .unwrap_or_else(|| "redaktionen".to_owned()),
                },
                approval,
            )?;

            Ok((
                StatusCode::CREATED,
                Json(json!({ "success": true, "data": version })),
            )
                .into_response())
        }
        VersioningCommand::Restore(restore) => {
            let id = restore
                .version_id
                .as_deref()
                .ok_or_else(|| AppError::BadRequest("versionId krävs".to_owned()))?
                .parse::<VersionId>()
                .map_err(|_| AppError::BadRequest("Ogiltigt versionId".to_owned()))?;

            let version = state
                .versions()
                .restore_version(id)
                .ok_or_else(|| AppError::NotFound("Versionen hittades inte".to_owned()))?;

            Ok(Json(json!({ "success": true, "data": version })).into_response())
        }
        VersioningCommand::Cleanup(cleanup) => {
            let max_age_days = cleanup
                .max_age_days
                .unwrap_or(state.config().version_retention_days);
            let removed = state.versions().cleanup_old_versions(max_age_days);

            Ok(Json(json!({ "success": true, "removed": removed })).into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::tests::{body_text, get, post_form, session_cookie, test_app, test_state};

    fn post_json(body: &Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/api/versioning")
            .header(header::HOST, "vitalis.test")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_list_without_key_is_400() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(get("/api/versioning?action=list", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "contentType och itemId krävs" })
        );
    }

    #[tokio::test]
    async fn test_unknown_content_type_is_400() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(get("/api/versioning?action=list&contentType=recipe&itemId=1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_action_is_400() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(get("/api/versioning?action=export", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_list_and_restore() {
        let (state, _rx) = test_state();
        let app = test_app(state);

        let response = app
            .clone()
            .oneshot(post_json(
                &json!({
                    "action": "create",
                    "contentType": "article",
                    "itemId": "42",
                    "title": "T",
                    "content": "C",
                    "changes": "fix typo",
                    "author": "bob",
                }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["success"], true);
        assert_eq!(created["data"]["author"], "bob");
        let id = created["data"]["id"].as_str().unwrap().to_owned();

        let response = app
            .clone()
            .oneshot(get("/api/versioning?action=list&contentType=article&itemId=42", None))
            .await
            .unwrap();
        let listed = json_body(response).await;
        assert_eq!(listed["contentType"], "article");
        assert_eq!(listed["versions"].as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(post_json(&json!({ "action": "restore", "versionId": id }), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"], created["data"]);
    }

    #[tokio::test]
    async fn test_latest_is_null_for_unknown_item() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(get("/api/versioning?action=latest&contentType=course&itemId=nytt", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"], Value::Null);
    }

    #[tokio::test]
    async fn test_protected_create_is_403_and_not_stored() {
        let (state, _rx) = test_state();
        let app = test_app(state.clone());
        let response = app
            .oneshot(post_json(
                &json!({
                    "action": "create",
                    "contentType": "course",
                    "itemId": "detox-101",
                    "title": "Ny modul",
                    "content": "...",
                    "bypassApproval": true,
                }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(state.versions().is_empty());
    }

    #[tokio::test]
    async fn test_editor_may_bypass_approval() {
        let (state, _rx) = test_state();
        let app = test_app(state.clone());

        let response = app
            .clone()
            .oneshot(post_form("/editor/login", "password=k7%23Qm2%21vLp9%40Zr", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = session_cookie(&response).unwrap();

        let response = app
            .oneshot(post_json(
                &json!({
                    "action": "create",
                    "contentType": "course",
                    "itemId": "detox-101",
                    "title": "Ny modul",
                    "content": "...",
                    "bypassApproval": true,
                }),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(state.versions().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_unknown_is_404() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(post_json(
                &json!({ "action": "restore", "versionId": VersionId::generate().to_string() }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cleanup_reports_removed() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(post_json(&json!({ "action": "cleanup" }), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "success": true, "removed": 0 }));
    }

    #[tokio::test]
    async fn test_missing_fields_on_create_is_400() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(post_json(
                &json!({ "action": "create", "contentType": "article", "itemId": "42" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn post_raw(body: &'static str, content_type: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/api/versioning").header(header::HOST, "vitalis.test");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_json_uses_error_envelope() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(post_raw("{not json", Some("application/json")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": "Ogiltig JSON" }));
    }

    #[tokio::test]
    async fn test_missing_content_type_uses_error_envelope() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(post_raw(r#"{"action":"cleanup"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Content-Type måste vara application/json" })
        );
    }

    #[tokio::test]
    async fn test_bad_limit_uses_error_envelope() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(get("/api/versioning?action=all&limit=abc", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": "Ogiltiga parametrar" }));
    }

    #[tokio::test]
    async fn test_protected_lists_keys() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(get("/api/versioning?action=protected", None))
            .await
            .unwrap();
        assert_eq!(
            json_body(response).await,
            json!({ "data": [{ "contentType": "course", "itemId": "detox-101" }] })
        );
    }
}
