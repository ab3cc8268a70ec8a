//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitalis_core::ProductId;

use crate::content::Product;
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::{PageContext, not_found, safe_redirect_target};
use crate::state::AppState;
use crate::stores::WishlistItem;
use crate::stores::session::{load_wishlist, save_wishlist};

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/show.html")]
pub struct WishlistTemplate {
    pub ctx: PageContext,
    pub products: Vec<Product>,
}

/// Wishlist form data.
#[derive(Debug, Deserialize)]
pub struct WishlistForm {
    pub product_id: String,
    pub return_to: Option<String>,
}

impl WishlistForm {
    fn product_id(&self) -> Result<ProductId> {
        ProductId::parse(&self.product_id)
            .map_err(|_| AppError::BadRequest("Ogiltigt produkt-id".to_owned()))
    }

    fn redirect(&self) -> Redirect {
        Redirect::to(safe_redirect_target(self.return_to.as_deref(), "/wishlist"))
    }
}

/// Display saved products, most recently saved first.
#[instrument(skip(state, ctx, session))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
) -> Result<impl IntoResponse> {
    let wishlist = load_wishlist(&session).await?;
    let products = wishlist
        .newest_first()
        .into_iter()
        .filter_map(|item| state.content().product(&item.product_id).cloned())
        .collect();

    Ok(WishlistTemplate { ctx, products })
}

/// Save a product. Unknown products get the 404 page.
#[instrument(skip(state, ctx, session))]
pub async fn add(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let id = form.product_id()?;
    if state.content().product(&id).is_none() {
        return Ok(not_found(ctx));
    }

    let mut wishlist = load_wishlist(&session).await?;
    wishlist.add(WishlistItem::new(id));
    save_wishlist(&session, &wishlist).await?;

    Ok(form.redirect().into_response())
}

/// Remove a saved product.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<WishlistForm>) -> Result<Redirect> {
    let id = form.product_id()?;

    let mut wishlist = load_wishlist(&session).await?;
    if wishlist.remove(&id).is_some() {
        save_wishlist(&session, &wishlist).await?;
    }

    Ok(form.redirect())
}

/// Save or unsave a product. Unknown products get the 404 page.
#[instrument(skip(state, ctx, session))]
pub async fn toggle(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let id = form.product_id()?;
    if state.content().product(&id).is_none() {
        return Ok(not_found(ctx));
    }

    let mut wishlist = load_wishlist(&session).await?;
    wishlist.toggle(&id);
    save_wishlist(&session, &wishlist).await?;

    Ok(form.redirect().into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::routes::tests::{body_text, get, post_form, session_cookie, test_app, test_state};

    #[tokio::test]
    async fn test_toggle_twice_leaves_empty_wishlist() {
        let (state, _rx) = test_state();
        let app = test_app(state);

        let response = app
            .clone()
            .oneshot(post_form("/wishlist/toggle", "product_id=spf50-fluid", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = session_cookie(&response).unwrap();

        let response = app
            .clone()
            .oneshot(get("/wishlist", Some(&cookie)))
            .await
            .unwrap();
        assert!(body_text(response).await.contains("/products/spf50-fluid"));

        app.clone()
            .oneshot(post_form("/wishlist/toggle", "product_id=spf50-fluid", Some(&cookie)))
            .await
            .unwrap();
        let response = app.oneshot(get("/wishlist", Some(&cookie))).await.unwrap();
        assert!(!body_text(response).await.contains("/products/spf50-fluid"));
    }

    #[tokio::test]
    async fn test_add_twice_keeps_one_entry() {
        let (state, _rx) = test_state();
        let app = test_app(state);

        let response = app
            .clone()
            .oneshot(post_form("/wishlist/add", "product_id=barrier-cream", None))
            .await
            .unwrap();
        let cookie = session_cookie(&response).unwrap();
        app.clone()
            .oneshot(post_form("/wishlist/add", "product_id=barrier-cream", Some(&cookie)))
            .await
            .unwrap();

        let response = app.oneshot(get("/wishlist", Some(&cookie))).await.unwrap();
        let body = body_text(response).await;
        assert_eq!(body.matches("wishlist-item").count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_renders_404_page() {
        let (state, _rx) = test_state();
        let app = test_app(state);

        for path in ["/wishlist/add", "/wishlist/toggle"] {
            let response = app
                .clone()
                .oneshot(post_form(path, "product_id=finns-inte", None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert!(body_text(response).await.contains("Sidan hittades inte"));
        }
    }
}
