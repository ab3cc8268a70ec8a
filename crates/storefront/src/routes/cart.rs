//! Cart route handlers.
//!
//! The cart lives in the visitor's session. For signed-in members every
//! mutation is also forwarded to the cart sync worker.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use vitalis_core::{Price, ProductId};

use crate::content::Product;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::routes::{PageContext, not_found, safe_redirect_target};
use crate::state::AppState;
use crate::stores::session::{load_cart, save_cart};
use crate::stores::{Cart, CartItem};

/// One cart line joined with its catalog product.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product: Product,
    pub quantity: u32,
    pub line_total: Price,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub ctx: PageContext,
    pub lines: Vec<CartLineView>,
    pub subtotal: Price,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
    pub return_to: Option<String>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Join cart lines with the catalog. Lines whose product has left the
/// catalog are skipped.
fn line_views(state: &AppState, cart: &Cart) -> Vec<CartLineView> {
    cart.items()
        .filter_map(|item| {
            let Some(product) = state.content().product(&item.product_id) else {
                tracing::debug!(product_id = %item.product_id, "Cart line for unknown product");
                return None;
            };
            Some(CartLineView {
                product: product.clone(),
                quantity: item.quantity,
                line_total: product.price.times(item.quantity),
            })
        })
        .collect()
}

fn subtotal(lines: &[CartLineView]) -> Price {
    let currency = lines
        .first()
        .map(|line| line.line_total.currency_code)
        .unwrap_or_default();
    let amount = lines.iter().map(|line| line.line_total.amount).sum::<Decimal>();
    Price::new(amount, currency)
}

/// Resolve a submitted product id against the catalog. `Ok(None)` when the
/// id is well formed but no such product exists.
fn catalog_product(state: &AppState, raw: &str) -> Result<Option<ProductId>> {
    let id = ProductId::parse(raw)
        .map_err(|_| AppError::BadRequest("Ogiltigt produkt-id".to_owned()))?;
    Ok(state.content().product(&id).is_some().then_some(id))
}

/// Load the cart, apply `mutate` and save it back. Signed-in members get
/// the change forwarded to remote sync.
async fn mutate_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    mutate: impl FnOnce(&mut Cart),
) -> Result<()> {
    let mut cart = load_cart(session).await?;
    if let Some(user) = user {
        state.cart_sync().attach(user.id, &mut cart);
    }
    mutate(&mut cart);
    save_cart(session, &cart).await?;
    Ok(())
}

/// Display the cart page.
#[instrument(skip(state, ctx, session))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
) -> Result<impl IntoResponse> {
    let cart = load_cart(&session).await?;
    let lines = line_views(&state, &cart);
    let subtotal = subtotal(&lines);

    Ok(CartTemplate {
        ctx,
        lines,
        subtotal,
    })
}

/// Add a product to the cart. Unknown products get the 404 page.
#[instrument(skip(state, ctx, session, user))]
pub async fn add(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let Some(id) = catalog_product(&state, &form.product_id)? else {
        return Ok(not_found(ctx));
    };
    let quantity = form.quantity.unwrap_or(1);

    mutate_cart(&state, &session, user.as_ref(), |cart| {
        cart.add(CartItem::new(id, quantity));
    })
    .await?;

    Ok(Redirect::to(safe_redirect_target(form.return_to.as_deref(), "/cart")).into_response())
}

/// Set the quantity of a line. Zero removes it.
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect> {
    let id = ProductId::parse(&form.product_id)
        .map_err(|_| AppError::BadRequest("Ogiltigt produkt-id".to_owned()))?;

    mutate_cart(&state, &session, user.as_ref(), |cart| {
        cart.set_quantity(&id, form.quantity);
    })
    .await?;

    Ok(Redirect::to("/cart"))
}

/// Remove a line.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect> {
    let id = ProductId::parse(&form.product_id)
        .map_err(|_| AppError::BadRequest("Ogiltigt produkt-id".to_owned()))?;

    mutate_cart(&state, &session, user.as_ref(), |cart| {
        cart.remove(&id);
    })
    .await?;

    Ok(Redirect::to("/cart"))
}

/// Empty the cart.
#[instrument(skip(state, session, user))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Redirect> {
    mutate_cart(&state, &session, user.as_ref(), Cart::clear).await?;
    Ok(Redirect::to("/cart"))
}

/// Total quantity in the cart as `{"count": n}`.
pub async fn count(session: Session) -> Result<Json<Value>> {
    let cart = load_cart(&session).await?;
    Ok(Json(json!({ "count": cart.total_quantity() })))
}
