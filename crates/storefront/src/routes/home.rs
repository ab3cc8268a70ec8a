//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::content::{Post, Product, Treatment};
use crate::filters;
use crate::routes::PageContext;
use crate::state::AppState;

/// Number of featured products on the home page.
const FEATURED_PRODUCTS: usize = 4;

/// Number of article teasers on the home page.
const LATEST_ARTICLES: usize = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub featured: Vec<Product>,
    pub articles: Vec<Post>,
    pub treatments: Vec<Treatment>,
}

/// Display the home page.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let content = state.content();

    HomeTemplate {
        ctx,
        featured: content
            .featured_products(FEATURED_PRODUCTS)
            .into_iter()
            .cloned()
            .collect(),
        articles: content
            .published_articles()
            .take(LATEST_ARTICLES)
            .cloned()
            .collect(),
        treatments: content.treatments().to_vec(),
    }
}
