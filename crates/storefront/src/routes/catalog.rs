//! Catalog pages: products, treatments and courses.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use vitalis_core::ProductId;

use crate::content::{Course, Ingredient, Product, Treatment};
use crate::error::Result;
use crate::filters;
use crate::routes::{PageContext, not_found};
use crate::state::AppState;
use crate::stores::session::load_wishlist;

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/products.html")]
pub struct ProductsTemplate {
    pub ctx: PageContext,
    pub products: Vec<Product>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/product.html")]
pub struct ProductTemplate {
    pub ctx: PageContext,
    pub product: Product,
    pub ingredients: Vec<Ingredient>,
    pub in_wishlist: bool,
}

/// Treatment listing template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/treatments.html")]
pub struct TreatmentsTemplate {
    pub ctx: PageContext,
    pub treatments: Vec<Treatment>,
}

/// Treatment detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/treatment.html")]
pub struct TreatmentTemplate {
    pub ctx: PageContext,
    pub treatment: Treatment,
}

/// Course listing template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/courses.html")]
pub struct CoursesTemplate {
    pub ctx: PageContext,
    pub courses: Vec<Course>,
}

/// Course detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/course.html")]
pub struct CourseTemplate {
    pub ctx: PageContext,
    pub course: Course,
}

/// Display all products.
#[instrument(skip(state, ctx))]
pub async fn products(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    ProductsTemplate {
        ctx,
        products: state.content().products().to_vec(),
    }
}

/// Display a product with its ingredients.
#[instrument(skip(state, ctx, session))]
pub async fn product(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Path(slug): Path<String>,
) -> Result<Response> {
    let Some(product) = ProductId::parse(&slug)
        .ok()
        .and_then(|id| state.content().product(&id))
    else {
        return Ok(not_found(ctx));
    };

    let ingredients = state
        .content()
        .ingredients_for(product)
        .into_iter()
        .cloned()
        .collect();
    let in_wishlist = load_wishlist(&session).await?.contains(&product.slug);

    Ok(ProductTemplate {
        ctx,
        product: product.clone(),
        ingredients,
        in_wishlist,
    }
    .into_response())
}

/// Display all treatments.
#[instrument(skip(state, ctx))]
pub async fn treatments(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    TreatmentsTemplate {
        ctx,
        treatments: state.content().treatments().to_vec(),
    }
}

/// Display a treatment.
#[instrument(skip(state, ctx))]
pub async fn treatment(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
) -> Response {
    match state.content().treatment(&slug) {
        Some(treatment) => TreatmentTemplate {
            ctx,
            treatment: treatment.clone(),
        }
        .into_response(),
        None => not_found(ctx),
    }
}

/// Display all courses.
#[instrument(skip(state, ctx))]
pub async fn courses(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    CoursesTemplate {
        ctx,
        courses: state.content().courses().to_vec(),
    }
}

/// Display a course.
#[instrument(skip(state, ctx))]
pub async fn course(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
) -> Response {
    match state.content().course(&slug) {
        Some(course) => CourseTemplate {
            ctx,
            course: course.clone(),
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
    async fn test_catalog_pages_render() {
        let (state, _rx) = test_state();
        let app = test_app(state);
        for path in [
            "/products",
            "/products/retinol-serum",
            "/treatments",
            "/courses",
            "/courses/detox-101",
        ] {
            let response = app.clone().oneshot(get(path, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
    }

    #[tokio::test]
    async fn test_product_page_shows_price_and_ingredients() {
        let (state, _rx) = test_state();
        let response = test_app(state)
            .oneshot(get("/products/retinol-serum", None))
            .await
            .unwrap();
        let body = body_text(response).await;
        assert!(body.contains(" kr"));
        assert!(body.contains("Ingredienser"));
    }

    #[tokio::test]
    async fn test_unknown_slugs_are_404() {
        let (state, _rx) = test_state();
        let app = test_app(state);
        for path in [
            "/products/finns-inte",
            "/products/OGILTIG%20SLUG",
            "/treatments/finns-inte",
            "/courses/finns-inte",
        ] {
            let response = app.clone().oneshot(get(path, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        }
    }
}
