//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use carniceria_core::Category;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::layout::PageContext;
use crate::routes::news::{ArticleView, latest};
use crate::routes::products::ProductCard;
use crate::services::delivery;
use crate::state::AppState;

/// Featured products on the home page.
const FEATURED_COUNT: usize = 8;

/// News articles on the home page.
const NEWS_COUNT: i64 = 3;

/// A category tile.
#[derive(Clone)]
pub struct CategoryLink {
    pub slug: &'static str,
    pub label: &'static str,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub featured: Vec<ProductCard>,
    pub categories: Vec<CategoryLink>,
    pub news: Vec<ArticleView>,
    pub next_delivery: Option<String>,
    pub free_shipping_threshold: String,
}

/// Display the home page.
#[instrument(skip(state, session, user))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    let mut featured: Vec<ProductCard> = state
        .catalog()
        .featured()
        .await
        .iter()
        .map(ProductCard::from)
        .collect();
    featured.truncate(FEATURED_COUNT);

    HomeTemplate {
        page: PageContext::load(&state, &session, user.as_ref()).await,
        featured,
        categories: Category::ALL
            .into_iter()
            .map(|c| CategoryLink {
                slug: c.as_str(),
                label: c.label(),
            })
            .collect(),
        news: latest(&state, NEWS_COUNT).await,
        next_delivery: delivery::upcoming(state.pool(), state.config().shop_utc_offset)
            .await
            .map(|n| n.describe()),
        free_shipping_threshold: state.pricing().free_shipping_threshold().to_string(),
    }
}
