//! News route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::{error, instrument};

use carniceria_core::NewsArticle;

use crate::content::render_markdown;
use crate::db::NewsRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::layout::PageContext;
use crate::state::AppState;

/// Articles shown on the news index.
const NEWS_PAGE_SIZE: i64 = 30;

/// Article view for templates.
#[derive(Clone)]
pub struct ArticleView {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub featured: bool,
    pub date: String,
}

impl From<&NewsArticle> for ArticleView {
    fn from(article: &NewsArticle) -> Self {
        Self {
            slug: article.slug.clone(),
            title: article.title.clone(),
            summary: article.summary.clone(),
            category: article.category.clone(),
            image_url: article.image_url.clone(),
            featured: article.featured,
            date: article
                .published_at
                .unwrap_or(article.created_at)
                .format("%d/%m/%Y")
                .to_string(),
        }
    }
}

/// News index page template.
#[derive(Template, WebTemplate)]
#[template(path = "news/index.html")]
pub struct NewsIndexTemplate {
    pub page: PageContext,
    pub articles: Vec<ArticleView>,
}

/// News article page template.
#[derive(Template, WebTemplate)]
#[template(path = "news/show.html")]
pub struct NewsShowTemplate {
    pub page: PageContext,
    pub article: ArticleView,
    pub body_html: String,
}

/// Published articles, newest first. Failures degrade to an empty list.
pub async fn latest(state: &AppState, limit: i64) -> Vec<ArticleView> {
    NewsRepository::new(state.pool())
        .list_published(limit)
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to load news");
            Vec::new()
        })
        .iter()
        .map(ArticleView::from)
        .collect()
}

/// Display the news index.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    NewsIndexTemplate {
        articles: latest(&state, NEWS_PAGE_SIZE).await,
        page: PageContext::load(&state, &session, user.as_ref()).await,
    }
}

/// Display one published article.
///
/// # Errors
///
/// Returns 404 for unknown or unpublished slugs.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let article = NewsRepository::new(state.pool())
        .get_published(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("news {slug}")))?;

    Ok(NewsShowTemplate {
        page: PageContext::load(&state, &session, user.as_ref()).await,
        body_html: render_markdown(&article.body_markdown),
        article: ArticleView::from(&article),
    })
}
