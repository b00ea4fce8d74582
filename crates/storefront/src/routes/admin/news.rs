//! News article route handlers.

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use carniceria_core::{NewsArticle, NewsArticleId, UserProfile, slugify};

use crate::db::{NewsDraft, NewsRepository, RepositoryError};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::{AdminUserView, render};

/// News article form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsFormInput {
    #[serde(default)]
    pub title: String,
    /// Derived from the title when blank.
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub body_markdown: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
    pub published: Option<String>,
    pub featured: Option<String>,
}

impl From<&NewsArticle> for NewsFormInput {
    fn from(article: &NewsArticle) -> Self {
        Self {
            title: article.title.clone(),
            slug: article.slug.clone(),
            summary: article.summary.clone(),
            body_markdown: article.body_markdown.clone(),
            category: article.category.clone().unwrap_or_default(),
            image_url: article.image_url.clone().unwrap_or_default(),
            published: article.published.then(|| "on".to_string()),
            featured: article.featured.then(|| "on".to_string()),
        }
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl NewsFormInput {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns a Spanish message naming the first invalid field.
    pub fn to_draft(&self) -> Result<NewsDraft, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("El título es obligatorio".to_string());
        }
        let slug = match self.slug.trim() {
            "" => slugify(title),
            given => slugify(given),
        };
        if slug.is_empty() {
            return Err("El título necesita al menos una letra o número".to_string());
        }

        Ok(NewsDraft {
            slug,
            title: title.to_string(),
            summary: self.summary.trim().to_string(),
            body_markdown: self.body_markdown.clone(),
            category: optional(&self.category),
            image_url: optional(&self.image_url),
            published: self.published.is_some(),
            featured: self.featured.is_some(),
        })
    }
}

/// Article row for the list page.
#[derive(Debug, Clone)]
pub struct ArticleRowView {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub published: bool,
    pub featured: bool,
    pub date: String,
}

impl From<&NewsArticle> for ArticleRowView {
    fn from(article: &NewsArticle) -> Self {
        Self {
            id: article.id.as_i32(),
            title: article.title.clone(),
            slug: article.slug.clone(),
            published: article.published,
            featured: article.featured,
            date: article.created_at.format("%d/%m/%Y").to_string(),
        }
    }
}

/// News list page template.
#[derive(Template)]
#[template(path = "admin/news/index.html")]
pub struct NewsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub articles: Vec<ArticleRowView>,
    pub error: Option<String>,
}

/// News form page template.
#[derive(Template)]
#[template(path = "admin/news/form.html")]
pub struct NewsFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub article_id: Option<i32>,
    pub form: NewsFormInput,
    pub error: Option<String>,
}

impl NewsFormTemplate {
    fn new(
        admin: &UserProfile,
        article_id: Option<i32>,
        form: NewsFormInput,
        error: Option<String>,
    ) -> Self {
        Self {
            admin_user: AdminUserView::from(admin),
            current_path: "/admin/news".to_string(),
            article_id,
            form,
            error,
        }
    }
}

fn save_error(e: &RepositoryError) -> String {
    match e {
        RepositoryError::Conflict(_) => "Ya existe una novedad con esa dirección".to_string(),
        _ => "No se pudo guardar la novedad".to_string(),
    }
}

/// News list page handler.
#[instrument(skip(admin, state))]
pub async fn index(RequireAdmin(admin): RequireAdmin, State(state): State<AppState>) -> Response {
    let (articles, error) = match NewsRepository::new(state.pool()).list_all().await {
        Ok(articles) => (articles.iter().map(ArticleRowView::from).collect(), None),
        Err(e) => {
            tracing::error!("Failed to fetch news: {e}");
            (Vec::new(), Some("No se pudieron cargar las novedades".to_string()))
        }
    };

    render(&NewsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/admin/news".to_string(),
        articles,
        error,
    })
}

/// New article form handler.
#[instrument(skip(admin))]
pub async fn new(RequireAdmin(admin): RequireAdmin) -> Response {
    render(&NewsFormTemplate::new(&admin, None, NewsFormInput::default(), None))
}

/// Create article handler.
#[instrument(skip(admin, state, input))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Form(input): Form<NewsFormInput>,
) -> Response {
    let draft = match input.to_draft() {
        Ok(draft) => draft,
        Err(message) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render(&NewsFormTemplate::new(&admin, None, input, Some(message))),
            )
                .into_response();
        }
    };

    match NewsRepository::new(state.pool()).create(&draft).await {
        Ok(article) => {
            tracing::info!(article_id = %article.id, slug = %article.slug, "News article created");
            Redirect::to("/admin/news").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create news article");
            render(&NewsFormTemplate::new(&admin, None, input, Some(save_error(&e))))
        }
    }
}

/// Edit article form handler.
#[instrument(skip(admin, state))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Response {
    match NewsRepository::new(state.pool())
        .get_by_id(NewsArticleId::new(id))
        .await
    {
        Ok(Some(article)) => render(&NewsFormTemplate::new(
            &admin,
            Some(id),
            NewsFormInput::from(&article),
            None,
        )),
        Ok(None) => (StatusCode::NOT_FOUND, "Novedad no encontrada").into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch news article: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo cargar la novedad").into_response()
        }
    }
}

/// Update article handler.
#[instrument(skip(admin, state, input))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(input): Form<NewsFormInput>,
) -> Response {
    let draft = match input.to_draft() {
        Ok(draft) => draft,
        Err(message) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render(&NewsFormTemplate::new(&admin, Some(id), input, Some(message))),
            )
                .into_response();
        }
    };

    match NewsRepository::new(state.pool())
        .update(NewsArticleId::new(id), &draft)
        .await
    {
        Ok(_) => {
            tracing::info!(article_id = id, "News article updated");
            Redirect::to("/admin/news").into_response()
        }
        Err(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Novedad no encontrada").into_response()
        }
        Err(e) => {
            tracing::error!(article_id = id, error = %e, "Failed to update news article");
            render(&NewsFormTemplate::new(&admin, Some(id), input, Some(save_error(&e))))
        }
    }
}

/// Delete article handler.
#[instrument(skip(_admin, state))]
pub async fn delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Response {
    match NewsRepository::new(state.pool())
        .delete(NewsArticleId::new(id))
        .await
    {
        Ok(()) => {
            tracing::info!(article_id = id, "News article deleted");
            Redirect::to("/admin/news").into_response()
        }
        Err(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Novedad no encontrada").into_response()
        }
        Err(e) => {
            tracing::error!(article_id = id, error = %e, "Failed to delete news article");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo borrar la novedad").into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_draft_derives_slug_from_title() {
        let draft = NewsFormInput {
            title: "¡Llegó el Cordero Patagónico!".to_string(),
            published: Some("on".to_string()),
            ..NewsFormInput::default()
        }
        .to_draft()
        .unwrap();
        assert_eq!(draft.slug, "llego-el-cordero-patagonico");
        assert!(draft.published);
        assert!(!draft.featured);
        assert_eq!(draft.category, None);
    }

    #[test]
    fn test_to_draft_normalises_given_slug() {
        let draft = NewsFormInput {
            title: "Horarios".to_string(),
            slug: "Horarios de Fiestas".to_string(),
            ..NewsFormInput::default()
        }
        .to_draft()
        .unwrap();
        assert_eq!(draft.slug, "horarios-de-fiestas");
    }

    #[test]
    fn test_to_draft_requires_title() {
        assert!(NewsFormInput::default().to_draft().is_err());
        assert!(
            NewsFormInput {
                title: "!!!".to_string(),
                ..NewsFormInput::default()
            }
            .to_draft()
            .is_err()
        );
    }
}
