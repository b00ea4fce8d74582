//! Editorial content: news articles, site messages and the contact card.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use carniceria_core::{
    Audience, ContactInfo, MessageKind, NewsArticle, NewsArticleId, SiteMessage, SiteMessageId,
};

use super::{RepositoryError, conflict_on_unique};

// =============================================================================
// News
// =============================================================================

const NEWS_COLUMNS: &str = r"
    id, slug, title, summary, body_markdown, category, image_url, published, featured,
    published_at, created_at, updated_at
";

#[derive(Debug, sqlx::FromRow)]
struct NewsRow {
    id: i32,
    slug: String,
    title: String,
    summary: String,
    body_markdown: String,
    category: Option<String>,
    image_url: Option<String>,
    published: bool,
    featured: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NewsRow> for NewsArticle {
    fn from(row: NewsRow) -> Self {
        Self {
            id: NewsArticleId::new(row.id),
            slug: row.slug,
            title: row.title,
            summary: row.summary,
            body_markdown: row.body_markdown,
            category: row.category,
            image_url: row.image_url,
            published: row.published,
            featured: row.featured,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// News article fields as edited in the back office.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsDraft {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body_markdown: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub published: bool,
    pub featured: bool,
}

/// Repository for news articles.
pub struct NewsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Published articles: featured first, then newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_published(&self, limit: i64) -> Result<Vec<NewsArticle>, RepositoryError> {
        let rows = sqlx::query_as::<_, NewsRow>(&format!(
            r"
            SELECT {NEWS_COLUMNS} FROM shop.news_article
            WHERE published
            ORDER BY featured DESC, published_at DESC NULLS LAST, id DESC
            LIMIT $1
            "
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every article, drafts included, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<NewsArticle>, RepositoryError> {
        let rows = sqlx::query_as::<_, NewsRow>(&format!(
            "SELECT {NEWS_COLUMNS} FROM shop.news_article ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A published article by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_published(&self, slug: &str) -> Result<Option<NewsArticle>, RepositoryError> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            "SELECT {NEWS_COLUMNS} FROM shop.news_article WHERE slug = $1 AND published"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Any article by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: NewsArticleId,
    ) -> Result<Option<NewsArticle>, RepositoryError> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            "SELECT {NEWS_COLUMNS} FROM shop.news_article WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create an article. The publication date is stamped on first publish.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, draft), fields(slug = %draft.slug))]
    pub async fn create(&self, draft: &NewsDraft) -> Result<NewsArticle, RepositoryError> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            r"
            INSERT INTO shop.news_article
                (slug, title, summary, body_markdown, category, image_url, published, featured,
                 published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $7 THEN NOW() END)
            RETURNING {NEWS_COLUMNS}
            "
        ))
        .bind(&draft.slug)
        .bind(&draft.title)
        .bind(&draft.summary)
        .bind(&draft.body_markdown)
        .bind(&draft.category)
        .bind(&draft.image_url)
        .bind(draft.published)
        .bind(draft.featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug"))?;

        Ok(row.into())
    }

    /// Overwrite an article.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID and
    /// `RepositoryError::Conflict` if the new slug is taken.
    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        id: NewsArticleId,
        draft: &NewsDraft,
    ) -> Result<NewsArticle, RepositoryError> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            r"
            UPDATE shop.news_article
            SET slug = $2, title = $3, summary = $4, body_markdown = $5, category = $6,
                image_url = $7, published = $8, featured = $9,
                published_at = COALESCE(published_at, CASE WHEN $8 THEN NOW() END),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {NEWS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.slug)
        .bind(&draft.title)
        .bind(&draft.summary)
        .bind(&draft.body_markdown)
        .bind(&draft.category)
        .bind(&draft.image_url)
        .bind(draft.published)
        .bind(draft.featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete an article.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: NewsArticleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.news_article WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Site messages
// =============================================================================

const MESSAGE_COLUMNS: &str =
    "id, title, body, kind, audience, active, starts_at, ends_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct SiteMessageRow {
    id: i32,
    title: String,
    body: String,
    kind: MessageKind,
    audience: Audience,
    active: bool,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<SiteMessageRow> for SiteMessage {
    fn from(row: SiteMessageRow) -> Self {
        Self {
            id: SiteMessageId::new(row.id),
            title: row.title,
            body: row.body,
            kind: row.kind,
            audience: row.audience,
            active: row.active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
        }
    }
}

/// Site message fields as edited in the back office.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteMessageDraft {
    pub title: String,
    pub body: String,
    pub kind: MessageKind,
    pub audience: Audience,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Repository for site-wide messages.
pub struct SiteMessageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SiteMessageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every message, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<SiteMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, SiteMessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM shop.site_message ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Messages with the active flag set. Window and audience are checked
    /// by the caller with [`SiteMessage::is_visible`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<SiteMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, SiteMessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM shop.site_message WHERE active ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: SiteMessageId,
    ) -> Result<Option<SiteMessage>, RepositoryError> {
        let row = sqlx::query_as::<_, SiteMessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM shop.site_message WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: &SiteMessageDraft) -> Result<SiteMessage, RepositoryError> {
        let row = sqlx::query_as::<_, SiteMessageRow>(&format!(
            r"
            INSERT INTO shop.site_message (title, body, kind, audience, active, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(&draft.title)
        .bind(&draft.body)
        .bind(draft.kind)
        .bind(draft.audience)
        .bind(draft.active)
        .bind(draft.starts_at)
        .bind(draft.ends_at)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        id: SiteMessageId,
        draft: &SiteMessageDraft,
    ) -> Result<SiteMessage, RepositoryError> {
        let row = sqlx::query_as::<_, SiteMessageRow>(&format!(
            r"
            UPDATE shop.site_message
            SET title = $2, body = $3, kind = $4, audience = $5, active = $6,
                starts_at = $7, ends_at = $8
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.body)
        .bind(draft.kind)
        .bind(draft.audience)
        .bind(draft.active)
        .bind(draft.starts_at)
        .bind(draft.ends_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: SiteMessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.site_message WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Contact info
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    phone: String,
    whatsapp: String,
    email: String,
    address: String,
    hours: String,
    instagram: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<ContactRow> for ContactInfo {
    fn from(row: ContactRow) -> Self {
        Self {
            phone: row.phone,
            whatsapp: row.whatsapp,
            email: row.email,
            address: row.address,
            hours: row.hours,
            instagram: row.instagram,
            updated_at: Some(row.updated_at),
        }
    }
}

/// Repository for the single contact-info row.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The shop's contact details, or empty details if never saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self) -> Result<ContactInfo, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT phone, whatsapp, email, address, hours, instagram, updated_at
            FROM shop.contact_info
            ",
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into).unwrap_or_default())
    }

    /// Save the contact details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    #[instrument(skip(self, contact))]
    pub async fn upsert(&self, contact: &ContactInfo) -> Result<ContactInfo, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            INSERT INTO shop.contact_info (id, phone, whatsapp, email, address, hours, instagram)
            VALUES (TRUE, $1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET phone = EXCLUDED.phone, whatsapp = EXCLUDED.whatsapp, email = EXCLUDED.email,
                address = EXCLUDED.address, hours = EXCLUDED.hours,
                instagram = EXCLUDED.instagram, updated_at = NOW()
            RETURNING phone, whatsapp, email, address, hours, instagram, updated_at
            ",
        )
        .bind(&contact.phone)
        .bind(&contact.whatsapp)
        .bind(&contact.email)
        .bind(&contact.address)
        .bind(&contact.hours)
        .bind(&contact.instagram)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
