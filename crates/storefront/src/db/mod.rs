//! Database operations for the shop's `PostgreSQL`.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `product` - Catalog, including per-kilogram prices and cut options
//! - `profile` - Shopper profiles keyed by identity-service subject
//! - `orders` / `order_line` - Placed orders with frozen prices
//! - `delivery_slot` - Weekly delivery windows
//! - `news_article` - News and blog posts (Markdown)
//! - `site_message` - Banners shown across the site
//! - `contact_info` - The shop's contact details (single row)
//!
//! Sessions live in `tower_sessions.session`, managed by the session store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p carniceria-cli -- migrate
//! ```

pub mod content;
pub mod delivery;
pub mod orders;
pub mod products;
pub mod profiles;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use content::{
    ContactRepository, NewsDraft, NewsRepository, SiteMessageDraft, SiteMessageRepository,
};
pub use delivery::DeliveryRepository;
pub use orders::{OrderRepository, Submission};
pub use products::{ProductDraft, ProductRepository};
pub use profiles::{NewProfile, ProfileRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
