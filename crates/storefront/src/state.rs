//! Application state shared across handlers.

use std::path::Path;
use std::sync::Arc;

use sqlx::PgPool;

use carniceria_core::PricingPolicy;

use crate::config::StorefrontConfig;
use crate::content::{ContentError, ContentStore};
use crate::identity::IdentityClient;
use crate::recipes::{RecipeClient, RecipeError};
use crate::services::CatalogService;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("recipe client error: {0}")]
    Recipes(#[from] RecipeError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: CatalogService,
    identity: IdentityClient,
    recipes: Option<RecipeClient>,
    content: ContentStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    /// * `content_dir` - Directory holding the Markdown pages
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be loaded or the recipe client
    /// cannot be built.
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
        content_dir: &Path,
    ) -> Result<Self, StateError> {
        let catalog = CatalogService::new(pool.clone(), config.catalog_cache_ttl);
        let identity = IdentityClient::new(&config.identity);
        let recipes = config.recipes.as_ref().map(RecipeClient::new).transpose()?;
        if recipes.is_none() {
            tracing::info!("RECIPES_API_KEY not set, recipe suggestions disabled");
        }
        let content = ContentStore::load(content_dir)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                identity,
                recipes,
                content,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the cached catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the identity service client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// The recipe client, if recipe suggestions are enabled.
    #[must_use]
    pub fn recipes(&self) -> Option<&RecipeClient> {
        self.inner.recipes.as_ref()
    }

    /// Get a reference to the Markdown pages.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }

    /// Get the pricing policy.
    #[must_use]
    pub fn pricing(&self) -> &PricingPolicy {
        &self.inner.config.pricing
    }
}
