//! Catalog provider with a short-lived in-memory cache.
//!
//! The whole in-stock catalog is loaded in one query and cached with `moka`.
//! Listing, filtering and sorting then run in memory through
//! [`carniceria_core::catalog`]. Back-office writes call [`CatalogService::invalidate`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, error};

use carniceria_core::catalog::{self, CatalogQuery};
use carniceria_core::{Category, Product, ProductId};

use crate::db::{ProductRepository, RepositoryError};

/// Cache key for catalog data.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    InStock,
}

/// Cached, read-only view of the catalog.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    pool: PgPool,
    cache: Cache<CacheKey, Arc<Vec<Product>>>,
}

impl CatalogService {
    /// Create a catalog service whose listings live for `ttl`.
    #[must_use]
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();

        Self {
            inner: Arc::new(CatalogServiceInner { pool, cache }),
        }
    }

    /// In-stock products, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the catalog cannot be loaded.
    /// Failures are not cached.
    pub async fn try_list(&self) -> Result<Arc<Vec<Product>>, Arc<RepositoryError>> {
        let pool = self.inner.pool.clone();
        self.inner
            .cache
            .try_get_with(CacheKey::InStock, async move {
                debug!("Loading catalog from database");
                ProductRepository::new(&pool)
                    .list_in_stock()
                    .await
                    .map(Arc::new)
            })
            .await
    }

    /// In-stock products; empty when the database is unavailable.
    pub async fn list(&self) -> Arc<Vec<Product>> {
        match self.try_list().await {
            Ok(products) => products,
            Err(e) => {
                error!(error = %e, "Failed to load catalog, showing empty listing");
                Arc::new(Vec::new())
            }
        }
    }

    /// An in-stock product by ID.
    pub async fn by_id(&self, id: ProductId) -> Option<Product> {
        self.list().await.iter().find(|p| p.id == id).cloned()
    }

    /// Featured products for the home page.
    pub async fn featured(&self) -> Vec<Product> {
        catalog::featured(&self.list().await)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Products of one category.
    pub async fn by_category(&self, category: Category) -> Vec<Product> {
        catalog::by_category(&self.list().await, category)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Filtered and sorted listing.
    pub async fn search(&self, query: &CatalogQuery) -> Vec<Product> {
        query
            .apply(&self.list().await)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Drop cached listings so the next read sees fresh data.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}
