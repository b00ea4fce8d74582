//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use carniceria_core::{
    BoneOption, Category, CutFormat, Kilograms, Money, Product, ProductId, SellableBy,
};

use super::RepositoryError;

/// Columns selected for every product query.
const PRODUCT_COLUMNS: &str = r"
    id, name, description, category, price, price_per_kilo, min_kg, sellable_by,
    formats, bone_options, featured, in_stock, image_url, created_at, updated_at
";

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    category: Category,
    price: i64,
    price_per_kilo: Option<i64>,
    min_kg: Option<Decimal>,
    sellable_by: SellableBy,
    formats: Vec<String>,
    bone_options: Vec<String>,
    featured: bool,
    in_stock: bool,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("product {}: invalid {what}: {e}", row.id))
        };

        let formats = row
            .formats
            .iter()
            .map(|f| f.parse::<CutFormat>().map_err(|e| corrupt("format", &e)))
            .collect::<Result<Vec<_>, _>>()?;
        let bone_options = row
            .bone_options
            .iter()
            .map(|b| b.parse::<BoneOption>().map_err(|e| corrupt("bone option", &e)))
            .collect::<Result<Vec<_>, _>>()?;
        let min_kg = row
            .min_kg
            .map(Kilograms::new)
            .transpose()
            .map_err(|e| corrupt("minimum weight", &e))?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            category: row.category,
            price: Money::new(row.price),
            price_per_kilo: row.price_per_kilo.map(Money::new),
            min_kg,
            sellable_by: row.sellable_by,
            formats,
            bone_options,
            featured: row.featured,
            in_stock: row.in_stock,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Product fields as edited in the back office.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub price: Money,
    pub price_per_kilo: Option<Money>,
    pub min_kg: Option<Kilograms>,
    pub sellable_by: SellableBy,
    pub formats: Vec<CutFormat>,
    pub bone_options: Vec<BoneOption>,
    pub featured: bool,
    pub in_stock: bool,
    pub image_url: Option<String>,
}

impl ProductDraft {
    fn format_strings(&self) -> Vec<String> {
        self.formats.iter().map(ToString::to_string).collect()
    }

    fn bone_strings(&self) -> Vec<String> {
        self.bone_options.iter().map(|b| b.as_str().to_owned()).collect()
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every product, in stock or not, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored option is unknown.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product ORDER BY name, id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// List products shoppers can buy.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_in_stock(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE in_stock ORDER BY name, id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO shop.product
                (name, description, category, price, price_per_kilo, min_kg, sellable_by,
                 formats, bone_options, featured, in_stock, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.category)
        .bind(draft.price)
        .bind(draft.price_per_kilo)
        .bind(draft.min_kg.map(Kilograms::value))
        .bind(draft.sellable_by)
        .bind(draft.format_strings())
        .bind(draft.bone_strings())
        .bind(draft.featured)
        .bind(draft.in_stock)
        .bind(&draft.image_url)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Overwrite a product's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE shop.product
            SET name = $2, description = $3, category = $4, price = $5, price_per_kilo = $6,
                min_kg = $7, sellable_by = $8, formats = $9, bone_options = $10,
                featured = $11, in_stock = $12, image_url = $13, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.category)
        .bind(draft.price)
        .bind(draft.price_per_kilo)
        .bind(draft.min_kg.map(Kilograms::value))
        .bind(draft.sellable_by)
        .bind(draft.format_strings())
        .bind(draft.bone_strings())
        .bind(draft.featured)
        .bind(draft.in_stock)
        .bind(&draft.image_url)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Flip the stock flag, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    #[instrument(skip(self))]
    pub async fn toggle_stock(&self, id: ProductId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            r"
            UPDATE shop.product
            SET in_stock = NOT in_stock, updated_at = NOW()
            WHERE id = $1
            RETURNING in_stock
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Past order lines keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ProductRow {
        ProductRow {
            id: 7,
            name: "Vacío".into(),
            description: String::new(),
            category: Category::Beef,
            price: 9000,
            price_per_kilo: Some(11_000),
            min_kg: Some(Decimal::new(15, 1)),
            sellable_by: SellableBy::Both,
            formats: vec!["whole".into(), "sliced-2".into()],
            bone_options: vec!["boneless".into()],
            featured: true,
            in_stock: true,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let product = Product::try_from(row()).expect("valid row");
        assert_eq!(product.formats, vec![CutFormat::Whole, CutFormat::Sliced(2)]);
        assert_eq!(product.bone_options, vec![BoneOption::Boneless]);
        assert_eq!(product.min_kg.map(Kilograms::value), Some(Decimal::new(15, 1)));
    }

    #[test]
    fn test_unknown_format_is_corruption() {
        let mut bad = row();
        bad.formats.push("diced".into());
        assert!(matches!(
            Product::try_from(bad),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_zero_minimum_is_corruption() {
        let mut bad = row();
        bad.min_kg = Some(Decimal::ZERO);
        assert!(Product::try_from(bad).is_err());
    }
}
