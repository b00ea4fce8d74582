//! Seed the database with demo data.
//!
//! Reads a YAML file with products, the weekly delivery schedule and the
//! shop's contact details. Products are matched by name, so running the seed
//! twice does not duplicate the catalog.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use carniceria_core::{
    BoneOption, Category, ContactInfo, CutFormat, DeliverySlotDraft, Kilograms, Money, SellableBy,
};
use carniceria_storefront::db::{
    ContactRepository, DeliveryRepository, ProductDraft, ProductRepository,
};

use super::connect;

/// Contents of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub delivery: Vec<DeliverySlotDraft>,
    #[serde(default)]
    pub contact: Option<ContactInfo>,
}

/// A catalog entry in the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub price: Money,
    #[serde(default)]
    pub price_per_kilo: Option<Money>,
    #[serde(default)]
    pub min_kg: Option<Kilograms>,
    pub sellable_by: SellableBy,
    #[serde(default)]
    pub formats: Vec<CutFormat>,
    #[serde(default)]
    pub bone_options: Vec<BoneOption>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<SeedProduct> for ProductDraft {
    fn from(p: SeedProduct) -> Self {
        Self {
            name: p.name,
            description: p.description,
            category: p.category,
            price: p.price,
            price_per_kilo: p.price_per_kilo,
            min_kg: p.min_kg,
            sellable_by: p.sellable_by,
            formats: p.formats,
            bone_options: p.bone_options,
            featured: p.featured,
            in_stock: true,
            image_url: p.image_url,
        }
    }
}

/// Parse and sanity-check a seed file.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or the delivery schedule is invalid.
pub fn parse(content: &str) -> Result<SeedFile, Box<dyn std::error::Error>> {
    let seed: SeedFile = serde_yaml::from_str(content)?;
    for slot in &seed.delivery {
        slot.validate()?;
    }
    Ok(seed)
}

/// Load a seed file into the database.
///
/// The delivery schedule and contact details are only written when none
/// exist yet, unless `force` is set.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a database operation fails.
pub async fn run(file_path: &str, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed data");
    let content = tokio::fs::read_to_string(path).await?;
    let seed = parse(&content)?;

    let pool = connect().await?;

    let products = ProductRepository::new(&pool);
    let existing: HashSet<String> = products
        .list_all()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();

    let mut created = 0;
    for product in seed.products {
        if existing.contains(&product.name) {
            continue;
        }
        products.create(&product.into()).await?;
        created += 1;
    }
    info!(created, skipped = existing.len(), "Products seeded");

    let delivery = DeliveryRepository::new(&pool);
    if !seed.delivery.is_empty() && (force || delivery.list().await?.is_empty()) {
        let slots = delivery.replace_all(&seed.delivery).await?;
        info!(slots = slots.len(), "Delivery schedule seeded");
    }

    if let Some(contact) = seed.contact {
        let repo = ContactRepository::new(&pool);
        let current = repo.get().await?;
        if force || current.phone.is_empty() {
            repo.upsert(&contact).await?;
            info!("Contact details seeded");
        }
    }

    info!("Seed complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../../../../seed/demo.yaml");

    #[test]
    fn test_demo_seed_parses() {
        let seed = parse(DEMO).unwrap();
        assert!(!seed.products.is_empty());
        assert!(!seed.delivery.is_empty());
        assert!(seed.contact.is_some());
    }

    #[test]
    fn test_seed_product_defaults_to_in_stock() {
        let seed = parse(
            r#"
products:
  - name: Vacío
    category: beef
    price: "14500"
    price_per_kilo: "14500"
    min_kg: "1"
    sellable_by: kilogram
"#,
        )
        .unwrap();
        let draft: ProductDraft = seed.products.into_iter().next().unwrap().into();
        assert!(draft.in_stock);
        assert!(draft.formats.is_empty());
        assert_eq!(draft.sellable_by, SellableBy::Kilogram);
    }

    #[test]
    fn test_inverted_slot_is_rejected() {
        let result = parse(
            r#"
delivery:
  - weekday: Tue
    starts_at: "18:00:00"
    ends_at: "09:00:00"
    active: true
    max_orders: null
"#,
        );
        assert!(result.is_err());
    }
}
