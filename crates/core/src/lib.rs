//! Carnicería Core - domain library for the butcher shop storefront.
//!
//! This crate holds everything about the shop that can be reasoned about
//! without a database or a network:
//! - [`types`] - ids, money, products, orders, profiles, delivery windows, content
//! - [`cart`] - the shopper's cart and its mutation rules
//! - [`pricing`] - line prices, vacuum-packing surcharge, delivery fee
//! - [`catalog`] - accent-insensitive search, filters and sorting
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The `postgres` feature adds `sqlx` encodings so the
//! storefront can bind these types directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod pricing;
pub mod types;

pub use cart::{Cart, CartError, CartItem, CartLoadError, LineId, PersistedCart, Selection};
pub use catalog::{CatalogQuery, SortOrder};
pub use pricing::{OrderTotals, PricingError, PricingPolicy};
pub use types::*;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::{Money, Product, ProductId, SellableBy};
    use crate::types::Category;

    /// An in-stock, unit-sold beef product with no format or bone choices.
    pub fn product(id: i32, name: &str, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            description: String::new(),
            category: Category::Beef,
            price: Money::new(price),
            price_per_kilo: None,
            min_kg: None,
            sellable_by: SellableBy::Unit,
            formats: Vec::new(),
            bone_options: Vec::new(),
            featured: false,
            in_stock: true,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
