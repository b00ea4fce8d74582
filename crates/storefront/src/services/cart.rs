//! Cart persistence in the visitor's session.
//!
//! The cart is stored as a versioned [`PersistedCart`] envelope. Anything that
//! fails to deserialize or validate is dropped and the visitor starts over
//! with an empty cart.

use tower_sessions::Session;
use tracing::warn;

use carniceria_core::{Cart, PersistedCart};

use crate::models::session_keys;

/// Load the visitor's cart, resetting it if the stored data is unusable.
pub async fn load(session: &Session) -> Cart {
    let persisted = match session.get::<PersistedCart>(session_keys::CART).await {
        Ok(Some(persisted)) => persisted,
        Ok(None) => return Cart::new(),
        Err(e) => {
            warn!(error = %e, "Discarding unreadable cart");
            discard(session).await;
            return Cart::new();
        }
    };

    match Cart::restore(persisted) {
        Ok(cart) => cart,
        Err(e) => {
            warn!(error = %e, "Discarding invalid cart");
            discard(session).await;
            Cart::new()
        }
    }
}

/// Persist the full cart.
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
pub async fn save(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart.persist()).await
}

/// Remove the cart from the session entirely.
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<serde_json::Value>(session_keys::CART)
        .await
        .map(|_| ())
}

async fn discard(session: &Session) {
    if let Err(e) = clear(session).await {
        warn!(error = %e, "Failed to remove discarded cart from session");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tower_sessions::MemoryStore;

    use carniceria_core::{
        Category, Kilograms, Money, Product, ProductId, Selection, SellableBy,
    };

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn vacio() -> Product {
        Product {
            id: ProductId::new(7),
            name: "Vacío".to_string(),
            description: String::new(),
            category: Category::Beef,
            price: Money::new(9000),
            price_per_kilo: Some(Money::new(9000)),
            min_kg: None,
            sellable_by: SellableBy::Both,
            formats: Vec::new(),
            bone_options: Vec::new(),
            featured: false,
            in_stock: true,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_empty_session_has_empty_cart() {
        assert!(load(&session()).await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let session = session();
        let mut cart = Cart::new();
        cart.add_item(&vacio(), Selection::unit()).unwrap();
        cart.add_item(&vacio(), Selection::weight("1,5".parse::<Kilograms>().unwrap()))
            .unwrap();
        save(&session, &cart).await.unwrap();

        assert_eq!(load(&session).await, cart);
    }

    #[tokio::test]
    async fn test_clear_empties_stored_cart() {
        let session = session();
        let mut cart = Cart::new();
        cart.add_item(&vacio(), Selection::unit()).unwrap();
        save(&session, &cart).await.unwrap();

        clear(&session).await.unwrap();

        assert!(load(&session).await.is_empty());
        assert!(
            session
                .get::<serde_json::Value>(session_keys::CART)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_garbage_resets_to_empty() {
        let session = session();
        session
            .insert(session_keys::CART, serde_json::json!({"items": "nope"}))
            .await
            .unwrap();

        assert!(load(&session).await.is_empty());
        assert!(
            session
                .get::<serde_json::Value>(session_keys::CART)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unknown_version_resets_to_empty() {
        let session = session();
        session
            .insert(
                session_keys::CART,
                serde_json::json!({"version": 99, "items": []}),
            )
            .await
            .unwrap();

        assert!(load(&session).await.is_empty());
    }
}
