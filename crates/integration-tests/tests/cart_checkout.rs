//! Cart and checkout integration tests.
//!
//! These tests require a migrated and seeded database and the storefront
//! running (`cargo run -p carniceria-storefront`).

#![allow(clippy::unwrap_used)]

use carniceria_integration_tests::{base_url, product_ids, visitor};
use reqwest::{Client, StatusCode};

/// First in-stock product sold by the unit, if any.
async fn unit_product(client: &Client) -> Option<i32> {
    let base = base_url();
    let html = client
        .get(format!("{base}/products"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    for id in product_ids(&html) {
        let page = client
            .get(format!("{base}/products/{id}"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        if page.contains("por unidad") && page.contains("name=\"product_id\"") {
            return Some(id);
        }
    }
    None
}

async fn cart_count(client: &Client) -> String {
    client
        .get(format!("{}/cart/count", base_url()))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_add_to_cart_merges_identical_lines() {
    let client = visitor();
    let base = base_url();
    let Some(id) = unit_product(&client).await else {
        return;
    };
    let id = id.to_string();

    for _ in 0..2 {
        let resp = client
            .post(format!("{base}/cart/add"))
            .header("hx-request", "true")
            .form(&[("product_id", id.as_str()), ("mode", "unit")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("hx-trigger").and_then(|v| v.to_str().ok()),
            Some("cart-updated")
        );
    }

    assert!(cart_count(&client).await.contains("(2)"));

    let cart = client
        .get(format!("{base}/cart"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(cart.matches("name=\"quantity\"").count(), 1);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_clear_cart_empties_it() {
    let client = visitor();
    let base = base_url();
    let Some(id) = unit_product(&client).await else {
        return;
    };

    client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", id.to_string().as_str()), ("mode", "unit")])
        .send()
        .await
        .unwrap();
    client
        .post(format!("{base}/cart/clear"))
        .send()
        .await
        .unwrap();

    assert!(!cart_count(&client).await.contains('('));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_empty_cart_checkout_redirects_to_cart() {
    let resp = visitor()
        .get(format!("{}/checkout", base_url()))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(
        resp.headers().get("location").and_then(|v| v.to_str().ok()),
        Some("/cart")
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_requires_contact_details() {
    let client = visitor();
    let base = base_url();
    let Some(id) = unit_product(&client).await else {
        return;
    };

    client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", id.to_string().as_str()), ("mode", "unit")])
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/checkout"))
        .form(&[("name", "Ana"), ("phone", ""), ("address", "Calle 1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_places_order_once() {
    let client = visitor();
    let base = base_url();
    let Some(id) = unit_product(&client).await else {
        return;
    };

    client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", id.to_string().as_str()), ("mode", "unit")])
        .send()
        .await
        .unwrap();
    client.get(format!("{base}/checkout")).send().await.unwrap();

    let resp = client
        .post(format!("{base}/checkout"))
        .form(&[
            ("name", "Ana Pérez"),
            ("phone", "11 5555-0000"),
            ("address", "Calle Falsa 123"),
        ])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(location.starts_with("/checkout/success/"));

    let success = client
        .get(format!("{base}{location}"))
        .send()
        .await
        .unwrap();
    assert_eq!(success.status(), StatusCode::OK);

    // The cart was emptied, so a second submit has nothing to place
    assert!(!cart_count(&client).await.contains('('));

    // Another visitor cannot see the confirmation
    let stranger = visitor()
        .get(format!("{base}{location}"))
        .send()
        .await
        .unwrap();
    assert_eq!(stranger.status(), StatusCode::NOT_FOUND);
}
