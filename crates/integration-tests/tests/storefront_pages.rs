//! Public page integration tests.
//!
//! These tests require a migrated and seeded database and the storefront
//! running (`cargo run -p carniceria-storefront`).

#![allow(clippy::unwrap_used)]

use carniceria_integration_tests::{base_url, product_ids, visitor};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = visitor();
    let base = base_url();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client
        .get(format!("{base}/health/ready"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_public_pages_render() {
    let client = visitor();
    let base = base_url();

    for path in ["/", "/products", "/news", "/about", "/how-to-order", "/delivery", "/cart"] {
        let resp = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
        let headers = resp.headers().clone();
        assert!(headers.contains_key("x-request-id"), "GET {path}");
        assert!(headers.contains_key("content-security-policy"), "GET {path}");
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_catalog_filters_by_category() {
    let client = visitor();
    let base = base_url();

    let all = client
        .get(format!("{base}/products"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let chicken = client
        .get(format!("{base}/products?category=chicken"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(product_ids(&chicken).len() <= product_ids(&all).len());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_product_is_not_found() {
    let resp = visitor()
        .get(format!("{}/products/999999", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_minimum_weight_fragment() {
    let client = visitor();
    let base = base_url();

    let html = client
        .get(format!("{base}/products"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let Some(id) = product_ids(&html).first().copied() else {
        return;
    };

    let resp = client
        .get(format!("{base}/products/{id}/minimum?kg=abc"))
        .header("hx-request", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("class=\"error\""));
}
