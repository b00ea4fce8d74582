//! Integration tests for the Carnicería storefront.
//!
//! The tests talk HTTP to a running server and are `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p carniceria-cli -- migrate
//! cargo run -p carniceria-cli -- seed
//! cargo run -p carniceria-storefront &
//! cargo test -p carniceria-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_BASE_URL` points the tests at another server.

use reqwest::Client;
use reqwest::redirect::Policy;

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client with its own cookie jar (one visitor) that does not follow
/// redirects, so tests can assert on them.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn visitor() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Product ids linked from a catalog page, in page order.
#[must_use]
pub fn product_ids(html: &str) -> Vec<i32> {
    let mut ids = Vec::new();
    for part in html.split("href=\"/products/").skip(1) {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        if let Ok(id) = digits.parse::<i32>()
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_ids_deduplicates_links() {
        let html = r#"<a href="/products/3">A</a><a href="/products/3">A</a>
            <a href="/products/12/minimum">x</a><a href="/products?category=beef">c</a>"#;
        assert_eq!(product_ids(html), vec![3, 12]);
    }
}
