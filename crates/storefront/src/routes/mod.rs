//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Home page
//!
//! # Products
//! GET  /products                   - Catalog (?q=&category=&bone=&sort=)
//! GET  /products/{id}              - Product detail
//! GET  /products/{id}/minimum      - Minimum-weight verdict for ?kg= (HTMX)
//! POST /products/{id}/recipes      - Recipe suggestion (HTMX)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                       - Cart page
//! POST /cart/add                   - Add to cart (triggers cart-updated)
//! POST /cart/update                - Update quantity (returns cart_items fragment)
//! POST /cart/remove                - Remove line (returns cart_items fragment)
//! POST /cart/vacuum                - Toggle vacuum packing (returns cart_items fragment)
//! POST /cart/clear                 - Empty the cart
//! GET  /cart/count                 - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout                   - Checkout form
//! POST /checkout                   - Place order
//! GET  /checkout/success/{id}      - Confirmation with WhatsApp link
//!
//! # Account (requires auth)
//! GET  /account                    - Profile and recent orders
//! POST /account/profile            - Save profile
//! GET  /account/orders             - Order history
//!
//! # Auth (rate limited)
//! GET  /auth/login                 - Login page
//! POST /auth/login                 - Login action
//! GET  /auth/register              - Register page
//! POST /auth/register              - Register action
//! POST /auth/logout                - Logout action
//! GET  /auth/sso/{provider}        - Start third-party sign-in
//! GET  /auth/callback              - Finish third-party sign-in
//!
//! # Content
//! GET  /news                       - News index
//! GET  /news/{slug}                - News article
//! GET  /about                      - About the shop
//! GET  /how-to-order               - How to order
//! GET  /delivery                   - Delivery schedule
//! POST /banner/dismiss             - Hide the promotional banner
//!
//! # Back office (requires admin role)
//! /admin/...                       - See [`admin`]
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod banner;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod layout;
pub mod news;
pub mod pages;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/sso/{provider}", get(auth::sso_start))
        .route("/callback", get(auth::sso_callback))
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/minimum", get(products::minimum))
        .route(
            "/{id}/recipes",
            post(products::recipes).layer(api_rate_limiter()),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/vacuum", post(cart::vacuum))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
        .layer(api_rate_limiter())
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/success/{id}", get(checkout::success))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/profile", post(account::update_profile))
        .route("/orders", get(account::orders))
}

/// Create the news routes router.
pub fn news_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(news::index))
        .route("/{slug}", get(news::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
        .nest("/news", news_routes())
        .route("/about", get(pages::about))
        .route("/how-to-order", get(pages::how_to_order))
        .route("/delivery", get(pages::delivery_info))
        .route("/banner/dismiss", post(banner::dismiss))
        .nest("/admin", admin::routes())
}
