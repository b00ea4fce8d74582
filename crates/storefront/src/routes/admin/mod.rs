//! Back office route handlers.
//!
//! Every handler takes [`RequireAdmin`], which re-reads the shopper's role
//! from the database on each request.
//!
//! # Route Structure
//!
//! ```text
//! GET  /admin                          - Dashboard (orders by status)
//!
//! GET  /admin/products                 - Product list
//! GET  /admin/products/new             - New product form
//! POST /admin/products                 - Create product
//! GET  /admin/products/{id}/edit       - Edit product form
//! POST /admin/products/{id}            - Update product
//! POST /admin/products/{id}/stock      - Toggle stock
//! POST /admin/products/{id}/delete     - Delete product
//!
//! GET  /admin/orders                   - Order list (?status=)
//! GET  /admin/orders/{id}              - Order detail
//! POST /admin/orders/{id}/status       - Move order to a new status
//!
//! GET  /admin/delivery                 - Weekly delivery schedule
//! POST /admin/delivery                 - Replace the schedule
//!
//! GET  /admin/contact                  - Contact details
//! POST /admin/contact                  - Save contact details
//!
//! GET  /admin/messages                 - Site messages
//! GET  /admin/messages/new             - New message form
//! POST /admin/messages                 - Create message
//! GET  /admin/messages/{id}/edit       - Edit message form
//! POST /admin/messages/{id}            - Update message
//! POST /admin/messages/{id}/delete     - Delete message
//!
//! GET  /admin/news                     - News articles
//! GET  /admin/news/new                 - New article form
//! POST /admin/news                     - Create article
//! GET  /admin/news/{id}/edit           - Edit article form
//! POST /admin/news/{id}                - Update article
//! POST /admin/news/{id}/delete         - Delete article
//! ```
//!
//! [`RequireAdmin`]: crate::middleware::RequireAdmin

pub mod contact;
pub mod dashboard;
pub mod delivery;
pub mod messages;
pub mod news;
pub mod orders;
pub mod products;

use askama::Template;
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use carniceria_core::UserProfile;

use crate::state::AppState;

/// Signed-in administrator, for the back office header.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
}

impl From<&UserProfile> for AdminUserView {
    fn from(profile: &UserProfile) -> Self {
        Self {
            name: profile.greeting_name().to_string(),
            email: profile.email.to_string(),
        }
    }
}

/// Render a back office template, logging render failures.
pub fn render(template: &impl Template) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Raw form fields, for forms with repeated or indexed names.
#[derive(Debug, Default)]
pub struct Fields(pub Vec<(String, String)>);

impl Fields {
    /// First value for `name`, trimmed; empty when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map_or("", |(_, value)| value.trim())
    }

    /// First value for `name`, or `None` when absent or blank.
    #[must_use]
    pub fn optional(&self, name: &str) -> Option<String> {
        let value = self.get(name);
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Every non-blank value for `name`.
    #[must_use]
    pub fn all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.trim())
            .collect()
    }

    /// Whether a checkbox named `name` was ticked.
    #[must_use]
    pub fn checked(&self, name: &str) -> bool {
        matches!(self.get(name), "on" | "true" | "1")
    }
}

/// Parse a `datetime-local` input given in the shop's local time.
#[must_use]
pub fn parse_local_datetime(value: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M").ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp for a `datetime-local` input in the shop's local time.
#[must_use]
pub fn format_local_datetime(value: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    value
        .map(|dt| dt.with_timezone(&offset).format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default()
}

/// Create the back office router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/products", get(products::index).post(products::create))
        .route("/products/new", get(products::new))
        .route("/products/{id}", post(products::update))
        .route("/products/{id}/edit", get(products::edit))
        .route("/products/{id}/stock", post(products::toggle_stock))
        .route("/products/{id}/delete", post(products::delete))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/delivery", get(delivery::show).post(delivery::save))
        .route("/contact", get(contact::show).post(contact::save))
        .route("/messages", get(messages::index).post(messages::create))
        .route("/messages/new", get(messages::new))
        .route("/messages/{id}", post(messages::update))
        .route("/messages/{id}/edit", get(messages::edit))
        .route("/messages/{id}/delete", post(messages::delete))
        .route("/news", get(news::index).post(news::create))
        .route("/news/new", get(news::new))
        .route("/news/{id}", post(news::update))
        .route("/news/{id}/edit", get(news::edit))
        .route("/news/{id}/delete", post(news::delete))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        Fields(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_fields_lookup() {
        let f = fields(&[
            ("name", " Vacío "),
            ("formats", "whole"),
            ("formats", ""),
            ("formats", "ground"),
            ("featured", "on"),
        ]);
        assert_eq!(f.get("name"), "Vacío");
        assert_eq!(f.get("missing"), "");
        assert_eq!(f.optional("missing"), None);
        assert_eq!(f.all("formats"), vec!["whole", "ground"]);
        assert!(f.checked("featured"));
        assert!(!f.checked("in_stock"));
    }

    #[test]
    fn test_local_datetime_round_trip_in_shop_time() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let utc = parse_local_datetime("2025-10-14T09:30", offset).unwrap();
        assert_eq!(utc.to_rfc3339(), "2025-10-14T12:30:00+00:00");
        assert_eq!(format_local_datetime(Some(utc), offset), "2025-10-14T09:30");
        assert_eq!(parse_local_datetime("", offset), None);
    }
}
