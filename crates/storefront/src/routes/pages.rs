//! Static content page route handlers.
//!
//! Serves the shop's Markdown pages. The delivery page also lists the weekly
//! schedule and the next delivery window.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::NaiveDate;
use tower_sessions::Session;
use tracing::instrument;

use carniceria_core::{DeliverySlot, weekday_label};

use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::routes::layout::PageContext;
use crate::services::delivery;
use crate::state::AppState;

/// Content page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/content.html")]
pub struct ContentPageTemplate {
    pub page: PageContext,
    pub title: String,
    pub description: String,
    pub updated_at: Option<NaiveDate>,
    pub content_html: String,
}

/// One delivery window for display.
#[derive(Clone)]
pub struct SlotView {
    pub weekday: &'static str,
    pub hours: String,
}

impl From<&DeliverySlot> for SlotView {
    fn from(slot: &DeliverySlot) -> Self {
        Self {
            weekday: weekday_label(slot.weekday),
            hours: format!(
                "{} a {}",
                slot.starts_at.format("%H:%M"),
                slot.ends_at.format("%H:%M")
            ),
        }
    }
}

/// Delivery page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/delivery.html")]
pub struct DeliveryPageTemplate {
    pub page: PageContext,
    pub content: ContentPageTemplate,
    pub slots: Vec<SlotView>,
    pub next_delivery: Option<String>,
    pub free_shipping_threshold: String,
    pub delivery_fee: String,
}

/// Serve a content page by slug.
async fn content_page(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    slug: &str,
) -> Result<ContentPageTemplate, AppError> {
    let page = state
        .content()
        .get_page(slug)
        .ok_or_else(|| AppError::NotFound(format!("page {slug}")))?;

    Ok(ContentPageTemplate {
        page: PageContext::load(state, session, user).await,
        title: page.meta.title.clone(),
        description: page.meta.description.clone().unwrap_or_default(),
        updated_at: page.meta.updated_at,
        content_html: page.content_html.clone(),
    })
}

/// Display the "Quiénes somos" page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, session, user))]
pub async fn about(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    content_page(&state, &session, user.as_ref(), "about").await
}

/// Display the "Cómo comprar" page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, session, user))]
pub async fn how_to_order(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    content_page(&state, &session, user.as_ref(), "how-to-order").await
}

/// Display the delivery page with the weekly schedule.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, session, user))]
pub async fn delivery_info(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    let content = content_page(&state, &session, user.as_ref(), "delivery").await?;
    let slots = delivery::schedule(state.pool()).await;
    let next = carniceria_core::next_delivery(
        &slots,
        delivery::shop_now(state.config().shop_utc_offset),
    );

    Ok(DeliveryPageTemplate {
        page: content.page.clone(),
        slots: slots
            .iter()
            .filter(|slot| slot.active)
            .map(SlotView::from)
            .collect(),
        next_delivery: next.map(|n| n.describe()),
        free_shipping_threshold: state.pricing().free_shipping_threshold().to_string(),
        delivery_fee: state.pricing().delivery_fee().to_string(),
        content,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, Weekday};

    use carniceria_core::DeliverySlotId;

    use super::*;

    #[test]
    fn test_slot_view_formats_hours() {
        let slot = DeliverySlot {
            id: DeliverySlotId::new(1),
            weekday: Weekday::Sat,
            starts_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            ends_at: NaiveTime::from_hms_opt(13, 30, 0).unwrap_or_default(),
            active: true,
            max_orders: None,
        };
        let view = SlotView::from(&slot);
        assert_eq!(view.weekday, "Sábado");
        assert_eq!(view.hours, "09:00 a 13:30");
    }
}
