//! Checkout route handlers.
//!
//! The checkout page mints a submission key and keeps it in the session; the
//! order is stored under that key so a double-submitted form places one order.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{error, instrument};
use uuid::Uuid;

use carniceria_core::{CheckoutDetails, Order, OrderId};

use crate::db::{ContactRepository, OrderRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, session_keys};
use crate::routes::cart::{CartView, error_message};
use crate::routes::layout::PageContext;
use crate::services::cart as cart_store;
use crate::services::{OrderError, orders};
use crate::state::AppState;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub details: CheckoutDetails,
    pub error: Option<String>,
}

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub details: String,
    pub total: String,
}

/// Placed order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: i32,
    pub date: String,
    pub status: &'static str,
    pub customer_name: String,
    pub delivery_address: String,
    pub delivery_phone: String,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub delivery_fee: String,
    pub total: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            date: order.created_at.format("%d/%m/%Y %H:%M").to_string(),
            status: order.status.label(),
            customer_name: order.customer.name.clone(),
            delivery_address: order.delivery_address.clone(),
            delivery_phone: order.delivery_phone.clone(),
            notes: order.notes.clone(),
            lines: order
                .items
                .iter()
                .map(|line| {
                    let mut details = Vec::new();
                    if let Some(kg) = line.weight_kg {
                        details.push(kg.to_string());
                    }
                    if let Some(format) = line.format {
                        details.push(format.label());
                    }
                    if let Some(bone) = line.bone {
                        details.push(bone.label().to_string());
                    }
                    if line.vacuum_packed {
                        details.push("Envasado al vacío".to_string());
                    }
                    OrderLineView {
                        name: line.product_name.clone(),
                        quantity: line.quantity,
                        details: details.join(" · "),
                        total: line.line_total.to_string(),
                    }
                })
                .collect(),
            subtotal: order.subtotal.to_string(),
            delivery_fee: order.delivery_fee.to_string(),
            total: order.total.to_string(),
        }
    }
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub page: PageContext,
    pub order: OrderView,
    pub whatsapp_link: Option<String>,
}

/// The key for this checkout attempt, minting one if none is pending.
async fn submission_key(session: &Session) -> Result<Uuid, AppError> {
    if let Some(key) = session.get::<Uuid>(session_keys::SUBMISSION_KEY).await? {
        return Ok(key);
    }
    let key = Uuid::new_v4();
    session.insert(session_keys::SUBMISSION_KEY, key).await?;
    Ok(key)
}

async fn render_form(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    details: CheckoutDetails,
    error: Option<String>,
) -> CheckoutTemplate {
    let cart = cart_store::load(session).await;
    CheckoutTemplate {
        page: PageContext::load(state, session, user).await,
        cart: CartView::new(&cart, state.pricing()),
        details,
        error,
    }
}

/// Display the checkout form, pre-filled from the shopper's profile.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response, AppError> {
    if cart_store::load(&session).await.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }
    submission_key(&session).await?;

    let details = user
        .as_ref()
        .map(|u| CheckoutDetails::from_profile(&u.profile))
        .unwrap_or_default();

    Ok(render_form(&state, &session, user.as_ref(), details, None)
        .await
        .into_response())
}

/// Place the order.
#[instrument(skip(state, session, user, details))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(details): Form<CheckoutDetails>,
) -> Result<Response, AppError> {
    let cart = cart_store::load(&session).await;
    let key = submission_key(&session).await?;
    let profile_id = user.as_ref().map(CurrentUser::profile_id);

    match orders::submit(
        state.pool(),
        &cart,
        &details,
        profile_id,
        state.pricing(),
        key,
    )
    .await
    {
        Ok(order_id) => {
            cart_store::clear(&session).await?;
            session.remove::<Uuid>(session_keys::SUBMISSION_KEY).await?;
            session
                .insert(session_keys::LAST_ORDER, order_id.as_i32())
                .await?;
            Ok(Redirect::to(&format!("/checkout/success/{order_id}")).into_response())
        }
        Err(OrderError::Checkout(e)) => {
            let form = render_form(
                &state,
                &session,
                user.as_ref(),
                details,
                Some(error_message(e.code())),
            )
            .await;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, form).into_response())
        }
        Err(e @ OrderError::Repository(_)) => {
            error!(error = %e, "Order could not be stored");
            let form = render_form(
                &state,
                &session,
                user.as_ref(),
                details,
                Some(error_message("order_failed")),
            )
            .await;
            Ok((StatusCode::SERVICE_UNAVAILABLE, form).into_response())
        }
    }
}

/// Whether this visitor may see the order: it was placed in this session or
/// belongs to the signed-in shopper.
fn may_view(order: &Order, last_order: Option<i32>, user: Option<&CurrentUser>) -> bool {
    last_order == Some(order.id.as_i32())
        || matches!(
            (order.profile_id, user),
            (Some(owner), Some(user)) if owner == user.profile_id()
        )
}

/// Order confirmation with the WhatsApp hand-off.
#[instrument(skip(state, session, user))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let order = OrderRepository::new(state.pool())
        .get_by_id(OrderId::new(id))
        .await?;
    let last_order = session.get::<i32>(session_keys::LAST_ORDER).await?;

    let Some(order) = order.filter(|o| may_view(o, last_order, user.as_ref())) else {
        return Err(AppError::NotFound(format!("order {id}")));
    };

    let contact = ContactRepository::new(state.pool())
        .get()
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to load contact info");
            carniceria_core::ContactInfo::default()
        });

    Ok(SuccessTemplate {
        page: PageContext::load(&state, &session, user.as_ref()).await,
        whatsapp_link: orders::whatsapp_link(&contact, &order),
        order: OrderView::from(&order),
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use carniceria_core::{CustomerSnapshot, Money, OrderStatus, ProfileId};

    use super::*;

    fn order(profile_id: Option<ProfileId>) -> Order {
        Order {
            id: OrderId::new(7),
            profile_id,
            customer: CustomerSnapshot {
                name: "Ana".to_string(),
                phone: "1155550000".to_string(),
                address: "Mitre 100".to_string(),
            },
            delivery_address: "Mitre 100".to_string(),
            delivery_phone: "1155550000".to_string(),
            notes: None,
            subtotal: Money::new(4000),
            delivery_fee: Money::new(1500),
            total: Money::new(5500),
            status: OrderStatus::Pending,
            submission_key: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items: Vec::new(),
        }
    }

    #[test]
    fn test_guest_sees_order_placed_in_session() {
        assert!(may_view(&order(None), Some(7), None));
        assert!(!may_view(&order(None), Some(8), None));
        assert!(!may_view(&order(None), None, None));
    }

    #[test]
    fn test_order_view_formats_totals() {
        let view = OrderView::from(&order(Some(ProfileId::new(3))));
        assert_eq!(view.total, "$5.500");
        assert_eq!(view.delivery_fee, "$1.500");
        assert!(view.lines.is_empty());
    }
}
