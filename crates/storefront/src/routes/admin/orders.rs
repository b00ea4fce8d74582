//! Order management route handlers.

use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use carniceria_core::{OrderId, OrderStatus};

use crate::db::{ContactRepository, OrderRepository, RepositoryError};
use crate::middleware::RequireAdmin;
use crate::routes::checkout::OrderView;
use crate::services::orders::whatsapp_link;
use crate::state::AppState;

use super::{AdminUserView, render};

/// Orders shown on the list page.
const ORDER_LIST_LIMIT: i64 = 100;

/// Status filter query parameters.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
    pub error: Option<String>,
}

/// Status change form input.
#[derive(Debug, Deserialize)]
pub struct StatusFormInput {
    pub status: String,
}

/// A status tab or button.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Orders list page template.
#[derive(Template)]
#[template(path = "admin/orders/index.html")]
pub struct OrdersIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub statuses: Vec<StatusOption>,
    pub orders: Vec<OrderView>,
    pub error: Option<String>,
}

/// Order detail page template.
#[derive(Template)]
#[template(path = "admin/orders/show.html")]
pub struct OrderShowTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub order: OrderView,
    pub customer_phone: String,
    pub transitions: Vec<StatusOption>,
    pub whatsapp_link: Option<String>,
    pub error: Option<String>,
}

/// Orders list page handler.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let filter = query
        .status
        .as_deref()
        .and_then(|s| s.parse::<OrderStatus>().ok());

    let (orders, error) = match OrderRepository::new(state.pool())
        .list(filter, ORDER_LIST_LIMIT)
        .await
    {
        Ok(orders) => (orders.iter().map(OrderView::from).collect(), None),
        Err(e) => {
            tracing::error!("Failed to fetch orders: {e}");
            (Vec::new(), Some("No se pudieron cargar los pedidos".to_string()))
        }
    };

    render(&OrdersIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/admin/orders".to_string(),
        statuses: OrderStatus::ALL
            .into_iter()
            .map(|s| StatusOption {
                value: s.as_str(),
                label: s.label(),
                selected: filter == Some(s),
            })
            .collect(),
        orders,
        error,
    })
}

/// Order detail page handler.
#[instrument(skip(admin, state))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let order = match OrderRepository::new(state.pool())
        .get_by_id(OrderId::new(id))
        .await
    {
        Ok(Some(order)) => order,
        Ok(None) => return (StatusCode::NOT_FOUND, "Pedido no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch order: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo cargar el pedido")
                .into_response();
        }
    };

    let contact = ContactRepository::new(state.pool())
        .get()
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch contact info: {e}");
            carniceria_core::ContactInfo::default()
        });

    render(&OrderShowTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/admin/orders".to_string(),
        customer_phone: order.customer.phone.clone(),
        transitions: order
            .status
            .allowed_transitions()
            .into_iter()
            .map(|s| StatusOption {
                value: s.as_str(),
                label: s.label(),
                selected: false,
            })
            .collect(),
        whatsapp_link: whatsapp_link(&contact, &order),
        order: OrderView::from(&order),
        error: query
            .error
            .map(|_| "Ese cambio de estado no está permitido".to_string()),
    })
}

/// Order status change handler.
#[instrument(skip(_admin, state))]
pub async fn update_status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(input): Form<StatusFormInput>,
) -> Response {
    let Ok(to) = input.status.parse::<OrderStatus>() else {
        return (StatusCode::BAD_REQUEST, "Estado desconocido").into_response();
    };

    match OrderRepository::new(state.pool())
        .update_status(OrderId::new(id), to)
        .await
    {
        Ok(_) => Redirect::to(&format!("/admin/orders/{id}")).into_response(),
        Err(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Pedido no encontrado").into_response()
        }
        Err(RepositoryError::Conflict(reason)) => {
            tracing::warn!(order_id = id, %reason, "Order status change rejected");
            Redirect::to(&format!("/admin/orders/{id}?error=transition")).into_response()
        }
        Err(e) => {
            tracing::error!(order_id = id, error = %e, "Failed to update order status");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo actualizar el pedido").into_response()
        }
    }
}
