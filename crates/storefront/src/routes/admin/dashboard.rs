//! Dashboard route handler.

use askama::Template;
use axum::{extract::State, response::Response};
use tracing::instrument;

use crate::db::{OrderRepository, ProductRepository};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::{AdminUserView, render};

/// Order count for one status.
#[derive(Debug, Clone)]
pub struct StatusCount {
    pub status: &'static str,
    pub label: &'static str,
    pub count: i64,
}

/// Recent order view for dashboard.
#[derive(Debug, Clone)]
pub struct RecentOrderView {
    pub id: i32,
    pub customer_name: String,
    pub total: String,
    pub status: &'static str,
    pub date: String,
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub counts: Vec<StatusCount>,
    pub product_count: usize,
    pub out_of_stock: usize,
    pub recent_orders: Vec<RecentOrderView>,
}

/// Dashboard page handler.
#[instrument(skip(admin, state))]
pub async fn dashboard(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Response {
    let orders = OrderRepository::new(state.pool());

    let counts = orders
        .count_by_status()
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to count orders: {e}");
            Vec::new()
        })
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.as_str(),
            label: status.label(),
            count,
        })
        .collect();

    let recent_orders = orders
        .list(None, 5)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch recent orders: {e}");
            Vec::new()
        })
        .iter()
        .map(|order| RecentOrderView {
            id: order.id.as_i32(),
            customer_name: order.customer.name.clone(),
            total: order.total.to_string(),
            status: order.status.label(),
            date: order.created_at.format("%d/%m %H:%M").to_string(),
        })
        .collect();

    let products = ProductRepository::new(state.pool())
        .list_all()
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch products: {e}");
            Vec::new()
        });

    render(&DashboardTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/admin".to_string(),
        counts,
        product_count: products.len(),
        out_of_stock: products.iter().filter(|p| !p.in_stock).count(),
        recent_orders,
    })
}
