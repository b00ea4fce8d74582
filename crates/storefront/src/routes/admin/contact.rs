//! Contact details route handlers.

use askama::Template;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use carniceria_core::ContactInfo;

use crate::db::ContactRepository;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::{AdminUserView, render};

/// Contact form input.
#[derive(Debug, Deserialize)]
pub struct ContactFormInput {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub hours: String,
    #[serde(default)]
    pub instagram: String,
}

impl From<ContactFormInput> for ContactInfo {
    fn from(input: ContactFormInput) -> Self {
        let instagram = input.instagram.trim().trim_start_matches('@').to_string();
        Self {
            phone: input.phone.trim().to_string(),
            whatsapp: input.whatsapp.trim().to_string(),
            email: input.email.trim().to_string(),
            address: input.address.trim().to_string(),
            hours: input.hours.trim().to_string(),
            instagram: (!instagram.is_empty()).then_some(instagram),
            updated_at: None,
        }
    }
}

/// Contact details page template.
#[derive(Template)]
#[template(path = "admin/contact.html")]
pub struct ContactTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub contact: ContactInfo,
    pub updated_at: Option<String>,
    pub error: Option<String>,
}

/// Contact details page handler.
#[instrument(skip(admin, state))]
pub async fn show(RequireAdmin(admin): RequireAdmin, State(state): State<AppState>) -> Response {
    let (contact, error) = match ContactRepository::new(state.pool()).get().await {
        Ok(contact) => (contact, None),
        Err(e) => {
            tracing::error!("Failed to fetch contact info: {e}");
            (
                ContactInfo::default(),
                Some("No se pudieron cargar los datos de contacto".to_string()),
            )
        }
    };

    render(&ContactTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/admin/contact".to_string(),
        updated_at: contact
            .updated_at
            .map(|t| t.format("%d/%m/%Y %H:%M").to_string()),
        contact,
        error,
    })
}

/// Save contact details handler.
#[instrument(skip(_admin, state, input))]
pub async fn save(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Form(input): Form<ContactFormInput>,
) -> Response {
    let contact = ContactInfo::from(input);

    match ContactRepository::new(state.pool()).upsert(&contact).await {
        Ok(_) => {
            tracing::info!("Contact info updated");
            Redirect::to("/admin/contact").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to save contact info");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudieron guardar los datos").into_response()
        }
    }
}
