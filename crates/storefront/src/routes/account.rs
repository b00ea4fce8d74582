//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, instrument};

use carniceria_core::{AddressType, ProfileUpdate, UserProfile};

use crate::db::OrderRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, update_current_user};
use crate::models::CurrentUser;
use crate::routes::checkout::OrderView;
use crate::routes::layout::PageContext;
use crate::services::{AuthService, ProfileSave};
use crate::state::AppState;

/// Profile form values for templates.
#[derive(Clone)]
pub struct ProfileView {
    pub email: String,
    pub display_name: String,
    pub phone: String,
    pub address: String,
    pub address_type: String,
    pub floor: String,
    pub buzzer: String,
}

impl From<&UserProfile> for ProfileView {
    fn from(profile: &UserProfile) -> Self {
        Self {
            email: profile.email.to_string(),
            display_name: profile.display_name.clone().unwrap_or_default(),
            phone: profile.phone.clone().unwrap_or_default(),
            address: profile.address.clone().unwrap_or_default(),
            address_type: profile
                .address_type
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            floor: profile.floor.clone().unwrap_or_default(),
            buzzer: profile.buzzer.clone().unwrap_or_default(),
        }
    }
}

/// An address type choice for the select box.
#[derive(Clone)]
pub struct AddressTypeOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: PageContext,
    pub profile: ProfileView,
    pub address_types: Vec<AddressTypeOption>,
    pub recent_orders: Vec<OrderView>,
    /// `saved` or `local` after a profile edit.
    pub notice: Option<String>,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderView>,
}

/// Query parameters for the overview page.
#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub saved: Option<String>,
}

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub address_type: String,
    #[serde(default)]
    pub floor: String,
    #[serde(default)]
    pub buzzer: String,
}

impl From<&ProfileForm> for ProfileUpdate {
    fn from(form: &ProfileForm) -> Self {
        Self::from_form(
            &form.display_name,
            &form.phone,
            &form.address,
            &form.address_type,
            &form.floor,
            &form.buzzer,
        )
    }
}

fn notice(saved: Option<&str>, user: &CurrentUser) -> Option<String> {
    match saved {
        Some("local") => Some("Guardamos tus datos solo en este dispositivo".to_string()),
        Some(_) => Some("Tus datos se guardaron".to_string()),
        None if user.unsynced => Some(
            "Algunos cambios de tu perfil solo están guardados en este dispositivo".to_string(),
        ),
        None => None,
    }
}

async fn load_orders(state: &AppState, user: &CurrentUser) -> Vec<OrderView> {
    OrderRepository::new(state.pool())
        .list_for_profile(user.profile_id())
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to load order history");
            Vec::new()
        })
        .iter()
        .map(OrderView::from)
        .collect()
}

/// Display account overview page.
#[instrument(skip(state, session, user, query))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<AccountQuery>,
) -> impl IntoResponse {
    let mut recent_orders = load_orders(&state, &user).await;
    recent_orders.truncate(3);

    AccountIndexTemplate {
        page: PageContext::load(&state, &session, Some(&user)).await,
        profile: ProfileView::from(&user.profile),
        address_types: AddressType::ALL
            .into_iter()
            .map(|t| AddressTypeOption {
                value: t.as_str(),
                label: t.label(),
            })
            .collect(),
        recent_orders,
        notice: notice(query.saved.as_deref(), &user),
    }
}

/// Save profile edits.
#[instrument(skip(state, session, user, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(mut user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let update = ProfileUpdate::from(&form);

    let target = match AuthService::new(state.pool(), state.identity())
        .update_profile(&user, &update)
        .await
    {
        ProfileSave::Saved(profile) => {
            user.profile = profile;
            user.unsynced = false;
            "/account?saved=db"
        }
        ProfileSave::SessionOnly(profile) => {
            user.profile = profile;
            user.unsynced = true;
            "/account?saved=local"
        }
    };

    update_current_user(&session, &user).await?;
    Ok(Redirect::to(target).into_response())
}

/// Display order history.
#[instrument(skip(state, session, user))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> impl IntoResponse {
    OrdersTemplate {
        orders: load_orders(&state, &user).await,
        page: PageContext::load(&state, &session, Some(&user)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_form_converts_blanks() {
        let form = ProfileForm {
            display_name: " Ana ".to_string(),
            phone: String::new(),
            address: "Mitre 100".to_string(),
            address_type: "apartment".to_string(),
            floor: "3".to_string(),
            buzzer: " ".to_string(),
        };
        let update = ProfileUpdate::from(&form);
        assert_eq!(update.display_name.as_deref(), Some("Ana"));
        assert_eq!(update.phone, None);
        assert_eq!(update.address_type, Some(AddressType::Apartment));
        assert_eq!(update.buzzer, None);
    }
}
