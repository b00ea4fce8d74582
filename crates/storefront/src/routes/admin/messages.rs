//! Site message route handlers.
//!
//! Start and end times are entered in the shop's local time.

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use tracing::instrument;

use carniceria_core::{Audience, MessageKind, SiteMessage, SiteMessageId, UserProfile};

use crate::db::{RepositoryError, SiteMessageDraft, SiteMessageRepository};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::{AdminUserView, format_local_datetime, parse_local_datetime, render};

const fn kind_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Info => "Información",
        MessageKind::Promo => "Promoción",
        MessageKind::Alert => "Aviso importante",
    }
}

const fn audience_label(audience: Audience) -> &'static str {
    match audience {
        Audience::Everyone => "Todos",
        Audience::Guests => "Visitantes sin cuenta",
        Audience::Customers => "Clientes con cuenta",
    }
}

/// Site message form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageFormInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub audience: String,
    pub active: Option<String>,
    #[serde(default)]
    pub starts_at: String,
    #[serde(default)]
    pub ends_at: String,
}

impl MessageFormInput {
    fn from_message(message: &SiteMessage, offset: FixedOffset) -> Self {
        Self {
            title: message.title.clone(),
            body: message.body.clone(),
            kind: message.kind.as_str().to_string(),
            audience: message.audience.as_str().to_string(),
            active: message.active.then(|| "on".to_string()),
            starts_at: format_local_datetime(message.starts_at, offset),
            ends_at: format_local_datetime(message.ends_at, offset),
        }
    }

    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns a Spanish message naming the first invalid field.
    pub fn to_draft(&self, offset: FixedOffset) -> Result<SiteMessageDraft, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("El título es obligatorio".to_string());
        }
        let kind = MessageKind::ALL
            .into_iter()
            .find(|k| k.as_str() == self.kind)
            .ok_or_else(|| "Elegí un tipo de mensaje".to_string())?;
        let audience = Audience::ALL
            .into_iter()
            .find(|a| a.as_str() == self.audience)
            .ok_or_else(|| "Elegí a quién se muestra".to_string())?;

        let when = |value: &str, field: &str| -> Result<_, String> {
            if value.trim().is_empty() {
                return Ok(None);
            }
            parse_local_datetime(value, offset)
                .map(Some)
                .ok_or_else(|| format!("Fecha de {field} inválida"))
        };
        let starts_at = when(&self.starts_at, "inicio")?;
        let ends_at = when(&self.ends_at, "fin")?;
        if let (Some(start), Some(end)) = (starts_at, ends_at)
            && end <= start
        {
            return Err("El mensaje termina antes de empezar".to_string());
        }

        Ok(SiteMessageDraft {
            title: title.to_string(),
            body: self.body.trim().to_string(),
            kind,
            audience,
            active: self.active.is_some(),
            starts_at,
            ends_at,
        })
    }
}

/// A select choice.
#[derive(Debug, Clone)]
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Message row for the list page.
#[derive(Debug, Clone)]
pub struct MessageRowView {
    pub id: i32,
    pub title: String,
    pub kind: &'static str,
    pub audience: &'static str,
    pub active: bool,
    pub visible_now: bool,
}

/// Messages list page template.
#[derive(Template)]
#[template(path = "admin/messages/index.html")]
pub struct MessagesIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub messages: Vec<MessageRowView>,
    pub error: Option<String>,
}

/// Message form page template.
#[derive(Template)]
#[template(path = "admin/messages/form.html")]
pub struct MessageFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub message_id: Option<i32>,
    pub form: MessageFormInput,
    pub kinds: Vec<Choice>,
    pub audiences: Vec<Choice>,
    pub error: Option<String>,
}

impl MessageFormTemplate {
    fn new(
        admin: &UserProfile,
        message_id: Option<i32>,
        form: MessageFormInput,
        error: Option<String>,
    ) -> Self {
        Self {
            admin_user: AdminUserView::from(admin),
            current_path: "/admin/messages".to_string(),
            message_id,
            kinds: MessageKind::ALL
                .into_iter()
                .map(|k| Choice {
                    value: k.as_str(),
                    label: kind_label(k),
                    selected: form.kind == k.as_str(),
                })
                .collect(),
            audiences: Audience::ALL
                .into_iter()
                .map(|a| Choice {
                    value: a.as_str(),
                    label: audience_label(a),
                    selected: form.audience == a.as_str(),
                })
                .collect(),
            form,
            error,
        }
    }
}

/// Messages list page handler.
#[instrument(skip(admin, state))]
pub async fn index(RequireAdmin(admin): RequireAdmin, State(state): State<AppState>) -> Response {
    let now = Utc::now();
    let (messages, error) = match SiteMessageRepository::new(state.pool()).list_all().await {
        Ok(messages) => (
            messages
                .iter()
                .map(|m| MessageRowView {
                    id: m.id.as_i32(),
                    title: m.title.clone(),
                    kind: kind_label(m.kind),
                    audience: audience_label(m.audience),
                    active: m.active,
                    visible_now: m.active
                        && m.starts_at.is_none_or(|s| s <= now)
                        && m.ends_at.is_none_or(|e| now < e),
                })
                .collect(),
            None,
        ),
        Err(e) => {
            tracing::error!("Failed to fetch site messages: {e}");
            (Vec::new(), Some("No se pudieron cargar los mensajes".to_string()))
        }
    };

    render(&MessagesIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/admin/messages".to_string(),
        messages,
        error,
    })
}

/// New message form handler.
#[instrument(skip(admin))]
pub async fn new(RequireAdmin(admin): RequireAdmin) -> Response {
    let form = MessageFormInput {
        kind: MessageKind::Info.as_str().to_string(),
        audience: Audience::Everyone.as_str().to_string(),
        active: Some("on".to_string()),
        ..MessageFormInput::default()
    };
    render(&MessageFormTemplate::new(&admin, None, form, None))
}

/// Create message handler.
#[instrument(skip(admin, state, input))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Form(input): Form<MessageFormInput>,
) -> Response {
    let draft = match input.to_draft(state.config().shop_utc_offset) {
        Ok(draft) => draft,
        Err(message) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render(&MessageFormTemplate::new(&admin, None, input, Some(message))),
            )
                .into_response();
        }
    };

    match SiteMessageRepository::new(state.pool()).create(&draft).await {
        Ok(message) => {
            tracing::info!(message_id = %message.id, "Site message created");
            Redirect::to("/admin/messages").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create site message");
            render(&MessageFormTemplate::new(
                &admin,
                None,
                input,
                Some("No se pudo guardar el mensaje".to_string()),
            ))
        }
    }
}

/// Edit message form handler.
#[instrument(skip(admin, state))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Response {
    match SiteMessageRepository::new(state.pool())
        .get_by_id(SiteMessageId::new(id))
        .await
    {
        Ok(Some(message)) => render(&MessageFormTemplate::new(
            &admin,
            Some(id),
            MessageFormInput::from_message(&message, state.config().shop_utc_offset),
            None,
        )),
        Ok(None) => (StatusCode::NOT_FOUND, "Mensaje no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch site message: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo cargar el mensaje").into_response()
        }
    }
}

/// Update message handler.
#[instrument(skip(admin, state, input))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(input): Form<MessageFormInput>,
) -> Response {
    let draft = match input.to_draft(state.config().shop_utc_offset) {
        Ok(draft) => draft,
        Err(message) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render(&MessageFormTemplate::new(&admin, Some(id), input, Some(message))),
            )
                .into_response();
        }
    };

    match SiteMessageRepository::new(state.pool())
        .update(SiteMessageId::new(id), &draft)
        .await
    {
        Ok(_) => {
            tracing::info!(message_id = id, "Site message updated");
            Redirect::to("/admin/messages").into_response()
        }
        Err(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Mensaje no encontrado").into_response()
        }
        Err(e) => {
            tracing::error!(message_id = id, error = %e, "Failed to update site message");
            render(&MessageFormTemplate::new(
                &admin,
                Some(id),
                input,
                Some("No se pudo guardar el mensaje".to_string()),
            ))
        }
    }
}

/// Delete message handler.
#[instrument(skip(_admin, state))]
pub async fn delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Response {
    match SiteMessageRepository::new(state.pool())
        .delete(SiteMessageId::new(id))
        .await
    {
        Ok(()) => {
            tracing::info!(message_id = id, "Site message deleted");
            Redirect::to("/admin/messages").into_response()
        }
        Err(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Mensaje no encontrado").into_response()
        }
        Err(e) => {
            tracing::error!(message_id = id, error = %e, "Failed to delete site message");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo borrar el mensaje").into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn offset() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn input() -> MessageFormInput {
        MessageFormInput {
            title: " Feriado ".to_string(),
            body: "Cerramos el lunes".to_string(),
            kind: "alert".to_string(),
            audience: "everyone".to_string(),
            active: Some("on".to_string()),
            starts_at: "2025-10-10T08:00".to_string(),
            ends_at: String::new(),
        }
    }

    #[test]
    fn test_to_draft_parses_fields() {
        let draft = input().to_draft(offset()).unwrap();
        assert_eq!(draft.title, "Feriado");
        assert_eq!(draft.kind, MessageKind::Alert);
        assert!(draft.active);
        assert_eq!(
            draft.starts_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-10-10T11:00:00+00:00")
        );
        assert_eq!(draft.ends_at, None);
    }

    #[test]
    fn test_to_draft_rejects_inverted_window() {
        let mut form = input();
        form.ends_at = "2025-10-09T08:00".to_string();
        assert!(form.to_draft(offset()).is_err());
    }

    #[test]
    fn test_to_draft_rejects_unknown_kind() {
        let mut form = input();
        form.kind = "banner".to_string();
        assert!(form.to_draft(offset()).is_err());
    }
}
