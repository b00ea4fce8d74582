//! Data every full page needs: header, banner and footer.

use chrono::Utc;
use tower_sessions::Session;
use tracing::error;

use carniceria_core::{ContactInfo, MessageKind, SiteMessage};

use crate::db::{ContactRepository, SiteMessageRepository};
use crate::models::{CurrentUser, session_keys};
use crate::services::cart;
use crate::state::AppState;

/// A site message ready for display.
#[derive(Clone)]
pub struct MessageView {
    pub title: String,
    pub body: String,
    pub kind: &'static str,
}

impl From<&SiteMessage> for MessageView {
    fn from(message: &SiteMessage) -> Self {
        Self {
            title: message.title.clone(),
            body: message.body.clone(),
            kind: message.kind.as_str(),
        }
    }
}

/// Shared page chrome.
#[derive(Clone)]
pub struct PageContext {
    pub cart_count: u64,
    pub signed_in: bool,
    pub user_name: String,
    pub is_admin: bool,
    /// Alerts; always shown.
    pub alerts: Vec<MessageView>,
    /// Info and promo messages; hidden once the visitor dismisses the banner.
    pub banner: Vec<MessageView>,
    pub contact: ContactInfo,
    pub whatsapp: String,
}

impl PageContext {
    /// Gather the chrome for the current visitor. Database failures degrade
    /// to an empty banner and blank contact details.
    pub async fn load(state: &AppState, session: &Session, user: Option<&CurrentUser>) -> Self {
        let cart_count = cart::load(session).await.item_count();
        let signed_in = user.is_some();
        let dismissed = session
            .get::<bool>(session_keys::BANNER_DISMISSED)
            .await
            .ok()
            .flatten()
            .unwrap_or(false);

        let messages = SiteMessageRepository::new(state.pool())
            .list_active()
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to load site messages");
                Vec::new()
            });
        let (alerts, banner) = split_messages(&messages, signed_in, dismissed);

        let contact = ContactRepository::new(state.pool())
            .get()
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to load contact info");
                ContactInfo::default()
            });

        Self {
            cart_count,
            signed_in,
            user_name: user
                .map(|u| u.profile.greeting_name().to_string())
                .unwrap_or_default(),
            is_admin: user.is_some_and(CurrentUser::is_admin),
            alerts,
            banner,
            whatsapp: contact.whatsapp_digits(),
            contact,
        }
    }
}

/// Split visible messages into alerts and the dismissible banner.
fn split_messages(
    messages: &[SiteMessage],
    signed_in: bool,
    dismissed: bool,
) -> (Vec<MessageView>, Vec<MessageView>) {
    let now = Utc::now();
    let visible = messages.iter().filter(|m| m.is_visible(now, signed_in));

    let mut alerts = Vec::new();
    let mut banner = Vec::new();
    for message in visible {
        if message.kind == MessageKind::Alert {
            alerts.push(MessageView::from(message));
        } else if !dismissed {
            banner.push(MessageView::from(message));
        }
    }
    (alerts, banner)
}

#[cfg(test)]
mod tests {
    use carniceria_core::{Audience, SiteMessageId};

    use super::*;

    fn message(id: i32, kind: MessageKind, audience: Audience) -> SiteMessage {
        SiteMessage {
            id: SiteMessageId::new(id),
            title: format!("Mensaje {id}"),
            body: String::new(),
            kind,
            audience,
            active: true,
            starts_at: None,
            ends_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_dismissal_hides_banner_but_not_alerts() {
        let messages = [
            message(1, MessageKind::Promo, Audience::Everyone),
            message(2, MessageKind::Alert, Audience::Everyone),
        ];

        let (alerts, banner) = split_messages(&messages, false, false);
        assert_eq!((alerts.len(), banner.len()), (1, 1));

        let (alerts, banner) = split_messages(&messages, false, true);
        assert_eq!((alerts.len(), banner.len()), (1, 0));
    }

    #[test]
    fn test_audience_filters_messages() {
        let messages = [
            message(1, MessageKind::Info, Audience::Guests),
            message(2, MessageKind::Info, Audience::Customers),
        ];

        let (_, banner) = split_messages(&messages, true, false);
        assert_eq!(banner.len(), 1);
        assert_eq!(banner.first().map(|m| m.title.as_str()), Some("Mensaje 2"));
    }
}
