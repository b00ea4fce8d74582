//! Editorial content: news, site banners and contact details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{NewsArticleId, SiteMessageId};
use crate::catalog::fold;

/// A news article or blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: NewsArticleId,
    pub slug: String,
    pub title: String,
    pub summary: String,
    /// Markdown source; rendered to HTML at display time.
    pub body_markdown: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub published: bool,
    pub featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Visual style of a site message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.message_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Info,
    Promo,
    Alert,
}

impl MessageKind {
    pub const ALL: [Self; 3] = [Self::Info, Self::Promo, Self::Alert];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Promo => "promo",
            Self::Alert => "alert",
        }
    }
}

/// Who should see a site message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.audience", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    Everyone,
    Guests,
    Customers,
}

impl Audience {
    pub const ALL: [Self; 3] = [Self::Everyone, Self::Guests, Self::Customers];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::Guests => "guests",
            Self::Customers => "customers",
        }
    }

    #[must_use]
    pub const fn includes(self, signed_in: bool) -> bool {
        match self {
            Self::Everyone => true,
            Self::Guests => !signed_in,
            Self::Customers => signed_in,
        }
    }
}

/// A banner or notice shown across the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMessage {
    pub id: SiteMessageId,
    pub title: String,
    pub body: String,
    pub kind: MessageKind,
    pub audience: Audience,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SiteMessage {
    /// Active, inside its `[starts_at, ends_at)` window, and meant for
    /// this kind of visitor.
    #[must_use]
    pub fn is_visible(&self, now: DateTime<Utc>, signed_in: bool) -> bool {
        self.active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now < end)
            && self.audience.includes(signed_in)
    }
}

/// The shop's public contact details. There is exactly one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: String,
    /// WhatsApp number in any human format, e.g. `+54 9 11 5555-0000`.
    pub whatsapp: String,
    pub email: String,
    pub address: String,
    pub hours: String,
    pub instagram: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContactInfo {
    /// WhatsApp number reduced to digits, as `wa.me` expects.
    #[must_use]
    pub fn whatsapp_digits(&self) -> String {
        self.whatsapp.chars().filter(char::is_ascii_digit).collect()
    }
}

/// Turn a title into a URL slug.
///
/// ```
/// use carniceria_core::slugify;
///
/// assert_eq!(slugify("¡Llegó el Cordero Patagónico!"), "llego-el-cordero-patagonico");
/// ```
#[must_use]
pub fn slugify(title: &str) -> String {
    let folded = fold(title);
    let mut slug = String::with_capacity(folded.len());
    for ch in folded.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn message(audience: Audience) -> SiteMessage {
        SiteMessage {
            id: SiteMessageId::new(1),
            title: "Feriado".into(),
            body: "Cerramos el lunes".into(),
            kind: MessageKind::Alert,
            audience,
            active: true,
            starts_at: None,
            ends_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_audience_matching() {
        let now = Utc::now();
        assert!(message(Audience::Everyone).is_visible(now, false));
        assert!(message(Audience::Guests).is_visible(now, false));
        assert!(!message(Audience::Guests).is_visible(now, true));
        assert!(message(Audience::Customers).is_visible(now, true));
        assert!(!message(Audience::Customers).is_visible(now, false));
    }

    #[test]
    fn test_window_is_half_open() {
        let now = Utc::now();
        let mut msg = message(Audience::Everyone);
        msg.starts_at = Some(now);
        msg.ends_at = Some(now + Duration::hours(1));
        assert!(msg.is_visible(now, false));
        assert!(!msg.is_visible(now + Duration::hours(1), false));
        assert!(!msg.is_visible(now - Duration::seconds(1), false));

        msg.active = false;
        assert!(!msg.is_visible(now, false));
    }

    #[test]
    fn test_whatsapp_digits() {
        let contact = ContactInfo {
            whatsapp: "+54 9 11 5555-0000".into(),
            ..ContactInfo::default()
        };
        assert_eq!(contact.whatsapp_digits(), "5491155550000");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Asado -- de  Tira  "), "asado-de-tira");
        assert_eq!(slugify("¿?"), "");
    }
}
