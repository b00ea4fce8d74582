//! Shopper profiles.

use core::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::ProfileId;
use super::product::UnknownVariant;

/// Access level of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.profile_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    #[default]
    Customer,
    Admin,
}

/// Kind of building at the delivery address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    House,
    Apartment,
    Business,
}

impl AddressType {
    pub const ALL: [Self; 3] = [Self::House, Self::Apartment, Self::Business];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Apartment => "apartment",
            Self::Business => "business",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::House => "Casa",
            Self::Apartment => "Departamento",
            Self::Business => "Comercio",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("address_type", s))
    }
}

/// A shopper's profile, keyed by the identity service's subject id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ProfileId,
    /// Subject (`sub`) of the user in the identity service.
    pub identity_id: String,
    pub email: Email,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub address_type: Option<AddressType>,
    pub floor: Option<String>,
    pub buzzer: Option<String>,
    pub role: ProfileRole,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ProfileRole::Admin
    }

    /// Name to greet the shopper with.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.email.as_str())
    }

    /// Street address with floor and buzzer appended, if any.
    ///
    /// ```
    /// # use carniceria_core::{Email, ProfileId, ProfileRole, UserProfile};
    /// # let now = chrono::Utc::now();
    /// let profile = UserProfile {
    ///     id: ProfileId::new(1),
    ///     identity_id: "abc".into(),
    ///     email: Email::parse("ana@ejemplo.com").unwrap(),
    ///     display_name: None,
    ///     phone: None,
    ///     address: Some("Mitre 100".into()),
    ///     address_type: None,
    ///     floor: Some("3".into()),
    ///     buzzer: Some("B".into()),
    ///     role: ProfileRole::Customer,
    ///     avatar_url: None,
    ///     created_at: now,
    ///     updated_at: now,
    /// };
    /// assert_eq!(profile.full_address().as_deref(), Some("Mitre 100, piso 3, timbre B"));
    /// ```
    #[must_use]
    pub fn full_address(&self) -> Option<String> {
        let mut address = self.address.clone()?;
        if let Some(floor) = &self.floor {
            address.push_str(", piso ");
            address.push_str(floor);
        }
        if let Some(buzzer) = &self.buzzer {
            address.push_str(", timbre ");
            address.push_str(buzzer);
        }
        Some(address)
    }

    /// Apply an edit in memory.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        self.display_name.clone_from(&update.display_name);
        self.phone.clone_from(&update.phone);
        self.address.clone_from(&update.address);
        self.address_type = update.address_type;
        self.floor.clone_from(&update.floor);
        self.buzzer.clone_from(&update.buzzer);
    }
}

/// Editable profile fields. Blank strings are stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub address_type: Option<AddressType>,
    pub floor: Option<String>,
    pub buzzer: Option<String>,
}

impl ProfileUpdate {
    /// Build an update from raw form values.
    #[must_use]
    pub fn from_form(
        display_name: &str,
        phone: &str,
        address: &str,
        address_type: &str,
        floor: &str,
        buzzer: &str,
    ) -> Self {
        Self {
            display_name: clean(display_name),
            phone: clean(phone),
            address: clean(address),
            address_type: address_type.trim().parse().ok(),
            floor: clean(floor),
            buzzer: clean(buzzer),
        }
    }
}

fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_from_form_blanks_become_none() {
        let update = ProfileUpdate::from_form(" Ana ", "", "Mitre 100", "apartment", " ", "4B");
        assert_eq!(update.display_name.as_deref(), Some("Ana"));
        assert_eq!(update.phone, None);
        assert_eq!(update.address_type, Some(AddressType::Apartment));
        assert_eq!(update.floor, None);
        assert_eq!(update.buzzer.as_deref(), Some("4B"));
    }

    #[test]
    fn test_unknown_address_type_is_dropped() {
        let update = ProfileUpdate::from_form("", "", "", "castle", "", "");
        assert_eq!(update.address_type, None);
    }
}
