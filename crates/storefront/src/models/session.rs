//! Session-related types.
//!
//! Everything the storefront keeps in the server-side session lives under a
//! `carniceria.` key so it cannot collide with other values in the store.

use serde::{Deserialize, Serialize};

use carniceria_core::{ProfileId, UserProfile};

use crate::identity::AccessToken;

/// Session-stored identity of the signed-in shopper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// The shopper's profile as last read or edited.
    pub profile: UserProfile,
    /// Identity service token, used for sign-out.
    pub token: AccessToken,
    /// Set when a profile edit could not be written to the database and only
    /// lives in this session.
    #[serde(default)]
    pub unsynced: bool,
}

impl CurrentUser {
    #[must_use]
    pub const fn new(profile: UserProfile, token: AccessToken) -> Self {
        Self {
            profile,
            token,
            unsynced: false,
        }
    }

    #[must_use]
    pub const fn profile_id(&self) -> ProfileId {
        self.profile.id
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile.is_admin()
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in shopper ([`super::CurrentUser`]).
    pub const CURRENT_USER: &str = "carniceria.current_user";

    /// The persisted cart envelope.
    pub const CART: &str = "carniceria.cart";

    /// Whether the promotional banner was dismissed.
    pub const BANNER_DISMISSED: &str = "carniceria.banner_dismissed";

    /// Idempotency key minted when the checkout page is rendered.
    pub const SUBMISSION_KEY: &str = "carniceria.submission_key";

    /// Id of the order this session placed most recently.
    pub const LAST_ORDER: &str = "carniceria.last_order";

    /// PKCE verifier for an SSO sign-in in flight.
    pub const PKCE_VERIFIER: &str = "carniceria.pkce_verifier";

    /// Where to send the shopper after signing in.
    pub const RETURN_TO: &str = "carniceria.return_to";
}
