//! Types exchanged with the identity service.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A signed-in session issued by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer token for user-scoped calls.
    pub access_token: String,
    /// Token used to obtain a fresh access token.
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Unix timestamp when the token was obtained.
    pub obtained_at: i64,
}

impl AccessToken {
    /// Check if the access token is expired (with 60s buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_in.is_some_and(|expires_in| {
            let now = Utc::now().timestamp();
            now >= self.obtained_at + expires_in - 60
        })
    }
}

/// A user as the identity service describes it.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    /// Subject id; stable across sign-in methods.
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Free-form profile data attached by sign-up or the SSO provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl IdentityUser {
    /// Best available display name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata
            .full_name
            .as_deref()
            .or(self.user_metadata.name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }
}

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub token: AccessToken,
    pub user: IdentityUser,
}

/// Outcome of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUp {
    /// The account is active and the shopper is signed in.
    SignedIn(SignedIn),
    /// The service sent a confirmation email first.
    ConfirmationSent,
}

/// Raw session response from the token and sign-up endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user: IdentityUser,
}

impl From<SessionResponse> for SignedIn {
    fn from(response: SessionResponse) -> Self {
        Self {
            token: AccessToken {
                access_token: response.access_token,
                refresh_token: response.refresh_token,
                expires_in: response.expires_in,
                obtained_at: Utc::now().timestamp(),
            },
            user: response.user,
        }
    }
}

/// Error body; the service uses two shapes depending on the endpoint.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub error_code: Option<String>,
    pub msg: Option<String>,
}

impl ErrorResponse {
    pub fn code(&self) -> &str {
        self.error_code
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("unknown")
    }

    pub fn message(&self) -> &str {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_full_name() {
        let user: IdentityUser = serde_json::from_str(
            r#"{"id":"u1","email":"ana@ejemplo.com","user_metadata":{"full_name":"Ana Pérez","name":"ana"}}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), Some("Ana Pérez"));

        let bare: IdentityUser = serde_json::from_str(r#"{"id":"u2","email":null}"#).unwrap();
        assert_eq!(bare.display_name(), None);
    }

    #[test]
    fn test_error_response_shapes() {
        let grant: ErrorResponse = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(grant.code(), "invalid_grant");
        assert_eq!(grant.message(), "Invalid login credentials");

        let api: ErrorResponse = serde_json::from_str(
            r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#,
        )
        .unwrap();
        assert_eq!(api.code(), "user_already_exists");
    }

    #[test]
    fn test_token_expiry() {
        let fresh = AccessToken {
            access_token: "t".into(),
            refresh_token: None,
            expires_in: Some(3600),
            obtained_at: Utc::now().timestamp(),
        };
        assert!(!fresh.is_expired());

        let stale = AccessToken {
            obtained_at: Utc::now().timestamp() - 3600,
            ..fresh
        };
        assert!(stale.is_expired());
    }
}
