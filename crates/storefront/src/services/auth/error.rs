//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::identity::IdentityError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] carniceria_core::EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but its email is not confirmed.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The identity service returned a user without an email.
    #[error("identity has no email address")]
    MissingEmail,

    /// SSO state missing from the session.
    #[error("invalid session state")]
    InvalidSessionState,

    /// Unknown SSO provider.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Identity service failure.
    #[error("identity service error: {0}")]
    Identity(IdentityError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials | IdentityError::Unauthorized => {
                Self::InvalidCredentials
            }
            IdentityError::EmailNotConfirmed => Self::EmailNotConfirmed,
            IdentityError::EmailTaken => Self::UserAlreadyExists,
            IdentityError::WeakPassword(message) => Self::WeakPassword(message),
            other => Self::Identity(other),
        }
    }
}

impl AuthError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "invalid_email",
            Self::InvalidCredentials => "invalid_credentials",
            Self::EmailNotConfirmed => "email_not_confirmed",
            Self::UserAlreadyExists => "email_taken",
            Self::WeakPassword(_) => "weak_password",
            Self::PasswordMismatch => "password_mismatch",
            Self::MissingEmail | Self::InvalidSessionState | Self::UnsupportedProvider(_) => {
                "sso_failed"
            }
            Self::Identity(_) | Self::Repository(_) => "unavailable",
        }
    }

    /// Whether the failure is ours rather than the shopper's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Identity(_) | Self::Repository(_))
    }
}
