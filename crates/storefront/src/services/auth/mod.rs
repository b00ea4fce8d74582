//! Authentication service.
//!
//! Credentials are checked by the hosted identity service; this service turns
//! a successful sign-in into a [`CurrentUser`] backed by a profile row,
//! creating the profile on first visit.

mod error;

pub use error::AuthError;

use sqlx::PgPool;
use tracing::{info, instrument, warn};

use carniceria_core::{Email, ProfileUpdate, UserProfile};

use crate::db::{NewProfile, ProfileRepository};
use crate::identity::{IdentityClient, SSO_PROVIDERS, SignUp, SignedIn};
use crate::models::CurrentUser;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Outcome of a registration.
#[derive(Debug)]
pub enum Registration {
    /// The account is active and the shopper is signed in.
    SignedIn(Box<CurrentUser>),
    /// The shopper must confirm their email before signing in.
    ConfirmationSent,
}

/// Outcome of a profile edit.
#[derive(Debug)]
pub enum ProfileSave {
    /// Written to the database.
    Saved(UserProfile),
    /// The database write failed; the edit only lives in the session.
    SessionOnly(UserProfile),
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    identity: &'a IdentityClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, identity: &'a IdentityClient) -> Self {
        Self { pool, identity }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        let signed_in = self
            .identity
            .sign_in_with_password(email.as_str(), password)
            .await?;

        self.establish(signed_in).await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` if
    /// the password is rejected.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password, confirmation))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
        full_name: Option<&str>,
    ) -> Result<Registration, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password, confirmation)?;

        match self
            .identity
            .sign_up(email.as_str(), password, full_name)
            .await?
        {
            SignUp::SignedIn(signed_in) => {
                let user = self.establish(signed_in).await?;
                Ok(Registration::SignedIn(Box::new(user)))
            }
            SignUp::ConfirmationSent => {
                info!("Registration awaiting email confirmation");
                Ok(Registration::ConfirmationSent)
            }
        }
    }

    /// Start third-party sign-in; returns the URL to redirect to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedProvider` for an unknown provider.
    pub fn sso_authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, AuthError> {
        if !SSO_PROVIDERS.contains(&provider) {
            return Err(AuthError::UnsupportedProvider(provider.to_string()));
        }
        Ok(self
            .identity
            .authorize_url(provider, redirect_to, code_challenge))
    }

    /// Finish third-party sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if the code exchange fails or the identity has no email.
    #[instrument(skip_all)]
    pub async fn complete_sso(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<CurrentUser, AuthError> {
        let signed_in = self.identity.exchange_code(code, code_verifier).await?;
        self.establish(signed_in).await
    }

    /// Revoke the identity session. Failures are logged, never surfaced.
    pub async fn logout(&self, user: &CurrentUser) {
        if let Err(e) = self.identity.sign_out(&user.token.access_token).await {
            warn!(error = %e, "Failed to revoke identity session");
        }
    }

    /// Save profile edits, falling back to the session copy if the database
    /// write fails.
    #[instrument(skip(self, user, update), fields(profile_id = %user.profile.id))]
    pub async fn update_profile(&self, user: &CurrentUser, update: &ProfileUpdate) -> ProfileSave {
        match ProfileRepository::new(self.pool)
            .update(user.profile.id, update)
            .await
        {
            Ok(profile) => ProfileSave::Saved(profile),
            Err(e) => {
                warn!(error = %e, "Profile update not persisted, keeping it in the session");
                let mut profile = user.profile.clone();
                profile.apply(update);
                ProfileSave::SessionOnly(profile)
            }
        }
    }

    /// Fetch or create the profile behind an identity sign-in.
    async fn establish(&self, signed_in: SignedIn) -> Result<CurrentUser, AuthError> {
        let SignedIn { token, user } = signed_in;
        let email = Email::parse(user.email.as_deref().ok_or(AuthError::MissingEmail)?)?;

        let profile = ProfileRepository::new(self.pool)
            .get_or_create(&NewProfile {
                identity_id: &user.id,
                email: &email,
                display_name: user.display_name(),
                avatar_url: user.user_metadata.avatar_url.as_deref(),
            })
            .await?;

        info!(profile_id = %profile.id, "Shopper signed in");
        Ok(CurrentUser::new(profile, token))
    }
}

/// Check a new password against its confirmation and the length rule.
///
/// # Errors
///
/// Returns `AuthError::PasswordMismatch` when the two differ and
/// `AuthError::WeakPassword` when the password is too short.
pub fn validate_password(password: &str, confirmation: &str) -> Result<(), AuthError> {
    if password != confirmation {
        return Err(AuthError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityError;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("carne-asada", "carne-asada").is_ok());
        assert!(matches!(
            validate_password("carne-asada", "carne-asado"),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            validate_password("corta", "corta"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_identity_errors_map_to_shopper_errors() {
        assert!(matches!(
            AuthError::from(IdentityError::InvalidCredentials),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            AuthError::from(IdentityError::EmailTaken),
            AuthError::UserAlreadyExists
        ));
        let server = AuthError::from(IdentityError::Parse("bad".into()));
        assert!(server.is_server_error());
        assert_eq!(server.code(), "unavailable");
    }
}
