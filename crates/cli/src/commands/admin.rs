//! Back office access commands.
//!
//! Admin access is a role on the shopper's profile, so the person must have
//! signed in at least once before they can be granted it.
//!
//! # Usage
//!
//! ```bash
//! carniceria admin grant -e owner@example.com
//! carniceria admin revoke -e owner@example.com
//! ```

use carniceria_core::{Email, ProfileRole};
use carniceria_storefront::db::{ProfileRepository, RepositoryError};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Nobody has signed in with this email yet.
    #[error("No profile registered with {0}; sign in once on the shop first")]
    UnknownEmail(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Give the profile registered with `email` the admin role.
///
/// # Errors
///
/// Returns an error if the email is invalid or has no profile.
pub async fn grant(email: &str) -> Result<(), AdminError> {
    set_role(email, ProfileRole::Admin).await?;
    tracing::info!("Admin access granted to {email}");
    Ok(())
}

/// Demote the profile registered with `email` back to a customer.
///
/// # Errors
///
/// Returns an error if the email is invalid or has no profile.
pub async fn revoke(email: &str) -> Result<(), AdminError> {
    set_role(email, ProfileRole::Customer).await?;
    tracing::info!("Admin access revoked for {email}");
    Ok(())
}

async fn set_role(email: &str, role: ProfileRole) -> Result<u64, AdminError> {
    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;

    ProfileRepository::new(&pool)
        .set_role_by_email(&parsed, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UnknownEmail(email.to_owned()),
            other => AdminError::Repository(other),
        })
}
