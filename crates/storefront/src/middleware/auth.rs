//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in shopper or an administrator
//! in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{error, warn};

use carniceria_core::UserProfile;

use crate::db::ProfileRepository;
use crate::error::set_sentry_user;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in shopper.
///
/// If nobody is signed in, returns a redirect to the login page and remembers
/// the requested page so the shopper lands back on it.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hola, {}!", user.profile.greeting_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when the request lacks the required identity.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API and HTMX requests).
    Unauthorized,
    /// Signed in, but not an administrator.
    Forbidden,
    /// The role could not be verified.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Acceso restringido").into_response(),
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

async fn reject(parts: &Parts, session: &Session) -> AuthRejection {
    let path = parts.uri.path();
    let is_htmx = parts.headers.contains_key("hx-request");
    if path.starts_with("/api/") || is_htmx {
        return AuthRejection::Unauthorized;
    }

    if parts.method == Method::GET {
        let target = parts
            .uri
            .path_and_query()
            .map_or(path, |pq| pq.as_str())
            .to_string();
        if let Err(e) = session.insert(session_keys::RETURN_TO, target).await {
            warn!(error = %e, "Failed to remember return path");
        }
    }
    AuthRejection::RedirectToLogin
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        match current_user(&session).await {
            Some(user) => {
                set_sentry_user(&user.profile.id, Some(user.profile.email.as_str()));
                Ok(Self(user))
            }
            None => Err(reject(parts, &session).await),
        }
    }
}

/// Extractor that optionally gets the signed-in shopper.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is signed in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Extractor that requires an administrator.
///
/// The role is read from the database on every request; the copy held in the
/// session is never trusted for this check.
pub struct RequireAdmin(pub UserProfile);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        let profile = ProfileRepository::new(state.pool())
            .get_by_id(user.profile_id())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to verify admin role");
                AuthRejection::Unavailable
            })?;

        match profile {
            Some(profile) if profile.is_admin() => Ok(Self(profile)),
            _ => {
                warn!(
                    profile_id = %user.profile_id(),
                    path = %parts.uri.path(),
                    "Admin access denied"
                );
                Err(AuthRejection::Forbidden)
            }
        }
    }
}

/// Helper to set the signed-in shopper in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to replace the session copy of the shopper without cycling the id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn update_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the signed-in shopper from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use chrono::Utc;
    use tower_sessions::MemoryStore;

    use carniceria_core::{Email, ProfileId, ProfileRole};

    use super::*;
    use crate::identity::AccessToken;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user() -> CurrentUser {
        CurrentUser::new(
            UserProfile {
                id: ProfileId::new(3),
                identity_id: "sub-3".to_string(),
                email: Email::parse("ana@ejemplo.com").unwrap(),
                display_name: Some("Ana".to_string()),
                phone: None,
                address: None,
                address_type: None,
                floor: None,
                buzzer: None,
                role: ProfileRole::Customer,
                avatar_url: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            AccessToken {
                access_token: "token".to_string(),
                refresh_token: None,
                expires_in: None,
                obtained_at: 0,
            },
        )
    }

    fn parts(uri: &str, session: &Session, htmx: bool) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if htmx {
            builder = builder.header("hx-request", "true");
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        parts.extensions.insert(session.clone());
        parts
    }

    #[tokio::test]
    async fn test_require_auth_redirects_and_remembers_page() {
        let session = session();
        let mut parts = parts("/account/orders?page=2", &session, false);

        let result = RequireAuth::from_request_parts(&mut parts, &()).await;

        assert!(matches!(result, Err(AuthRejection::RedirectToLogin)));
        let target: Option<String> = session.get(session_keys::RETURN_TO).await.unwrap();
        assert_eq!(target.as_deref(), Some("/account/orders?page=2"));
    }

    #[tokio::test]
    async fn test_require_auth_htmx_gets_unauthorized() {
        let session = session();
        let mut parts = parts("/account", &session, true);

        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthorized)));
    }

    #[tokio::test]
    async fn test_signed_in_user_is_extracted() {
        let session = session();
        update_current_user(&session, &user()).await.unwrap();
        let mut parts = parts("/account", &session, false);

        let RequireAuth(found) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.profile_id(), ProfileId::new(3));

        clear_current_user(&session).await.unwrap();
        let OptionalAuth(after) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(after.is_none());
    }
}
