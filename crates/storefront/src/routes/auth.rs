//! Authentication route handlers.
//!
//! Handles password login, registration and third-party sign-in through the
//! hosted identity service. A successful sign-in lands the shopper back on
//! the page that sent them to the login form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, instrument, warn};

use crate::error::{AppError, clear_sentry_user};
use crate::filters;
use crate::identity::{PkcePair, SSO_PROVIDERS};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::routes::layout::PageContext;
use crate::services::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub full_name: Option<String>,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Query parameters the identity service sends back after SSO.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub success: Option<String>,
    pub providers: &'static [&'static str],
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub providers: &'static [&'static str],
}

/// Spanish message for an auth `?error=` code.
#[must_use]
pub fn error_message(code: &str) -> String {
    match code {
        "invalid_email" => "Ese email no parece válido",
        "invalid_credentials" => "Email o contraseña incorrectos",
        "email_not_confirmed" => "Confirmá tu email antes de ingresar",
        "email_taken" => "Ya existe una cuenta con ese email",
        "weak_password" => "La contraseña debe tener al menos 8 caracteres",
        "password_mismatch" => "Las contraseñas no coinciden",
        "sso_failed" => "No pudimos completar el ingreso, intentá de nuevo",
        "session" => "No pudimos iniciar tu sesión, intentá de nuevo",
        _ => "El servicio de ingreso no está disponible, intentá más tarde",
    }
    .to_string()
}

fn success_message(code: &str) -> String {
    match code {
        "confirm_email" => "Te enviamos un email para confirmar tu cuenta",
        "logged_out" => "Cerraste sesión",
        _ => "Listo",
    }
    .to_string()
}

/// A same-site path to land on after signing in. Anything that could leave
/// the site falls back to the account page.
fn safe_return_to(path: Option<String>) -> String {
    path.filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.contains('\\'))
        .filter(|p| !p.starts_with("/auth/"))
        .unwrap_or_else(|| "/account".to_string())
}

/// Store the shopper and send them where they were headed.
async fn finish_sign_in(session: &Session, user: &CurrentUser) -> Response {
    let return_to = session
        .remove::<String>(session_keys::RETURN_TO)
        .await
        .ok()
        .flatten();

    if let Err(e) = set_current_user(session, user).await {
        error!(error = %e, "Failed to store shopper in session");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    Redirect::to(&safe_return_to(return_to)).into_response()
}

fn auth_failure(page: &str, err: &AuthError) -> Response {
    if err.is_server_error() {
        error!(error = %err, "Authentication failed");
    } else {
        warn!(error = %err, "Authentication rejected");
    }
    Redirect::to(&format!("{page}?error={}", err.code())).into_response()
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in shoppers go straight to their account.
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }

    LoginTemplate {
        page: PageContext::load(&state, &session, None).await,
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().map(success_message),
        providers: SSO_PROVIDERS,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let service = AuthService::new(state.pool(), state.identity());

    match service.login_with_password(&form.email, &form.password).await {
        Ok(user) => finish_sign_in(&session, &user).await,
        Err(e) => auth_failure("/auth/login", &e),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }

    RegisterTemplate {
        page: PageContext::load(&state, &session, None).await,
        error: query.error.as_deref().map(error_message),
        providers: SSO_PROVIDERS,
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let service = AuthService::new(state.pool(), state.identity());
    let full_name = form
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    match service
        .register(&form.email, &form.password, &form.password_confirm, full_name)
        .await
    {
        Ok(Registration::SignedIn(user)) => finish_sign_in(&session, &user).await,
        Ok(Registration::ConfirmationSent) => {
            Redirect::to("/auth/login?success=confirm_email").into_response()
        }
        Err(e) => auth_failure("/auth/register", &e),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out. The cart survives; only the identity is dropped.
#[instrument(skip(state, session, user))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Redirect, AppError> {
    if let Some(user) = user {
        AuthService::new(state.pool(), state.identity())
            .logout(&user)
            .await;
    }
    clear_current_user(&session).await?;
    clear_sentry_user();

    Ok(Redirect::to("/auth/login?success=logged_out"))
}

// =============================================================================
// Third-party sign-in
// =============================================================================

/// Redirect to the identity service to sign in with `provider`.
#[instrument(skip(state, session))]
pub async fn sso_start(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
) -> Response {
    let pkce = PkcePair::generate();
    let redirect_to = format!("{}/auth/callback", state.config().base_url);

    let url = match AuthService::new(state.pool(), state.identity()).sso_authorize_url(
        &provider,
        &redirect_to,
        &pkce.challenge,
    ) {
        Ok(url) => url,
        Err(e) => return auth_failure("/auth/login", &e),
    };

    if let Err(e) = session
        .insert(session_keys::PKCE_VERIFIER, &pkce.verifier)
        .await
    {
        error!(error = %e, "Failed to store PKCE verifier");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    Redirect::to(&url).into_response()
}

/// Handle the identity service's redirect after third-party sign-in.
#[instrument(skip(state, session, query))]
pub async fn sso_callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    // The verifier is single-use whatever happens next.
    let verifier = session
        .remove::<String>(session_keys::PKCE_VERIFIER)
        .await
        .ok()
        .flatten();

    if let Some(err) = &query.error {
        warn!(
            error = %err,
            description = query.error_description.as_deref().unwrap_or_default(),
            "Identity service reported an SSO error"
        );
        return Redirect::to("/auth/login?error=sso_failed").into_response();
    }

    let (Some(code), Some(verifier)) = (query.code.as_deref(), verifier) else {
        return auth_failure("/auth/login", &AuthError::InvalidSessionState);
    };

    match AuthService::new(state.pool(), state.identity())
        .complete_sso(code, &verifier)
        .await
    {
        Ok(user) => finish_sign_in(&session, &user).await,
        Err(e) => auth_failure("/auth/login", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_return_to_keeps_local_paths() {
        assert_eq!(safe_return_to(Some("/checkout".to_string())), "/checkout");
        assert_eq!(
            safe_return_to(Some("/products?category=beef".to_string())),
            "/products?category=beef"
        );
    }

    #[test]
    fn test_safe_return_to_rejects_offsite_targets() {
        assert_eq!(safe_return_to(None), "/account");
        assert_eq!(safe_return_to(Some("https://evil.test".to_string())), "/account");
        assert_eq!(safe_return_to(Some("//evil.test".to_string())), "/account");
        assert_eq!(safe_return_to(Some("/\\evil.test".to_string())), "/account");
        assert_eq!(safe_return_to(Some("/auth/login".to_string())), "/account");
    }

    #[test]
    fn test_error_messages_cover_auth_codes() {
        assert_eq!(error_message("password_mismatch"), "Las contraseñas no coinciden");
        assert_eq!(
            error_message(AuthError::UserAlreadyExists.code()),
            "Ya existe una cuenta con ese email"
        );
        assert!(error_message("unavailable").contains("no está disponible"));
    }
}
