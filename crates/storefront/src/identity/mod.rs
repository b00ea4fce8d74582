//! Hosted identity service client.
//!
//! Talks to a GoTrue-compatible REST API for password sign-in, sign-up and
//! third-party sign-in. Profiles live in our database; the identity service
//! only proves who the shopper is.
//!
//! # SSO Flow
//!
//! 1. Generate a PKCE verifier with [`PkcePair::generate`] and keep it in the session
//! 2. Redirect to [`IdentityClient::authorize_url`]
//! 3. The service redirects back to `/auth/callback?code=...`
//! 4. Exchange code and verifier with [`IdentityClient::exchange_code`]

mod types;

pub use types::*;

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::config::IdentityConfig;

/// Third-party providers offered on the sign-in page.
pub const SSO_PROVIDERS: &[&str] = &["google", "facebook"];

/// Errors from the identity service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The email has not been confirmed yet.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// An account with this email already exists.
    #[error("email already registered")]
    EmailTaken,

    /// The service rejected the password.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// The access token is invalid or expired.
    #[error("unauthorized")]
    Unauthorized,

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Other API error.
    #[error("identity error ({code}): {message}")]
    Api { code: String, message: String },

    /// Response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh verifier.
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_random_string(64);
        let challenge = pkce_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 code challenge for a verifier.
#[must_use]
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generate a cryptographically secure random string.
#[must_use]
pub fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|&b| char::from(b))
        .collect()
}

/// Client for the identity service.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    /// Create a new identity client.
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            inner: Arc::new(IdentityClientInner {
                client: reqwest::Client::new(),
                base_url: config.url.clone(),
                api_key: config.api_key.expose_secret().to_string(),
            }),
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` for a wrong email or password.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, IdentityError> {
        let url = format!("{}/token?grant_type=password", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .header("apikey", &self.inner.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: SessionResponse = handle_response(response).await?;
        Ok(session.into())
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::EmailTaken` when the email is registered and
    /// `IdentityError::WeakPassword` when the service rejects the password.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUp, IdentityError> {
        let url = format!("{}/signup", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .header("apikey", &self.inner.api_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await?;

        // With email confirmation on, the body is a bare user without a session.
        let body: serde_json::Value = handle_response(response).await?;
        if body.get("access_token").is_some() {
            let session: SessionResponse = serde_json::from_value(body)
                .map_err(|e| IdentityError::Parse(format!("Failed to parse session: {e}")))?;
            Ok(SignUp::SignedIn(session.into()))
        } else {
            Ok(SignUp::ConfirmationSent)
        }
    }

    /// Fetch the user behind an access token.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` for an invalid or expired token.
    pub async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let url = format!("{}/user", self.inner.base_url);
        let response = self
            .inner
            .client
            .get(&url)
            .header("apikey", &self.inner.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        handle_response(response).await
    }

    /// URL that starts third-party sign-in with `provider`.
    #[must_use]
    pub fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        format!(
            "{}/authorize?\
            provider={}&\
            redirect_to={}&\
            code_challenge={}&\
            code_challenge_method=s256",
            self.inner.base_url,
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to),
            urlencoding::encode(code_challenge),
        )
    }

    /// Exchange an SSO authorization code for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the code or verifier is rejected.
    #[instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<SignedIn, IdentityError> {
        let url = format!("{}/token?grant_type=pkce", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .header("apikey", &self.inner.api_key)
            .json(&serde_json::json!({
                "auth_code": auth_code,
                "code_verifier": code_verifier,
            }))
            .send()
            .await?;

        let session: SessionResponse = handle_response(response).await?;
        Ok(session.into())
    }

    /// Revoke the session behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. An already-expired token is
    /// treated as signed out.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let url = format!("{}/logout", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .header("apikey", &self.inner.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(handle_error_status(status, response).await)
    }
}

/// Parse a success body or map the error status.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, IdentityError> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| IdentityError::Parse(format!("Failed to parse response: {e}")))
    } else {
        Err(handle_error_status(status, response).await)
    }
}

async fn handle_error_status(status: StatusCode, response: reqwest::Response) -> IdentityError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return IdentityError::RateLimited(retry_after);
    }

    match response.text().await {
        Ok(body) => classify_error(status, &body),
        Err(e) => IdentityError::Http(e),
    }
}

fn classify_error(status: StatusCode, body: &str) -> IdentityError {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();

    match parsed.code() {
        "invalid_grant" | "invalid_credentials" => IdentityError::InvalidCredentials,
        "email_not_confirmed" => IdentityError::EmailNotConfirmed,
        "user_already_exists" | "email_exists" => IdentityError::EmailTaken,
        "weak_password" => IdentityError::WeakPassword(parsed.message().to_string()),
        _ if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            IdentityError::Unauthorized
        }
        code => IdentityError::Api {
            code: code.to_string(),
            message: if parsed.message().is_empty() {
                body.to_string()
            } else {
                parsed.message().to_string()
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_challenge_matches_rfc_7636_example() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            pkce_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_random_string_length_and_charset() {
        let s = generate_random_string(64);
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(s, generate_random_string(64));
    }

    #[test]
    fn test_authorize_url_encodes_parameters() {
        let client = IdentityClient::new(&IdentityConfig {
            url: "https://auth.local/auth/v1".to_string(),
            api_key: secrecy::SecretString::from("key"),
        });
        let url = client.authorize_url("google", "https://shop.local/auth/callback", "abc");
        assert!(url.starts_with("https://auth.local/auth/v1/authorize?provider=google&"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fshop.local%2Fauth%2Fcallback"));
        assert!(url.ends_with("code_challenge=abc&code_challenge_method=s256"));
    }

    #[test]
    fn test_classify_error() {
        assert!(matches!(
            classify_error(
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            ),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(
            classify_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#
            ),
            IdentityError::EmailTaken
        ));
        assert!(matches!(
            classify_error(StatusCode::UNAUTHORIZED, "not json"),
            IdentityError::Unauthorized
        ));
        assert!(matches!(
            classify_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            IdentityError::Api { .. }
        ));
    }
}
