//! Promotional banner dismissal.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::session_keys;

/// Hide info and promo messages for the rest of the session.
///
/// HTMX requests get an empty body so the banner element is swapped out;
/// plain form posts go back home.
pub async fn dismiss(session: Session, headers: HeaderMap) -> Result<Response, AppError> {
    session
        .insert(session_keys::BANNER_DISMISSED, true)
        .await?;

    if headers.contains_key("hx-request") {
        Ok(StatusCode::OK.into_response())
    } else {
        Ok(Redirect::to("/").into_response())
    }
}
