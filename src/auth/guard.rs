use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::session::SessionData;
use crate::errors::AppError;
use crate::AppState;

/// Helper: validate a token against the store and return a clone of the session.
pub fn validate_session(state: &AppState, token: &str) -> Result<SessionData, AppError> {
    let store = state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    store.validate(token).cloned().map_err(AppError::Auth)
}

/// Helper: validate a token and require the OWNER role.
pub fn validate_owner(state: &AppState, token: &str) -> Result<SessionData, AppError> {
    let session = validate_session(state, token)?;
    if !session.is_owner() {
        return Err(AppError::Forbidden(
            "Only the company owner can do this".into(),
        ));
    }
    Ok(session)
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(parts: &Parts) -> Result<String, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Missing Authorization header".into()))?
        .to_str()
        .map_err(|_| AppError::Auth("Malformed Authorization header".into()))?;

    header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Auth("Expected a Bearer token".into()))
}

/// Any logged-in employee.
pub struct CurrentSession {
    pub token: String,
    pub data: SessionData,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let data = validate_session(state, &token)?;
        Ok(Self { token, data })
    }
}

/// A logged-in employee with the OWNER role.
pub struct OwnerSession(pub SessionData);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OwnerSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        validate_owner(state, &token).map(OwnerSession)
    }
}
