use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::{error::ApiError, state::AppState};

/// Guards the `/internal` routes. With no token configured they stay open.
pub async fn admin_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.admin_api_token.as_deref() {
        let provided = bearer_token(req.headers())
            .ok_or_else(|| ApiError::unauthorized("missing or invalid Authorization header"))?;
        if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            return Err(ApiError::unauthorized("invalid token"));
        }
    }

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
