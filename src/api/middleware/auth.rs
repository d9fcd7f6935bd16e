use crate::AppState;
use crate::api::error::AppError;
use crate::utils::auth::authenticate;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Verifies the bearer token and attaches the caller `Identity`. Rejected
/// requests never reach the handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let identity = authenticate(header, &state.config.jwt_secret).map_err(|e| {
        tracing::warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
        AppError::from(e)
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
