use crate::AppState;
use crate::api::error::{ErrorDetail, error_body};
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

/// Rewrites 5xx bodies to include the internal error text when the gateway
/// runs in development mode. Otherwise the detail is dropped.
pub async fn expose_error_details(State(state): State<AppState>, mut response: Response) -> Response {
    let Some(detail) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };

    if !state.config.expose_error_details {
        return response;
    }

    let status = response.status();
    (status, Json(error_body(&detail.message, Some(detail.detail)))).into_response()
}
