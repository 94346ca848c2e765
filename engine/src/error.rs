use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ApiError;
use crate::polyline::PolylineError;
use crate::providers::ProviderError;
use crate::refresher::RefreshError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Polyline(#[from] PolylineError),
    #[error("upstream provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::InvalidRequest(_) | EngineError::Polyline(_) => StatusCode::BAD_REQUEST,
            EngineError::Provider(_) => StatusCode::BAD_GATEWAY,
            EngineError::Refresh(err) => match err {
                RefreshError::NoLocation => StatusCode::BAD_REQUEST,
                RefreshError::Superseded => StatusCode::CONFLICT,
                RefreshError::Disposed => StatusCode::SERVICE_UNAVAILABLE,
                RefreshError::Fetch(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::debug!("rejected request: {self}");
        }
        (
            status,
            Json(ApiError {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
