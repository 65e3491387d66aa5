//! REST API endpoint handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use ssamnote::error::{ErrorBody, RefineError};
use ssamnote::record::{DomainTag, TimeBlock};
use ssamnote::refine::{RefinementResult, RefinementService, TransformBody};
use tracing::{debug, error};

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RefinementService>,
}

/// A [`RefineError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RefineError);

impl From<RefineError> for ApiError {
    fn from(e: RefineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            RefineError::GenerationFailed(source) => {
                error!(error = %source, "Transform failed");
            }
            RefineError::Configuration => {
                error!("Transform requested but no generation credential is configured");
            }
            RefineError::InvalidInput => debug!("Rejected transform request without content"),
        }
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

/// POST /api/transform — Refine one note.
///
/// The credential is checked before the body is looked at, so an
/// unconfigured service answers 500 whatever the request. An unparseable
/// body counts as missing content.
pub async fn post_transform(
    State(app): State<AppState>,
    body: Result<Json<TransformBody>, JsonRejection>,
) -> Result<Json<RefinementResult>, ApiError> {
    if !app.service.is_configured() {
        return Err(RefineError::Configuration.into());
    }
    let Json(body) = body.map_err(|rejection| {
        debug!("Unreadable transform body: {rejection}");
        ApiError(RefineError::InvalidInput)
    })?;
    let request = body.into_request()?;
    let result = app.service.refine_request(&request).await?;
    Ok(Json(result))
}

/// Response body for GET /api/health.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub configured: bool,
}

/// GET /api/health — Liveness plus whether a credential is configured.
pub async fn get_health(State(app): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        configured: app.service.is_configured(),
    })
}

/// GET /api/domain-tags — The domain taxonomy, in display order.
pub async fn get_domain_tags() -> Json<Vec<DomainTag>> {
    Json(DomainTag::taxonomy())
}

/// GET /api/time-blocks — The default daily schedule.
pub async fn get_time_blocks() -> Json<Vec<TimeBlock>> {
    Json(TimeBlock::default_schedule())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssamnote::error::GenerationError;

    #[test]
    fn error_status_and_body() {
        let resp = ApiError(RefineError::InvalidInput).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError(RefineError::Configuration).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = ApiError(RefineError::GenerationFailed(GenerationError::Transport(
            "reset".into(),
        )))
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn health_serializes() {
        let json = serde_json::to_value(HealthResponse {
            status: "ok",
            configured: false,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok", "configured": false}));
    }
}
