use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};
use warden_core::WardenError;

/// A [`WardenError`] rendered as an HTTP response with a `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError(pub WardenError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            WardenError::NotFound(_) => StatusCode::NOT_FOUND,
            WardenError::AgentBusy(_) | WardenError::InvalidState(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WardenError> for ApiError {
    fn from(e: WardenError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use warden_core::EntityKind;

    #[test]
    fn test_status_mapping() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            ApiError::from(WardenError::not_found(EntityKind::Task, id)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(WardenError::AgentBusy("a".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(WardenError::InvalidState("x".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(WardenError::Orchestrator("join".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
