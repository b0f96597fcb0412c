use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error as ThisError;

/// Wrapper mapping core errors onto HTTP responses.
///
/// Bodies are `{"error": {"kind": ..., "message": ...}}` with a `fields`
/// array on validation failures; the console surfaces `message` directly, so
/// it passes through unchanged.
#[derive(Debug, ThisError)]
#[error(transparent)]
pub struct Error(#[from] pub vsctl::Error);

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            vsctl::Error::Validation { .. } => StatusCode::BAD_REQUEST,
            vsctl::Error::NotFound(_) => StatusCode::NOT_FOUND,
            vsctl::Error::InvalidTransition { .. } => StatusCode::CONFLICT,
            vsctl::Error::ActivationFailed(_) => StatusCode::BAD_GATEWAY,
            vsctl::Error::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            vsctl::Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        });
        if let vsctl::Error::Validation { violations } = &self.0 {
            body["error"]["fields"] = serde_json::to_value(violations).unwrap_or_default();
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use vsctl::Violation;
    use vsctl::registry::types::VsStatus;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error(vsctl::Error::validation("name", "empty")).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error(vsctl::Error::NotFound(Uuid::new_v4())).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error(vsctl::Error::InvalidTransition { from: VsStatus::Active, requested: "clear maintenance" }).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(Error(vsctl::Error::ActivationFailed("no ack".to_string())).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(Error(vsctl::Error::Render("empty pool".to_string())).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_validation_body_carries_fields() {
        let err = Error(vsctl::Error::Validation {
            violations: vec![Violation::new("backends", "At least one backend is required")],
        });
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"]["kind"], "validation");
        assert_eq!(parsed["error"]["fields"][0]["field"], "backends");
    }
}
