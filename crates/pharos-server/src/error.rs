//! HTTP error mapping for guidance errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use pharos_core::{ErrorBody, GuidanceError};

/// A guidance error crossing the HTTP boundary. Serializes as an
/// [`ErrorBody`] with a status code derived from the error variant.
#[derive(Debug)]
pub struct ApiError(pub GuidanceError);

impl From<GuidanceError> for ApiError {
    fn from(err: GuidanceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// The HTTP status code this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0 {
            GuidanceError::SuggestionNotFound(_) => StatusCode::NOT_FOUND,
            GuidanceError::UnsupportedInteraction { .. } => StatusCode::NOT_IMPLEMENTED,
            GuidanceError::UnknownCallback(_) => StatusCode::BAD_REQUEST,
            GuidanceError::NotConfigured
            | GuidanceError::AlreadyRunning
            | GuidanceError::NotRunning => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.0.code(), error = %self.0, "request failed");
        }
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharos_core::{ActionId, Interaction, SuggestionId};

    #[test]
    fn status_mapping() {
        let cases = [
            (
                GuidanceError::SuggestionNotFound(SuggestionId::from("x")),
                StatusCode::NOT_FOUND,
            ),
            (
                GuidanceError::UnsupportedInteraction {
                    interaction: Interaction::PreviewStart,
                    action_id: ActionId::from("a"),
                },
                StatusCode::NOT_IMPLEMENTED,
            ),
            (
                GuidanceError::UnknownCallback("cb".into()),
                StatusCode::BAD_REQUEST,
            ),
            (GuidanceError::NotConfigured, StatusCode::CONFLICT),
            (GuidanceError::AlreadyRunning, StatusCode::CONFLICT),
            (GuidanceError::NotRunning, StatusCode::CONFLICT),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn response_body_carries_code_and_message() {
        let err = ApiError(GuidanceError::SuggestionNotFound(SuggestionId::from(
            "sugg-1",
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), 10_000)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["code"], "NOT_FOUND");
        assert!(parsed["error"].as_str().unwrap().contains("sugg-1"));
    }
}
