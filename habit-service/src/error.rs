//! Error kinds for the plan request flow and their HTTP mapping.

use crate::services::metrics;
use crate::services::providers::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service_core::error::AppError;
use thiserror::Error;

/// The request itself is unusable; nothing external was called.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Goal is required")]
    MissingGoal,
}

/// The request body is not a JSON object. Reported to callers as a server error.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body is not valid JSON")]
    Json(#[source] serde_json::Error),

    #[error("request body is not a JSON object")]
    NotAnObject,
}

/// The model's output could not be turned into a plan.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid response envelope")]
    Envelope(#[source] serde_json::Error),

    #[error("response envelope has no text content")]
    MissingContent,

    #[error("model output is not valid JSON")]
    PlanJson(#[source] serde_json::Error),

    #[error("model output does not match the plan schema")]
    PlanSchema(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unreadable request")]
    Request(#[from] RequestError),

    #[error("inference failed")]
    Inference(#[source] ProviderError),

    #[error("parse failed")]
    Parse(#[from] ParseError),

    #[error("storage failed")]
    Storage(#[source] AppError),
}

impl From<ProviderError> for PlanError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidEnvelope(e) => PlanError::Parse(ParseError::Envelope(e)),
            ProviderError::MissingContent => PlanError::Parse(ParseError::MissingContent),
            other => PlanError::Inference(other),
        }
    }
}

impl PlanError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::Validation(_) => "validation",
            PlanError::Request(_) => "request",
            PlanError::Inference(_) => "inference",
            PlanError::Parse(_) => "parse",
            PlanError::Storage(_) => "storage",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PlanError::Validation(_) => StatusCode::BAD_REQUEST,
            PlanError::Request(_)
            | PlanError::Inference(_)
            | PlanError::Parse(_)
            | PlanError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Upstream failures are never described.
    pub fn public_message(&self) -> String {
        match self {
            PlanError::Validation(err) => err.to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for PlanError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        metrics::record_plan_error(self.kind());

        if status.is_server_error() {
            tracing::error!(
                error.kind = self.kind(),
                error.chain = %error_chain(&self),
                error = ?self,
                "Plan request failed"
            );
        } else {
            tracing::info!(error.kind = self.kind(), reason = %self, "Rejected plan request");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        chain.push(inner.to_string());
        source = inner.source();
    }
    chain.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("not json").unwrap_err()
    }

    #[tokio::test]
    async fn missing_goal_is_400_with_exact_body() {
        let response = PlanError::from(ValidationError::MissingGoal).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Goal is required" })
        );
    }

    #[tokio::test]
    async fn upstream_failures_are_500_with_generic_body() {
        let errors = vec![
            PlanError::from(RequestError::NotAnObject),
            PlanError::from(ProviderError::RateLimited),
            PlanError::from(ParseError::PlanJson(json_error())),
            PlanError::Storage(AppError::DatabaseError(anyhow::anyhow!("quota exceeded"))),
        ];

        for err in errors {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                body_json(response).await,
                json!({ "error": "Internal server error" })
            );
        }
    }

    #[test]
    fn envelope_errors_from_provider_are_parse_errors() {
        let err = PlanError::from(ProviderError::InvalidEnvelope(json_error()));
        assert_eq!(err.kind(), "parse");

        let err = PlanError::from(ProviderError::MissingContent);
        assert!(matches!(err, PlanError::Parse(ParseError::MissingContent)));

        let err = PlanError::from(ProviderError::ApiError("boom".to_string()));
        assert_eq!(err.kind(), "inference");
    }

    #[test]
    fn log_chain_includes_sources() {
        let err = PlanError::Storage(AppError::DatabaseError(anyhow::anyhow!("quota exceeded")));
        let logged = error_chain(&err);
        assert_eq!(logged, "storage failed: Database error: quota exceeded");
    }

    #[test]
    fn log_chain_names_each_source_once() {
        let err = PlanError::from(ParseError::PlanJson(json_error()));
        let logged = error_chain(&err);
        let root = json_error().to_string();

        assert!(logged.starts_with("parse failed: model output is not valid JSON: "));
        assert_eq!(logged.matches(root.as_str()).count(), 1);
    }
}
