//! HTTP surface for the query service.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::RagError;
use crate::record::Answer;
use crate::service::QueryService;

/// Route serving question answering.
pub const QUERY_ROUTE: &str = "/api/rag-query";

const INVALID_QUESTION: &str = "Missing or invalid 'question'";

/// Inbound query payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural-language question.
    pub question: String,
}

impl QueryRequest {
    /// Extracts a non-blank string `question` from an arbitrary JSON body.
    pub fn from_value(body: &Value) -> Result<Self, RagError> {
        match body.get("question").and_then(Value::as_str) {
            Some(question) if !question.trim().is_empty() => Ok(Self {
                question: question.to_string(),
            }),
            _ => Err(RagError::Validation(INVALID_QUESTION.to_string())),
        }
    }
}

/// Error payload: message plus machine-readable kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Failure kind, see [`RagError::kind`].
    pub kind: String,
}

/// [`RagError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RagError);

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code for the wrapped failure.
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if self.0.is_upstream_error() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            RagError::Validation(message) => message.clone(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            warn!(kind = self.0.kind(), "query failed: {message}");
        }
        let body = ErrorBody {
            error: message,
            kind: self.0.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Router exposing the query and health endpoints.
pub fn router(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(QUERY_ROUTE, post(query_handler))
        .with_state(service)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Answers one question; malformed bodies are validation failures.
pub async fn query_handler(
    State(service): State<Arc<QueryService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        RagError::Validation(format!("{INVALID_QUESTION}: {}", rejection.body_text()))
    })?;
    let request = QueryRequest::from_value(&body)?;
    let answer = service.answer(&request.question).await?;
    info!(sources = answer.sources.len(), "answered question");
    Ok(Json(answer))
}
