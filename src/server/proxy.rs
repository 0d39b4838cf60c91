//! Command proxy handler that routes HTTP requests to workflow operations
//!
//! A single /api/invoke endpoint takes `{cmd, args}` and dispatches to the
//! route modules in `routes/`:
//! - session_routes: session create/list/load/replace/rename/delete
//! - workflow_routes: stage operations on one session
//! - meeting_routes: meeting selection, turns, summaries and runs
//! - config_routes: API key, settings and prompt library

use super::routes;
use super::ServerAppState;
use crate::error::LabError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for /api/invoke endpoint
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    /// Command name (e.g., "list_sessions", "take_meeting_turn")
    pub cmd: String,
    /// Command arguments as JSON object
    #[serde(default)]
    pub args: Value,
}

/// Response body for /api/invoke endpoint
#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error type for invoke handler
#[derive(Debug)]
pub struct InvokeError {
    status: StatusCode,
    message: String,
}

impl InvokeError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LabError> for InvokeError {
    fn from(error: LabError) -> Self {
        let status = match &error {
            LabError::Validation(_) | LabError::Precondition(_) => StatusCode::BAD_REQUEST,
            LabError::NotFound { .. } => StatusCode::NOT_FOUND,
            LabError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            LabError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.user_message(),
        }
    }
}

impl IntoResponse for InvokeError {
    fn into_response(self) -> Response {
        let body = InvokeResponse {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Main invoke handler - routes commands to their implementations
pub async fn invoke_handler(
    State(state): State<ServerAppState>,
    Json(req): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, InvokeError> {
    log::debug!("Invoke command: {}", req.cmd);

    match routes::route_command(&req.cmd, req.args, &state).await {
        Ok(data) => Ok(Json(InvokeResponse {
            success: true,
            data: Some(data),
            error: None,
        })),
        Err(e) => {
            log::warn!("Command {} failed ({}): {}", req.cmd, e.kind(), e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_request_deserialization() {
        let json = r#"{"cmd": "get_session", "args": {"sessionId": "abc"}}"#;
        let req: InvokeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.cmd, "get_session");
        assert_eq!(req.args["sessionId"], "abc");
    }

    #[test]
    fn test_invoke_request_without_args() {
        let req: InvokeRequest = serde_json::from_str(r#"{"cmd": "list_sessions"}"#).unwrap();
        assert!(req.args.is_null());
    }

    #[test]
    fn test_invoke_response_serialization() {
        let resp = InvokeResponse {
            success: true,
            data: Some(serde_json::json!({"count": 5})),
            error: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"count\":5"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (LabError::validation("bad"), StatusCode::BAD_REQUEST),
            (LabError::precondition("not yet"), StatusCode::BAD_REQUEST),
            (LabError::not_found("Session", "x"), StatusCode::NOT_FOUND),
            (LabError::upstream(Some(500), "down"), StatusCode::BAD_GATEWAY),
            (LabError::storage("disk"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(InvokeError::from(error).status(), status);
        }
    }

    #[test]
    fn test_upstream_error_message_carries_retry_hint() {
        let err = InvokeError::from(LabError::upstream(Some(429), "Rate limit exceeded"));
        assert!(err.message().contains("Rate limit exceeded"));
        assert!(err.message().contains("try again"));
    }
}
