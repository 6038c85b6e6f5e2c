use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docket_core::tasks::TaskStoreError;
use serde_json::json;
use tracing::error;

/// Uniform JSON error envelope: `{"error": <category>, "message": <detail>}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    category: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            category: "Bad Request",
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            category: "Not Found",
            message: message.into(),
        }
    }
}

impl From<TaskStoreError> for ApiError {
    fn from(err: TaskStoreError) -> Self {
        match &err {
            TaskStoreError::Validation { .. } => ApiError::bad_request(err.to_string()),
            TaskStoreError::NotFound { .. } => ApiError::not_found(err.to_string()),
            TaskStoreError::Storage { .. } => {
                // The reason goes to the log, not the client.
                error!("{err}");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    category: "Server Error",
                    message: "An unexpected error occurred.".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.category, "message": self.message }));
        (self.status, body).into_response()
    }
}

/// Fallback for known paths hit with an unsupported verb.
pub async fn method_not_allowed() -> ApiError {
    ApiError {
        status: StatusCode::METHOD_NOT_ALLOWED,
        category: "Method Not Allowed",
        message: "Invalid HTTP method for this endpoint.".to_string(),
    }
}

/// Fallback for paths outside the API surface.
pub async fn unknown_path() -> ApiError {
    ApiError::not_found("The requested resource was not found.")
}
