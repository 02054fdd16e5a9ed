use axum::{http::StatusCode, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("backend unreachable: {0}")]
    NetworkUnavailable(String),

    /// Non-2xx upstream reply; `message` is the body's `error` text when present.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("{0}")]
    Validation(String),

    /// 2xx upstream reply that still carried an `error` field.
    #[error("{0}")]
    Application(String),

    #[error("Backend is offline. Start the backend server to enable subscriptions.")]
    Offline,

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("A subscription is already processing.")]
    Busy,
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                message: format!("Request failed: {}", status.as_u16()),
            },
            None => Self::NetworkUnavailable(err.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        let status = match &err {
            DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
            DashboardError::UnknownPlan(_) => StatusCode::NOT_FOUND,
            DashboardError::Busy => StatusCode::CONFLICT,
            DashboardError::Offline => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Http { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(StatusCode::is_client_error)
                .unwrap_or(StatusCode::BAD_GATEWAY),
            DashboardError::NetworkUnavailable(_) | DashboardError::Application(_) => {
                StatusCode::BAD_GATEWAY
            }
        };

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_client_errors_keep_their_status_and_message() {
        let err = AppError::from(DashboardError::Http {
            status: 400,
            message: "plan full".to_string(),
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "plan full");
    }

    #[test]
    fn upstream_server_errors_become_bad_gateway() {
        let err = AppError::from(DashboardError::Http {
            status: 503,
            message: "Request failed: 503".to_string(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn validation_is_a_bad_request() {
        let err = AppError::from(DashboardError::Validation("Please enter your name.".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Please enter your name.");
    }
}
