use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::types::{ErrorBody, ErrorResponse, PrettyJson};
use crate::txsub::SubmitError;

/// API error type that converts to HTTP responses.
pub enum ApiError {
    BadRequest {
        message: String,
        param: Option<String>,
    },
    NotFound {
        message: String,
    },
    /// The resource is older than the retained history.
    Gone {
        message: String,
    },
    TransactionFailed {
        result_xdr: String,
    },
    ServiceUnavailable {
        message: String,
    },
    Internal {
        message: String,
    },
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Failed(failed) => ApiError::TransactionFailed {
                result_xdr: failed.result_xdr,
            },
            SubmitError::CoreException(_) => ApiError::BadRequest {
                message: err.to_string(),
                param: Some("tx".to_string()),
            },
            SubmitError::Transport(_) | SubmitError::Timeout(_) | SubmitError::TryAgainLater => {
                ApiError::ServiceUnavailable {
                    message: err.to_string(),
                }
            }
            SubmitError::UnrecognizedStatus(_) => ApiError::Internal {
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut result_xdr = None;
        let (status, error_type, code, message, param) = match self {
            ApiError::BadRequest { message, param } => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                Some("invalid_parameter"),
                message,
                param,
            ),
            ApiError::NotFound { message } => (
                StatusCode::NOT_FOUND,
                "invalid_request_error",
                Some("resource_missing"),
                message,
                None,
            ),
            ApiError::Gone { message } => (
                StatusCode::GONE,
                "invalid_request_error",
                Some("before_history"),
                message,
                None,
            ),
            ApiError::TransactionFailed { result_xdr: xdr } => {
                result_xdr = Some(xdr);
                (
                    StatusCode::BAD_REQUEST,
                    "transaction_error",
                    Some("transaction_failed"),
                    "transaction failed when submitted to the network".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "api_error",
                Some("service_unavailable"),
                message,
                None,
            ),
            ApiError::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "api_error",
                None,
                message,
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                error_type: error_type.to_string(),
                code: code.map(str::to_string),
                message,
                param,
                result_xdr,
            },
        };

        (status, PrettyJson(body)).into_response()
    }
}
