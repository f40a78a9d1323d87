//! # RPC Errors
//!
//! Only produced when the error policy is `surface`, or when the call
//! itself could not be executed. The JSON gateway answers with an HTTP
//! status and `{error, code}`; gRPC answers with a `tonic::Status`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tonic::Status;

use crate::store::StoreError;

/// Result type for RPC handlers
pub type RpcResult<T> = Result<T, RpcError>;

/// RPC errors
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// A field of the requested record is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store or engine failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service name passed to the health check is not registered
    #[error("Unknown service: {0}")]
    UnknownService(String),
}

impl RpcError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::UnknownService(_) => StatusCode::NOT_FOUND,
            RpcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for RpcError {
    fn from(err: StoreError) -> Self {
        if err.is_not_found() {
            RpcError::NotFound(err.to_string())
        } else {
            RpcError::Internal(err.to_string())
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<RpcError> for ErrorResponse {
    fn from(err: RpcError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}

impl From<RpcError> for Status {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::NotFound(_) | RpcError::UnknownService(_) => {
                Status::not_found(err.to_string())
            }
            RpcError::Internal(_) => Status::internal(err.to_string()),
        }
    }
}
