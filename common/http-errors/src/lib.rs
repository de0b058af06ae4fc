use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error envelope shared by every storefront handler. Each variant carries a
/// stable machine code that is also emitted as the `X-Error-Code` response
/// header for the error-metrics middleware.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized { trace_id: Option<Uuid> },
    BadRequest { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    NotFound { code: &'static str, trace_id: Option<Uuid> },
    BadGateway { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    Internal { trace_id: Option<Uuid>, message: Option<String> },
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized { trace_id: None }
    }
    pub fn bad_request(code: &'static str) -> Self {
        Self::BadRequest { code, trace_id: None, message: None }
    }
    pub fn bad_request_msg(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest { code, trace_id: None, message: Some(message.into()) }
    }
    pub fn not_found(code: &'static str) -> Self {
        Self::NotFound { code, trace_id: None }
    }
    pub fn bad_gateway<E: std::fmt::Display>(code: &'static str, e: E) -> Self {
        Self::BadGateway { code, trace_id: None, message: Some(e.to_string()) }
    }
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal { trace_id: None, message: Some(e.to_string()) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body, error_code) = match self {
            ApiError::Unauthorized { trace_id } => (
                StatusCode::UNAUTHORIZED,
                ErrorBody { code: "unauthorized".into(), trace_id, message: None },
                "unauthorized",
            ),
            ApiError::BadRequest { code, trace_id, message } => (
                StatusCode::BAD_REQUEST,
                ErrorBody { code: code.into(), trace_id, message },
                code,
            ),
            ApiError::NotFound { code, trace_id } => (
                StatusCode::NOT_FOUND,
                ErrorBody { code: code.into(), trace_id, message: None },
                code,
            ),
            ApiError::BadGateway { code, trace_id, message } => (
                StatusCode::BAD_GATEWAY,
                ErrorBody { code: code.into(), trace_id, message },
                code,
            ),
            ApiError::Internal { trace_id, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { code: "internal_error".into(), trace_id, message },
                "internal_error",
            ),
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
