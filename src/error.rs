// src/error.rs
use std::convert::Infallible;
use std::fmt;

use log::error;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

use crate::api::Envelope;

#[derive(Debug)]
pub enum ApiError {
    InvalidId(String),
    NotFound,
    Timeout,
    Storage(sqlx::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidId(_) => "invalid_id",
            ApiError::NotFound => "not_found",
            ApiError::Timeout => "timeout",
            ApiError::Storage(_) => "storage",
        }
    }

    /// Message safe to return to the client. Query failures stay generic;
    /// the detail goes to the log at the rejection site.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::InvalidId(raw) => format!("invalid stock id: {}", raw),
            ApiError::NotFound => "stock not found".to_string(),
            ApiError::Timeout => "query timed out".to_string(),
            ApiError::Storage(_) => "database error".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Storage(e) => write!(f, "database error: {}", e),
            other => write!(f, "{}", other.public_message()),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl Reject for ApiError {}

/// Turns every rejection into the failure envelope. Nothing here is fatal to
/// the process; a request that fails gets a JSON error and the service moves
/// on.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, code, message) = if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            "not_found",
            "resource not found".to_string(),
        )
    } else if let Some(e) = err.find::<ApiError>() {
        (e.status(), e.code(), e.public_message())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "invalid_body", e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed".to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&Envelope::<()>::failure(code, message)),
        status,
    ))
}
