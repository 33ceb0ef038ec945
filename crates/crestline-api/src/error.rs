//! Error types for the API client core.

use std::fmt;

use crate::response::ResponseEnvelope;

/// Errors surfaced by the request client.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// The security resolver failed while composing the request.
    Compose(String),
    /// The request body or query string could not be encoded.
    Encode(String),
    /// HTTP request failed.
    Request(String),
    /// Connection refused or failed.
    Connection(String),
    /// Request timed out.
    Timeout,
    /// Request was cancelled through its cancel token.
    Cancelled,
    /// Invalid URL provided.
    InvalidUrl(String),
    /// Invalid header name or value.
    InvalidHeader(String),
    /// JSON serialization/deserialization error.
    Json(String),
    /// The transport completed with a non-success status.
    ///
    /// The classified envelope is carried along so callers can still read
    /// the parsed error payload and the raw response body.
    Status {
        /// The HTTP status code.
        status: u16,
        /// The classified response envelope.
        envelope: Box<ResponseEnvelope>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compose(msg) => write!(f, "Security resolver error: {msg}"),
            Self::Encode(msg) => write!(f, "Encode error: {msg}"),
            Self::Request(msg) => write!(f, "HTTP request error: {msg}"),
            Self::Connection(msg) => write!(f, "Connection error: {msg}"),
            Self::Timeout => write!(f, "Request timed out"),
            Self::Cancelled => write!(f, "Request was cancelled"),
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {msg}"),
            Self::InvalidHeader(msg) => write!(f, "Invalid header: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
            Self::Status { status, .. } => write!(f, "HTTP {status}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for ApiError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for ApiError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// A specialized Result type for API client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
