//! Response envelope types and body classification.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};

/// How to parse the response body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseFormat {
    /// Parse the body as JSON.
    Json,
    /// Decode the body as UTF-8 text.
    Text,
    /// Keep the body as raw bytes.
    Bytes,
}

impl ResponseFormat {
    /// The format name, matching the transport's parsing method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Bytes => "bytes",
        }
    }
}

/// A response body parsed per the requested format.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedBody {
    /// A parsed JSON document.
    Json(serde_json::Value),
    /// A decoded text body.
    Text(String),
    /// The raw body bytes.
    Bytes(Bytes),
}

/// The error side of a classified envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum EnvelopeError {
    /// The parsed error payload of a non-success response.
    Payload(ParsedBody),
    /// Parsing the body failed; the failure is captured, not thrown.
    Decode(String),
}

/// The classified result of one transport exchange.
///
/// The full response body is buffered, so the raw bytes stay readable
/// regardless of how parsing went. Once classification ran, exactly one
/// of `data`/`error` is populated; without a requested format both stay
/// empty and the envelope is just the raw response.
#[derive(Clone)]
pub struct ResponseEnvelope {
    status: http::StatusCode,
    headers: http::HeaderMap,
    url: String,
    body: Bytes,
    data: Option<ParsedBody>,
    error: Option<EnvelopeError>,
}

impl ResponseEnvelope {
    pub(crate) fn new(
        status: http::StatusCode,
        headers: http::HeaderMap,
        url: String,
        body: Bytes,
    ) -> Self {
        Self {
            status,
            headers,
            url,
            body,
            data: None,
            error: None,
        }
    }

    /// Parse the buffered body per the requested format and populate the
    /// success or error side based on the transport status.
    pub(crate) fn classify(&mut self, format: ResponseFormat) {
        let parsed = match format {
            ResponseFormat::Json => serde_json::from_slice(&self.body)
                .map(ParsedBody::Json)
                .map_err(|e| e.to_string()),
            ResponseFormat::Text => String::from_utf8(self.body.to_vec())
                .map(ParsedBody::Text)
                .map_err(|e| e.to_string()),
            ResponseFormat::Bytes => Ok(ParsedBody::Bytes(self.body.clone())),
        };

        match parsed {
            Ok(parsed) if self.status.is_success() => self.data = Some(parsed),
            Ok(parsed) => self.error = Some(EnvelopeError::Payload(parsed)),
            Err(message) => self.error = Some(EnvelopeError::Decode(message)),
        }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &http::HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the final URL of the exchange.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the raw buffered response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// View the raw body as UTF-8 text, when it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Get the parsed success payload, when classification populated it.
    pub fn data(&self) -> Option<&ParsedBody> {
        self.data.as_ref()
    }

    /// Get the error side, when classification populated it.
    pub fn error(&self) -> Option<&EnvelopeError> {
        self.error.as_ref()
    }

    /// Deserialize the parsed JSON success payload into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.data {
            Some(ParsedBody::Json(value)) => Ok(serde_json::from_value(value.clone())?),
            _ => Err(ApiError::Json(
                "envelope carries no parsed JSON data".to_string(),
            )),
        }
    }

    /// Deserialize the parsed JSON error payload into a typed value.
    pub fn error_as<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.error {
            Some(EnvelopeError::Payload(ParsedBody::Json(value))) => {
                Ok(serde_json::from_value(value.clone())?)
            }
            _ => Err(ApiError::Json(
                "envelope carries no parsed JSON error".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for ResponseEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseEnvelope")
            .field("status", &self.status())
            .field("url", &self.url)
            .field("has_data", &self.data.is_some())
            .field("has_error", &self.error.is_some())
            .finish()
    }
}
