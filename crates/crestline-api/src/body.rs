//! Request body encoding per content type.

use bytes::Bytes;

use crate::error::{ApiError, Result};
use crate::query::QueryParams;

/// The wire encoding family governing body serialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// `application/json`.
    #[default]
    Json,
    /// `application/vnd.api+json`.
    JsonApi,
    /// `multipart/form-data`.
    FormData,
    /// `application/x-www-form-urlencoded`.
    UrlEncoded,
    /// `text/plain`.
    Text,
}

impl ContentType {
    /// The MIME string sent in the `Content-Type` header.
    pub fn as_mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::JsonApi => "application/vnd.api+json",
            Self::FormData => "multipart/form-data",
            Self::UrlEncoded => "application/x-www-form-urlencoded",
            Self::Text => "text/plain",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_mime())
    }
}

/// Multipart form data for file uploads.
pub struct MultipartForm {
    inner: reqwest::multipart::Form,
}

impl MultipartForm {
    /// Create a new empty multipart form.
    pub fn new() -> Self {
        Self {
            inner: reqwest::multipart::Form::new(),
        }
    }

    /// Add a text field to the form.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner = self.inner.text(name.into(), value.into());
        self
    }

    /// Add a file field from bytes.
    pub fn file_bytes(
        mut self,
        name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        mime_type: Option<&str>,
    ) -> Self {
        let bytes_vec: Vec<u8> = bytes.into();
        let filename_str: String = filename.into();
        let part = reqwest::multipart::Part::bytes(bytes_vec.clone()).file_name(filename_str.clone());
        // mime_str consumes self and returns Result<Part>
        let part = match mime_type {
            Some(mime) => part.mime_str(mime).unwrap_or_else(|e| {
                tracing::warn!(target: "crestline_api::body", "Invalid MIME type '{}': {}", mime, e);
                reqwest::multipart::Part::bytes(bytes_vec).file_name(filename_str)
            }),
            None => part,
        };
        self.inner = self.inner.part(name.into(), part);
        self
    }

    /// Convert to the internal reqwest form.
    pub(crate) fn into_reqwest(self) -> reqwest::multipart::Form {
        self.inner
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MultipartForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartForm").finish()
    }
}

/// The payload of a request before encoding.
#[derive(Debug)]
pub enum Body {
    /// A structured payload value.
    Value(serde_json::Value),
    /// A plain text payload, passed through unchanged.
    Text(String),
    /// A raw binary payload, passed through unchanged.
    Raw(Bytes),
    /// A prepared multipart form, passed through unchanged.
    Multipart(MultipartForm),
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self::Raw(value)
    }
}

impl From<MultipartForm> for Body {
    fn from(value: MultipartForm) -> Self {
        Self::Multipart(value)
    }
}

/// A wire-ready request body.
#[derive(Debug, Default)]
pub enum EncodedBody {
    /// No body is sent.
    #[default]
    None,
    /// A textual body.
    Text(String),
    /// A raw binary body.
    Raw(Bytes),
    /// A multipart body; reqwest supplies the boundary header itself.
    Multipart(reqwest::multipart::Form),
}

impl EncodedBody {
    /// Check whether a body will be sent.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Encode a payload for the given content type.
///
/// A `Value::Null` payload encodes to no body under every content type;
/// the orchestrator additionally skips the codec entirely when the request
/// carries no body at all.
pub fn encode(content_type: ContentType, body: Body) -> Result<EncodedBody> {
    match content_type {
        ContentType::Json | ContentType::JsonApi => encode_json(body),
        ContentType::Text => encode_text(body),
        ContentType::FormData => encode_form_data(body),
        ContentType::UrlEncoded => encode_url_encoded(body),
    }
}

fn encode_json(body: Body) -> Result<EncodedBody> {
    match body {
        Body::Value(serde_json::Value::Null) => Ok(EncodedBody::None),
        // Objects, arrays and strings serialize to JSON text; bare numbers
        // and booleans pass through in their plain display form.
        Body::Value(
            value @ (serde_json::Value::Object(_)
            | serde_json::Value::Array(_)
            | serde_json::Value::String(_)),
        ) => Ok(EncodedBody::Text(serde_json::to_string(&value)?)),
        Body::Value(serde_json::Value::Number(n)) => Ok(EncodedBody::Text(n.to_string())),
        Body::Value(serde_json::Value::Bool(b)) => Ok(EncodedBody::Text(b.to_string())),
        Body::Text(text) => Ok(EncodedBody::Text(text)),
        Body::Raw(bytes) => Ok(EncodedBody::Raw(bytes)),
        Body::Multipart(_) => Err(ApiError::Encode(
            "multipart form payload under a JSON content type".to_string(),
        )),
    }
}

fn encode_text(body: Body) -> Result<EncodedBody> {
    match body {
        Body::Text(text) => Ok(EncodedBody::Text(text)),
        Body::Value(serde_json::Value::Null) => Ok(EncodedBody::None),
        // Non-string payloads fall back to JSON text.
        Body::Value(value) => Ok(EncodedBody::Text(serde_json::to_string(&value)?)),
        Body::Raw(bytes) => Ok(EncodedBody::Raw(bytes)),
        Body::Multipart(_) => Err(ApiError::Encode(
            "multipart form payload under a text content type".to_string(),
        )),
    }
}

fn encode_form_data(body: Body) -> Result<EncodedBody> {
    match body {
        Body::Multipart(form) => Ok(EncodedBody::Multipart(form.into_reqwest())),
        Body::Value(serde_json::Value::Null) => Ok(EncodedBody::None),
        Body::Value(serde_json::Value::Object(map)) => {
            let mut form = reqwest::multipart::Form::new();
            for (key, value) in map {
                match value {
                    serde_json::Value::Null => {}
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        form = form.text(key, serde_json::to_string(&value)?);
                    }
                    serde_json::Value::String(s) => {
                        form = form.text(key, s);
                    }
                    other => {
                        form = form.text(key, other.to_string());
                    }
                }
            }
            Ok(EncodedBody::Multipart(form))
        }
        other => Err(ApiError::Encode(format!(
            "form-data payload must be a multipart form or an object, got {other:?}"
        ))),
    }
}

fn encode_url_encoded(body: Body) -> Result<EncodedBody> {
    match body {
        Body::Value(serde_json::Value::Null) => Ok(EncodedBody::None),
        Body::Value(value) => {
            let params = QueryParams::try_from(value)?;
            Ok(EncodedBody::Text(params.encode()))
        }
        // An already-encoded text payload passes through.
        Body::Text(text) => Ok(EncodedBody::Text(text)),
        other => Err(ApiError::Encode(format!(
            "url-encoded payload must be an object, got {other:?}"
        ))),
    }
}
