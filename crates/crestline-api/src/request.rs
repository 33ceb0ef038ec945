//! Request descriptor types and the per-call builder.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use crate::body::{Body, ContentType, MultipartForm};
use crate::cancel::CancelToken;
use crate::client::ApiClient;
use crate::compose::RequestOverrides;
use crate::error::Result;
use crate::query::{QueryParams, QueryValue};
use crate::response::{ResponseEnvelope, ResponseFormat};

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// The caller-supplied description of one request.
///
/// Generated endpoint wrappers construct one of these per call; only
/// `path` and `method` are required, everything else falls back to the
/// client's defaults.
#[derive(Debug)]
pub struct ApiRequest {
    /// The request path, appended to the effective base URL.
    pub path: String,
    /// The HTTP method.
    pub method: HttpMethod,
    /// Query parameters.
    pub query: Option<QueryParams>,
    /// The request payload.
    pub body: Option<Body>,
    /// The wire encoding for the payload.
    pub content_type: ContentType,
    /// How to parse the response body; `None` returns the raw envelope.
    pub format: Option<ResponseFormat>,
    /// Overrides the client's default origin for this call.
    pub base_url: Option<String>,
    /// Couples this call to an abortable token.
    pub cancel_token: Option<CancelToken>,
    /// Per-call override layer (headers, secure flag, timeout).
    pub overrides: RequestOverrides,
}

impl ApiRequest {
    /// Create a descriptor with only the required fields set.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            query: None,
            body: None,
            content_type: ContentType::default(),
            format: None,
            base_url: None,
            cancel_token: None,
            overrides: RequestOverrides::default(),
        }
    }
}

/// Builder for one API request.
///
/// Created through the client's method helpers (`client.get(path)` etc.),
/// finished with [`send`](Self::send) or turned into a plain descriptor
/// with [`build`](Self::build).
pub struct ApiRequestBuilder<S: Clone + Send + Sync + 'static> {
    client: ApiClient<S>,
    request: ApiRequest,
}

impl<S: Clone + Send + Sync + 'static> ApiRequestBuilder<S> {
    pub(crate) fn new(client: ApiClient<S>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            client,
            request: ApiRequest::new(method, path),
        }
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        let params = self.request.query.take().unwrap_or_default();
        self.request.query = Some(params.push(key, value));
        self
    }

    /// Add a query parameter only when a value is present.
    pub fn query_opt<V: Into<QueryValue>>(
        mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        let params = self.request.query.take().unwrap_or_default();
        self.request.query = Some(params.push_opt(key, value));
        self
    }

    /// Replace the query parameters wholesale.
    pub fn query_params(mut self, params: QueryParams) -> Self {
        self.request.query = Some(params);
        self
    }

    /// Set a JSON body from a serializable value.
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => {
                self.request.body = Some(Body::Value(value));
                self.request.content_type = ContentType::Json;
            }
            Err(e) => {
                tracing::error!(target: "crestline_api::request", "Failed to serialize JSON body: {}", e);
            }
        }
        self
    }

    /// Set a plain text body.
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.request.body = Some(Body::Text(body.into()));
        self.request.content_type = ContentType::Text;
        self
    }

    /// Set a raw binary body.
    pub fn bytes_body(mut self, body: impl Into<Bytes>) -> Self {
        self.request.body = Some(Body::Raw(body.into()));
        self
    }

    /// Set a URL-encoded form body from a serializable value.
    pub fn form<T: Serialize>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => {
                self.request.body = Some(Body::Value(value));
                self.request.content_type = ContentType::UrlEncoded;
            }
            Err(e) => {
                tracing::error!(target: "crestline_api::request", "Failed to serialize form body: {}", e);
            }
        }
        self
    }

    /// Set a multipart form body.
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.request.body = Some(Body::Multipart(form));
        self.request.content_type = ContentType::FormData;
        self
    }

    /// Set the content type explicitly.
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.request.content_type = content_type;
        self
    }

    /// Request response parsing in the given format.
    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.request.format = Some(format);
        self
    }

    /// Override the client's base URL for this call.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.request.base_url = Some(base_url.into());
        self
    }

    /// Couple this call to a cancel token.
    pub fn cancel_token(mut self, token: impl Into<CancelToken>) -> Self {
        self.request.cancel_token = Some(token.into());
        self
    }

    /// Add a header to the per-call override layer.
    pub fn header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        self.request.overrides = self.request.overrides.header(name, value);
        self
    }

    /// Control whether the security resolver runs for this call.
    pub fn secure(mut self, secure: bool) -> Self {
        self.request.overrides = self.request.overrides.secure(secure);
        self
    }

    /// Set a timeout for this specific request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.overrides = self.request.overrides.timeout(timeout);
        self
    }

    /// Build the descriptor without sending it.
    pub fn build(self) -> ApiRequest {
        self.request
    }

    /// Send the request and classify the response.
    pub async fn send(self) -> Result<ResponseEnvelope> {
        let client = self.client.clone();
        client.request(self.request).await
    }
}
