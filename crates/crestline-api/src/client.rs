//! The request client orchestrator.
//!
//! # Example
//!
//! ```ignore
//! use crestline_api::{ApiClient, ResponseFormat};
//!
//! let client: ApiClient = ApiClient::builder("https://api.example.com")
//!     .base_header("Accept", "application/json")
//!     .secure_by_default(true)
//!     .security_resolver(|token: Option<String>| async move {
//!         Ok(token.map(|t| {
//!             RequestOverrides::new().header("Authorization", format!("Bearer {t}"))
//!         }))
//!     })
//!     .build()?;
//!
//! client.set_security_data(Some("session-token".to_string()));
//!
//! let envelope = client
//!     .get("/account")
//!     .query("limit", 100i64)
//!     .format(ResponseFormat::Json)
//!     .send()
//!     .await?;
//! let accounts: Vec<Account> = envelope.data_as()?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::Mutex;

use crate::body::{self, ContentType, EncodedBody};
use crate::cancel::{CancelSignal, CancelToken, CancellationRegistry};
use crate::compose::{self, RequestOverrides, SecurityResolver};
use crate::error::{ApiError, Result};
use crate::request::{ApiRequest, ApiRequestBuilder, HttpMethod};
use crate::response::{ResponseEnvelope, ResponseFormat};
use crate::transport::{HttpTransport, HttpTransportBuilder};

/// Builder for configuring an [`ApiClient`].
pub struct ApiClientBuilder<S = serde_json::Value> {
    base_url: String,
    transport: Option<HttpTransport>,
    transport_builder: Option<HttpTransportBuilder>,
    base: RequestOverrides,
    security_resolver: Option<SecurityResolver<S>>,
}

impl<S: Clone + Send + Sync + 'static> ApiClientBuilder<S> {
    /// Create a new builder with the specified base URL.
    ///
    /// All request paths are appended to this base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            transport: None,
            transport_builder: None,
            base: RequestOverrides::default(),
            security_resolver: None,
        }
    }

    /// Use an existing transport instead of creating a new one.
    pub fn http_transport(mut self, transport: HttpTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom transport builder for advanced configuration.
    pub fn transport_builder(mut self, builder: HttpTransportBuilder) -> Self {
        self.transport_builder = Some(builder);
        self
    }

    /// Add a header sent with every request. Invalid names or values are
    /// skipped.
    pub fn base_header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        self.base = self.base.header(name, value);
        self
    }

    /// Run the security resolver for every call that does not opt out.
    pub fn secure_by_default(mut self, secure: bool) -> Self {
        self.base = self.base.secure(secure);
        self
    }

    /// Parse responses in the given format unless a call overrides it.
    pub fn default_format(mut self, format: ResponseFormat) -> Self {
        self.base = self.base.format(format);
        self
    }

    /// Replace the whole base override layer.
    pub fn base_overrides(mut self, base: RequestOverrides) -> Self {
        self.base = base;
        self
    }

    /// Set the security resolver invoked for secure requests.
    ///
    /// The resolver receives the client's current security data and
    /// returns the highest-precedence override layer, or nothing.
    pub fn security_resolver<F, Fut>(mut self, resolver: F) -> Self
    where
        F: Fn(Option<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<RequestOverrides>>> + Send + 'static,
    {
        self.security_resolver = Some(Arc::new(move |data| resolver(data).boxed()));
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ApiClient<S>> {
        let transport = if let Some(transport) = self.transport {
            transport
        } else if let Some(builder) = self.transport_builder {
            builder.build()?
        } else {
            HttpTransport::new()
        };

        // Normalize base URL (remove trailing slash)
        let base_url = self.base_url.trim_end_matches('/').to_string();

        Ok(ApiClient {
            inner: Arc::new(ApiClientInner {
                transport,
                base_url,
                base: self.base,
                security_resolver: self.security_resolver,
                security_data: Mutex::new(None),
                cancellations: CancellationRegistry::new(),
            }),
        })
    }
}

struct ApiClientInner<S> {
    transport: HttpTransport,
    base_url: String,
    base: RequestOverrides,
    security_resolver: Option<SecurityResolver<S>>,
    security_data: Mutex<Option<S>>,
    cancellations: CancellationRegistry,
}

/// The request client driving the generated endpoint wrappers.
///
/// Turns one request descriptor into one outstanding network call:
/// composes the effective override layers, encodes query and body,
/// couples the call to its cancel token, issues the transport call, and
/// classifies the result into a success/error envelope.
///
/// Cheaply cloneable; clones share the transport, the security-data slot,
/// and the cancellation registry.
pub struct ApiClient<S = serde_json::Value> {
    inner: Arc<ApiClientInner<S>>,
}

impl<S> Clone for ApiClient<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Clone + Send + Sync + 'static> ApiClient<S> {
    /// Create a new builder for configuring a client.
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder<S> {
        ApiClientBuilder::new(base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &HttpTransport {
        &self.inner.transport
    }

    /// Get a reference to the cancellation registry.
    pub fn cancellations(&self) -> &CancellationRegistry {
        &self.inner.cancellations
    }

    /// Replace the security data consulted by the security resolver.
    ///
    /// Callers update this on login/logout; requests that have not yet
    /// composed observe the new value.
    pub fn set_security_data(&self, data: Option<S>) {
        *self.inner.security_data.lock() = data;
    }

    /// Get a clone of the current security data.
    pub fn security_data(&self) -> Option<S> {
        self.inner.security_data.lock().clone()
    }

    /// Abort every in-flight request sharing the token.
    ///
    /// Returns `true` if a live handle was fired.
    pub fn abort(&self, token: &CancelToken) -> bool {
        self.inner.cancellations.abort(token)
    }

    /// Create a GET request builder.
    pub fn get(&self, path: impl Into<String>) -> ApiRequestBuilder<S> {
        self.request_with(HttpMethod::Get, path)
    }

    /// Create a POST request builder.
    pub fn post(&self, path: impl Into<String>) -> ApiRequestBuilder<S> {
        self.request_with(HttpMethod::Post, path)
    }

    /// Create a PUT request builder.
    pub fn put(&self, path: impl Into<String>) -> ApiRequestBuilder<S> {
        self.request_with(HttpMethod::Put, path)
    }

    /// Create a DELETE request builder.
    pub fn delete(&self, path: impl Into<String>) -> ApiRequestBuilder<S> {
        self.request_with(HttpMethod::Delete, path)
    }

    /// Create a PATCH request builder.
    pub fn patch(&self, path: impl Into<String>) -> ApiRequestBuilder<S> {
        self.request_with(HttpMethod::Patch, path)
    }

    /// Create a HEAD request builder.
    pub fn head(&self, path: impl Into<String>) -> ApiRequestBuilder<S> {
        self.request_with(HttpMethod::Head, path)
    }

    /// Create a request builder with a custom method.
    pub fn request_with(&self, method: HttpMethod, path: impl Into<String>) -> ApiRequestBuilder<S> {
        ApiRequestBuilder::new(self.clone(), method, path)
    }

    /// Execute one request descriptor.
    ///
    /// A non-success transport status fails the call with
    /// [`ApiError::Status`], carrying the classified envelope; only a
    /// success status returns `Ok`.
    pub async fn request(&self, request: ApiRequest) -> Result<ResponseEnvelope> {
        if request.path.is_empty() {
            return Err(ApiError::InvalidUrl("request path is empty".to_string()));
        }

        // Compose: may suspend on the security resolver.
        let security = self.resolve_security(&request.overrides).await?;
        let effective = compose::merge(&self.inner.base, &request.overrides, security.as_ref());

        // Encode query and body.
        let query_string = request
            .query
            .as_ref()
            .map(|query| query.encode())
            .unwrap_or_default();
        let encoded = match request.body {
            Some(payload) => body::encode(request.content_type, payload)?,
            None => EncodedBody::None,
        };
        let format = request.format.or(effective.format);

        let url = self.build_url(request.base_url.as_deref(), &request.path, &query_string)?;

        let mut headers = effective.headers;
        // Multipart bodies carry their own boundary parameter; setting the
        // header here would lose it.
        if encoded.is_present() && request.content_type != ContentType::FormData {
            headers.insert(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static(request.content_type.as_mime()),
            );
        }

        tracing::debug!(
            target: "crestline_api::client",
            "{} {}",
            request.method,
            url,
        );

        let signal = request
            .cancel_token
            .as_ref()
            .map(|token| self.inner.cancellations.signal(token));

        let result = self
            .exchange(request.method, url, headers, encoded, effective.timeout, format, signal)
            .await;

        // A finished call never holds a stale handle, whatever the outcome.
        if let Some(token) = &request.cancel_token {
            self.inner.cancellations.complete(token);
        }

        let envelope = result?;
        if !envelope.is_success() {
            return Err(ApiError::Status {
                status: envelope.status(),
                envelope: Box::new(envelope),
            });
        }
        Ok(envelope)
    }

    async fn resolve_security(&self, call: &RequestOverrides) -> Result<Option<RequestOverrides>> {
        let secure = call.secure.or(self.inner.base.secure).unwrap_or(false);
        if !secure {
            return Ok(None);
        }
        let Some(resolver) = &self.inner.security_resolver else {
            return Ok(None);
        };
        // Single read of the slot; the call observes whatever is stored at
        // compose time.
        let data = self.inner.security_data.lock().clone();
        resolver(data).await
    }

    fn build_url(&self, base_url: Option<&str>, path: &str, query_string: &str) -> Result<url::Url> {
        let base = base_url
            .map(|base| base.trim_end_matches('/'))
            .unwrap_or(&self.inner.base_url);
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        let mut full = format!("{base}{path}");
        if !query_string.is_empty() {
            full.push('?');
            full.push_str(query_string);
        }
        Ok(url::Url::parse(&full)?)
    }

    async fn exchange(
        &self,
        method: HttpMethod,
        url: url::Url,
        headers: http::HeaderMap,
        body: EncodedBody,
        timeout: Option<std::time::Duration>,
        format: Option<ResponseFormat>,
        signal: Option<CancelSignal>,
    ) -> Result<ResponseEnvelope> {
        let mut req_builder = self
            .inner
            .transport
            .reqwest_client()
            .request(method.to_reqwest(), url);

        for (name, value) in headers.iter() {
            req_builder = req_builder.header(name, value);
        }

        if let Some(timeout) = timeout {
            req_builder = req_builder.timeout(timeout);
        }

        req_builder = match body {
            EncodedBody::None => req_builder,
            EncodedBody::Text(text) => req_builder.body(text),
            EncodedBody::Raw(bytes) => req_builder.body(bytes),
            EncodedBody::Multipart(form) => req_builder.multipart(form),
        };

        let work = async move {
            let response = req_builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let final_url = response.url().to_string();
            let body = response.bytes().await?;
            Ok::<_, ApiError>(ResponseEnvelope::new(status, headers, final_url, body))
        };

        let mut envelope = match signal {
            Some(signal) => tokio::select! {
                result = work => result?,
                _ = signal.fired() => {
                    tracing::debug!(target: "crestline_api::client", "request aborted by cancel token");
                    return Err(ApiError::Cancelled);
                }
            },
            None => work.await?,
        };

        if let Some(format) = format {
            envelope.classify(format);
        }
        Ok(envelope)
    }
}

impl<S> std::fmt::Debug for ApiClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field(
                "has_security_resolver",
                &self.inner.security_resolver.is_some(),
            )
            .finish()
    }
}
