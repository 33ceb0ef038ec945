//! Request client core for the Crestline API.
//!
//! This crate provides the client that drives the generated per-endpoint
//! wrapper functions: it turns a logical request description (path,
//! method, query, body, content type, desired response parsing, optional
//! cancel token) into a single outstanding network call with consistent
//! serialization, abort handling, and success/error data shaping.
//!
//! # Making requests
//!
//! ```ignore
//! use crestline_api::{ApiClient, ResponseFormat};
//!
//! let client: ApiClient = ApiClient::builder("https://api.example.com").build()?;
//!
//! // GET /account?limit=100, parsed as JSON
//! let envelope = client
//!     .get("/account")
//!     .query("limit", 100i64)
//!     .format(ResponseFormat::Json)
//!     .send()
//!     .await?;
//!
//! // POST with a JSON body
//! let envelope = client
//!     .post("/account")
//!     .json(&serde_json::json!({"name": "Ada"}))
//!     .format(ResponseFormat::Json)
//!     .send()
//!     .await?;
//! ```
//!
//! # Security-augmented requests
//!
//! A security resolver contributes the highest-precedence override layer
//! for calls marked secure. The client holds the security data in a
//! mutable slot that callers update on login/logout:
//!
//! ```ignore
//! use crestline_api::{ApiClient, RequestOverrides};
//!
//! let client: ApiClient<String> = ApiClient::builder("https://api.example.com")
//!     .secure_by_default(true)
//!     .security_resolver(|token: Option<String>| async move {
//!         Ok(token.map(|t| {
//!             RequestOverrides::new().header("Authorization", format!("Bearer {t}"))
//!         }))
//!     })
//!     .build()?;
//!
//! client.set_security_data(Some("session-token".into()));
//! ```
//!
//! # Cancellation
//!
//! Requests sharing one cancel token share one abort handle; aborting the
//! token cancels all of them:
//!
//! ```ignore
//! use crestline_api::CancelToken;
//!
//! let token = CancelToken::from("dashboard-load");
//! let pending = client.get("/account").cancel_token(token.clone()).send();
//!
//! // Elsewhere, e.g. when the view is torn down:
//! client.abort(&token);
//! ```

mod body;
mod cancel;
mod client;
mod compose;
mod error;
mod query;
mod request;
mod response;
mod transport;

pub use body::{Body, ContentType, EncodedBody, MultipartForm};
pub use cancel::{CancelSignal, CancelToken, CancellationRegistry};
pub use client::{ApiClient, ApiClientBuilder};
pub use compose::{RequestOverrides, SecurityResolver, merge};
pub use error::{ApiError, Result};
pub use query::{QueryParams, QueryValue, Scalar};
pub use request::{ApiRequest, ApiRequestBuilder, HttpMethod};
pub use response::{EnvelopeError, ParsedBody, ResponseEnvelope, ResponseFormat};
pub use transport::{HttpTransport, HttpTransportBuilder, HttpTransportConfig};

pub use body::encode as encode_body;
