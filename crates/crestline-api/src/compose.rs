//! Request composition: override layers, merge rules, and the security
//! resolver seam.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::response::ResponseFormat;

/// A partial request layer: client defaults, a per-call override, or the
/// security resolver's contribution.
///
/// Unset fields fall through to lower-precedence layers when merged.
#[derive(Clone, Debug, Default)]
pub struct RequestOverrides {
    /// Headers contributed by this layer.
    pub headers: http::HeaderMap,
    /// Whether the security resolver runs for this request.
    pub secure: Option<bool>,
    /// How to parse the response body.
    pub format: Option<ResponseFormat>,
    /// Per-request transport timeout.
    pub timeout: Option<Duration>,
}

impl RequestOverrides {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header to this layer. Invalid names or values are skipped.
    pub fn header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Set the secure flag for this layer.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Set the response parse format for this layer.
    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the transport timeout for this layer.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Merge the three override layers into one effective layer.
///
/// Precedence (highest wins): security > per-call > base, field by field.
/// Headers are the exception: the union of all three layers, with later
/// layers overwriting same-named keys.
pub fn merge(
    base: &RequestOverrides,
    call: &RequestOverrides,
    security: Option<&RequestOverrides>,
) -> RequestOverrides {
    let mut headers = base.headers.clone();
    for (name, value) in call.headers.iter() {
        headers.insert(name.clone(), value.clone());
    }
    if let Some(security) = security {
        for (name, value) in security.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
    }

    let security = security.cloned().unwrap_or_default();
    RequestOverrides {
        headers,
        secure: security.secure.or(call.secure).or(base.secure),
        format: security.format.or(call.format).or(base.format),
        timeout: security.timeout.or(call.timeout).or(base.timeout),
    }
}

/// Callback invoked for secure requests with the client's current
/// security data.
///
/// The resolver may suspend; its returned layer merges in at the highest
/// precedence. Returning `Ok(None)` contributes nothing, and an error
/// fails the call before anything is encoded or sent.
pub type SecurityResolver<S> =
    Arc<dyn Fn(Option<S>) -> BoxFuture<'static, Result<Option<RequestOverrides>>> + Send + Sync>;
