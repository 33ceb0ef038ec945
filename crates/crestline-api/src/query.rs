//! Query string encoding.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::{ApiError, Result};

/// Characters percent-encoded in query keys and values.
///
/// Matches the unreserved set of `encodeURIComponent`: alphanumerics plus
/// `- _ . ! ~ * ' ( )` stay literal, everything else is escaped.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A single query parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// A text value, emitted as-is (percent-encoded).
    Text(String),
    /// A numeric value, serialized in decimal form.
    Number(serde_json::Number),
    /// A boolean value, serialized as `true`/`false`.
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

/// A query parameter value: a single scalar or a list of scalars.
///
/// List values expand to one `key=value` pair per element.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryValue {
    /// A single `key=value` pair.
    Single(Scalar),
    /// One `key=value` pair per element.
    List(Vec<Scalar>),
}

impl QueryValue {
    /// Build a list value from any iterable of scalars.
    pub fn list<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Scalar>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Scalar> for QueryValue {
    fn from(value: Scalar) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Single(value.into())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Single(value.into())
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Single(value.into())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Single(value.into())
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        Self::Single(value.into())
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        Self::Single(value.into())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        Self::Single(value.into())
    }
}

/// An ordered collection of query parameters.
///
/// Pairs encode in insertion order. Keys pushed with an absent value are
/// skipped entirely rather than emitted as empty pairs.
///
/// # Example
///
/// ```ignore
/// let query = QueryParams::new()
///     .push("q", "rust client")
///     .push("limit", 100i64)
///     .push_opt("offset", None::<i64>);
///
/// assert_eq!(query.encode(), "q=rust%20client&limit=100");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, QueryValue)>,
}

impl QueryParams {
    /// Create an empty parameter collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn push(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Append a parameter only when a value is present.
    pub fn push_opt<V: Into<QueryValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.push(key, value),
            None => self,
        }
    }

    /// Check whether no parameters were collected.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Get the number of collected pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterate over the collected pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, QueryValue)> {
        self.pairs.iter()
    }

    /// Encode the parameters into a query string.
    ///
    /// Returns an empty string when no pairs qualify; the caller prefixes
    /// `?` only when the result is non-empty.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.pairs {
            match value {
                QueryValue::Single(scalar) => append_pair(&mut out, key, scalar),
                QueryValue::List(scalars) => {
                    for scalar in scalars {
                        append_pair(&mut out, key, scalar);
                    }
                }
            }
        }
        out
    }
}

fn append_pair(out: &mut String, key: &str, value: &Scalar) {
    if !out.is_empty() {
        out.push('&');
    }
    out.push_str(&utf8_percent_encode(key, QUERY_ENCODE_SET).to_string());
    out.push('=');
    out.push_str(&utf8_percent_encode(&value.to_string(), QUERY_ENCODE_SET).to_string());
}

impl TryFrom<serde_json::Value> for QueryParams {
    type Error = ApiError;

    /// Build parameters from a JSON object.
    ///
    /// `Null` entries are skipped (the absent-value rule). Array entries
    /// become list values; nested objects are rejected.
    fn try_from(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(ApiError::Encode(
                "query parameters must be a JSON object".to_string(),
            ));
        };

        let mut params = QueryParams::new();
        for (key, entry) in map {
            match entry {
                serde_json::Value::Null => {}
                serde_json::Value::Array(items) => {
                    let scalars = items
                        .into_iter()
                        .map(json_scalar)
                        .collect::<Result<Vec<_>>>()?;
                    params = params.push(key, QueryValue::List(scalars));
                }
                other => {
                    params = params.push(key, QueryValue::Single(json_scalar(other)?));
                }
            }
        }
        Ok(params)
    }
}

fn json_scalar(value: serde_json::Value) -> Result<Scalar> {
    match value {
        serde_json::Value::String(s) => Ok(Scalar::Text(s)),
        serde_json::Value::Number(n) => Ok(Scalar::Number(n)),
        serde_json::Value::Bool(b) => Ok(Scalar::Bool(b)),
        other => Err(ApiError::Encode(format!(
            "query value must be a scalar, got {other}"
        ))),
    }
}
