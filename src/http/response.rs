//! HTTP responses.

use crate::http::body::Body;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{StatusCode, Version};
use mime::Mime;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An HTTP response, including body, headers, and status code.
///
/// # Creation and conversion
///
/// Responses come back from backend sends ([`Request::send()`][crate::Request::send]),
/// are re-materialized from cache partitions, or are created programmatically:
///
/// - [`Response::new()`]
/// - [`Response::from_body()`]
/// - [`Response::from_status()`]
///
/// The offline strategies also synthesize responses directly, so that a failed fetch
/// always resolves to *something* rather than a raised error:
///
/// - [`Response::not_found()`] — Cache-First miss with the network down.
/// - [`Response::offline_json()`] — Network-First API failure with no cached entry.
/// - [`Response::offline_page()`] — navigation failure with nothing cached at all.
///
/// # Builder-style methods
///
/// [`Response`] can be used as a builder; `with_`-prefixed methods return `Self` for
/// chaining, and `set_`-prefixed setters can be mixed in freely.
///
/// ```
/// # use sw_cache::Response;
/// let resp = Response::new()
///     .with_header("x-spark", "daily")
///     .with_body("rise and shine");
/// assert!(resp.is_success());
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    version: Version,
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Body>,
}

impl Response {
    /// Create a new [`Response`].
    ///
    /// The new response is created with status code `200 OK`, no headers, and an empty
    /// body.
    pub fn new() -> Self {
        Self {
            version: Version::HTTP_11,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a new [`Response`] with the given value as the body.
    pub fn from_body(body: impl Into<Body>) -> Self {
        Self::new().with_body(body)
    }

    /// Create a new response with the given status code.
    ///
    /// ```
    /// # use sw_cache::Response;
    /// use sw_cache::http::StatusCode;
    /// let resp = Response::from_status(StatusCode::NOT_FOUND);
    /// assert_eq!(resp.get_status().as_u16(), 404);
    /// ```
    pub fn from_status(status: StatusCode) -> Self {
        Self::new().with_status(status)
    }

    /// Create the synthetic `404 Not Found` returned when a Cache-First lookup misses
    /// and the network fetch fails.
    ///
    /// A stale or missing image resolves to this rather than raising, so the page never
    /// sees a rejected fetch for a cacheable asset.
    pub fn not_found() -> Self {
        Self::from_status(StatusCode::NOT_FOUND)
            .with_body_text_plain("not found")
    }

    /// Create the synthetic `503` JSON error returned when a Network-First API fetch
    /// fails and no cached entry exists.
    ///
    /// The body is the machine-readable `{"error":"offline"}` the frontend's query
    /// layer keys on.
    pub fn offline_json() -> Self {
        Self::from_status(StatusCode::SERVICE_UNAVAILABLE)
            .with_body_json(&serde_json::json!({ "error": "offline" }))
            .expect("static JSON body serializes")
    }

    /// Create the synthetic offline document returned when a navigation fails and
    /// neither the exact page, the offline fallback document, nor the root document is
    /// cached.
    pub fn offline_page() -> Self {
        let mut resp = Self::from_status(StatusCode::SERVICE_UNAVAILABLE);
        resp.set_content_type(mime::TEXT_HTML_UTF_8);
        resp.set_body("<!doctype html><title>Offline</title><p>You appear to be offline.</p>");
        resp
    }

    /// Make a new response with the same headers, status, and version of this response,
    /// but no body.
    pub fn clone_without_body(&self) -> Response {
        Self {
            version: self.version,
            status: self.status,
            headers: self.headers.clone(),
            body: None,
        }
    }

    /// Clone this response, including its body.
    ///
    /// Bodies are fully buffered, so unlike a streaming implementation this does not
    /// consume anything from the original.
    pub fn clone_with_body(&self) -> Response {
        self.clone()
    }

    /// Get the HTTP version of this response.
    pub fn get_version(&self) -> Version {
        self.version
    }

    /// Get the status code of this response.
    pub fn get_status(&self) -> StatusCode {
        self.status
    }

    /// Set the status code of this response.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Builder-style equivalent of [`set_status()`][Self::set_status()].
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.set_status(status);
        self
    }

    /// Return whether the status code of this response is a `2xx` success.
    ///
    /// This is the gate the cache layer applies before storing anything: only
    /// successful responses are ever written to a partition.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get a header value as a string, if it is present and valid UTF-8.
    pub fn get_header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Set a header to the given value, discarding any previous values for that name.
    ///
    /// # Panics
    ///
    /// Panics if the name or value is not a valid header name or value.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        let name: HeaderName = name.as_ref().parse().expect("invalid header name");
        let value: HeaderValue = value.as_ref().parse().expect("invalid header value");
        self.headers.insert(name, value);
    }

    /// Builder-style equivalent of [`set_header()`][Self::set_header()].
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Get a shared reference to the headers of this response.
    pub fn get_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the headers of this response.
    pub fn get_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the `Content-Type` of this response as a [`Mime`], if it is present and
    /// valid.
    pub fn get_content_type(&self) -> Option<Mime> {
        self.get_header_str(header::CONTENT_TYPE.as_str())
            .and_then(|v| v.parse().ok())
    }

    /// Set the `Content-Type` header of this response.
    pub fn set_content_type(&mut self, mime: Mime) {
        self.set_header(header::CONTENT_TYPE.as_str(), mime.as_ref());
    }

    /// Builder-style equivalent of [`set_content_type()`][Self::set_content_type()].
    pub fn with_content_type(mut self, mime: Mime) -> Self {
        self.set_content_type(mime);
        self
    }

    /// Set the body of this response.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = Some(body.into());
    }

    /// Builder-style equivalent of [`set_body()`][Self::set_body()].
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.set_body(body);
        self
    }

    /// Set the body to a `text/plain; charset=utf-8` string.
    pub fn set_body_text_plain(&mut self, body: &str) {
        self.set_body(body);
        self.set_content_type(mime::TEXT_PLAIN_UTF_8);
    }

    /// Builder-style equivalent of [`set_body_text_plain()`][Self::set_body_text_plain()].
    pub fn with_body_text_plain(mut self, body: &str) -> Self {
        self.set_body_text_plain(body);
        self
    }

    /// Set the body to the JSON serialization of the given value, and the
    /// `Content-Type` to `application/json`.
    pub fn set_body_json(&mut self, value: &impl Serialize) -> Result<(), serde_json::Error> {
        self.set_body(serde_json::to_vec(value)?);
        self.set_content_type(mime::APPLICATION_JSON);
        Ok(())
    }

    /// Builder-style equivalent of [`set_body_json()`][Self::set_body_json()].
    pub fn with_body_json(mut self, value: &impl Serialize) -> Result<Self, serde_json::Error> {
        self.set_body_json(value)?;
        Ok(self)
    }

    /// Take the body from this response and deserialize it from JSON.
    pub fn take_body_json<T: DeserializeOwned>(&mut self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.take_body().into_bytes())
    }

    /// Return whether this response has a body.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Borrow the body's bytes, or an empty slice if there is no body.
    pub fn get_body_bytes(&self) -> &[u8] {
        self.body.as_ref().map(Body::as_bytes).unwrap_or(&[])
    }

    /// Take and return the body from this response, leaving it bodiless.
    pub fn take_body(&mut self) -> Body {
        self.body.take().unwrap_or_default()
    }

    /// Consume the response and return its body as a byte vector.
    pub fn into_body_bytes(self) -> Vec<u8> {
        self.body.map(Body::into_bytes).unwrap_or_default()
    }

    /// Consume the response and return its body as a `String`.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid UTF-8.
    pub fn into_body_str(self) -> String {
        self.body.map(Body::into_string).unwrap_or_default()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
