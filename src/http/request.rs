//! HTTP requests.

use crate::backend::{Backend, SendError};
use crate::error::ensure;
use crate::http::body::Body;
use crate::http::response::Response;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use url::Url;

/// The resource type a request is fetching, as reported by the fetch event.
///
/// This is the `Request.destination` of the platform fetch API, trimmed down to the
/// classes the strategy selector distinguishes. Anything else maps to [`Other`].
///
/// [`Other`]: Destination::Other
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// A full document (top-level or iframe navigation).
    Document,
    /// An image resource.
    Image,
    /// A script resource.
    Script,
    /// A stylesheet.
    Style,
    /// A font resource.
    Font,
    /// Any other resource type.
    #[default]
    Other,
}

/// The mode of a request, as reported by the fetch event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// A full-page navigation.
    Navigate,
    /// A same-origin request.
    SameOrigin,
    /// A no-CORS request.
    NoCors,
    /// A CORS request.
    #[default]
    Cors,
}

/// The credentials mode applied when a request is sent to the network.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsMode {
    /// Send credentials only on same-origin requests.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
    /// Never send credentials.
    Omit,
}

/// An HTTP request, including body, headers, method, URL, and fetch metadata.
///
/// # Creation
///
/// Requests are normally handed to the [`Worker`][crate::Worker] by the embedding
/// environment, one per intercepted fetch event. They can also be created
/// programmatically:
///
/// - [`Request::new()`]
/// - [`Request::get()`]
///
/// # Builder-style methods
///
/// [`Request`] can be used as a builder, allowing requests to be constructed and used
/// through method chaining. Methods with the `with_` name prefix, such as
/// [`with_header()`][`Self::with_header()`], return `Self` to allow chaining. Setter
/// methods, prefixed by `set_`, can be mixed in when construction involves branches or
/// loops.
///
/// ```
/// use sw_cache::http::{Destination, Request};
/// let req = Request::get("https://reawakened.app/icons/spark.png")
///     .with_destination(Destination::Image)
///     .with_header("accept", "image/png");
/// assert_eq!(req.get_path(), "/icons/spark.png");
/// ```
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Body>,
    destination: Destination,
    mode: RequestMode,
    credentials: CredentialsMode,
}

impl Request {
    /// Create a new request with the given method and URL.
    ///
    /// # Panics
    ///
    /// Panics if the URL is invalid. Requests arriving from a fetch event always carry
    /// a valid absolute URL; use [`Url::parse()`] directly when handling untrusted
    /// input.
    pub fn new(method: Method, url: impl AsRef<str>) -> Self {
        let url = Url::parse(url.as_ref()).expect("invalid request URL");
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            destination: Destination::default(),
            mode: RequestMode::default(),
            credentials: CredentialsMode::default(),
        }
    }

    /// Create a new `GET` request with the given URL.
    ///
    /// # Panics
    ///
    /// Panics if the URL is invalid.
    pub fn get(url: impl AsRef<str>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a new `POST` request with the given URL.
    ///
    /// # Panics
    ///
    /// Panics if the URL is invalid.
    pub fn post(url: impl AsRef<str>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Get the HTTP method of this request.
    pub fn get_method(&self) -> &Method {
        &self.method
    }

    /// Set the HTTP method of this request.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Builder-style equivalent of [`set_method()`][Self::set_method()].
    pub fn with_method(mut self, method: Method) -> Self {
        self.set_method(method);
        self
    }

    /// Get the URL of this request.
    pub fn get_url(&self) -> &Url {
        &self.url
    }

    /// Get the URL of this request as a string.
    pub fn get_url_str(&self) -> &str {
        self.url.as_str()
    }

    /// Get the path component of this request's URL.
    pub fn get_path(&self) -> &str {
        self.url.path()
    }

    /// Get the host component of this request's URL, if any.
    pub fn get_host(&self) -> Option<&str> {
        self.url.host_str()
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

    /// Get a shared reference to the headers of this request.
    pub fn get_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the destination (resource type) of this request.
    pub fn get_destination(&self) -> Destination {
        self.destination
    }

    /// Set the destination (resource type) of this request.
    pub fn set_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    /// Builder-style equivalent of [`set_destination()`][Self::set_destination()].
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.set_destination(destination);
        self
    }

    /// Get the mode of this request.
    pub fn get_mode(&self) -> RequestMode {
        self.mode
    }

    /// Set the mode of this request.
    pub fn set_mode(&mut self, mode: RequestMode) {
        self.mode = mode;
    }

    /// Builder-style equivalent of [`set_mode()`][Self::set_mode()].
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.set_mode(mode);
        self
    }

    /// Get the credentials mode of this request.
    pub fn get_credentials(&self) -> CredentialsMode {
        self.credentials
    }

    /// Set the credentials mode applied when this request is sent to the network.
    pub fn set_credentials(&mut self, credentials: CredentialsMode) {
        self.credentials = credentials;
    }

    /// Builder-style equivalent of [`set_credentials()`][Self::set_credentials()].
    pub fn with_credentials(mut self, credentials: CredentialsMode) -> Self {
        self.set_credentials(credentials);
        self
    }

    /// Return whether this request is a full-page navigation.
    ///
    /// A request is a navigation when its mode is `navigate`, or when its destination
    /// is a document (some environments report one but not the other).
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate || self.destination == Destination::Document
    }

    /// Set the body of this request.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = Some(body.into());
    }

    /// Builder-style equivalent of [`set_body()`][Self::set_body()].
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.set_body(body);
        self
    }

    /// Return whether this request has a body.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Take and return the body from this request, leaving it bodiless.
    pub fn take_body(&mut self) -> Body {
        self.body.take().unwrap_or_default()
    }

    /// Send this request to the network through the given backend.
    ///
    /// An `Err` here means the exchange itself failed (DNS, connection, abort); a
    /// response with an HTTP error status is an `Ok` like any other.
    pub fn send(self, backend: &impl Backend) -> Result<Response, SendError> {
        backend.send(&self)
    }
}

/// Check whether a request looks suitable for sending to a backend.
///
/// Note that this is *not* meant to be a filter for things that could cause security
/// issues, it is only meant to catch errors early in order to yield friendlier error
/// messages.
pub fn validate_request(req: &Request) -> Result<(), crate::error::Error> {
    let scheme_ok = req.url.scheme().eq_ignore_ascii_case("http")
        || req.url.scheme().eq_ignore_ascii_case("https");
    ensure!(
        scheme_ok && req.url.has_authority(),
        "request URLs must have a scheme (http/https) and an authority (host)"
    );
    Ok(())
}
