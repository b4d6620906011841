//! HTTP requests, responses, and bodies.
//!
//! These types deliberately mirror the surface a service worker sees: a [`Request`]
//! carries not just method, URL, and headers, but also the fetch metadata the strategy
//! selector keys on — [`Destination`], [`RequestMode`], and [`CredentialsMode`].

pub mod body;
pub mod request;
pub mod response;

pub use self::body::Body;
pub use self::request::{CredentialsMode, Destination, Request, RequestMode};
pub use self::response::Response;

#[doc(no_inline)]
pub use http::header::{self, HeaderMap, HeaderName, HeaderValue};
#[doc(no_inline)]
pub use http::{Method, StatusCode};
#[doc(no_inline)]
pub use url::Url;
