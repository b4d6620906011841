//! The network boundary.
//!
//! A [`Backend`] is whatever actually performs a network exchange on behalf of the
//! worker — in a browser host this is the real `fetch`, in tests a scripted fake. The
//! cache layer only ever talks to the network through this trait, which is what lets
//! every strategy be exercised with the network "unplugged".
//!
//! The error contract matters more than the trait itself: [`SendError`] models the
//! exchange *failing* (DNS, connection refused, abort). A response that arrives with an
//! HTTP error status is a successful send, is returned as `Ok`, and is handled by the
//! strategies as a pass-through, never as a cache-layer error.

use crate::http::{Request, Response};
use crate::error::Error;
use std::fmt;

/// A destination that can carry out network exchanges for the worker.
///
/// Implementations should be cheap to call repeatedly; the worker holds exactly one
/// backend for its whole lifetime and sends every non-bypassed network fetch through
/// it, with the request's credentials mode already applied.
pub trait Backend {
    /// Perform the exchange, returning the response or the reason the exchange itself
    /// failed.
    fn send(&self, req: &Request) -> Result<Response, SendError>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn send(&self, req: &Request) -> Result<Response, SendError> {
        (**self).send(req)
    }
}

/// The reason a network exchange failed.
///
/// These map onto the failure classes a browser fetch can reject with. There is
/// deliberately no variant for HTTP error statuses; those are responses, not send
/// failures.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SendErrorCause {
    /// The destination host could not be resolved.
    Dns,
    /// A connection could not be established, or was dropped before a complete
    /// response could be read.
    Connection,
    /// The exchange was aborted before completion.
    Aborted,
    /// All other errors.
    Generic(Error),
}

impl fmt::Display for SendErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SendErrorCause::Dns => {
                write!(f, "host could not be resolved")
            }
            SendErrorCause::Connection => {
                write!(f, "connection failed or closed early")
            }
            SendErrorCause::Aborted => {
                write!(f, "exchange was aborted")
            }
            SendErrorCause::Generic(e) => {
                write!(f, "generic send error: {}", e)
            }
        }
    }
}

/// An error that occurred while sending a request.
///
/// The URL of the failed request is retained so that fallback handling and logging can
/// name what failed without holding the request itself.
#[derive(Debug, thiserror::Error)]
#[error("error sending request to {url}: {error}")]
pub struct SendError {
    url: String,
    #[source]
    error: SendErrorCause,
}

impl SendError {
    /// Create a `SendError` for the given request URL and underlying cause.
    pub fn new(url: impl Into<String>, error: SendErrorCause) -> Self {
        SendError {
            url: url.into(),
            error,
        }
    }

    /// Get the URL of the request that failed.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Get the underlying cause of this `SendError`.
    pub fn root_cause(&self) -> &SendErrorCause {
        &self.error
    }
}
