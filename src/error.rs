//! Error-handling utilities.

pub use crate::backend::{SendError, SendErrorCause};
pub use crate::cache::CacheError;
pub use crate::lifecycle::LifecycleError;
pub use anyhow::{anyhow, bail, ensure, Context, Error};
