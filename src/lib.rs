// Warnings (other than unused variables) in doctests are promoted to errors.
#![doc(test(attr(deny(warnings))))]
#![doc(test(attr(allow(dead_code))))]
#![doc(test(attr(allow(unused_variables))))]
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::invalid_codeblock_attributes)]

//! # Offline cache manager for PWA service workers.
//!
//! This crate implements the caching core that sits between a controlled page and the
//! network: every intercepted fetch is classified into a request class, routed to a
//! caching strategy (Cache-First, Network-First, or Stale-While-Revalidate), and served
//! from named, versioned cache partitions that are pre-warmed at install time and
//! garbage-collected at activate time.
//!
//! The crate is host-agnostic. The embedding environment supplies the network through
//! the [`Backend`] trait and drives the [`Worker`] with its fetch, install, activate,
//! and message events; everything else — partition bookkeeping, strategy selection,
//! offline fallbacks, lifecycle state — lives here.
//!
//! A minimal embedding looks like this:
//!
//! ```no_run
//! use sw_cache::{Backend, CacheConfig, Request, Worker};
//! # fn network() -> impl Backend { struct N; impl sw_cache::Backend for N {
//! #     fn send(&self, _: &sw_cache::Request) -> Result<sw_cache::Response, sw_cache::backend::SendError> { unimplemented!() }
//! # } N }
//!
//! let mut worker = Worker::new(CacheConfig::default(), network());
//! worker.install().unwrap();
//! worker.activate().unwrap();
//!
//! let outcome = worker
//!     .handle_fetch(Request::get("https://reawakened.app/api/sparks/today"))
//!     .unwrap();
//! // respond to the page with `outcome.response`, then let the
//! // revalidation task (if any) run before the event is settled:
//! if let Some(task) = outcome.revalidation {
//!     worker.revalidate(task);
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod worker;

pub use crate::backend::Backend;
#[doc(inline)]
pub use crate::cache::PartitionStore;
#[doc(inline)]
pub use crate::classify::{classify, Decision, Strategy};
#[doc(inline)]
pub use crate::config::CacheConfig;
#[doc(inline)]
pub use crate::error::Error;
#[doc(inline)]
pub use crate::http::{Body, Request, Response};
#[doc(inline)]
pub use crate::lifecycle::{Message, Phase};
#[doc(inline)]
pub use crate::worker::{FetchOutcome, Worker};
