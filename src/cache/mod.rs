//! The cache partition store.
//!
//! Cached state is organized into named **partitions**, each a map from a normalized
//! request key to a stored response snapshot. Partition names embed the deployment
//! version token (`static-v3`, `dynamic-v3`, `api-v3`); the lifecycle manager creates
//! the static partition eagerly at install, the others appear lazily on first write,
//! and activation deletes every partition whose name does not belong to the current
//! version. There is no per-entry expiry in the store itself — freshness is the
//! strategies' business.
//!
//! Two invariants are enforced here rather than trusted to callers:
//!
//! * only `GET` requests produce cache keys, and
//! * only successful (`2xx`) responses are ever stored.

mod store;

pub use store::{CacheError, CacheKey, Partition, PartitionKind, PartitionStore, StoredResponse};
