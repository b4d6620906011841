use crate::config::StoreLimits;
use crate::http::{Request, Response};
use bytes::Bytes;
use http::header::HeaderMap;
use http::{Method, StatusCode};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// The logical role of a partition, independent of the version token in its name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PartitionKind {
    /// Shell assets: scripts, styles, fonts, documents, the offline page.
    Static,
    /// Lazily cached assets, mostly images.
    Dynamic,
    /// API response snapshots for offline fallback.
    Api,
}

impl PartitionKind {
    /// The name stem this kind contributes to a partition name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Dynamic => "dynamic",
            PartitionKind::Api => "api",
        }
    }
}

/// Errors arising from cache operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CacheError {
    /// Operation failed due to a limit (partition entry count or body size).
    ///
    /// This is the crate's stand-in for the host running out of storage quota.
    #[error("cache operation failed due to a limit")]
    LimitExceeded,
    /// The request or response is not eligible for caching.
    ///
    /// Non-`GET` requests never produce keys, and non-`2xx` responses are never
    /// stored.
    #[error("request or response is not cacheable")]
    NotCacheable,
}

/// A normalized cache key: method plus URL with the fragment stripped.
///
/// Two requests for the same resource must collide here even if one carries a
/// fragment, since fragments never reach the network. The query string is kept — it
/// addresses distinct API resources.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    url: String,
}

impl CacheKey {
    /// Build the cache key for a request.
    ///
    /// Returns [`CacheError::NotCacheable`] for non-`GET` requests; they must never
    /// reach a partition.
    pub fn for_request(req: &Request) -> Result<Self, CacheError> {
        if req.get_method() != Method::GET {
            return Err(CacheError::NotCacheable);
        }
        let mut url = req.get_url().clone();
        url.set_fragment(None);
        Ok(Self {
            method: Method::GET,
            url: url.into(),
        })
    }

    /// The normalized URL this key addresses.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A stored response snapshot: status, headers, body bytes, and insertion time.
#[derive(Clone, Debug)]
pub struct StoredResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    stored_at: Instant,
}

impl StoredResponse {
    /// Snapshot a response for storage.
    ///
    /// Only successful (`2xx`) responses may be snapshotted; anything else is
    /// [`CacheError::NotCacheable`].
    pub fn snapshot(resp: &Response) -> Result<Self, CacheError> {
        if !resp.is_success() {
            return Err(CacheError::NotCacheable);
        }
        Ok(Self {
            status: resp.get_status(),
            headers: resp.get_headers().clone(),
            body: Bytes::copy_from_slice(resp.get_body_bytes()),
            stored_at: Instant::now(),
        })
    }

    /// Re-materialize the snapshot as a response.
    pub fn to_response(&self) -> Response {
        let mut resp = Response::from_status(self.status);
        *resp.get_headers_mut() = self.headers.clone();
        resp.set_body(self.body.clone());
        resp
    }

    /// The size in bytes of the stored body.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// How long ago this snapshot was stored.
    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }
}

/// A single named partition: request key to stored response.
#[derive(Debug)]
pub struct Partition {
    name: String,
    entries: HashMap<CacheKey, StoredResponse>,
}

impl Partition {
    fn new(name: String) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    /// The full (versioned) name of this partition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a stored response by key.
    pub fn lookup(&self, key: &CacheKey) -> Option<&StoredResponse> {
        self.entries.get(key)
    }

    /// Return whether the partition holds an entry for the key.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// The number of entries in this partition.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether this partition is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store a snapshot of the response under the key.
    ///
    /// Overwrites any existing entry for the key (last write wins; entries are
    /// idempotent snapshots of the same logical resource). Fails with
    /// [`CacheError::LimitExceeded`] when the partition is full or the body is over
    /// the size bound, and with [`CacheError::NotCacheable`] for non-`2xx` responses.
    pub fn insert(
        &mut self,
        key: CacheKey,
        resp: &Response,
        limits: &StoreLimits,
    ) -> Result<(), CacheError> {
        let snapshot = StoredResponse::snapshot(resp)?;
        if snapshot.body_len() > limits.max_body_bytes {
            return Err(CacheError::LimitExceeded);
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= limits.max_entries_per_partition
        {
            return Err(CacheError::LimitExceeded);
        }
        self.entries.insert(key, snapshot);
        Ok(())
    }
}

/// The set of partitions held by one worker instance.
///
/// Partitions are created lazily on first open and destroyed only by
/// [`delete()`][Self::delete] — which the activate step drives for every name that
/// does not belong to the current version.
#[derive(Debug)]
pub struct PartitionStore {
    partitions: HashMap<String, Partition>,
    limits: StoreLimits,
}

impl PartitionStore {
    /// Create an empty store with the given limits.
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            partitions: HashMap::new(),
            limits,
        }
    }

    /// Open a partition by name, creating it if it does not exist.
    pub fn open(&mut self, name: &str) -> &mut Partition {
        self.partitions
            .entry(name.to_string())
            .or_insert_with(|| Partition::new(name.to_string()))
    }

    /// Get a partition by name, if it exists.
    pub fn get(&self, name: &str) -> Option<&Partition> {
        self.partitions.get(name)
    }

    /// Look up a stored response in the named partition.
    ///
    /// A missing partition is just a miss.
    pub fn lookup(&self, name: &str, key: &CacheKey) -> Option<&StoredResponse> {
        self.partitions.get(name).and_then(|p| p.lookup(key))
    }

    /// Store a snapshot of the response in the named partition, creating the partition
    /// if needed.
    pub fn insert(
        &mut self,
        name: &str,
        key: CacheKey,
        resp: &Response,
    ) -> Result<(), CacheError> {
        let limits = self.limits;
        self.open(name).insert(key, resp, &limits)
    }

    /// The names of all existing partitions.
    pub fn names(&self) -> Vec<String> {
        self.partitions.keys().cloned().collect()
    }

    /// Delete the named partition and everything in it. Returns whether it existed.
    pub fn delete(&mut self, name: &str) -> bool {
        self.partitions.remove(name).is_some()
    }

    /// Return whether any partition holds an entry for the key.
    ///
    /// Useful for asserting the negative — that an auth exchange left no trace
    /// anywhere.
    pub fn contains_anywhere(&self, key: &CacheKey) -> bool {
        self.partitions.values().any(|p| p.contains(key))
    }
}
