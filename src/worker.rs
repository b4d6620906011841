//! The worker: fetch-event handling and the caching strategies.
//!
//! One [`Worker`] instance corresponds to one installed service-worker version. The
//! host dispatches events into it — [`install()`][Worker::install],
//! [`activate()`][Worker::activate], [`handle_message()`][Worker::handle_message] (all
//! in [`lifecycle`][crate::lifecycle]), and [`handle_fetch()`][Worker::handle_fetch]
//! here. Handlers take `&mut self`: the worker is single-threaded and event-driven,
//! and a race between two writers of the same key is resolved by last-write-wins,
//! which is acceptable because entries are idempotent snapshots of the same logical
//! resource.
//!
//! A fetch resolves to a [`FetchOutcome`]: the response for the page, plus an optional
//! [`Revalidation`] task. The task is the crate's explicit analog of `waitUntil` — the
//! event is not fully handled until the host has driven it through
//! [`Worker::revalidate()`], but the page gets its response first.

use crate::backend::{Backend, SendError};
use crate::cache::{CacheKey, PartitionStore};
use crate::classify::{classify, Decision, Strategy};
use crate::config::CacheConfig;
use crate::http::{CredentialsMode, Request, Response};
use crate::lifecycle::Phase;
use log::{debug, warn};

/// The result of handling a fetch event.
#[derive(Debug)]
pub struct FetchOutcome {
    /// The response to hand to the page.
    pub response: Response,
    /// Background work the host must drive before the event is settled, if any.
    ///
    /// Only Stale-While-Revalidate produces one.
    pub revalidation: Option<Revalidation>,
}

impl FetchOutcome {
    fn done(response: Response) -> Self {
        Self {
            response,
            revalidation: None,
        }
    }
}

/// A pending background revalidation for a cache entry.
///
/// Returned inside a [`FetchOutcome`] when a stale entry was served; the host passes
/// it to [`Worker::revalidate()`] after responding to the page. Dropping it instead is
/// harmless — the stale entry simply stays until the next fetch.
#[derive(Debug)]
pub struct Revalidation {
    key: CacheKey,
    partition: String,
    request: Request,
}

impl Revalidation {
    /// The URL being revalidated.
    pub fn url(&self) -> &str {
        self.key.url()
    }
}

/// A service worker's offline cache manager.
///
/// Holds the partition store, the deployment configuration, and the one [`Backend`]
/// all network traffic goes through.
pub struct Worker<B> {
    pub(crate) config: CacheConfig,
    pub(crate) store: PartitionStore,
    pub(crate) backend: B,
    pub(crate) phase: Phase,
    pub(crate) wants_activation: bool,
}

impl<B: Backend> Worker<B> {
    /// Create a worker for the given deployment configuration.
    ///
    /// The worker starts in [`Phase::Installing`]; the host should dispatch
    /// [`install()`][Worker::install] next.
    pub fn new(config: CacheConfig, backend: B) -> Self {
        let store = PartitionStore::new(config.limits);
        Self {
            config,
            store,
            backend,
            phase: Phase::Installing,
            wants_activation: false,
        }
    }

    /// The deployment configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The partition store.
    pub fn store(&self) -> &PartitionStore {
        &self.store
    }

    /// Handle an intercepted fetch event.
    ///
    /// Classification happens first, before any I/O; the request is then either passed
    /// through (bypass) or handled by its strategy. Every cached strategy resolves
    /// without error — offline failures become cached fallbacks or synthetic
    /// responses. An `Err` can only come out of the two pure pass-through paths (a
    /// bypassed request, or Stale-While-Revalidate on a completely cold cache), where
    /// the page would have seen the same network failure with no worker at all.
    pub fn handle_fetch(&mut self, req: Request) -> Result<FetchOutcome, SendError> {
        match classify(&req, &self.config) {
            Decision::Bypass => self.backend.send(&req).map(FetchOutcome::done),
            Decision::Use {
                strategy,
                partition,
            } => {
                let key = match CacheKey::for_request(&req) {
                    Ok(key) => key,
                    // Unreachable while rule 1 of the table holds; pass through rather
                    // than panic if it ever stops holding.
                    Err(_) => return self.backend.send(&req).map(FetchOutcome::done),
                };
                let partition = self.config.partition_name(partition);
                match strategy {
                    Strategy::CacheFirst => Ok(self.cache_first(req, key, partition)),
                    Strategy::NetworkFirst => Ok(self.network_first(req, key, partition)),
                    Strategy::NetworkFirstOffline => {
                        Ok(self.network_first_offline(req, key, partition))
                    }
                    Strategy::StaleWhileRevalidate => {
                        self.stale_while_revalidate(req, key, partition)
                    }
                }
            }
        }
    }

    /// Drive a pending revalidation to completion.
    ///
    /// On a successful (`2xx`) fetch the partition entry is overwritten for next time;
    /// on an HTTP error or a network failure the existing entry is silently kept.
    pub fn revalidate(&mut self, task: Revalidation) {
        let Revalidation {
            key,
            partition,
            request,
        } = task;
        match self.backend.send(&request) {
            Ok(resp) if resp.is_success() => {
                self.store_swallowing(&partition, key, &resp);
            }
            Ok(resp) => {
                debug!(
                    "revalidation of {} got HTTP {}; keeping cached entry",
                    request.get_url_str(),
                    resp.get_status()
                );
            }
            Err(err) => {
                debug!("revalidation of {} failed: {}", request.get_url_str(), err);
            }
        }
    }

    /// Cache-First: a hit is returned with zero network calls; a miss is fetched and
    /// stored; a miss with the network down becomes a synthetic 404.
    fn cache_first(&mut self, req: Request, key: CacheKey, partition: String) -> FetchOutcome {
        if let Some(found) = self.store.lookup(&partition, &key) {
            return FetchOutcome::done(found.to_response());
        }
        match self.backend.send(&req) {
            Ok(resp) => {
                if resp.is_success() {
                    self.store_swallowing(&partition, key, &resp);
                }
                FetchOutcome::done(resp)
            }
            Err(err) => {
                debug!("cache-first fetch of {} failed: {}", req.get_url_str(), err);
                FetchOutcome::done(Response::not_found())
            }
        }
    }

    /// Network-First for API calls: live responses win; a network failure falls back
    /// to the cached snapshot, then to the synthetic offline JSON error. HTTP errors
    /// pass through untouched and uncached.
    fn network_first(&mut self, req: Request, key: CacheKey, partition: String) -> FetchOutcome {
        // Session cookies must accompany the call even though the cache is bypassed on
        // the way out.
        let outgoing = req.with_credentials(CredentialsMode::Include);
        match self.backend.send(&outgoing) {
            Ok(resp) => {
                if resp.is_success() {
                    self.store_swallowing(&partition, key, &resp);
                }
                FetchOutcome::done(resp)
            }
            Err(err) => {
                debug!(
                    "network-first fetch of {} failed: {}",
                    outgoing.get_url_str(),
                    err
                );
                match self.store.lookup(&partition, &key) {
                    Some(found) => FetchOutcome::done(found.to_response()),
                    None => FetchOutcome::done(Response::offline_json()),
                }
            }
        }
    }

    /// Network-First for navigations, with the three-level fallback chain: the exact
    /// cached page, the offline fallback document, the cached root document. The user
    /// always sees *something*.
    fn network_first_offline(
        &mut self,
        req: Request,
        key: CacheKey,
        partition: String,
    ) -> FetchOutcome {
        match self.backend.send(&req) {
            Ok(resp) => {
                if resp.is_success() {
                    self.store_swallowing(&partition, key, &resp);
                }
                FetchOutcome::done(resp)
            }
            Err(err) => {
                debug!("navigation fetch of {} failed: {}", req.get_url_str(), err);
                let fallbacks = [
                    key,
                    self.app_path_key(&self.config.offline_page),
                    self.app_path_key(&self.config.root_document),
                ];
                for fallback in &fallbacks {
                    if let Some(found) = self.store.lookup(&partition, fallback) {
                        return FetchOutcome::done(found.to_response());
                    }
                }
                FetchOutcome::done(Response::offline_page())
            }
        }
    }

    /// Stale-While-Revalidate: a cached entry is returned immediately, with the
    /// refresh handed back as a [`Revalidation`] task; a cold cache degrades to a
    /// plain network fetch.
    ///
    /// The per-path max-age table acts as a revalidation damper: an entry younger than
    /// its configured max-age is served without scheduling a refresh at all.
    fn stale_while_revalidate(
        &mut self,
        req: Request,
        key: CacheKey,
        partition: String,
    ) -> Result<FetchOutcome, SendError> {
        if let Some(found) = self.store.lookup(&partition, &key) {
            let fresh = self
                .config
                .max_age_for(req.get_path())
                .is_some_and(|max_age| found.age() < max_age);
            let response = found.to_response();
            let revalidation = if fresh {
                None
            } else {
                Some(Revalidation {
                    key,
                    partition,
                    request: req,
                })
            };
            return Ok(FetchOutcome {
                response,
                revalidation,
            });
        }
        // Cold cache: network-only, and the caller sees the network's own outcome.
        let resp = self.backend.send(&req)?;
        if resp.is_success() {
            self.store_swallowing(&partition, key, &resp);
        }
        Ok(FetchOutcome::done(resp))
    }

    /// Store a snapshot, swallowing (but logging) write failures: a response the store
    /// refuses is still a perfectly good response for the page.
    pub(crate) fn store_swallowing(&mut self, partition: &str, key: CacheKey, resp: &Response) {
        let url = key.url().to_string();
        if let Err(err) = self.store.insert(partition, key, resp) {
            warn!("failed to cache {} in {}: {}", url, partition, err);
        }
    }

    fn app_path_key(&self, path: &str) -> CacheKey {
        CacheKey::for_request(&Request::get(self.config.absolute_url(path)))
            .expect("GET requests always produce cache keys")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SendErrorCause;
    use crate::cache::PartitionKind;
    use crate::http::{Destination, RequestMode};
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, VecDeque};

    /// A scripted network: per-URL response queues, a global offline switch, and a
    /// record of every exchange that went out.
    #[derive(Default)]
    struct MockBackend {
        routes: RefCell<HashMap<String, VecDeque<Response>>>,
        offline: Cell<bool>,
        sent: RefCell<Vec<String>>,
        last_credentials: Cell<Option<CredentialsMode>>,
    }

    impl MockBackend {
        fn route(&self, url: &str, resp: Response) {
            self.routes
                .borrow_mut()
                .entry(url.to_string())
                .or_default()
                .push_back(resp);
        }

        fn set_offline(&self, offline: bool) {
            self.offline.set(offline);
        }

        fn sent_count(&self) -> usize {
            self.sent.borrow().len()
        }

        fn sent_count_for(&self, url: &str) -> usize {
            self.sent.borrow().iter().filter(|u| *u == url).count()
        }
    }

    impl Backend for MockBackend {
        fn send(&self, req: &Request) -> Result<Response, SendError> {
            let url = req.get_url_str().to_string();
            self.sent.borrow_mut().push(url.clone());
            self.last_credentials.set(Some(req.get_credentials()));
            if self.offline.get() {
                return Err(SendError::new(url, SendErrorCause::Connection));
            }
            let mut routes = self.routes.borrow_mut();
            let queue = routes
                .get_mut(&url)
                .unwrap_or_else(|| panic!("no route for {}", url));
            if queue.len() > 1 {
                Ok(queue.pop_front().unwrap())
            } else {
                Ok(queue.front().expect("route queue is empty").clone())
            }
        }
    }

    fn worker_with(backend: &MockBackend) -> Worker<&MockBackend> {
        let mut worker = Worker::new(CacheConfig::default(), backend);
        // jump straight to the steady state; lifecycle has its own tests
        worker.phase = Phase::Activated;
        worker
    }

    fn image_request(url: &str) -> Request {
        Request::get(url).with_destination(Destination::Image)
    }

    #[test]
    fn cache_first_hit_makes_zero_network_calls() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/icons/spark.png";
        backend.route(url, Response::from_body("png-bytes"));
        let mut worker = worker_with(&backend);

        let first = worker.handle_fetch(image_request(url)).unwrap();
        assert_eq!(first.response.get_body_bytes(), b"png-bytes");
        assert_eq!(backend.sent_count(), 1);

        let second = worker.handle_fetch(image_request(url)).unwrap();
        assert_eq!(second.response.get_body_bytes(), b"png-bytes");
        assert_eq!(backend.sent_count(), 1, "hit must not touch the network");
    }

    #[test]
    fn cache_first_miss_with_network_down_is_a_synthetic_404() {
        let backend = MockBackend::default();
        backend.set_offline(true);
        let mut worker = worker_with(&backend);

        let outcome = worker
            .handle_fetch(image_request("https://reawakened.app/icons/missing.png"))
            .unwrap();
        assert_eq!(outcome.response.get_status().as_u16(), 404);
    }

    #[test]
    fn api_success_is_cached_and_replayed_byte_identical_when_offline() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/api/sparks/today";
        backend.route(
            url,
            Response::new()
                .with_body_json(&serde_json::json!({ "title": "Morning Spark" }))
                .unwrap(),
        );
        let mut worker = worker_with(&backend);

        let live = worker.handle_fetch(Request::get(url)).unwrap();
        assert!(live.response.is_success());
        let live_bytes = live.response.get_body_bytes().to_vec();

        backend.set_offline(true);
        let replayed = worker.handle_fetch(Request::get(url)).unwrap();
        assert_eq!(replayed.response.get_body_bytes(), live_bytes.as_slice());
    }

    #[test]
    fn api_requests_go_out_with_credentials_included() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/api/journal";
        backend.route(url, Response::new());
        let mut worker = worker_with(&backend);

        worker.handle_fetch(Request::get(url)).unwrap();
        assert_eq!(
            backend.last_credentials.get(),
            Some(CredentialsMode::Include)
        );
    }

    #[test]
    fn api_http_errors_pass_through_and_are_not_cached() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/api/sparks/today";
        backend.route(
            url,
            Response::from_status(http::StatusCode::INTERNAL_SERVER_ERROR),
        );
        let mut worker = worker_with(&backend);

        let outcome = worker.handle_fetch(Request::get(url)).unwrap();
        assert_eq!(outcome.response.get_status().as_u16(), 500);

        let key = CacheKey::for_request(&Request::get(url)).unwrap();
        assert!(!worker.store().contains_anywhere(&key));
    }

    #[test]
    fn api_offline_with_cold_cache_is_the_offline_json_error() {
        let backend = MockBackend::default();
        backend.set_offline(true);
        let mut worker = worker_with(&backend);

        let mut outcome = worker
            .handle_fetch(Request::get("https://reawakened.app/api/plans"))
            .unwrap();
        assert_eq!(outcome.response.get_status().as_u16(), 503);
        let body: serde_json::Value = outcome.response.take_body_json().unwrap();
        assert_eq!(body, serde_json::json!({ "error": "offline" }));
    }

    #[test]
    fn swr_returns_the_cached_response_and_updates_after_revalidation() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/assets/app.js";
        backend.route(url, Response::from_body("v1"));
        backend.route(url, Response::from_body("v2"));
        let mut worker = worker_with(&backend);
        let script = || Request::get(url).with_destination(Destination::Script);

        // cold cache: network-only
        let cold = worker.handle_fetch(script()).unwrap();
        assert_eq!(cold.response.get_body_bytes(), b"v1");
        assert!(cold.revalidation.is_none());

        // warm: stale entry served, refresh handed back as a task
        let warm = worker.handle_fetch(script()).unwrap();
        assert_eq!(warm.response.get_body_bytes(), b"v1");
        let task = warm.revalidation.expect("stale entry schedules a refresh");

        // the partition must not change until the task is driven
        let key = CacheKey::for_request(&script()).unwrap();
        let static_name = worker.config().partition_name(PartitionKind::Static);
        assert_eq!(
            worker
                .store()
                .lookup(&static_name, &key)
                .unwrap()
                .to_response()
                .get_body_bytes(),
            b"v1"
        );

        worker.revalidate(task);
        assert_eq!(
            worker
                .store()
                .lookup(&static_name, &key)
                .unwrap()
                .to_response()
                .get_body_bytes(),
            b"v2"
        );
    }

    #[test]
    fn swr_keeps_the_entry_when_revalidation_fails() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/assets/styles.css";
        backend.route(url, Response::from_body("cached"));
        let mut worker = worker_with(&backend);
        let style = || Request::get(url).with_destination(Destination::Style);

        worker.handle_fetch(style()).unwrap(); // prime
        let warm = worker.handle_fetch(style()).unwrap();
        let task = warm.revalidation.unwrap();

        backend.set_offline(true);
        worker.revalidate(task);

        let key = CacheKey::for_request(&style()).unwrap();
        let static_name = worker.config().partition_name(PartitionKind::Static);
        assert_eq!(
            worker
                .store()
                .lookup(&static_name, &key)
                .unwrap()
                .to_response()
                .get_body_bytes(),
            b"cached"
        );
    }

    #[test]
    fn swr_skips_revalidation_while_the_entry_is_fresh() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/fonts/serif.woff2";
        backend.route(url, Response::from_body("font"));
        let mut config = CacheConfig::default();
        config.max_age_secs.insert("/fonts".to_string(), 3600);
        let mut worker = Worker::new(config, &backend);
        worker.phase = Phase::Activated;
        let font = || Request::get(url).with_destination(Destination::Font);

        worker.handle_fetch(font()).unwrap(); // prime
        let warm = worker.handle_fetch(font()).unwrap();
        assert_eq!(warm.response.get_body_bytes(), b"font");
        assert!(warm.revalidation.is_none(), "fresh entry must not refresh");
        assert_eq!(backend.sent_count(), 1);
    }

    #[test]
    fn navigation_success_is_mirrored_into_the_static_partition() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/plans";
        backend.route(url, Response::from_body("<html>plans</html>"));
        let mut worker = worker_with(&backend);

        worker
            .handle_fetch(Request::get(url).with_mode(RequestMode::Navigate))
            .unwrap();

        let key = CacheKey::for_request(&Request::get(url)).unwrap();
        let static_name = worker.config().partition_name(PartitionKind::Static);
        assert!(worker.store().lookup(&static_name, &key).is_some());
    }

    #[test]
    fn failed_navigation_walks_the_fallback_chain() {
        let backend = MockBackend::default();
        let mut worker = worker_with(&backend);
        let static_name = worker.config().partition_name(PartitionKind::Static);
        let navigate =
            |url: &str| Request::get(url).with_mode(RequestMode::Navigate);

        backend.set_offline(true);

        // nothing cached at all: resolves to the synthetic offline document
        let outcome = worker
            .handle_fetch(navigate("https://reawakened.app/plans"))
            .unwrap();
        assert_eq!(outcome.response.get_status().as_u16(), 503);
        assert_eq!(
            outcome.response.get_content_type(),
            Some(mime::TEXT_HTML_UTF_8)
        );

        // root document cached: used as the last cached resort
        let root_key = CacheKey::for_request(&Request::get("https://reawakened.app/")).unwrap();
        worker
            .store
            .insert(&static_name, root_key, &Response::from_body("root"))
            .unwrap();
        let outcome = worker
            .handle_fetch(navigate("https://reawakened.app/plans"))
            .unwrap();
        assert_eq!(outcome.response.get_body_bytes(), b"root");

        // offline page cached: preferred over the root document
        let offline_key =
            CacheKey::for_request(&Request::get("https://reawakened.app/offline.html")).unwrap();
        worker
            .store
            .insert(&static_name, offline_key, &Response::from_body("offline"))
            .unwrap();
        let outcome = worker
            .handle_fetch(navigate("https://reawakened.app/plans"))
            .unwrap();
        assert_eq!(outcome.response.get_body_bytes(), b"offline");

        // exact page cached: wins over both
        let exact_key =
            CacheKey::for_request(&Request::get("https://reawakened.app/plans")).unwrap();
        worker
            .store
            .insert(&static_name, exact_key, &Response::from_body("plans"))
            .unwrap();
        let outcome = worker
            .handle_fetch(navigate("https://reawakened.app/plans"))
            .unwrap();
        assert_eq!(outcome.response.get_body_bytes(), b"plans");
    }

    #[test]
    fn login_navigations_are_never_cached() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/login";
        backend.route(url, Response::from_body("<html>login</html>"));
        let mut worker = worker_with(&backend);

        for _ in 0..3 {
            let outcome = worker
                .handle_fetch(Request::get(url).with_mode(RequestMode::Navigate))
                .unwrap();
            assert!(outcome.response.is_success());
        }
        assert_eq!(backend.sent_count_for(url), 3, "every load goes out");

        let key = CacheKey::for_request(&Request::get(url)).unwrap();
        assert!(!worker.store().contains_anywhere(&key));
    }

    #[test]
    fn non_get_requests_bypass_and_surface_network_errors() {
        let backend = MockBackend::default();
        let url = "https://reawakened.app/api/journal";
        backend.route(url, Response::from_status(http::StatusCode::CREATED));
        let mut worker = worker_with(&backend);

        let outcome = worker.handle_fetch(Request::post(url)).unwrap();
        assert_eq!(outcome.response.get_status().as_u16(), 201);
        let key = CacheKey::for_request(&Request::get(url)).unwrap();
        assert!(!worker.store().contains_anywhere(&key));

        backend.set_offline(true);
        assert!(worker.handle_fetch(Request::post(url)).is_err());
    }
}
