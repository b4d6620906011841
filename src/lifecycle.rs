//! The lifecycle manager: install, activate, and the message control channel.
//!
//! A worker version moves through [`Phase::Installing`] → [`Phase::Installed`] (the
//! waiting state) → [`Phase::Activating`] → [`Phase::Activated`]. Install pre-warms
//! the static partition with the shell-asset manifest; activate garbage-collects every
//! partition that does not belong to the current version. The version token in the
//! partition names is the only invalidation mechanism there is — a deployment bumps
//! the token and the next activate sweeps everything older away.
//!
//! The control channel carries one recognized message, `SKIP_WAITING`, which lets the
//! page promote a waiting worker immediately instead of waiting for the old version's
//! clients to go away.

use crate::backend::Backend;
use crate::cache::PartitionKind;
use crate::http::Request;
use crate::worker::Worker;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// The lifecycle phase of a worker version.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Created, not yet installed.
    Installing,
    /// Installed and waiting to take over.
    Installed,
    /// Activation in progress.
    Activating,
    /// In control of clients.
    Activated,
}

/// Errors arising from lifecycle events.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LifecycleError {
    /// An event arrived in a phase where it is not valid.
    #[error("{event} event is not valid in phase {phase:?}")]
    Phase {
        /// The event that was dispatched.
        event: &'static str,
        /// The phase the worker was in.
        phase: Phase,
    },
}

/// A structured message from a controlled page.
///
/// The envelope is JSON with a `type` tag; `SKIP_WAITING` is the single recognized
/// value. Anything else fails to parse and should be logged and dropped by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Ask a waiting worker to activate immediately.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl Message {
    /// Parse a message envelope from its JSON wire form.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl<B: Backend> Worker<B> {
    /// The current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Return whether install finished and the worker asked to skip the waiting phase.
    ///
    /// The host honors this by dispatching [`activate()`][Self::activate] without
    /// waiting for the previous version's clients to unload.
    pub fn wants_activation(&self) -> bool {
        self.wants_activation
    }

    /// Handle the install event: pre-warm the static partition with the shell assets.
    ///
    /// Pre-population is best-effort. A manifest entry that fails — network error,
    /// non-`2xx` status, store limit — is logged and skipped; install itself only
    /// fails if dispatched in the wrong phase. One missing optional asset must never
    /// block the whole installation.
    pub fn install(&mut self) -> Result<(), LifecycleError> {
        if self.phase != Phase::Installing {
            return Err(LifecycleError::Phase {
                event: "install",
                phase: self.phase,
            });
        }
        let partition = self.config.partition_name(PartitionKind::Static);
        // open eagerly so the partition exists even if every asset fails
        self.store.open(&partition);

        let manifest: Vec<String> = self.config.shell_manifest.clone();
        for path in manifest {
            let req = Request::get(self.config.absolute_url(&path));
            match self.backend.send(&req) {
                Ok(resp) if resp.is_success() => {
                    let key = crate::cache::CacheKey::for_request(&req)
                        .expect("GET requests always produce cache keys");
                    self.store_swallowing(&partition, key, &resp);
                }
                Ok(resp) => {
                    warn!(
                        "skipping shell asset {}: HTTP {}",
                        path,
                        resp.get_status()
                    );
                }
                Err(err) => {
                    warn!("skipping shell asset {}: {}", path, err);
                }
            }
        }

        info!(
            "installed {} with {} shell assets",
            partition,
            self.store.get(&partition).map_or(0, |p| p.len())
        );
        self.phase = Phase::Installed;
        self.wants_activation = true;
        Ok(())
    }

    /// Handle the activate event: garbage-collect partitions from older versions.
    ///
    /// Every partition whose name is not one of the current version's three names is
    /// deleted. Returns the deleted names. After this returns the worker is
    /// [`Phase::Activated`] and the host should claim all open clients so the new
    /// version takes control without a page reload.
    pub fn activate(&mut self) -> Result<Vec<String>, LifecycleError> {
        if self.phase != Phase::Installed {
            return Err(LifecycleError::Phase {
                event: "activate",
                phase: self.phase,
            });
        }
        self.phase = Phase::Activating;

        let keep = self.config.current_partition_names();
        let mut deleted = Vec::new();
        for name in self.store.names() {
            if !keep.contains(&name) {
                self.store.delete(&name);
                info!("deleted stale partition {}", name);
                deleted.push(name);
            }
        }

        self.phase = Phase::Activated;
        Ok(deleted)
    }

    /// Handle a control-channel message.
    ///
    /// `SKIP_WAITING` activates a waiting worker immediately; in any other phase it is
    /// a no-op (the page may race a message against a worker that already took over).
    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::SkipWaiting => {
                if self.phase == Phase::Installed {
                    match self.activate() {
                        Ok(deleted) => {
                            info!("skip-waiting activation removed {} partitions", deleted.len())
                        }
                        Err(err) => warn!("skip-waiting activation failed: {}", err),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SendError, SendErrorCause};
    use crate::config::CacheConfig;
    use crate::http::{Request, Response};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves scripted shell assets; anything unrouted is a network failure.
    #[derive(Default)]
    struct ShellBackend {
        routes: RefCell<HashMap<String, Response>>,
    }

    impl ShellBackend {
        fn route(&self, url: &str, resp: Response) {
            self.routes.borrow_mut().insert(url.to_string(), resp);
        }
    }

    impl Backend for ShellBackend {
        fn send(&self, req: &Request) -> Result<Response, SendError> {
            let url = req.get_url_str();
            self.routes
                .borrow()
                .get(url)
                .cloned()
                .ok_or_else(|| SendError::new(url, SendErrorCause::Connection))
        }
    }

    fn config_v3() -> CacheConfig {
        CacheConfig {
            version: "v3".to_string(),
            ..CacheConfig::default()
        }
    }

    #[test]
    fn install_prewarms_the_static_partition() {
        let backend = ShellBackend::default();
        backend.route("https://reawakened.app/", Response::from_body("root"));
        backend.route(
            "https://reawakened.app/index.html",
            Response::from_body("index"),
        );
        backend.route(
            "https://reawakened.app/offline.html",
            Response::from_body("offline"),
        );
        backend.route(
            "https://reawakened.app/manifest.json",
            Response::from_body("{}"),
        );

        let mut worker = Worker::new(config_v3(), &backend);
        worker.install().unwrap();

        assert_eq!(worker.phase(), Phase::Installed);
        assert!(worker.wants_activation());
        assert_eq!(worker.store().get("static-v3").unwrap().len(), 4);
    }

    #[test]
    fn install_survives_missing_and_erroring_assets() {
        let backend = ShellBackend::default();
        // only two of the four manifest entries resolve; one 404s, one is unrouted
        backend.route("https://reawakened.app/", Response::from_body("root"));
        backend.route(
            "https://reawakened.app/index.html",
            Response::from_body("index"),
        );
        backend.route(
            "https://reawakened.app/offline.html",
            Response::from_status(http::StatusCode::NOT_FOUND),
        );

        let mut worker = Worker::new(config_v3(), &backend);
        worker.install().unwrap();

        assert_eq!(worker.phase(), Phase::Installed);
        assert_eq!(worker.store().get("static-v3").unwrap().len(), 2);
    }

    #[test]
    fn activate_deletes_every_stale_partition() {
        let backend = ShellBackend::default();
        let mut worker = Worker::new(config_v3(), &backend);
        worker.phase = Phase::Installed;

        for name in ["static-v3", "dynamic-v3", "api-v3", "static-v2"] {
            worker.store.open(name);
        }

        let mut deleted = worker.activate().unwrap();
        deleted.sort();
        assert_eq!(deleted, ["static-v2"]);
        assert_eq!(worker.phase(), Phase::Activated);

        let mut remaining = worker.store().names();
        remaining.sort();
        assert_eq!(remaining, ["api-v3", "dynamic-v3", "static-v3"]);
    }

    #[test]
    fn events_out_of_order_are_phase_errors() {
        let backend = ShellBackend::default();
        let mut worker = Worker::new(config_v3(), &backend);

        match worker.activate() {
            Err(LifecycleError::Phase {
                event: "activate",
                phase: Phase::Installing,
            }) => {}
            x => panic!("unexpected result: {:?}", x),
        }

        worker.phase = Phase::Activated;
        match worker.install() {
            Err(LifecycleError::Phase {
                event: "install",
                phase: Phase::Activated,
            }) => {}
            x => panic!("unexpected result: {:?}", x),
        }
    }

    #[test]
    fn skip_waiting_activates_a_waiting_worker() {
        let backend = ShellBackend::default();
        let mut worker = Worker::new(config_v3(), &backend);
        worker.phase = Phase::Installed;
        worker.store.open("static-v1");

        let message = Message::parse(r#"{ "type": "SKIP_WAITING" }"#).unwrap();
        worker.handle_message(message);

        assert_eq!(worker.phase(), Phase::Activated);
        assert!(worker.store().get("static-v1").is_none());
    }

    #[test]
    fn skip_waiting_is_a_noop_once_activated() {
        let backend = ShellBackend::default();
        let mut worker = Worker::new(config_v3(), &backend);
        worker.phase = Phase::Activated;
        worker.handle_message(Message::SkipWaiting);
        assert_eq!(worker.phase(), Phase::Activated);
    }

    #[test]
    fn unrecognized_message_types_do_not_parse() {
        assert!(Message::parse(r#"{ "type": "PING" }"#).is_err());
        assert!(Message::parse("not json").is_err());
    }
}
