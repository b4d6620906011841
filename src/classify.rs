//! The strategy selector.
//!
//! Classification is a pure function from a request (method, URL, destination, mode)
//! to a [`Decision`], made *before* any cache or network I/O. It is implemented as an
//! ordered table of rules evaluated top to bottom, first match wins — the order is
//! load-bearing, not a set of independent predicates. In particular, the auth bypass
//! rule must run before the API rule, because auth exchanges live under the API prefix
//! too.

use crate::cache::PartitionKind;
use crate::config::CacheConfig;
use crate::http::{Destination, Request};
use http::Method;

/// The class a request falls into, per the classification table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestClass {
    /// Pass straight through to the network; never read or write a cache.
    Bypass,
    /// An API call under the configured prefix.
    Api,
    /// An image resource.
    Image,
    /// A full-page navigation.
    Navigation,
    /// A script, style, or font.
    StaticAsset,
    /// Everything else.
    Other,
}

/// The fetch-handling algorithm applied to a request class.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from cache if present; otherwise fetch and store. A stale hit is
    /// preferred over a slow network.
    CacheFirst,
    /// Fetch from the network; fall back to cache (then a synthetic JSON error) when
    /// the exchange fails.
    NetworkFirst,
    /// Network-first with the navigation fallback chain: exact match, then the
    /// offline document, then the root document.
    NetworkFirstOffline,
    /// Serve the cached entry immediately and revalidate in the background.
    StaleWhileRevalidate,
}

/// The outcome of classifying a request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Pass through to the network directly, with no cache involvement.
    Bypass,
    /// Handle with the given strategy against the given partition.
    Use {
        /// The strategy to apply.
        strategy: Strategy,
        /// The partition the strategy reads and writes.
        partition: PartitionKind,
    },
}

/// One row of the classification table.
struct Rule {
    class: RequestClass,
    applies: fn(&Request, &CacheConfig) -> bool,
    decision: Decision,
}

/// The classification table, in priority order.
const RULES: &[Rule] = &[
    // 1. Non-GET requests always bypass; the cache only ever holds GET snapshots.
    Rule {
        class: RequestClass::Bypass,
        applies: |req, _| req.get_method() != Method::GET,
        decision: Decision::Bypass,
    },
    // 2. Auth exchanges and identity-provider hosts bypass before anything else —
    //    never cache credentials or auth redirects. Checked ahead of the API rule on
    //    purpose.
    Rule {
        class: RequestClass::Bypass,
        applies: |req, config| {
            config.is_auth_path(req.get_path())
                || req.get_host().is_some_and(|h| config.is_bypass_host(h))
        },
        decision: Decision::Bypass,
    },
    // 3. API calls: freshness matters, offline usability still desired.
    Rule {
        class: RequestClass::Api,
        applies: |req, config| config.is_api_path(req.get_path()),
        decision: Decision::Use {
            strategy: Strategy::NetworkFirst,
            partition: PartitionKind::Api,
        },
    },
    // 4. Images: a stale image beats a slow one.
    Rule {
        class: RequestClass::Image,
        applies: |req, _| req.get_destination() == Destination::Image,
        decision: Decision::Use {
            strategy: Strategy::CacheFirst,
            partition: PartitionKind::Dynamic,
        },
    },
    // 5. Full-page loads get the offline fallback chain.
    Rule {
        class: RequestClass::Navigation,
        applies: |req, _| req.is_navigation(),
        decision: Decision::Use {
            strategy: Strategy::NetworkFirstOffline,
            partition: PartitionKind::Static,
        },
    },
    // 6. Scripts, styles, fonts: shell assets, revalidated in the background.
    Rule {
        class: RequestClass::StaticAsset,
        applies: |req, _| {
            matches!(
                req.get_destination(),
                Destination::Script | Destination::Style | Destination::Font
            )
        },
        decision: Decision::Use {
            strategy: Strategy::StaleWhileRevalidate,
            partition: PartitionKind::Static,
        },
    },
    // 7. Everything else.
    Rule {
        class: RequestClass::Other,
        applies: |_, _| true,
        decision: Decision::Use {
            strategy: Strategy::StaleWhileRevalidate,
            partition: PartitionKind::Dynamic,
        },
    },
];

/// Classify a request, returning the strategy and target partition to use.
pub fn classify(req: &Request, config: &CacheConfig) -> Decision {
    rule_for(req, config).decision
}

/// The request class, per the same table [`classify()`] uses.
pub fn request_class(req: &Request, config: &CacheConfig) -> RequestClass {
    rule_for(req, config).class
}

fn rule_for(req: &Request, config: &CacheConfig) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.applies)(req, config))
        .expect("classification table ends in a catch-all rule")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestMode;

    fn config() -> CacheConfig {
        CacheConfig {
            bypass_hosts: vec!["id.example.com".to_string()],
            ..CacheConfig::default()
        }
    }

    #[test]
    fn non_get_always_bypasses() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let req = Request::new(method.clone(), "https://reawakened.app/api/journal");
            assert_eq!(classify(&req, &config()), Decision::Bypass, "{}", method);
        }
    }

    #[test]
    fn auth_paths_bypass_even_under_the_api_prefix() {
        let req = Request::get("https://reawakened.app/api/auth/session");
        assert_eq!(classify(&req, &config()), Decision::Bypass);
        assert_eq!(request_class(&req, &config()), RequestClass::Bypass);

        let req = Request::get("https://reawakened.app/callback?code=abc");
        assert_eq!(classify(&req, &config()), Decision::Bypass);
    }

    #[test]
    fn identity_provider_hosts_bypass() {
        let req = Request::get("https://id.example.com/oauth/authorize");
        assert_eq!(classify(&req, &config()), Decision::Bypass);
    }

    #[test]
    fn api_paths_are_network_first() {
        let req = Request::get("https://reawakened.app/api/sparks/today");
        assert_eq!(
            classify(&req, &config()),
            Decision::Use {
                strategy: Strategy::NetworkFirst,
                partition: PartitionKind::Api,
            }
        );
    }

    #[test]
    fn api_prefix_outranks_the_image_rule() {
        // an image served from an API route is still an API call per the table order
        let req = Request::get("https://reawakened.app/api/avatar.png")
            .with_destination(Destination::Image);
        assert_eq!(
            classify(&req, &config()),
            Decision::Use {
                strategy: Strategy::NetworkFirst,
                partition: PartitionKind::Api,
            }
        );
    }

    #[test]
    fn images_are_cache_first_in_the_dynamic_partition() {
        let req = Request::get("https://reawakened.app/icons/spark.png")
            .with_destination(Destination::Image);
        assert_eq!(
            classify(&req, &config()),
            Decision::Use {
                strategy: Strategy::CacheFirst,
                partition: PartitionKind::Dynamic,
            }
        );
    }

    #[test]
    fn navigations_get_the_offline_chain() {
        let req = Request::get("https://reawakened.app/plans").with_mode(RequestMode::Navigate);
        assert_eq!(
            classify(&req, &config()),
            Decision::Use {
                strategy: Strategy::NetworkFirstOffline,
                partition: PartitionKind::Static,
            }
        );
    }

    #[test]
    fn scripts_styles_and_fonts_are_swr_static() {
        for destination in [Destination::Script, Destination::Style, Destination::Font] {
            let req = Request::get("https://reawakened.app/assets/app.js")
                .with_destination(destination);
            assert_eq!(
                classify(&req, &config()),
                Decision::Use {
                    strategy: Strategy::StaleWhileRevalidate,
                    partition: PartitionKind::Static,
                },
                "{:?}",
                destination
            );
        }
    }

    #[test]
    fn everything_else_is_swr_dynamic() {
        let req = Request::get("https://cdn.example.net/widget.json");
        assert_eq!(
            classify(&req, &config()),
            Decision::Use {
                strategy: Strategy::StaleWhileRevalidate,
                partition: PartitionKind::Dynamic,
            }
        );
    }
}
