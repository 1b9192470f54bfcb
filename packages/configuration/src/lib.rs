//! Configuration data structures for the [Swarm Tracker](https://docs.rs/swarm-tracker).
//!
//! The configuration is a YAML document nested under the top-level
//! `swarm_tracker` key:
//!
//! ```yaml
//! swarm_tracker:
//!   announce_interval: 30m
//!   min_announce_interval: 20m
//!   http:
//!     bind_address: 0.0.0.0:6969
//!   udp:
//!     bind_address: 0.0.0.0:6969
//!   storage:
//!     shard_count: 1024
//!     peer_lifetime: 31m
//!   prehooks:
//!     - name: interval
//! ```
//!
//! It is loaded from the file given on the command line (or the default
//! path), or from the `SWARM_TRACKER_CONFIG` environment variable holding
//! the whole document. Individual values can be overridden with
//! `SWARM_TRACKER_CONFIG_OVERRIDE_`-prefixed environment variables, using
//! `__` as the path separator, for example:
//!
//! ```text
//! SWARM_TRACKER_CONFIG_OVERRIDE_SWARM_TRACKER__HTTP__BIND_ADDRESS=0.0.0.0:7070
//! ```
//!
//! Durations accept the humantime syntax (`30m`, `90s`, `500ms`).
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod hooks;
pub mod http_tracker;
pub mod logging;
pub mod storage;
pub mod udp_tracker;

pub use hooks::{HookConfig, ScrapeMode};
pub use http_tracker::HttpTracker;
pub use logging::{Logging, Threshold};
pub use storage::Storage;
pub use udp_tracker::UdpTracker;

/// Prefix for env vars that overwrite configuration options.
const CONFIG_OVERRIDE_PREFIX: &str = "SWARM_TRACKER_CONFIG_OVERRIDE_";
/// Path separator in env var names for nested values in configuration.
const CONFIG_OVERRIDE_SEPARATOR: &str = "__";

/// The maximum length of the deniability peer id prefix. The rest of the
/// 20 bytes is random padding.
pub const MAX_PEER_ID_PREFIX_LEN: usize = 20;

/// Information needed to load the configuration: the whole document from
/// an env var, or a file path.
#[derive(Debug, Default, Clone)]
pub struct Info {
    /// Whole configuration document, taking priority over the file path.
    pub config_yaml: Option<String>,
    /// Path of the configuration file.
    pub config_yaml_path: String,
}

/// Errors raised while loading or validating the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("bad configuration: {source}")]
    ConfigError {
        #[from]
        source: figment::Error,
    },

    #[error("neither the http nor the udp frontend is configured")]
    NoFrontends,

    #[error("storage.shard_count must be at least 1")]
    InvalidShardCount,

    #[error("invalid options for the {hook} hook: {reason}")]
    InvalidHookOptions { hook: &'static str, reason: String },
}

/// Intervals sent back to announcing clients, in seconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AnnouncePolicy {
    /// Recommended wait time between two announces.
    pub interval: u32,
    /// Shortest allowed wait time between two announces.
    pub interval_min: u32,
}

/// Core configuration for the tracker.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Configuration {
    /// Interval clients are asked to wait between announces.
    #[serde(default = "Configuration::default_announce_interval", with = "humantime_serde")]
    pub announce_interval: Duration,

    /// Shortest announce interval clients are allowed.
    #[serde(default = "Configuration::default_min_announce_interval", with = "humantime_serde")]
    pub min_announce_interval: Duration,

    /// Logging configuration.
    #[serde(default)]
    pub logging: Logging,

    /// The HTTP frontend. Disabled when missing.
    #[serde(default)]
    pub http: Option<HttpTracker>,

    /// The UDP frontend. Disabled when missing.
    #[serde(default)]
    pub udp: Option<UdpTracker>,

    /// The in-memory swarm store.
    #[serde(default)]
    pub storage: Storage,

    /// The Prometheus exporter endpoint. Disabled when missing.
    #[serde(default)]
    pub metrics: Option<MetricsApi>,

    /// Hooks run before the response is materialised. They may veto the
    /// request or mutate the response draft.
    #[serde(default = "Configuration::default_prehooks")]
    pub prehooks: Vec<HookConfig>,

    /// Hooks run after the response has been written. Their errors are
    /// logged only.
    #[serde(default)]
    pub posthooks: Vec<HookConfig>,
}

/// Configuration for the metrics exporter endpoint.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct MetricsApi {
    #[serde(default = "MetricsApi::default_bind_address")]
    pub bind_address: SocketAddr,
}

impl MetricsApi {
    fn default_bind_address() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 6880)
    }
}

impl Default for MetricsApi {
    fn default() -> Self {
        Self {
            bind_address: Self::default_bind_address(),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            announce_interval: Self::default_announce_interval(),
            min_announce_interval: Self::default_min_announce_interval(),
            logging: Logging::default(),
            http: Some(HttpTracker::default()),
            udp: Some(UdpTracker::default()),
            storage: Storage::default(),
            metrics: None,
            prehooks: Self::default_prehooks(),
            posthooks: Vec::default(),
        }
    }
}

/// The whole configuration document: everything lives under the
/// `swarm_tracker` key.
#[derive(Serialize, Deserialize, Default, Debug)]
struct Registry {
    #[serde(default)]
    swarm_tracker: Configuration,
}

impl Configuration {
    fn default_announce_interval() -> Duration {
        Duration::from_secs(30 * 60)
    }

    fn default_min_announce_interval() -> Duration {
        Duration::from_secs(20 * 60)
    }

    fn default_prehooks() -> Vec<HookConfig> {
        vec![HookConfig::Interval]
    }

    /// The announce intervals, converted to the seconds sent on the wire.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn announce_policy(&self) -> AnnouncePolicy {
        AnnouncePolicy {
            interval: self.announce_interval.as_secs() as u32,
            interval_min: self.min_announce_interval.as_secs() as u32,
        }
    }

    /// Loads the configuration described by the `Info` struct.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the document cannot be parsed or does not
    /// validate.
    pub fn load(info: &Info) -> Result<Configuration, Error> {
        let figment = if let Some(config_yaml) = &info.config_yaml {
            // Config in env var has priority over config file path
            Figment::from(Serialized::defaults(Registry::default()))
                .merge(Yaml::string(config_yaml))
                .merge(Env::prefixed(CONFIG_OVERRIDE_PREFIX).split(CONFIG_OVERRIDE_SEPARATOR))
        } else {
            Figment::from(Serialized::defaults(Registry::default()))
                .merge(Yaml::file(&info.config_yaml_path))
                .merge(Env::prefixed(CONFIG_OVERRIDE_PREFIX).split(CONFIG_OVERRIDE_SEPARATOR))
        };

        let registry: Registry = figment.extract()?;

        let config = registry.swarm_tracker;
        config.validate()?;

        Ok(config)
    }

    /// Checks the cross-field constraints the serde layer cannot express.
    ///
    /// # Errors
    ///
    /// Will return `Err` when no frontend is enabled, the shard count is
    /// zero, or a hook carries inconsistent options.
    pub fn validate(&self) -> Result<(), Error> {
        if self.http.is_none() && self.udp.is_none() {
            return Err(Error::NoFrontends);
        }

        if self.storage.shard_count == 0 {
            return Err(Error::InvalidShardCount);
        }

        for hook in self.prehooks.iter().chain(&self.posthooks) {
            validate_hook(hook)?;
        }

        Ok(())
    }
}

fn validate_hook(hook: &HookConfig) -> Result<(), Error> {
    match hook {
        HookConfig::Deniability {
            modify_response_probability,
            prefix,
            min_port,
            max_port,
            ..
        } => {
            if !(0.0..=1.0).contains(modify_response_probability) {
                return Err(Error::InvalidHookOptions {
                    hook: hook.name(),
                    reason: format!("modify_response_probability {modify_response_probability} is not within [0, 1]"),
                });
            }
            if prefix.len() > MAX_PEER_ID_PREFIX_LEN {
                return Err(Error::InvalidHookOptions {
                    hook: hook.name(),
                    reason: format!("prefix is longer than {MAX_PEER_ID_PREFIX_LEN} bytes"),
                });
            }
            if min_port >= max_port {
                return Err(Error::InvalidHookOptions {
                    hook: hook.name(),
                    reason: format!("port range [{min_port}, {max_port}) is empty"),
                });
            }
            Ok(())
        }
        HookConfig::ClientApproval { whitelist, blacklist } | HookConfig::InfohashApproval { whitelist, blacklist, .. } => {
            if !whitelist.is_empty() && !blacklist.is_empty() {
                return Err(Error::InvalidHookOptions {
                    hook: hook.name(),
                    reason: "whitelist and blacklist are mutually exclusive".to_owned(),
                });
            }
            Ok(())
        }
        HookConfig::Interval | HookConfig::FixedPeers { .. } => Ok(()),
    }
}
