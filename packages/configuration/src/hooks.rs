use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Configuration of one hook in the `prehooks` or `posthooks` chain.
///
/// YAML shape:
///
/// ```yaml
/// prehooks:
///   - name: client_approval
///     options:
///       whitelist: ["TR2820"]
///   - name: fixed_peers
///     options:
///       peers: ["10.0.0.2:6881"]
/// ```
///
/// Unknown hook names are rejected when the configuration is loaded.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(tag = "name", content = "options", rename_all = "snake_case")]
pub enum HookConfig {
    /// Fills `interval` and `min interval` in the announce response.
    Interval,

    /// Denies clients by the 6-byte client fingerprint of their peer id.
    ClientApproval {
        #[serde(default)]
        whitelist: Vec<String>,
        #[serde(default)]
        blacklist: Vec<String>,
    },

    /// Denies announces and scrapes by info-hash.
    InfohashApproval {
        #[serde(default)]
        whitelist: Vec<String>,
        #[serde(default)]
        blacklist: Vec<String>,
        /// What to do with disallowed hashes on scrape: drop them from
        /// the response, or fail the whole request.
        #[serde(default)]
        scrape_mode: ScrapeMode,
    },

    /// Appends a fixed set of peers to every announce response.
    FixedPeers { peers: Vec<SocketAddr> },

    /// Mixes plausible random peers into announce responses.
    Deniability {
        /// Probability that a given response is modified, in `[0, 1]`.
        modify_response_probability: f64,
        /// Upper bound of random peers inserted per modified response.
        max_random_peers: u32,
        /// Prefix of the generated peer ids; padded with random digits
        /// up to 20 bytes.
        prefix: String,
        /// Generated ports are uniform in `[min_port, max_port)`.
        min_port: u16,
        max_port: u16,
    },
}

impl HookConfig {
    /// The `name` key the hook is registered under.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            HookConfig::Interval => "interval",
            HookConfig::ClientApproval { .. } => "client_approval",
            HookConfig::InfohashApproval { .. } => "infohash_approval",
            HookConfig::FixedPeers { .. } => "fixed_peers",
            HookConfig::Deniability { .. } => "deniability",
        }
    }
}

/// Scrape behaviour of the info-hash approval hook.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeMode {
    /// Disallowed hashes are silently dropped from the response.
    #[default]
    Filter,
    /// A single disallowed hash fails the whole request.
    Block,
}
