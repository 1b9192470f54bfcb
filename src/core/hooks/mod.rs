//! The hook chains of the request pipeline.
//!
//! Every deployment policy — approval lists, fixed peers, response
//! randomisation — is a hook. Pre-hooks run in the configured order and
//! may mutate the response draft or short-circuit with an error;
//! post-hooks run after the response has been written and can only log.
//!
//! Hooks are built from their YAML `{name, options}` configuration by
//! [`build_chain`]. The swarm-interaction step is not part of any chain:
//! it is the built-in finalizer the [`crate::core::Tracker`] always runs
//! last.
use swarm_tracker_configuration::{AnnouncePolicy, HookConfig};
use thiserror::Error;

use crate::core::error::Error;
use crate::core::{AnnounceData, AnnounceRequest, ScrapeData, ScrapeRequest};

pub mod client_approval;
pub mod deniability;
pub mod fixed_peers;
pub mod infohash_approval;
pub mod interval;
pub mod swarm_interaction;

/// A pluggable unit inserted before or after response generation.
pub trait Hook: Send + Sync {
    /// The `name` the hook is configured under.
    fn name(&self) -> &'static str;

    /// Called for every announce before the response is materialised
    /// (pre-hooks) or after it has been written (post-hooks).
    ///
    /// # Errors
    ///
    /// A client error terminates the pipeline and becomes the failure
    /// reason; an internal error terminates it with a generic message.
    fn on_announce(&self, request: &AnnounceRequest, response: &mut AnnounceData) -> Result<(), Error> {
        let _ = (request, response);
        Ok(())
    }

    /// Called for every scrape. The request is mutable so hooks can
    /// drop info-hashes (e.g. approval filtering).
    ///
    /// # Errors
    ///
    /// Same contract as [`Hook::on_announce`].
    fn on_scrape(&self, request: &mut ScrapeRequest, response: &mut ScrapeData) -> Result<(), Error> {
        let _ = (request, response);
        Ok(())
    }
}

/// Errors raised while turning hook configuration into runtime hooks.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid info-hash {value} in the {hook} hook options")]
    InvalidInfoHash { hook: &'static str, value: String },

    #[error("invalid client id {value} in the {hook} hook options, expected 6 bytes")]
    InvalidClientId { hook: &'static str, value: String },
}

/// Builds one hook chain in configuration order.
///
/// # Errors
///
/// Will return `Err` when an option cannot be turned into its runtime
/// form.
pub fn build_chain(configs: &[HookConfig], policy: AnnouncePolicy) -> Result<Vec<Box<dyn Hook>>, BuildError> {
    configs.iter().map(|config| build_hook(config, policy)).collect()
}

fn build_hook(config: &HookConfig, policy: AnnouncePolicy) -> Result<Box<dyn Hook>, BuildError> {
    match config {
        HookConfig::Interval => Ok(Box::new(interval::SetInterval::new(policy))),
        HookConfig::ClientApproval { whitelist, blacklist } => Ok(Box::new(client_approval::ClientApproval::new(
            whitelist, blacklist,
        )?)),
        HookConfig::InfohashApproval {
            whitelist,
            blacklist,
            scrape_mode,
        } => Ok(Box::new(infohash_approval::InfohashApproval::new(
            whitelist,
            blacklist,
            *scrape_mode,
        )?)),
        HookConfig::FixedPeers { peers } => Ok(Box::new(fixed_peers::FixedPeers::new(peers.clone()))),
        HookConfig::Deniability {
            modify_response_probability,
            max_random_peers,
            prefix,
            min_port,
            max_port,
        } => Ok(Box::new(deniability::Deniability::new(
            *modify_response_probability,
            *max_random_peers,
            prefix.as_bytes(),
            *min_port,
            *max_port,
        ))),
    }
}
