//! Setup for the tracker application.
//!
//! The [`setup`] function turns the process environment into a loaded,
//! validated configuration and initialises tracing. The swarm store and
//! the services are started by [`crate::app::start`] afterwards, so a
//! reload can rebuild everything around the preserved store.
use std::sync::Arc;

use swarm_tracker_configuration::Configuration;
use tracing::info;

use super::config::Arguments;
use crate::shared::crypto::ephemeral_instance_keys;

/// Loads the configuration and initialises tracing.
///
/// # Errors
///
/// Will return `Err` if the configuration cannot be loaded or does not
/// validate.
pub fn setup(args: &Arguments) -> Result<Configuration, swarm_tracker_configuration::Error> {
    let config = super::config::initialize_configuration(args)?;

    super::tracing::setup(&config);

    info!("configuration loaded");

    Ok(config)
}

/// The key the UDP connection-ID engine signs with: the configured
/// `private_key`, or the random per-process seed.
#[must_use]
pub fn cookie_key(config: &Configuration) -> Arc<Vec<u8>> {
    match config.udp.as_ref().and_then(|udp| udp.private_key.clone()) {
        Some(key) => Arc::new(key.into_bytes()),
        None => Arc::new(ephemeral_instance_keys::RANDOM_SEED.to_vec()),
    }
}
