//! Setup for the application tracing.
//!
//! It redirects the traces to the standard output, with the level
//! defined in the configuration:
//!
//! - `Off` (i.e. don't load any subscriber)
//! - `Error`
//! - `Warn`
//! - `Info`
//! - `Debug`
//! - `Trace`
use std::sync::Once;

use swarm_tracker_configuration::{Configuration, Threshold};
use tracing::debug;
use tracing::level_filters::LevelFilter;

static INIT: Once = Once::new();

/// It redirects the traces to the standard output with the level
/// defined in the configuration.
pub fn setup(cfg: &Configuration) {
    let filter = level_filter(cfg.logging.threshold);

    if filter == LevelFilter::OFF {
        return;
    }

    INIT.call_once(|| {
        stdout_init(filter);
    });
}

fn level_filter(threshold: Threshold) -> LevelFilter {
    match threshold {
        Threshold::Off => LevelFilter::OFF,
        Threshold::Error => LevelFilter::ERROR,
        Threshold::Warn => LevelFilter::WARN,
        Threshold::Info => LevelFilter::INFO,
        Threshold::Debug => LevelFilter::DEBUG,
        Threshold::Trace => LevelFilter::TRACE,
    }
}

fn stdout_init(filter: LevelFilter) {
    tracing_subscriber::fmt().with_max_level(filter).init();

    debug!("tracing initialized.");
}
