//! Tracker application container.
//!
//! It starts the configured services (UDP tracker, HTTP tracker,
//! metrics exporter) around one [`crate::core::Tracker`] and keeps
//! their controllers so they can be stopped together — on shutdown, or
//! on reload while the swarm store stays in place.
use std::sync::Arc;

use swarm_tracker_configuration::Configuration;
use tracing::warn;

use crate::bootstrap::jobs::{http_tracker, metrics_api, udp_tracker};
use crate::core;
use crate::servers::http::server::RunningHttpServer;
use crate::servers::metrics::RunningMetricsServer;
use crate::servers::udp::server::RunningUdpServer;

/// The running services of one configuration generation.
pub struct Running {
    pub udp: Option<RunningUdpServer>,
    pub http: Option<RunningHttpServer>,
    pub metrics: Option<RunningMetricsServer>,
}

/// It starts every service enabled in the configuration.
pub async fn start(config: &Configuration, tracker: Arc<core::Tracker>, cookie_key: Arc<Vec<u8>>) -> Running {
    let udp = match &config.udp {
        Some(udp_config) => Some(udp_tracker::start_job(udp_config, tracker.clone(), cookie_key).await),
        None => None,
    };

    let http = match &config.http {
        Some(http_config) => Some(http_tracker::start_job(http_config, tracker.clone()).await),
        None => None,
    };

    let metrics = match &config.metrics {
        Some(metrics_config) => Some(metrics_api::start_job(metrics_config).await),
        None => None,
    };

    Running { udp, http, metrics }
}

/// It stops every running service, tolerating services that already
/// shut themselves down on a global signal.
pub async fn stop(running: Running) {
    if let Some(udp) = running.udp {
        if let Err(e) = udp.stop().await {
            warn!("could not stop the udp tracker cleanly: {e}");
        }
    }

    if let Some(http) = running.http {
        if let Err(e) = http.stop().await {
            warn!("could not stop the http tracker cleanly: {e}");
        }
    }

    if let Some(metrics) = running.metrics {
        if let Err(e) = metrics.stop().await {
            warn!("could not stop the metrics exporter cleanly: {e}");
        }
    }
}
