//! Metrics exporter job starter.
use swarm_tracker_configuration::MetricsApi;

use crate::servers::metrics::{RunningMetricsServer, StoppedMetricsServer};

/// It starts the Prometheus exporter endpoint.
///
/// # Panics
///
/// It will panic if the listener cannot be bound.
pub async fn start_job(config: &MetricsApi) -> RunningMetricsServer {
    StoppedMetricsServer::new(config.clone())
        .start()
        .await
        .expect("it should be able to start the metrics exporter")
}
