//! HTTP tracker job starter.
use std::sync::Arc;

use swarm_tracker_configuration::HttpTracker;

use crate::core;
use crate::servers::http::server::{HttpServer, RunningHttpServer};

/// It starts the HTTP tracker server.
///
/// # Panics
///
/// It will panic if the listener cannot be bound or the TLS material
/// cannot be loaded.
pub async fn start_job(config: &HttpTracker, tracker: Arc<core::Tracker>) -> RunningHttpServer {
    HttpServer::new(config.clone())
        .start(tracker)
        .await
        .expect("it should be able to start the http tracker")
}
