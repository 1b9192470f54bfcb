//! UDP tracker job starter.
use std::sync::Arc;

use swarm_tracker_configuration::UdpTracker;

use crate::core;
use crate::servers::udp::server::{RunningUdpServer, UdpServer};

/// It starts the UDP tracker server.
///
/// # Panics
///
/// It will panic if the socket cannot be bound.
pub async fn start_job(config: &UdpTracker, tracker: Arc<core::Tracker>, cookie_key: Arc<Vec<u8>>) -> RunningUdpServer {
    UdpServer::new(config.clone())
        .start(tracker, cookie_key)
        .await
        .expect("it should be able to start the udp tracker")
}
