//! Application jobs: starters for the long-running services.
//!
//! Each `start_job` function spawns one service and returns its running
//! controller, which the application container keeps so it can stop the
//! service on shutdown or reload.
pub mod http_tracker;
pub mod metrics_api;
pub mod udp_tracker;
