//! Servers. Services that can be started and stopped.
pub mod http;
pub mod metrics;
pub mod signals;
pub mod udp;
