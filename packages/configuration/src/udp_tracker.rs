use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the UDP tracker frontend.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct UdpTracker {
    /// The address the tracker will bind to.
    #[serde(default = "UdpTracker::default_bind_address")]
    pub bind_address: SocketAddr,

    /// Key used to sign connection IDs. A fresh random key is generated
    /// at startup when not set.
    #[serde(default = "UdpTracker::default_private_key")]
    pub private_key: Option<String>,

    /// How far in the future a connection ID timestamp may be before it
    /// is rejected.
    #[serde(default = "UdpTracker::default_max_clock_skew", with = "humantime_serde")]
    pub max_clock_skew: Duration,

    /// Weather the tracker should trust the IP field of announce packets
    /// instead of the source address.
    #[serde(default = "UdpTracker::default_allow_ip_spoofing")]
    pub allow_ip_spoofing: bool,

    /// Weather per-request latency should be observed in the metrics.
    #[serde(default = "UdpTracker::default_enable_request_timing")]
    pub enable_request_timing: bool,

    /// Hard limit for the `numwant` announce field.
    #[serde(default = "UdpTracker::default_max_numwant")]
    pub max_numwant: u32,

    /// Value used when the `numwant` announce field is `-1`.
    #[serde(default = "UdpTracker::default_default_numwant")]
    pub default_numwant: u32,

    /// Maximum number of info-hashes served by a single scrape packet.
    /// Packets above the limit are truncated, not rejected.
    #[serde(default = "UdpTracker::default_max_scrape_infohashes")]
    pub max_scrape_infohashes: u32,
}

impl Default for UdpTracker {
    fn default() -> Self {
        Self {
            bind_address: Self::default_bind_address(),
            private_key: Self::default_private_key(),
            max_clock_skew: Self::default_max_clock_skew(),
            allow_ip_spoofing: Self::default_allow_ip_spoofing(),
            enable_request_timing: Self::default_enable_request_timing(),
            max_numwant: Self::default_max_numwant(),
            default_numwant: Self::default_default_numwant(),
            max_scrape_infohashes: Self::default_max_scrape_infohashes(),
        }
    }
}

impl UdpTracker {
    fn default_bind_address() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 6969)
    }

    fn default_private_key() -> Option<String> {
        None
    }

    fn default_max_clock_skew() -> Duration {
        Duration::from_secs(10)
    }

    fn default_allow_ip_spoofing() -> bool {
        false
    }

    fn default_enable_request_timing() -> bool {
        false
    }

    fn default_max_numwant() -> u32 {
        100
    }

    fn default_default_numwant() -> u32 {
        50
    }

    fn default_max_scrape_infohashes() -> u32 {
        50
    }
}
