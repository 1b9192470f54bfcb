use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP tracker frontend.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct HttpTracker {
    /// The address the tracker will bind to.
    #[serde(default = "HttpTracker::default_bind_address")]
    pub bind_address: SocketAddr,

    /// Maximum duration to wait for the request headers and body.
    #[serde(default = "HttpTracker::default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Maximum duration to wait for the response to be written.
    #[serde(default = "HttpTracker::default_write_timeout", with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Maximum duration for the whole request to be served.
    #[serde(default = "HttpTracker::default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Weather the tracker should trust the `ip`, `ipv4` and `ipv6` query
    /// params instead of the connecting address.
    #[serde(default = "HttpTracker::default_allow_ip_spoofing")]
    pub allow_ip_spoofing: bool,

    /// Header holding the real client IP when the tracker sits behind a
    /// reverse proxy (e.g. `X-Real-IP`).
    #[serde(default = "HttpTracker::default_real_ip_header")]
    pub real_ip_header: Option<String>,

    /// Path to the TLS certificate. TLS is enabled when both this and
    /// `tls_key_path` are set.
    #[serde(default = "HttpTracker::default_tls_cert_path")]
    pub tls_cert_path: Option<String>,

    /// Path to the TLS key.
    #[serde(default = "HttpTracker::default_tls_key_path")]
    pub tls_key_path: Option<String>,

    /// Hard limit for the `numwant` announce param.
    #[serde(default = "HttpTracker::default_max_numwant")]
    pub max_numwant: u32,

    /// Value used when the `numwant` announce param is missing.
    #[serde(default = "HttpTracker::default_default_numwant")]
    pub default_numwant: u32,

    /// Maximum number of info-hashes served by a single scrape request.
    /// Requests above the limit are truncated, not rejected.
    #[serde(default = "HttpTracker::default_max_scrape_infohashes")]
    pub max_scrape_infohashes: u32,
}

impl Default for HttpTracker {
    fn default() -> Self {
        Self {
            bind_address: Self::default_bind_address(),
            read_timeout: Self::default_read_timeout(),
            write_timeout: Self::default_write_timeout(),
            request_timeout: Self::default_request_timeout(),
            allow_ip_spoofing: Self::default_allow_ip_spoofing(),
            real_ip_header: Self::default_real_ip_header(),
            tls_cert_path: Self::default_tls_cert_path(),
            tls_key_path: Self::default_tls_key_path(),
            max_numwant: Self::default_max_numwant(),
            default_numwant: Self::default_default_numwant(),
            max_scrape_infohashes: Self::default_max_scrape_infohashes(),
        }
    }
}

impl HttpTracker {
    fn default_bind_address() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 6969)
    }

    fn default_read_timeout() -> Duration {
        Duration::from_secs(5)
    }

    fn default_write_timeout() -> Duration {
        Duration::from_secs(5)
    }

    fn default_request_timeout() -> Duration {
        Duration::from_secs(10)
    }

    fn default_allow_ip_spoofing() -> bool {
        false
    }

    fn default_real_ip_header() -> Option<String> {
        None
    }

    fn default_tls_cert_path() -> Option<String> {
        None
    }

    fn default_tls_key_path() -> Option<String> {
        None
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

    #[must_use]
    pub fn is_tls_enabled(&self) -> bool {
        self.tls_cert_path.is_some() && self.tls_key_path.is_some()
    }
}
