//! Axum handlers for the `announce` and `scrape` routes.
use std::net::{IpAddr, SocketAddr};
use std::panic::Location;
use std::sync::Arc;

use axum::http::HeaderMap;
use swarm_tracker_configuration::HttpTracker;
use thiserror::Error;

pub mod announce;
pub mod scrape;

/// Shared state of the HTTP routes.
#[derive(Clone)]
pub struct State {
    pub tracker: Arc<crate::core::Tracker>,
    pub cfg: Arc<HttpTracker>,
}

/// Errors resolving the client IP. The display string is the failure
/// reason the client receives.
#[derive(Error, Debug)]
pub enum ResolveIpError {
    #[error("invalid ip")]
    InvalidIpParam { location: &'static Location<'static> },

    #[error("invalid ip in the real-ip header")]
    InvalidRealIpHeader { location: &'static Location<'static> },
}

/// Resolves the IP the announced peer is reachable at.
///
/// In order: when spoofing is allowed, the `ip`, `ipv4` and `ipv6`
/// query params are consulted; otherwise, when a real-IP header is
/// configured, its first value is used; otherwise the TCP peer address.
///
/// # Errors
///
/// Will return `Err` when the winning source fails to parse.
pub fn resolve_client_ip(
    spoofed_params: [Option<&str>; 3],
    headers: &HeaderMap,
    remote_addr: SocketAddr,
    cfg: &HttpTracker,
) -> Result<IpAddr, ResolveIpError> {
    if cfg.allow_ip_spoofing {
        if let Some(raw_ip) = spoofed_params.iter().flatten().next() {
            return raw_ip.parse().map_err(|_| ResolveIpError::InvalidIpParam {
                location: Location::caller(),
            });
        }
    }

    if let Some(header_name) = &cfg.real_ip_header {
        if let Some(value) = headers.get(header_name) {
            let raw_ip = value.to_str().map_err(|_| ResolveIpError::InvalidRealIpHeader {
                location: Location::caller(),
            })?;

            // Proxies append addresses; the first one is the client.
            let raw_ip = raw_ip.split(',').next().unwrap_or_default().trim();

            return raw_ip.parse().map_err(|_| ResolveIpError::InvalidRealIpHeader {
                location: Location::caller(),
            });
        }
    }

    Ok(remote_addr.ip())
}

#[cfg(test)]
mod tests {

    mod resolving_the_client_ip {
        use std::net::{IpAddr, Ipv4Addr, SocketAddr};

        use axum::http::HeaderMap;
        use swarm_tracker_configuration::HttpTracker;

        use crate::servers::http::handlers::resolve_client_ip;

        fn remote_addr() -> SocketAddr {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)), 40000)
        }

        #[test]
        fn should_use_the_connecting_address_by_default() {
            let cfg = HttpTracker::default();

            let ip = resolve_client_ip([None, None, None], &HeaderMap::new(), remote_addr(), &cfg).unwrap();

            assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)));
        }

        #[test]
        fn should_ignore_the_ip_params_when_spoofing_is_disabled() {
            let cfg = HttpTracker::default();

            let ip = resolve_client_ip([Some("1.2.3.4"), None, None], &HeaderMap::new(), remote_addr(), &cfg).unwrap();

            assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)));
        }

        #[test]
        fn should_honour_the_ip_params_in_order_when_spoofing_is_enabled() {
            let cfg = HttpTracker {
                allow_ip_spoofing: true,
                ..HttpTracker::default()
            };

            let ip = resolve_client_ip(
                [Some("1.2.3.4"), Some("5.6.7.8"), None],
                &HeaderMap::new(),
                remote_addr(),
                &cfg,
            )
            .unwrap();
            assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));

            let ip = resolve_client_ip([None, Some("5.6.7.8"), None], &HeaderMap::new(), remote_addr(), &cfg).unwrap();
            assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8)));
        }

        #[test]
        fn should_fail_on_an_unparsable_spoofed_ip() {
            let cfg = HttpTracker {
                allow_ip_spoofing: true,
                ..HttpTracker::default()
            };

            let result = resolve_client_ip([Some("not-an-ip"), None, None], &HeaderMap::new(), remote_addr(), &cfg);

            assert!(result.is_err());
        }

        #[test]
        fn should_use_the_first_value_of_the_real_ip_header() {
            let cfg = HttpTracker {
                real_ip_header: Some("X-Forwarded-For".to_owned()),
                ..HttpTracker::default()
            };

            let mut headers = HeaderMap::new();
            headers.insert("X-Forwarded-For", "1.2.3.4, 10.0.0.1".parse().unwrap());

            let ip = resolve_client_ip([None, None, None], &headers, remote_addr(), &cfg).unwrap();

            assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));
        }

        #[test]
        fn should_fall_back_to_the_connecting_address_when_the_header_is_absent() {
            let cfg = HttpTracker {
                real_ip_header: Some("X-Real-IP".to_owned()),
                ..HttpTracker::default()
            };

            let ip = resolve_client_ip([None, None, None], &HeaderMap::new(), remote_addr(), &cfg).unwrap();

            assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)));
        }
    }
}
