//! Request sanitisation.
//!
//! Runs before any hook: clamps `numwant` and the scrape hash count to
//! the frontend limits, rejects unusable ports and collapses 4-in-6
//! mapped addresses so a v4 client reaching a v6 socket lands in the v4
//! half of the store.
use std::net::IpAddr;

use swarm_tracker_configuration::{HttpTracker, UdpTracker};

use crate::core::error::Error;
use crate::core::{AnnounceRequest, ScrapeRequest};

/// The per-frontend request limits.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_numwant: u32,
    pub default_numwant: u32,
    pub max_scrape_infohashes: u32,
}

impl From<&HttpTracker> for Limits {
    fn from(config: &HttpTracker) -> Self {
        Self {
            max_numwant: config.max_numwant,
            default_numwant: config.default_numwant,
            max_scrape_infohashes: config.max_scrape_infohashes,
        }
    }
}

impl From<&UdpTracker> for Limits {
    fn from(config: &UdpTracker) -> Self {
        Self {
            max_numwant: config.max_numwant,
            default_numwant: config.default_numwant,
            max_scrape_infohashes: config.max_scrape_infohashes,
        }
    }
}

/// Sanitises an announce request in place.
///
/// # Errors
///
/// Will return `Error::InvalidPort` for port zero.
pub fn announce(request: &mut AnnounceRequest, limits: &Limits) -> Result<(), Error> {
    if request.port == 0 {
        return Err(Error::InvalidPort);
    }

    request.ip = canonical_ip(request.ip);

    request.num_want = Some(match request.num_want {
        Some(wanted) => wanted.min(limits.max_numwant),
        None => limits.default_numwant,
    });

    Ok(())
}

/// Sanitises a scrape request in place: the hash list is truncated, not
/// rejected, when it exceeds the limit.
pub fn scrape(request: &mut ScrapeRequest, limits: &Limits) {
    request
        .info_hashes
        .truncate(usize::try_from(limits.max_scrape_infohashes).expect("the scrape limit should fit in a usize"));
}

/// Collapses a 4-in-6 mapped address to its IPv4 form. The address
/// family of a peer is decided after this step.
#[must_use]
pub fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(_) => ip,
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
    }
}

#[cfg(test)]
mod tests {

    mod it_should {
        use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

        use swarm_tracker_primitives::announce_event::AnnounceEvent;
        use swarm_tracker_primitives::info_hash::InfoHash;
        use swarm_tracker_primitives::peer;

        use crate::core::sanitize::{announce, canonical_ip, scrape, Limits};
        use crate::core::{AnnounceRequest, ScrapeRequest};

        fn limits() -> Limits {
            Limits {
                max_numwant: 100,
                default_numwant: 50,
                max_scrape_infohashes: 3,
            }
        }

        fn announce_request() -> AnnounceRequest {
            AnnounceRequest {
                info_hash: InfoHash([0x69; 20]),
                peer_id: peer::Id(*b"-qB00000000000000001"),
                ip: IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)),
                port: 6881,
                uploaded: 0,
                downloaded: 0,
                left: 100,
                event: AnnounceEvent::Started,
                num_want: None,
            }
        }

        #[test]
        fn reject_port_zero() {
            let mut request = announce_request();
            request.port = 0;

            assert!(announce(&mut request, &limits()).is_err());
        }

        #[test]
        fn use_the_default_numwant_when_absent() {
            let mut request = announce_request();
            request.num_want = None;

            announce(&mut request, &limits()).unwrap();

            assert_eq!(request.num_want, Some(50));
        }

        #[test]
        fn clamp_numwant_to_the_maximum() {
            let mut request = announce_request();
            request.num_want = Some(5000);

            announce(&mut request, &limits()).unwrap();

            assert_eq!(request.num_want, Some(100));
        }

        #[test]
        fn keep_a_numwant_within_the_limit() {
            let mut request = announce_request();
            request.num_want = Some(25);

            announce(&mut request, &limits()).unwrap();

            assert_eq!(request.num_want, Some(25));
        }

        #[test]
        fn collapse_a_4in6_mapped_address_to_ipv4() {
            let mut request = announce_request();
            request.ip = IpAddr::V6(Ipv4Addr::new(1, 2, 3, 4).to_ipv6_mapped());

            announce(&mut request, &limits()).unwrap();

            assert_eq!(request.ip, IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));
        }

        #[test]
        fn leave_a_plain_v6_address_alone() {
            let ip = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));

            assert_eq!(canonical_ip(ip), ip);
        }

        #[test]
        fn truncate_an_oversized_scrape() {
            let mut request = ScrapeRequest {
                info_hashes: (0..10u8).map(|i| InfoHash([i; 20])).collect(),
                family: swarm_tracker_primitives::AddressFamily::V4,
            };

            scrape(&mut request, &limits());

            assert_eq!(request.info_hashes.len(), 3);
        }
    }
}
