//! Hook mixing plausible random peers into announce responses.
//!
//! With the configured probability the response is modified: up to
//! `max_random_peers` generated peers are inserted at random positions.
//! Generated addresses keep every octet within `[1, 254]` so they look
//! routable without ever being broadcast or network addresses; peer ids
//! are the configured prefix padded with random digits; ports are
//! uniform in `[min_port, max_port)`.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Mutex;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::peer::{self, Peer};
use swarm_tracker_primitives::{AddressFamily, DurationSinceUnixEpoch};

use super::Hook;
use crate::core::error::Error;
use crate::core::{AnnounceData, AnnounceRequest};

/// Size of the generator pool. Requests pick a generator by info-hash,
/// so swarms stay decorrelated without a global lock on one RNG.
const RNG_POOL_SIZE: usize = 64;

pub struct Deniability {
    probability: f64,
    max_random_peers: u32,
    prefix: Vec<u8>,
    min_port: u16,
    max_port: u16,
    rngs: Vec<Mutex<SmallRng>>,
}

impl Deniability {
    #[must_use]
    pub fn new(probability: f64, max_random_peers: u32, prefix: &[u8], min_port: u16, max_port: u16) -> Self {
        let rngs = (0..RNG_POOL_SIZE).map(|_| Mutex::new(SmallRng::from_entropy())).collect();

        Self {
            probability,
            max_random_peers,
            prefix: prefix.to_vec(),
            min_port,
            max_port,
            rngs,
        }
    }

    fn rng_for(&self, request: &AnnounceRequest) -> &Mutex<SmallRng> {
        let prefix = u32::from_be_bytes(
            request.info_hash.0[0..4]
                .try_into()
                .expect("an info-hash has at least 4 bytes"),
        );
        &self.rngs[prefix as usize % RNG_POOL_SIZE]
    }

    fn random_peer(&self, rng: &mut SmallRng, family: AddressFamily) -> Peer {
        let ip = match family {
            AddressFamily::V4 => IpAddr::V4(Ipv4Addr::new(
                rng.gen_range(1..=254),
                rng.gen_range(1..=254),
                rng.gen_range(1..=254),
                rng.gen_range(1..=254),
            )),
            AddressFamily::V6 => {
                let mut octets = [0u8; 16];
                for octet in &mut octets {
                    *octet = rng.gen_range(1..=254);
                }
                IpAddr::V6(Ipv6Addr::from(octets))
            }
        };

        let port = rng.gen_range(self.min_port..self.max_port);

        let mut id = [0u8; 20];
        let prefix_len = self.prefix.len().min(20);
        id[..prefix_len].copy_from_slice(&self.prefix[..prefix_len]);
        for byte in &mut id[prefix_len..] {
            *byte = b'0' + rng.gen_range(0..10u8);
        }

        Peer {
            peer_id: peer::Id(id),
            peer_addr: SocketAddr::new(ip, port),
            updated: DurationSinceUnixEpoch::ZERO,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: AnnounceEvent::None,
        }
    }
}

impl Hook for Deniability {
    fn name(&self) -> &'static str {
        "deniability"
    }

    fn on_announce(&self, request: &AnnounceRequest, response: &mut AnnounceData) -> Result<(), Error> {
        let mut rng = self.rng_for(request).lock().expect("the rng mutex should not be poisoned");

        if rng.gen::<f64>() >= self.probability {
            return Ok(());
        }

        let count = rng.gen_range(1..=self.max_random_peers.max(1));
        for _ in 0..count {
            let peer = self.random_peer(&mut rng, request.family());
            let position = rng.gen_range(0..=response.peers.len());
            response.peers.insert(position, peer);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {

    mod it_should {
        use std::net::{IpAddr, Ipv4Addr};

        use swarm_tracker_primitives::announce_event::AnnounceEvent;
        use swarm_tracker_primitives::info_hash::InfoHash;
        use swarm_tracker_primitives::peer;

        use crate::core::hooks::deniability::Deniability;
        use crate::core::hooks::Hook;
        use crate::core::{AnnounceData, AnnounceRequest};

        fn request() -> AnnounceRequest {
            AnnounceRequest {
                info_hash: InfoHash([0x69; 20]),
                peer_id: peer::Id(*b"-qB00000000000000001"),
                ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 6881,
                uploaded: 0,
                downloaded: 0,
                left: 100,
                event: AnnounceEvent::Started,
                num_want: None,
            }
        }

        #[test]
        fn never_modify_the_response_with_zero_probability() {
            let hook = Deniability::new(0.0, 5, b"-DN0000-", 2000, 3000);

            let mut response = AnnounceData::default();
            for _ in 0..50 {
                hook.on_announce(&request(), &mut response).unwrap();
            }

            assert!(response.peers.is_empty());
        }

        #[test]
        fn generate_plausible_peers_with_probability_one() {
            let hook = Deniability::new(1.0, 5, b"-DN0000-", 2000, 3000);

            let mut response = AnnounceData::default();
            hook.on_announce(&request(), &mut response).unwrap();

            assert!(!response.peers.is_empty());
            assert!(response.peers.len() <= 5);

            for peer in &response.peers {
                let IpAddr::V4(ip) = peer.peer_addr.ip() else {
                    panic!("a v4 announce should only receive v4 peers");
                };
                assert!(ip.octets().iter().all(|octet| (1..=254).contains(octet)));
                assert!((2000..3000).contains(&peer.peer_addr.port()));
                assert!(peer.peer_id.0.starts_with(b"-DN0000-"));
                assert!(peer.peer_id.0[8..].iter().all(u8::is_ascii_digit));
            }
        }

        #[test]
        fn pad_the_peer_id_prefix_with_random_digits() {
            let hook = Deniability::new(1.0, 1, b"-DN0000-", 2000, 2001);

            let mut response = AnnounceData::default();
            hook.on_announce(&request(), &mut response).unwrap();

            let id = response.peers[0].peer_id.0;
            assert_eq!(&id[..8], b"-DN0000-");
            assert_eq!(id.len(), 20);
        }
    }
}
