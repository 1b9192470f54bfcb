//! Hook appending a configured list of peers to announce responses.
use std::net::SocketAddr;

use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::peer::{self, Peer};
use swarm_tracker_primitives::{AddressFamily, DurationSinceUnixEpoch};

use super::Hook;
use crate::core::error::Error;
use crate::core::{AnnounceData, AnnounceRequest};

/// Peer id carried by injected peers. They are not real downloaders, so
/// there is no client behind the id.
const FIXED_PEER_ID: peer::Id = peer::Id([0u8; 20]);

/// Appends the configured peers of the announcer's address family to
/// every response and counts them as seeders.
pub struct FixedPeers {
    peers: Vec<SocketAddr>,
}

impl FixedPeers {
    #[must_use]
    pub fn new(peers: Vec<SocketAddr>) -> Self {
        Self { peers }
    }
}

impl Hook for FixedPeers {
    fn name(&self) -> &'static str {
        "fixed_peers"
    }

    fn on_announce(&self, request: &AnnounceRequest, response: &mut AnnounceData) -> Result<(), Error> {
        for addr in &self.peers {
            if AddressFamily::of(&addr.ip()) != request.family() {
                continue;
            }

            response.peers.push(Peer {
                peer_id: FIXED_PEER_ID,
                peer_addr: *addr,
                updated: DurationSinceUnixEpoch::ZERO,
                uploaded: 0,
                downloaded: 0,
                left: 0,
                event: AnnounceEvent::None,
            });
            response.complete += 1;
        }

        Ok(())
    }
}
