//! The built-in finalizer: the single place the pipeline touches the
//! swarm store.
//!
//! It always runs after the configured pre-hooks. The announce event and
//! the `left` counter decide how the announcing peer lands in the store:
//!
//! - `stopped`: the peer is deleted from both roles. A peer the store
//!   never saw is a no-op, not an error.
//! - `completed`, or `left == 0`: the peer graduates to the seeder set.
//! - otherwise: the peer is upserted as a leecher.
//!
//! Afterwards the swarm counts and the peer list are copied into the
//! response.
use std::sync::Arc;

use super::Hook;
use crate::core::error::Error;
use crate::core::storage::{self, Store};
use crate::core::{AnnounceData, AnnounceRequest};
use swarm_tracker_primitives::announce_event::AnnounceEvent;

pub struct SwarmInteraction {
    store: Arc<dyn Store>,
}

impl SwarmInteraction {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Applies the announce to the store and fills the response.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature matches the hook contract so
    /// the finalizer can also be configured as an explicit last
    /// pre-hook.
    pub fn fill_announce(&self, request: &AnnounceRequest, response: &mut AnnounceData) -> Result<(), Error> {
        let info_hash = &request.info_hash;
        let peer = request.peer(crate::core::now());

        match request.event {
            AnnounceEvent::Stopped => {
                let _ = self.store.delete_seeder(info_hash, &peer);
                let _ = self.store.delete_leecher(info_hash, &peer);
            }
            AnnounceEvent::Completed => self.store.graduate_leecher(info_hash, &peer),
            _ if request.is_seeder() => self.store.graduate_leecher(info_hash, &peer),
            _ => self.store.put_leecher(info_hash, &peer),
        }

        let metadata = self.store.scrape_swarm(info_hash, request.family());
        response.complete += metadata.complete;
        response.incomplete += metadata.incomplete;

        let num_want = request.num_want.unwrap_or(0) as usize;
        if num_want > 0 {
            match self
                .store
                .announce_peers(info_hash, request.is_seeder(), num_want, &request.fingerprint())
            {
                Ok(peers) => response.peers.extend(peers),
                // The swarm vanished (e.g. a stopped announce emptied it).
                Err(storage::Error::ResourceDoesNotExist) => {}
            }
        }

        Ok(())
    }
}

impl Hook for SwarmInteraction {
    fn name(&self) -> &'static str {
        "swarm_interaction"
    }

    fn on_announce(&self, request: &AnnounceRequest, response: &mut AnnounceData) -> Result<(), Error> {
        self.fill_announce(request, response)
    }
}
