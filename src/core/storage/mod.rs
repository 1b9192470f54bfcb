//! The in-memory swarm store.
//!
//! The store is the single synchronisation point of the tracker: an
//! index from info-hash to the two peer sets of the swarm (seeders and
//! leechers), sharded to keep lock contention per-swarm rather than
//! global. Everything else in the tracker is stateless or per-request.
//!
//! The [`Store`] trait is the contract the request pipeline depends on;
//! [`sharded::ShardedStore`] is the implementation this tracker runs. A
//! different store satisfying the same contract may be substituted.
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::{Fingerprint, Peer};
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;
use swarm_tracker_primitives::AddressFamily;
use thiserror::Error;

pub mod sharded;

/// Errors returned by the swarm store.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The swarm, or the peer in the requested role, is not in the store.
    #[error("swarm or peer does not exist")]
    ResourceDoesNotExist,
}

/// Contract of the swarm store.
///
/// Writes (`put_*`, `delete_*`, `graduate_leecher`) serialise per shard;
/// reads (`announce_peers`, `scrape_swarm`) take shared locks. No
/// cross-shard ordering is guaranteed.
pub trait Store: Send + Sync + 'static {
    /// Upserts the peer into the seeder set, creating the swarm if
    /// missing. A leecher with the same fingerprint is left in place;
    /// callers who mean graduation call [`Store::graduate_leecher`].
    fn put_seeder(&self, info_hash: &InfoHash, peer: &Peer);

    /// Upserts the peer into the leecher set, creating the swarm if
    /// missing.
    fn put_leecher(&self, info_hash: &InfoHash, peer: &Peer);

    /// Removes the peer from the seeder set.
    ///
    /// # Errors
    ///
    /// Will return `Error::ResourceDoesNotExist` if the swarm, or the
    /// peer in that role, is absent.
    fn delete_seeder(&self, info_hash: &InfoHash, peer: &Peer) -> Result<(), Error>;

    /// Removes the peer from the leecher set.
    ///
    /// # Errors
    ///
    /// Will return `Error::ResourceDoesNotExist` if the swarm, or the
    /// peer in that role, is absent.
    fn delete_leecher(&self, info_hash: &InfoHash, peer: &Peer) -> Result<(), Error>;

    /// Moves the peer from the leecher set (if present) to the seeder
    /// set, creating the swarm if missing. Idempotent.
    fn graduate_leecher(&self, info_hash: &InfoHash, peer: &Peer);

    /// Returns up to `num_want` peers of the announcer's address family,
    /// excluding the announcer itself.
    ///
    /// A seeder is handed only leechers; a leecher is handed seeders
    /// first, topped up with leechers.
    ///
    /// # Errors
    ///
    /// Will return `Error::ResourceDoesNotExist` if the swarm is absent.
    fn announce_peers(
        &self,
        info_hash: &InfoHash,
        as_seeder: bool,
        num_want: usize,
        announcer: &Fingerprint,
    ) -> Result<Vec<Peer>, Error>;

    /// Returns the swarm counts in the given family, zeroed when the
    /// swarm is absent. Never fails.
    fn scrape_swarm(&self, info_hash: &InfoHash, family: AddressFamily) -> SwarmMetadata;
}
