//! The domain layer of the tracker: the request pipeline.
//!
//! Both frontends translate their wire formats into the
//! [`AnnounceRequest`] and [`ScrapeRequest`] types of this module and
//! hand them to the [`Tracker`] service. The service:
//!
//! 1. sanitises the request ([`sanitize`]),
//! 2. runs the ordered pre-hook chain, any of which may mutate the
//!    response draft or short-circuit with an error,
//! 3. materialises the response from the swarm store (the built-in
//!    swarm-interaction finalizer),
//! 4. hands the response back to the frontend, which writes it,
//! 5. runs the post-hook chain asynchronously once the frontend reports
//!    the response as written.
//!
//! > **NOTICE**: the `Tracker` never touches the network. The frontends
//! > own the sockets and the wire formats.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use swarm_tracker_configuration::Configuration;
use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::{self, Fingerprint, Peer};
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;
use swarm_tracker_primitives::{AddressFamily, DurationSinceUnixEpoch, NumberOfBytes};
use swarm_tracker_clock::clock::Time;
use tracing::warn;

use self::error::Error;
use self::hooks::swarm_interaction::SwarmInteraction;
use self::hooks::Hook;
use self::sanitize::Limits;
use self::storage::Store;
use crate::CurrentClock;

pub mod error;
pub mod hooks;
pub mod sanitize;
pub mod statistics;
pub mod storage;

/// A protocol-agnostic announce request, as handed over by a frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    /// The resolved client IP. Canonicalised by the sanitiser.
    pub ip: IpAddr,
    pub port: u16,
    pub uploaded: NumberOfBytes,
    pub downloaded: NumberOfBytes,
    pub left: NumberOfBytes,
    pub event: AnnounceEvent,
    /// `None` until the sanitiser fills in the default.
    pub num_want: Option<u32>,
}

impl AnnounceRequest {
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    #[must_use]
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.ip)
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_parts(&self.peer_id, &self.peer_addr())
    }

    /// The peer record the swarm store receives for this announce.
    #[must_use]
    pub fn peer(&self, updated: DurationSinceUnixEpoch) -> Peer {
        Peer {
            peer_id: self.peer_id,
            peer_addr: self.peer_addr(),
            updated,
            uploaded: self.uploaded,
            downloaded: self.downloaded,
            left: self.left,
            event: self.event,
        }
    }

    /// Whether the announcer already holds the whole file.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left == 0
    }
}

/// A protocol-agnostic scrape request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub info_hashes: Vec<InfoHash>,
    /// Address family of the requesting client; scrape counts are
    /// reported for the matching half of the store.
    pub family: AddressFamily,
}

/// The draft, and finally the content, of an announce response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnounceData {
    /// Recommended seconds between two announces.
    pub interval: u32,
    /// Minimum seconds between two announces.
    pub interval_min: u32,
    /// Number of seeders in the swarm.
    pub complete: u32,
    /// Number of leechers in the swarm.
    pub incomplete: u32,
    /// The peers handed to the client. Same address family as the
    /// announcer.
    pub peers: Vec<Peer>,
}

/// The content of a scrape response. Entries keep the order of the
/// request, which the UDP wire format relies on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrapeData {
    pub files: Vec<(InfoHash, SwarmMetadata)>,
}

/// The request pipeline service.
pub struct Tracker {
    store: Arc<dyn Store>,
    prehooks: Vec<Box<dyn Hook>>,
    posthooks: Vec<Box<dyn Hook>>,
    finalizer: SwarmInteraction,
}

impl Tracker {
    /// Builds the service and its hook chains from the configuration.
    ///
    /// # Errors
    ///
    /// Will return `Err` when a hook option cannot be turned into its
    /// runtime form (e.g. a malformed info-hash in an approval list).
    pub fn new(config: &Configuration, store: Arc<dyn Store>) -> Result<Tracker, hooks::BuildError> {
        let policy = config.announce_policy();

        Ok(Tracker {
            prehooks: hooks::build_chain(&config.prehooks, policy)?,
            posthooks: hooks::build_chain(&config.posthooks, policy)?,
            finalizer: SwarmInteraction::new(store.clone()),
            store,
        })
    }

    /// It handles an announce request.
    ///
    /// BEP 03: [The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html).
    ///
    /// # Errors
    ///
    /// Will return a client error when the request is rejected by the
    /// sanitiser or a hook, and an internal error when a hook fails.
    pub fn handle_announce(&self, mut request: AnnounceRequest, limits: &Limits) -> Result<AnnounceData, Error> {
        sanitize::announce(&mut request, limits)?;

        let mut response = AnnounceData::default();

        for hook in &self.prehooks {
            hook.on_announce(&request, &mut response)?;
        }

        self.finalizer.fill_announce(&request, &mut response)?;

        Ok(response)
    }

    /// It handles a scrape request.
    ///
    /// BEP 48: [Tracker Protocol Extension: Scrape](https://www.bittorrent.org/beps/bep_0048.html).
    ///
    /// # Errors
    ///
    /// Will return an error when a hook vetoes the request (e.g. the
    /// info-hash approval hook in `block` mode).
    pub fn handle_scrape(&self, mut request: ScrapeRequest, limits: &Limits) -> Result<ScrapeData, Error> {
        sanitize::scrape(&mut request, limits);

        let mut response = ScrapeData::default();

        for hook in &self.prehooks {
            hook.on_scrape(&mut request, &mut response)?;
        }

        for info_hash in &request.info_hashes {
            let metadata = self.store.scrape_swarm(info_hash, request.family);
            response.files.push((*info_hash, metadata));
        }

        Ok(response)
    }

    /// Schedules the post-hooks of an announce. Called by the frontend
    /// once the response has been written; errors are logged only.
    pub fn dispatch_announce_post_hooks(self: &Arc<Self>, request: AnnounceRequest, response: AnnounceData) {
        if self.posthooks.is_empty() {
            return;
        }

        let tracker = self.clone();
        tokio::spawn(async move {
            let mut response = response;
            for hook in &tracker.posthooks {
                if let Err(e) = hook.on_announce(&request, &mut response) {
                    warn!(hook = hook.name(), "announce post-hook failed: {e}");
                }
            }
        });
    }

    /// Schedules the post-hooks of a scrape.
    pub fn dispatch_scrape_post_hooks(self: &Arc<Self>, request: ScrapeRequest, response: ScrapeData) {
        if self.posthooks.is_empty() {
            return;
        }

        let tracker = self.clone();
        tokio::spawn(async move {
            let mut request = request;
            let mut response = response;
            for hook in &tracker.posthooks {
                if let Err(e) = hook.on_scrape(&mut request, &mut response) {
                    warn!(hook = hook.name(), "scrape post-hook failed: {e}");
                }
            }
        });
    }
}

/// The timestamp new peer records carry. The store overwrites it with
/// its cached clock; this value only matters to post-hooks inspecting
/// the request.
#[must_use]
pub fn now() -> DurationSinceUnixEpoch {
    CurrentClock::now()
}
