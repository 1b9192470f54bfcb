//! The sharded swarm store.
//!
//! Swarms are spread over `2 · shard_count` peer tables: the lower half
//! serves IPv4 swarms, the upper half IPv6 ones. The shard of a swarm is
//! derived from the first four bytes of its info-hash, so address-family
//! selection costs nothing and lock fan-out does not depend on family.
//!
//! Each shard has its own reader/writer lock and maintains seeder and
//! leecher counters alongside its maps. There is no cross-shard
//! coordination: two operations on different shards always proceed in
//! parallel.
//!
//! The store owns three background tasks:
//!
//! - the cached clock, refreshing a shared nanosecond counter once per
//!   second so peer mtimes never pay for a syscall,
//! - the garbage collector, reaping peers older than `peer_lifetime`,
//! - the gauge reporter, summing the shard counters for Prometheus.
//!
//! The store is a one-shot resource: after [`ShardedStore::stop`] every
//! operation panics.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use swarm_tracker_clock::clock::Time;
use swarm_tracker_configuration::Storage;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::{Fingerprint, Peer};
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;
use swarm_tracker_primitives::{AddressFamily, DurationSinceUnixEpoch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Error, Store};
use crate::core::statistics::METRICS;
use crate::CurrentClock;

/// One swarm: the seeder and leecher sets, keyed by peer fingerprint,
/// holding the mtime of the peer's last announce in nanoseconds.
#[derive(Debug, Default)]
struct Swarm {
    seeders: HashMap<Fingerprint, u64>,
    leechers: HashMap<Fingerprint, u64>,
    /// Number of leechers that graduated in this swarm.
    downloaded: u32,
}

impl Swarm {
    fn is_empty(&self) -> bool {
        self.seeders.is_empty() && self.leechers.is_empty()
    }
}

/// One of the `2 · shard_count` peer tables.
///
/// The counters equal the sums of the respective map cardinalities at
/// any point where the lock is not held for writing.
#[derive(Debug, Default)]
struct Shard {
    swarms: HashMap<InfoHash, Swarm>,
    num_seeders: usize,
    num_leechers: usize,
}

impl Shard {
    /// Deletes the peers of one swarm whose mtime is at or before
    /// `cutoff`, dropping the swarm when it becomes empty.
    fn prune_swarm(&mut self, info_hash: &InfoHash, cutoff: u64) {
        let Self {
            swarms,
            num_seeders,
            num_leechers,
        } = self;

        let Some(swarm) = swarms.get_mut(info_hash) else {
            return;
        };

        let seeders_before = swarm.seeders.len();
        swarm.seeders.retain(|_, mtime| *mtime > cutoff);
        *num_seeders -= seeders_before - swarm.seeders.len();

        let leechers_before = swarm.leechers.len();
        swarm.leechers.retain(|_, mtime| *mtime > cutoff);
        *num_leechers -= leechers_before - swarm.leechers.len();

        if swarm.is_empty() {
            swarms.remove(info_hash);
        }
    }
}

/// The shared nanosecond counter the store stamps mtimes with.
///
/// Comparisons in this domain are always against `now - peer_lifetime`
/// with `peer_lifetime` far above one second, so a once-per-second
/// refresh is precise enough.
#[derive(Debug, Default)]
struct CachedClock {
    nanos: AtomicU64,
}

impl CachedClock {
    #[allow(clippy::cast_possible_truncation)]
    fn refresh(&self) {
        self.nanos.store(CurrentClock::now().as_nanos() as u64, Ordering::Release);
    }

    fn now_nanos(&self) -> u64 {
        self.nanos.load(Ordering::Acquire)
    }
}

/// Handles of the background tasks, taken on stop.
struct BackgroundTasks {
    shutdown: tokio::sync::watch::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

/// The in-memory, sharded swarm store.
pub struct ShardedStore {
    /// `2 · shard_count` entries: v4 shards first, then v6.
    shards: Vec<RwLock<Shard>>,
    shard_count: usize,
    clock: CachedClock,
    peer_lifetime: Duration,
    gc_interval: Duration,
    reporting_interval: Duration,
    closed: AtomicBool,
    tasks: Mutex<Option<BackgroundTasks>>,
}

impl ShardedStore {
    /// Builds the store. Background tasks are attached separately with
    /// [`ShardedStore::start_background_tasks`], once a runtime exists.
    #[must_use]
    pub fn new(config: &Storage) -> Self {
        let shard_count = usize::try_from(config.shard_count).expect("shard_count should fit in a usize");
        assert!(shard_count > 0, "shard_count must be at least 1");

        let mut shards = Vec::with_capacity(shard_count * 2);
        shards.resize_with(shard_count * 2, RwLock::default);

        let clock = CachedClock::default();
        clock.refresh();

        Self {
            shards,
            shard_count,
            clock,
            peer_lifetime: config.peer_lifetime,
            gc_interval: config.gc_interval,
            reporting_interval: config.prometheus_reporting_interval,
            closed: AtomicBool::new(false),
            tasks: Mutex::new(None),
        }
    }

    /// Spawns the clock, garbage collection and gauge reporting tasks.
    ///
    /// # Panics
    ///
    /// Will panic if called twice, or outside a tokio runtime.
    pub fn start_background_tasks(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().expect("the task mutex should not be poisoned");
        assert!(tasks.is_none(), "the store background tasks are already running");

        let (shutdown, _) = tokio::sync::watch::channel(());

        let handles = vec![
            spawn_periodic(self, &shutdown, Duration::from_secs(1), |store| async move {
                store.clock.refresh();
            }),
            spawn_periodic(self, &shutdown, self.gc_interval, |store| async move {
                store.collect_garbage().await;
            }),
            spawn_periodic(self, &shutdown, self.reporting_interval, |store| async move {
                store.report_gauges();
            }),
        ];

        *tasks = Some(BackgroundTasks { shutdown, handles });
    }

    /// Signals the background tasks to exit and waits for them. The
    /// store is closed afterwards: any further operation panics.
    /// Stopping twice is a no-op.
    pub async fn stop(&self) {
        let tasks = self.tasks.lock().expect("the task mutex should not be poisoned").take();

        if let Some(tasks) = tasks {
            drop(tasks.shutdown);
            for handle in tasks.handles {
                if let Err(e) = handle.await {
                    warn!("store background task failed to shut down: {e}");
                }
            }
        }

        self.closed.store(true, Ordering::Release);
    }

    fn assert_open(&self) {
        assert!(
            !self.closed.load(Ordering::Acquire),
            "the swarm store has been stopped and cannot be used again"
        );
    }

    /// Shard index: first four bytes of the info-hash, big-endian, mod
    /// the per-family shard count, offset into the upper half for v6.
    fn shard_index(&self, info_hash: &InfoHash, family: AddressFamily) -> usize {
        let prefix = u32::from_be_bytes(info_hash.0[0..4].try_into().expect("an info-hash has at least 4 bytes"));
        let index = prefix as usize % self.shard_count;

        match family {
            AddressFamily::V4 => index,
            AddressFamily::V6 => index + self.shard_count,
        }
    }

    fn shard(&self, info_hash: &InfoHash, family: AddressFamily) -> &RwLock<Shard> {
        &self.shards[self.shard_index(info_hash, family)]
    }

    /// Deletes every peer whose mtime is at or before `cutoff_nanos`,
    /// in one synchronous sweep. The periodic task prefers
    /// [`Self::collect_garbage`], which yields between swarms.
    pub fn purge_inactive_peers(&self, cutoff_nanos: u64) {
        self.assert_open();

        for shard in &self.shards {
            let keys: Vec<InfoHash> = {
                let shard = shard.read().expect("the shard read lock should not be poisoned");
                shard.swarms.keys().copied().collect()
            };

            for info_hash in keys {
                let mut shard = shard.write().expect("the shard write lock should not be poisoned");
                shard.prune_swarm(&info_hash, cutoff_nanos);
            }
        }
    }

    /// One garbage collection sweep.
    ///
    /// Per shard: snapshot the key set under a read lock, then reap each
    /// swarm under its own short write lock, yielding to the scheduler
    /// between swarms so the sweep never monopolises the store.
    async fn collect_garbage(&self) {
        let started_at = Instant::now();
        #[allow(clippy::cast_possible_truncation)]
        let cutoff = self.clock.now_nanos().saturating_sub(self.peer_lifetime.as_nanos() as u64);

        for shard in &self.shards {
            let keys: Vec<InfoHash> = {
                let shard = shard.read().expect("the shard read lock should not be poisoned");
                shard.swarms.keys().copied().collect()
            };

            for info_hash in keys {
                {
                    let mut shard = shard.write().expect("the shard write lock should not be poisoned");
                    shard.prune_swarm(&info_hash, cutoff);
                }
                tokio::task::yield_now().await;
            }

            tokio::task::yield_now().await;
        }

        let elapsed = started_at.elapsed();
        METRICS.set_gc_duration(elapsed);
        debug!("garbage collection sweep finished in {elapsed:?}");
    }

    /// Sums the shard counters into the Prometheus gauges. Each shard is
    /// read-locked on its own, so writers are never blocked for longer
    /// than a single shard iteration.
    fn report_gauges(&self) {
        let mut infohashes = 0;
        let mut seeders = 0;
        let mut leechers = 0;

        for shard in &self.shards {
            let shard = shard.read().expect("the shard read lock should not be poisoned");
            infohashes += shard.swarms.len();
            seeders += shard.num_seeders;
            leechers += shard.num_leechers;
        }

        METRICS.set_swarm_totals(infohashes, seeders, leechers);
    }

    #[cfg(test)]
    fn counter_totals(&self) -> (usize, usize) {
        self.shards.iter().fold((0, 0), |(seeders, leechers), shard| {
            let shard = shard.read().unwrap();
            (seeders + shard.num_seeders, leechers + shard.num_leechers)
        })
    }

    #[cfg(test)]
    fn cardinality_totals(&self) -> (usize, usize) {
        self.shards.iter().fold((0, 0), |(seeders, leechers), shard| {
            let shard = shard.read().unwrap();
            let s: usize = shard.swarms.values().map(|swarm| swarm.seeders.len()).sum();
            let l: usize = shard.swarms.values().map(|swarm| swarm.leechers.len()).sum();
            (seeders + s, leechers + l)
        })
    }
}

/// Spawns a task ticking `period`, stopping when `shutdown` is dropped.
fn spawn_periodic<F, Fut>(
    store: &Arc<ShardedStore>,
    shutdown: &tokio::sync::watch::Sender<()>,
    period: Duration,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<ShardedStore>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let store = store.clone();
    let mut shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    tick(store.clone()).await;
                }
            }
        }
    })
}

impl Store for ShardedStore {
    fn put_seeder(&self, info_hash: &InfoHash, peer: &Peer) {
        self.assert_open();

        let fingerprint = peer.fingerprint();
        let now = self.clock.now_nanos();

        let mut shard = self
            .shard(info_hash, peer.address_family())
            .write()
            .expect("the shard write lock should not be poisoned");
        let Shard {
            swarms, num_seeders, ..
        } = &mut *shard;

        let swarm = swarms.entry(*info_hash).or_default();
        if swarm.seeders.insert(fingerprint, now).is_none() {
            *num_seeders += 1;
        }
    }

    fn put_leecher(&self, info_hash: &InfoHash, peer: &Peer) {
        self.assert_open();

        let fingerprint = peer.fingerprint();
        let now = self.clock.now_nanos();

        let mut shard = self
            .shard(info_hash, peer.address_family())
            .write()
            .expect("the shard write lock should not be poisoned");
        let Shard {
            swarms, num_leechers, ..
        } = &mut *shard;

        let swarm = swarms.entry(*info_hash).or_default();
        if swarm.leechers.insert(fingerprint, now).is_none() {
            *num_leechers += 1;
        }
    }

    fn delete_seeder(&self, info_hash: &InfoHash, peer: &Peer) -> Result<(), Error> {
        self.assert_open();

        let fingerprint = peer.fingerprint();

        let mut shard = self
            .shard(info_hash, peer.address_family())
            .write()
            .expect("the shard write lock should not be poisoned");
        let Shard {
            swarms, num_seeders, ..
        } = &mut *shard;

        let swarm = swarms.get_mut(info_hash).ok_or(Error::ResourceDoesNotExist)?;

        if swarm.seeders.remove(&fingerprint).is_none() {
            return Err(Error::ResourceDoesNotExist);
        }
        *num_seeders -= 1;

        if swarm.is_empty() {
            swarms.remove(info_hash);
        }

        Ok(())
    }

    fn delete_leecher(&self, info_hash: &InfoHash, peer: &Peer) -> Result<(), Error> {
        self.assert_open();

        let fingerprint = peer.fingerprint();

        let mut shard = self
            .shard(info_hash, peer.address_family())
            .write()
            .expect("the shard write lock should not be poisoned");
        let Shard {
            swarms, num_leechers, ..
        } = &mut *shard;

        let swarm = swarms.get_mut(info_hash).ok_or(Error::ResourceDoesNotExist)?;

        if swarm.leechers.remove(&fingerprint).is_none() {
            return Err(Error::ResourceDoesNotExist);
        }
        *num_leechers -= 1;

        if swarm.is_empty() {
            swarms.remove(info_hash);
        }

        Ok(())
    }

    fn graduate_leecher(&self, info_hash: &InfoHash, peer: &Peer) {
        self.assert_open();

        let fingerprint = peer.fingerprint();
        let now = self.clock.now_nanos();

        let mut shard = self
            .shard(info_hash, peer.address_family())
            .write()
            .expect("the shard write lock should not be poisoned");
        let Shard {
            swarms,
            num_seeders,
            num_leechers,
        } = &mut *shard;

        let swarm = swarms.entry(*info_hash).or_default();

        if swarm.leechers.remove(&fingerprint).is_some() {
            *num_leechers -= 1;
            swarm.downloaded += 1;
        }

        if swarm.seeders.insert(fingerprint, now).is_none() {
            *num_seeders += 1;
        }
    }

    fn announce_peers(
        &self,
        info_hash: &InfoHash,
        as_seeder: bool,
        num_want: usize,
        announcer: &Fingerprint,
    ) -> Result<Vec<Peer>, Error> {
        self.assert_open();

        let shard = self
            .shard(info_hash, announcer.address_family())
            .read()
            .expect("the shard read lock should not be poisoned");

        let swarm = shard.swarms.get(info_hash).ok_or(Error::ResourceDoesNotExist)?;

        let mut peers = Vec::with_capacity(num_want.min(swarm.seeders.len() + swarm.leechers.len()));

        if as_seeder {
            // Seeders are not interested in each other.
            collect_peers(&swarm.leechers, announcer, num_want, &mut peers);
        } else {
            collect_peers(&swarm.seeders, announcer, num_want, &mut peers);
            collect_peers(&swarm.leechers, announcer, num_want, &mut peers);
        }

        Ok(peers)
    }

    fn scrape_swarm(&self, info_hash: &InfoHash, family: AddressFamily) -> SwarmMetadata {
        self.assert_open();

        let shard = self
            .shard(info_hash, family)
            .read()
            .expect("the shard read lock should not be poisoned");

        match shard.swarms.get(info_hash) {
            Some(swarm) => SwarmMetadata {
                downloaded: swarm.downloaded,
                #[allow(clippy::cast_possible_truncation)]
                complete: swarm.seeders.len() as u32,
                #[allow(clippy::cast_possible_truncation)]
                incomplete: swarm.leechers.len() as u32,
            },
            None => SwarmMetadata::zeroed(),
        }
    }
}

/// Appends up to `num_want - peers.len()` entries from `set`, skipping
/// the announcer. Map iteration order is arbitrary, which is all the
/// selection contract asks for.
fn collect_peers(set: &HashMap<Fingerprint, u64>, announcer: &Fingerprint, num_want: usize, peers: &mut Vec<Peer>) {
    for (fingerprint, mtime) in set {
        if peers.len() >= num_want {
            return;
        }
        if fingerprint == announcer {
            continue;
        }

        let (peer_id, peer_addr) = fingerprint.to_parts();

        // Response peers carry identity fields only; the transfer stats
        // of other peers are not tracked.
        peers.push(Peer {
            peer_id,
            peer_addr,
            updated: DurationSinceUnixEpoch::from_nanos(*mtime),
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: swarm_tracker_primitives::announce_event::AnnounceEvent::None,
        });
    }
}
