use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the in-memory swarm store.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Storage {
    /// Interval between two garbage collection sweeps.
    #[serde(default = "Storage::default_gc_interval", with = "humantime_serde")]
    pub gc_interval: Duration,

    /// How long a peer stays in a swarm after its last announce.
    #[serde(default = "Storage::default_peer_lifetime", with = "humantime_serde")]
    pub peer_lifetime: Duration,

    /// Number of shards per address family. Raising it lowers lock
    /// contention at the cost of memory.
    #[serde(default = "Storage::default_shard_count")]
    pub shard_count: u32,

    /// Interval between two gauge refreshes.
    #[serde(default = "Storage::default_prometheus_reporting_interval", with = "humantime_serde")]
    pub prometheus_reporting_interval: Duration,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            gc_interval: Self::default_gc_interval(),
            peer_lifetime: Self::default_peer_lifetime(),
            shard_count: Self::default_shard_count(),
            prometheus_reporting_interval: Self::default_prometheus_reporting_interval(),
        }
    }
}

impl Storage {
    fn default_gc_interval() -> Duration {
        Duration::from_secs(3 * 60)
    }

    fn default_peer_lifetime() -> Duration {
        Duration::from_secs(31 * 60)
    }

    fn default_shard_count() -> u32 {
        1024
    }

    fn default_prometheus_reporting_interval() -> Duration {
        Duration::from_secs(1)
    }
}
