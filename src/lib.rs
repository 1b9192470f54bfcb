//! **Swarm Tracker** is a standalone [`BitTorrent`](https://www.bittorrent.org/) tracker.
//!
//! Peers in a `BitTorrent` network need to know where they can find
//! other peers with the files they are looking for. Clients announce
//! their state for a swarm over HTTP or UDP and receive a sample of the
//! other active peers; scrapes return the aggregate counts. The tracker
//! never touches torrent data: per info-hash it only maintains the
//! currently-active peers, in memory.
//!
//! # Services
//!
//! - One [`UDP`](crate::servers::udp) tracker, per
//!   [BEP 15](https://www.bittorrent.org/beps/bep_0015.html) with the
//!   [BEP 41](https://www.bittorrent.org/beps/bep_0041.html) option
//!   extension and the legacy dual-stack announce.
//! - One [`HTTP(S)`](crate::servers::http) tracker, per
//!   [BEP 3](https://www.bittorrent.org/beps/bep_0003.html) /
//!   [BEP 23](https://www.bittorrent.org/beps/bep_0023.html).
//! - A [Prometheus exporter](crate::servers::metrics).
//!
//! # Components
//!
//! - [`core`]: the protocol-agnostic request pipeline — sanitiser,
//!   hook chains and the sharded in-memory [swarm
//!   store](crate::core::storage).
//! - [`servers`]: the network frontends.
//! - [`app`] / [`bootstrap`]: configuration loading and service
//!   lifecycle, including reload on `SIGUSR1` that preserves the swarm
//!   store.
//!
//! The tracker does not authenticate users, does not persist state
//! across restarts, and keeps no state outside the single process.
#[macro_use]
extern crate lazy_static;

pub mod app;
pub mod bootstrap;
pub mod core;
pub mod servers;
pub mod shared;

/// This code needs to be copied into each crate.
/// Working version, for production.
#[cfg(not(test))]
pub type CurrentClock = swarm_tracker_clock::clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
pub type CurrentClock = swarm_tracker_clock::clock::Stopped;
