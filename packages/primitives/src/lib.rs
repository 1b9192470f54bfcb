//! Primitive types for the [Swarm Tracker](https://docs.rs/swarm-tracker).
//!
//! This crate contains the basic data structures shared by the tracker
//! server crate and its sibling packages: info-hashes, peers and the
//! values derived from them.
use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod announce_event;
pub mod info_hash;
pub mod peer;
pub mod swarm_metadata;

/// Duration since the Unix Epoch. This is the timestamp format used by
/// all the tracker clocks.
pub type DurationSinceUnixEpoch = Duration;

/// Number of bytes reported by a peer in an announce request
/// (`uploaded`, `downloaded` or `left`).
pub type NumberOfBytes = i64;

/// The IP family of a peer or a swarm.
///
/// IPv4 and IPv6 swarms are kept apart: a v4 announce only ever returns
/// v4 peers and the other way around.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, Debug, derive_more::Display)]
pub enum AddressFamily {
    #[serde(rename = "ipv4")]
    #[display("IPv4")]
    V4,
    #[serde(rename = "ipv6")]
    #[display("IPv6")]
    V6,
}

impl AddressFamily {
    #[must_use]
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Label used for the `address_family` dimension of the metrics.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::V4 => "ipv4",
            Self::V6 => "ipv6",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use crate::AddressFamily;

    #[test]
    fn address_family_should_be_derived_from_an_ip_address() {
        assert_eq!(AddressFamily::of(&IpAddr::V4(Ipv4Addr::LOCALHOST)), AddressFamily::V4);
        assert_eq!(AddressFamily::of(&IpAddr::V6(Ipv6Addr::LOCALHOST)), AddressFamily::V6);
    }
}
