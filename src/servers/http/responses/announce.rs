//! `Announce` response for the HTTP tracker.
//!
//! Data structures and logic to build the `announce` response, in both
//! the [BEP 03](https://www.bittorrent.org/beps/bep_0003.html)
//! non-compact and the [BEP 23](https://www.bittorrent.org/beps/bep_0023.html)
//! compact formats, with [BEP 07](https://www.bittorrent.org/beps/bep_0007.html)
//! `peers6` records for IPv6.
use std::net::IpAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use swarm_tracker_bencode::{ben_bytes, ben_int, ben_list, ben_map, BencodeMut};
use swarm_tracker_primitives::peer;

use crate::core::AnnounceData;

/// Normal (non compact) `announce` response: the peers are a list of
/// dictionaries with `peer id`, `ip` and `port` keys.
#[derive(Debug, PartialEq, Eq)]
pub struct NonCompact {
    pub interval: u32,
    pub interval_min: u32,
    pub complete: u32,
    pub incomplete: u32,
    pub peers: Vec<Peer>,
}

/// Peer information in the [`NonCompact`] response.
#[derive(Debug, PartialEq, Eq)]
pub struct Peer {
    pub peer_id: [u8; 20],
    pub ip: IpAddr,
    pub port: u16,
}

impl Peer {
    #[must_use]
    pub fn ben_map(&self) -> BencodeMut {
        ben_map! {
            "ip" => ben_bytes!(self.ip.to_string()),
            "peer id" => ben_bytes!(self.peer_id.to_vec()),
            "port" => ben_int!(i64::from(self.port))
        }
    }
}

impl From<peer::Peer> for Peer {
    fn from(peer: peer::Peer) -> Self {
        Peer {
            peer_id: peer.peer_id.0,
            ip: peer.peer_addr.ip(),
            port: peer.peer_addr.port(),
        }
    }
}

impl NonCompact {
    /// Returns the bencoded body of the non-compact response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut peers_list = ben_list!();
        let peers_list_mut = peers_list.list_mut().expect("a list was just built");
        for peer in &self.peers {
            peers_list_mut.push(peer.ben_map());
        }

        (ben_map! {
            "complete" => ben_int!(i64::from(self.complete)),
            "incomplete" => ben_int!(i64::from(self.incomplete)),
            "interval" => ben_int!(i64::from(self.interval)),
            "min interval" => ben_int!(i64::from(self.interval_min)),
            "peers" => peers_list
        })
        .encode()
    }
}

impl IntoResponse for NonCompact {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

impl From<AnnounceData> for NonCompact {
    fn from(data: AnnounceData) -> Self {
        Self {
            interval: data.interval,
            interval_min: data.interval_min,
            complete: data.complete,
            incomplete: data.incomplete,
            peers: data.peers.into_iter().map(Peer::from).collect(),
        }
    }
}

/// Compact `announce` response.
///
/// _"To reduce the size of tracker responses and to reduce memory and
/// computational requirements in trackers, trackers may return peers as a
/// packed string rather than as a bencoded list."_
///
/// v4 peers pack into the 6-byte records of the `peers` key, v6 peers
/// into the 18-byte records of `peers6`. Keys whose packed string would
/// be empty are omitted.
#[derive(Debug, PartialEq, Eq)]
pub struct Compact {
    pub interval: u32,
    pub interval_min: u32,
    pub complete: u32,
    pub incomplete: u32,
    pub peers: Vec<CompactPeer>,
}

/// Compact peer. It's used in the [`Compact`] response: `IP ‖ port`,
/// without the peer id.
#[derive(Debug, PartialEq, Eq)]
pub struct CompactPeer {
    pub ip: IpAddr,
    pub port: u16,
}

impl From<peer::Peer> for CompactPeer {
    fn from(peer: peer::Peer) -> Self {
        Self {
            ip: peer.peer_addr.ip(),
            port: peer.peer_addr.port(),
        }
    }
}

impl Compact {
    /// Returns the bencoded body of the compact response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut v4_bytes: Vec<u8> = Vec::new();
        let mut v6_bytes: Vec<u8> = Vec::new();

        for peer in &self.peers {
            match peer.ip {
                IpAddr::V4(ip) => {
                    v4_bytes.extend_from_slice(&ip.octets());
                    v4_bytes.extend_from_slice(&peer.port.to_be_bytes());
                }
                IpAddr::V6(ip) => {
                    v6_bytes.extend_from_slice(&ip.octets());
                    v6_bytes.extend_from_slice(&peer.port.to_be_bytes());
                }
            }
        }

        let mut dict = ben_map! {
            "complete" => ben_int!(i64::from(self.complete)),
            "incomplete" => ben_int!(i64::from(self.incomplete)),
            "interval" => ben_int!(i64::from(self.interval)),
            "min interval" => ben_int!(i64::from(self.interval_min))
        };

        {
            let dict_mut = dict.dict_mut().expect("a dict was just built");
            if !v4_bytes.is_empty() {
                dict_mut.insert(b"peers".to_vec(), ben_bytes!(v4_bytes));
            }
            if !v6_bytes.is_empty() {
                dict_mut.insert(b"peers6".to_vec(), ben_bytes!(v6_bytes));
            }
        }

        dict.encode()
    }
}

impl IntoResponse for Compact {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

impl From<AnnounceData> for Compact {
    fn from(data: AnnounceData) -> Self {
        Self {
            interval: data.interval,
            interval_min: data.interval_min,
            complete: data.complete,
            incomplete: data.incomplete,
            peers: data.peers.into_iter().map(CompactPeer::from).collect(),
        }
    }
}
