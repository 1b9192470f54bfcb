//! Peer types used by the swarm store and both frontends.
//!
//! A peer is identified inside a swarm by its [`Fingerprint`]: the
//! serialised `peer id ‖ port ‖ ip bytes`. Clients behind NAT can share
//! a peer id while being distinct peers, so the id alone is not a key.
use std::net::{IpAddr, SocketAddr};
use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

use crate::announce_event::AnnounceEvent;
use crate::{AddressFamily, DurationSinceUnixEpoch, NumberOfBytes};

pub const PEER_ID_BYTES_LEN: usize = 20;

/// ID chosen by the downloader peer. 20 raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub [u8; 20]);

/// Error returned when trying to convert an invalid peer id from another type.
///
/// Usually because the source format does not contain 20 bytes.
#[derive(Error, Debug)]
pub enum IdConversionError {
    #[error("not enough bytes for peer id: {message} {location}")]
    NotEnoughBytes {
        location: &'static Location<'static>,
        message: String,
    },
    #[error("too many bytes for peer id: {message} {location}")]
    TooManyBytes {
        location: &'static Location<'static>,
        message: String,
    },
}

impl Id {
    /// Converts to hex string.
    ///
    /// For the `Id` `-qB00000000000000000` it returns
    /// `0x2d71423030303030303030303030303030303030`.
    ///
    /// Returns `None` if the hex bytes are not valid UTF-8 (they always
    /// are; the `Option` mirrors the conversion API).
    #[must_use]
    pub fn to_hex_string(&self) -> Option<String> {
        let mut tmp = [0u8; 40];
        binascii::bin2hex(&self.0, &mut tmp).unwrap();

        match std::str::from_utf8(&tmp) {
            Ok(hex) => Some(format!("0x{hex}")),
            Err(_) => None,
        }
    }

    /// The client fingerprint inside the peer id, used by the
    /// client-approval hook.
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        client_id(&self.0).expect("a 20-byte peer id always contains a client id")
    }
}

impl From<[u8; 20]> for Id {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<Vec<u8>> for Id {
    type Error = IdConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < PEER_ID_BYTES_LEN {
            return Err(IdConversionError::NotEnoughBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN},
            });
        }
        if bytes.len() > PEER_ID_BYTES_LEN {
            return Err(IdConversionError::TooManyBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN},
            });
        }

        let mut data = [0u8; 20];
        data.copy_from_slice(&bytes);
        Ok(Self(data))
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_hex_string() {
            Some(hex) => write!(f, "{hex}"),
            None => write!(f, ""),
        }
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex_string().unwrap_or_default())
    }
}

/// The 6-byte client fingerprint derived from a peer id.
///
/// Azureus-style ids start with `-` followed by the client code
/// (`-TR2820-...`), so the dash is skipped. Shadow-style ids carry the
/// code in the first six bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub [u8; 6]);

/// Derives the [`ClientId`] from raw peer id bytes.
///
/// Returns `None` when the input is too short to contain one.
#[must_use]
pub fn client_id(peer_id: &[u8]) -> Option<ClientId> {
    let source = if peer_id.first() == Some(&b'-') {
        peer_id.get(1..7)?
    } else {
        peer_id.get(..6)?
    };

    let mut bytes = [0u8; 6];
    bytes.copy_from_slice(source);
    Some(ClientId(bytes))
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Peer struct used by the swarm store and the request pipeline.
///
/// A sample peer:
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr, SocketAddr};
/// use swarm_tracker_primitives::announce_event::AnnounceEvent;
/// use swarm_tracker_primitives::peer;
/// use swarm_tracker_primitives::DurationSinceUnixEpoch;
///
/// peer::Peer {
///     peer_id: peer::Id(*b"-qB00000000000000000"),
///     peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080),
///     updated: DurationSinceUnixEpoch::new(1_669_397_478, 0),
///     uploaded: 0,
///     downloaded: 0,
///     left: 0,
///     event: AnnounceEvent::Started,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Copy, PartialEq, Eq, Hash)]
pub struct Peer {
    /// ID used by the downloader peer
    pub peer_id: Id,
    /// The IP and port this peer is listening on
    pub peer_addr: SocketAddr,
    /// The last time the tracker received an announce request from this peer (timestamp)
    pub updated: DurationSinceUnixEpoch,
    /// The total amount of bytes uploaded by this peer so far
    pub uploaded: NumberOfBytes,
    /// The total amount of bytes downloaded by this peer so far
    pub downloaded: NumberOfBytes,
    /// The number of bytes this peer still has to download
    pub left: NumberOfBytes,
    /// This is an optional key which maps to started, completed, or stopped (or empty, which is the same as not being present).
    pub event: AnnounceEvent,
}

impl Peer {
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left <= 0 && self.event != AnnounceEvent::Stopped
    }

    pub fn change_ip(&mut self, new_ip: &IpAddr) {
        self.peer_addr = SocketAddr::new(*new_ip, self.peer_addr.port());
    }

    /// The IP family of the peer: IPv4 or IPv6.
    #[must_use]
    pub fn address_family(&self) -> AddressFamily {
        AddressFamily::of(&self.peer_addr.ip())
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_parts(&self.peer_id, &self.peer_addr)
    }
}

impl Ord for Peer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.fingerprint().cmp(&other.fingerprint())
    }
}

impl PartialOrd for Peer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Serialised peer key: `id (20) ‖ port (2, big-endian) ‖ ip bytes (4 or 16)`.
///
/// The IP length is implicit in the total length, so a v4 and a v6 peer
/// can never produce the same fingerprint. Two peers sharing an id but
/// differing in port or address are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Vec<u8>);

const FINGERPRINT_V4_LEN: usize = 20 + 2 + 4;
const FINGERPRINT_V6_LEN: usize = 20 + 2 + 16;

impl Fingerprint {
    #[must_use]
    pub fn from_parts(peer_id: &Id, peer_addr: &SocketAddr) -> Self {
        let mut bytes = Vec::with_capacity(match peer_addr.ip() {
            IpAddr::V4(_) => FINGERPRINT_V4_LEN,
            IpAddr::V6(_) => FINGERPRINT_V6_LEN,
        });

        bytes.extend_from_slice(&peer_id.0);
        bytes.extend_from_slice(&peer_addr.port().to_be_bytes());
        match peer_addr.ip() {
            IpAddr::V4(ip) => bytes.extend_from_slice(&ip.octets()),
            IpAddr::V6(ip) => bytes.extend_from_slice(&ip.octets()),
        }

        Self(bytes)
    }

    /// Recovers the peer id and socket address encoded in the key.
    #[must_use]
    pub fn to_parts(&self) -> (Id, SocketAddr) {
        let mut id = [0u8; 20];
        id.copy_from_slice(&self.0[..20]);

        let port = u16::from_be_bytes([self.0[20], self.0[21]]);

        let ip: IpAddr = match self.0.len() {
            FINGERPRINT_V4_LEN => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&self.0[22..]);
                IpAddr::from(octets)
            }
            FINGERPRINT_V6_LEN => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&self.0[22..]);
                IpAddr::from(octets)
            }
            len => unreachable!("fingerprints are {FINGERPRINT_V4_LEN} or {FINGERPRINT_V6_LEN} bytes, got {len}"),
        };

        (Id(id), SocketAddr::new(ip, port))
    }

    #[must_use]
    pub fn address_family(&self) -> AddressFamily {
        if self.0.len() == FINGERPRINT_V4_LEN {
            AddressFamily::V4
        } else {
            AddressFamily::V6
        }
    }
}

impl From<&Peer> for Fingerprint {
    fn from(peer: &Peer) -> Self {
        peer.fingerprint()
    }
}

pub mod fixture {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::{Id, Peer};
    use crate::announce_event::AnnounceEvent;
    use crate::DurationSinceUnixEpoch;

    #[derive(PartialEq, Debug)]
    pub struct PeerBuilder {
        peer: Peer,
    }

    #[allow(clippy::derivable_impls)]
    impl Default for PeerBuilder {
        fn default() -> Self {
            Self { peer: Peer::default() }
        }
    }

    impl PeerBuilder {
        #[must_use]
        pub fn seeder() -> Self {
            let peer = Peer {
                peer_id: Id(*b"-qB00000000000000001"),
                peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080),
                updated: DurationSinceUnixEpoch::new(1_669_397_478, 0),
                uploaded: 0,
                downloaded: 0,
                left: 0,
                event: AnnounceEvent::Completed,
            };

            Self { peer }
        }

        #[must_use]
        pub fn leecher() -> Self {
            let peer = Peer {
                peer_id: Id(*b"-qB00000000000000002"),
                peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)), 8080),
                updated: DurationSinceUnixEpoch::new(1_669_397_478, 0),
                uploaded: 0,
                downloaded: 0,
                left: 10,
                event: AnnounceEvent::Started,
            };

            Self { peer }
        }

        #[must_use]
        pub fn with_peer_id(mut self, peer_id: &Id) -> Self {
            self.peer.peer_id = *peer_id;
            self
        }

        #[must_use]
        pub fn with_peer_addr(mut self, peer_addr: &SocketAddr) -> Self {
            self.peer.peer_addr = *peer_addr;
            self
        }

        #[must_use]
        pub fn with_event(mut self, event: AnnounceEvent) -> Self {
            self.peer.event = event;
            self
        }

        #[must_use]
        pub fn with_bytes_pending_to_download(mut self, left: i64) -> Self {
            self.peer.left = left;
            self
        }

        #[must_use]
        pub fn with_no_bytes_pending_to_download(mut self) -> Self {
            self.peer.left = 0;
            self
        }

        #[must_use]
        pub fn last_updated_on(mut self, updated: DurationSinceUnixEpoch) -> Self {
            self.peer.updated = updated;
            self
        }

        #[must_use]
        pub fn build(self) -> Peer {
            self.peer
        }
    }

    impl Default for Peer {
        fn default() -> Self {
            Self {
                peer_id: Id(*b"-qB00000000000000000"),
                peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080),
                updated: DurationSinceUnixEpoch::new(1_669_397_478, 0),
                uploaded: 0,
                downloaded: 0,
                left: 0,
                event: AnnounceEvent::Started,
            }
        }
    }
}
