//! UDP response framing.
//!
//! Responses are assembled into a fresh buffer. The announce response
//! record width follows the request: action-1 announces from v4 clients
//! get 6-byte records, while action-4 announces and v6 clients get
//! 18-byte records with v4 addresses widened to their mapped form.
use std::net::{IpAddr, SocketAddr};

use super::request::{ACTION_CONNECT, ACTION_ERROR, ACTION_SCRAPE};

/// A response ready to be framed and written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Connect(ConnectResponse),
    Announce(AnnounceResponse),
    Scrape(ScrapeResponse),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    pub transaction_id: u32,
    pub connection_id: [u8; 8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceResponse {
    /// Echo of the request action: 1, or 4 for the legacy layout.
    pub action: u32,
    pub transaction_id: u32,
    pub interval: u32,
    pub leechers: u32,
    pub seeders: u32,
    pub peers: Vec<SocketAddr>,
    /// Whether peer records carry 16-byte addresses.
    pub wide_records: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResponse {
    pub transaction_id: u32,
    pub entries: Vec<ScrapeEntry>,
}

/// One per requested info-hash, in request order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeEntry {
    pub complete: u32,
    pub downloaded: u32,
    pub incomplete: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub transaction_id: u32,
    pub failure_reason: String,
}

impl Response {
    /// Serialises the response into wire bytes.
    #[must_use]
    pub fn write(&self) -> Vec<u8> {
        match self {
            Response::Connect(response) => {
                let mut bytes = Vec::with_capacity(16);
                bytes.extend_from_slice(&ACTION_CONNECT.to_be_bytes());
                bytes.extend_from_slice(&response.transaction_id.to_be_bytes());
                bytes.extend_from_slice(&response.connection_id);
                bytes
            }
            Response::Announce(response) => {
                let record_len = if response.wide_records { 18 } else { 6 };
                let mut bytes = Vec::with_capacity(20 + record_len * response.peers.len());
                bytes.extend_from_slice(&response.action.to_be_bytes());
                bytes.extend_from_slice(&response.transaction_id.to_be_bytes());
                bytes.extend_from_slice(&response.interval.to_be_bytes());
                bytes.extend_from_slice(&response.leechers.to_be_bytes());
                bytes.extend_from_slice(&response.seeders.to_be_bytes());
                for peer in &response.peers {
                    write_peer_record(&mut bytes, peer, response.wide_records);
                }
                bytes
            }
            Response::Scrape(response) => {
                let mut bytes = Vec::with_capacity(8 + 12 * response.entries.len());
                bytes.extend_from_slice(&ACTION_SCRAPE.to_be_bytes());
                bytes.extend_from_slice(&response.transaction_id.to_be_bytes());
                for entry in &response.entries {
                    bytes.extend_from_slice(&entry.complete.to_be_bytes());
                    bytes.extend_from_slice(&entry.downloaded.to_be_bytes());
                    bytes.extend_from_slice(&entry.incomplete.to_be_bytes());
                }
                bytes
            }
            Response::Error(response) => {
                let mut bytes = Vec::with_capacity(8 + response.failure_reason.len() + 1);
                bytes.extend_from_slice(&ACTION_ERROR.to_be_bytes());
                bytes.extend_from_slice(&response.transaction_id.to_be_bytes());
                bytes.extend_from_slice(response.failure_reason.as_bytes());
                bytes.push(0);
                bytes
            }
        }
    }
}

fn write_peer_record(bytes: &mut Vec<u8>, peer: &SocketAddr, wide: bool) {
    match (peer.ip(), wide) {
        (IpAddr::V4(ip), false) => bytes.extend_from_slice(&ip.octets()),
        (IpAddr::V4(ip), true) => bytes.extend_from_slice(&ip.to_ipv6_mapped().octets()),
        (IpAddr::V6(ip), _) => bytes.extend_from_slice(&ip.octets()),
    }
    bytes.extend_from_slice(&peer.port().to_be_bytes());
}

#[cfg(test)]
mod tests {

    mod it_should {
        use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

        use crate::servers::udp::response::{
            AnnounceResponse, ConnectResponse, ErrorResponse, Response, ScrapeEntry, ScrapeResponse,
        };

        #[test]
        fn frame_a_connect_response() {
            let bytes = Response::Connect(ConnectResponse {
                transaction_id: 0xAABB_CCDD,
                connection_id: [1, 2, 3, 4, 5, 6, 7, 8],
            })
            .write();

            assert_eq!(
                bytes,
                [
                    0x00, 0x00, 0x00, 0x00, // action 0
                    0xAA, 0xBB, 0xCC, 0xDD, // transaction id
                    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // connection id
                ]
            );
        }

        #[test]
        fn frame_an_announce_response_with_6_byte_records() {
            let bytes = Response::Announce(AnnounceResponse {
                action: 1,
                transaction_id: 7,
                interval: 1800,
                leechers: 1,
                seeders: 2,
                peers: vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), 6881)],
                wide_records: false,
            })
            .write();

            assert_eq!(bytes.len(), 26);
            assert_eq!(&bytes[20..], &[1, 2, 3, 4, 0x1A, 0xE1]);
        }

        #[test]
        fn widen_v4_peers_to_mapped_addresses_in_wide_records() {
            let bytes = Response::Announce(AnnounceResponse {
                action: 4,
                transaction_id: 7,
                interval: 1800,
                leechers: 0,
                seeders: 1,
                peers: vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), 6881)],
                wide_records: true,
            })
            .write();

            assert_eq!(bytes.len(), 38);
            let expected_ip = Ipv4Addr::new(1, 2, 3, 4).to_ipv6_mapped().octets();
            assert_eq!(&bytes[20..36], &expected_ip);
        }

        #[test]
        fn frame_v6_peer_records() {
            let bytes = Response::Announce(AnnounceResponse {
                action: 1,
                transaction_id: 7,
                interval: 1800,
                leechers: 0,
                seeders: 1,
                peers: vec![SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 6881)],
                wide_records: true,
            })
            .write();

            assert_eq!(bytes.len(), 38);
            assert_eq!(&bytes[20..36], &Ipv6Addr::LOCALHOST.octets());
        }

        #[test]
        fn frame_scrape_entries_in_order() {
            let bytes = Response::Scrape(ScrapeResponse {
                transaction_id: 9,
                entries: vec![
                    ScrapeEntry {
                        complete: 1,
                        downloaded: 0,
                        incomplete: 2,
                    },
                    ScrapeEntry {
                        complete: 3,
                        downloaded: 0,
                        incomplete: 4,
                    },
                ],
            })
            .write();

            assert_eq!(bytes.len(), 8 + 24);
            assert_eq!(&bytes[8..12], &1u32.to_be_bytes());
            assert_eq!(&bytes[12..16], &0u32.to_be_bytes());
            assert_eq!(&bytes[16..20], &2u32.to_be_bytes());
            assert_eq!(&bytes[20..24], &3u32.to_be_bytes());
        }

        #[test]
        fn frame_an_error_with_a_nul_terminated_reason() {
            let bytes = Response::Error(ErrorResponse {
                transaction_id: 5,
                failure_reason: "bad connection ID".to_owned(),
            })
            .write();

            assert_eq!(&bytes[0..4], &3u32.to_be_bytes());
            assert_eq!(&bytes[4..8], &5u32.to_be_bytes());
            assert_eq!(&bytes[8..bytes.len() - 1], b"bad connection ID");
            assert_eq!(bytes[bytes.len() - 1], 0);
        }
    }
}
