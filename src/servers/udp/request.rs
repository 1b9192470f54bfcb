//! UDP request framing.
//!
//! Requests are parsed with fixed-layout [`zerocopy`] views over the
//! datagram: the shared 16-byte header, then the per-action body at
//! fixed offsets, then (for announces) the BEP 41 option trail.
use std::net::IpAddr;

use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer;
use zerocopy::network_endian::{I32, I64, U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use super::error::Error;

/// Magic connection ID a connect request must carry:
/// `00 00 04 17 27 10 19 80`.
pub const PROTOCOL_ID: [u8; 8] = [0x00, 0x00, 0x04, 0x17, 0x27, 0x10, 0x19, 0x80];

/// Length of the header shared by all actions. Anything shorter is
/// dropped without a response.
pub const HEADER_LEN: usize = 16;

const ANNOUNCE_V4_LEN: usize = HEADER_LEN + 82;
const ANNOUNCE_V6_LEN: usize = HEADER_LEN + 94;
const INFO_HASH_LEN: usize = 20;

pub const ACTION_CONNECT: u32 = 0;
pub const ACTION_ANNOUNCE: u32 = 1;
pub const ACTION_SCRAPE: u32 = 2;
pub const ACTION_ERROR: u32 = 3;
pub const ACTION_ANNOUNCE_V6: u32 = 4;

/// The header shared by all actions.
#[derive(FromZeroes, FromBytes, AsBytes, Debug, Clone, Copy)]
#[repr(C)]
pub struct RequestHeader {
    pub connection_id: [u8; 8],
    pub action: U32,
    pub transaction_id: U32,
}

/// The fixed fields of a v4 announce body (action 1).
#[derive(FromZeroes, FromBytes, AsBytes, Debug, Clone, Copy)]
#[repr(C)]
struct AnnounceBodyV4 {
    info_hash: [u8; 20],
    peer_id: [u8; 20],
    downloaded: I64,
    left: I64,
    uploaded: I64,
    event: I32,
    ip: [u8; 4],
    key: U32,
    num_want: I32,
    port: U16,
}

/// The fixed fields of a legacy dual-stack announce body (action 4).
#[derive(FromZeroes, FromBytes, AsBytes, Debug, Clone, Copy)]
#[repr(C)]
struct AnnounceBodyV6 {
    info_hash: [u8; 20],
    peer_id: [u8; 20],
    downloaded: I64,
    left: I64,
    uploaded: I64,
    event: I32,
    ip: [u8; 16],
    key: U32,
    num_want: I32,
    port: U16,
}

/// A parsed UDP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Connect(ConnectRequest),
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub connection_id: [u8; 8],
    pub transaction_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub connection_id: [u8; 8],
    /// The action the packet arrived with: 1, or 4 for the legacy
    /// dual-stack layout. Echoed in the response.
    pub action: u32,
    pub transaction_id: u32,
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub downloaded: i64,
    pub left: i64,
    pub uploaded: i64,
    pub event: AnnounceEvent,
    /// The IP field, `None` when all-zero ("use the source IP").
    pub ip: Option<IpAddr>,
    pub key: u32,
    /// `None` when the field is negative ("use the default").
    pub num_want: Option<u32>,
    pub port: u16,
    /// Concatenated BEP 41 URL-data, when present.
    pub url_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub connection_id: [u8; 8],
    pub transaction_id: u32,
    pub info_hashes: Vec<InfoHash>,
}

impl Request {
    /// Parses a datagram of at least [`HEADER_LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Will return a client error carrying the failure reason written
    /// back to the sender.
    ///
    /// # Panics
    ///
    /// Will panic if the payload is shorter than the header; callers
    /// drop such packets without a response.
    pub fn parse(payload: &[u8]) -> Result<Request, Error> {
        assert!(payload.len() >= HEADER_LEN, "packets shorter than the header are dropped");

        let header = RequestHeader::read_from_prefix(payload).expect("the header length was just checked");
        let body = &payload[HEADER_LEN..];

        match header.action.get() {
            ACTION_CONNECT => parse_connect(&header, body),
            ACTION_ANNOUNCE | ACTION_ANNOUNCE_V6 => parse_announce(&header, payload),
            ACTION_SCRAPE => parse_scrape(&header, body),
            _ => Err(Error::unknown_action()),
        }
    }
}

fn parse_connect(header: &RequestHeader, body: &[u8]) -> Result<Request, Error> {
    if !body.is_empty() || header.connection_id != PROTOCOL_ID {
        return Err(Error::malformed_packet());
    }

    Ok(Request::Connect(ConnectRequest {
        connection_id: header.connection_id,
        transaction_id: header.transaction_id.get(),
    }))
}

#[allow(clippy::cast_sign_loss)]
fn parse_announce(header: &RequestHeader, payload: &[u8]) -> Result<Request, Error> {
    let action = header.action.get();

    let (fixed_len, info_hash, peer_id, downloaded, left, uploaded, event, ip, key, num_want, port) =
        if action == ACTION_ANNOUNCE {
            if payload.len() < ANNOUNCE_V4_LEN {
                return Err(Error::malformed_packet());
            }
            let body = AnnounceBodyV4::read_from(&payload[HEADER_LEN..ANNOUNCE_V4_LEN]).ok_or_else(Error::malformed_packet)?;
            let ip = if body.ip == [0u8; 4] {
                None
            } else {
                Some(IpAddr::from(body.ip))
            };
            (
                ANNOUNCE_V4_LEN,
                body.info_hash,
                body.peer_id,
                body.downloaded.get(),
                body.left.get(),
                body.uploaded.get(),
                body.event.get(),
                ip,
                body.key.get(),
                body.num_want.get(),
                body.port.get(),
            )
        } else {
            if payload.len() < ANNOUNCE_V6_LEN {
                return Err(Error::malformed_packet());
            }
            let body = AnnounceBodyV6::read_from(&payload[HEADER_LEN..ANNOUNCE_V6_LEN]).ok_or_else(Error::malformed_packet)?;
            let ip = if body.ip == [0u8; 16] {
                None
            } else {
                Some(IpAddr::from(body.ip))
            };
            (
                ANNOUNCE_V6_LEN,
                body.info_hash,
                body.peer_id,
                body.downloaded.get(),
                body.left.get(),
                body.uploaded.get(),
                body.event.get(),
                ip,
                body.key.get(),
                body.num_want.get(),
                body.port.get(),
            )
        };

    let url_data = parse_options(&payload[fixed_len..])?;

    Ok(Request::Announce(AnnounceRequest {
        connection_id: header.connection_id,
        action,
        transaction_id: header.transaction_id.get(),
        info_hash: InfoHash(info_hash),
        peer_id: peer::Id(peer_id),
        downloaded,
        left,
        uploaded,
        event: AnnounceEvent::from_i32(event),
        ip,
        key,
        num_want: u32::try_from(num_want).ok(),
        port,
        url_data,
    }))
}

/// Scans the BEP 41 type-length-value trail of an announce.
///
/// `0x00` ends the scan, `0x01` is a single-byte NOP, `0x02` prefixes a
/// length byte and that many URL-data bytes; multiple URL-data segments
/// are concatenated. Anything else is an unknown option. A declared
/// length running past the packet is a malformed packet.
fn parse_options(mut trail: &[u8]) -> Result<Option<Vec<u8>>, Error> {
    let mut url_data: Option<Vec<u8>> = None;

    while let Some((&option_type, rest)) = trail.split_first() {
        match option_type {
            0x00 => break,
            0x01 => trail = rest,
            0x02 => {
                let (&len, rest) = rest.split_first().ok_or_else(Error::malformed_packet)?;
                let len = usize::from(len);
                if rest.len() < len {
                    return Err(Error::malformed_packet());
                }
                url_data.get_or_insert_with(Vec::new).extend_from_slice(&rest[..len]);
                trail = &rest[len..];
            }
            _ => return Err(Error::unknown_option_type()),
        }
    }

    Ok(url_data)
}

fn parse_scrape(header: &RequestHeader, body: &[u8]) -> Result<Request, Error> {
    if body.is_empty() || body.len() % INFO_HASH_LEN != 0 {
        return Err(Error::malformed_packet());
    }

    let info_hashes = body
        .chunks_exact(INFO_HASH_LEN)
        .map(|chunk| InfoHash(chunk.try_into().expect("chunks are exactly 20 bytes")))
        .collect();

    Ok(Request::Scrape(ScrapeRequest {
        connection_id: header.connection_id,
        transaction_id: header.transaction_id.get(),
        info_hashes,
    }))
}

#[cfg(test)]
mod tests {

    mod it_should {
        use swarm_tracker_primitives::announce_event::AnnounceEvent;

        use crate::servers::udp::error::Error;
        use crate::servers::udp::request::{Request, HEADER_LEN, PROTOCOL_ID};

        fn connect_packet(transaction_id: u32) -> Vec<u8> {
            let mut packet = Vec::new();
            packet.extend_from_slice(&PROTOCOL_ID);
            packet.extend_from_slice(&0u32.to_be_bytes());
            packet.extend_from_slice(&transaction_id.to_be_bytes());
            packet
        }

        fn announce_packet(options: &[u8]) -> Vec<u8> {
            let mut packet = Vec::new();
            packet.extend_from_slice(&[0xAA; 8]); // connection id
            packet.extend_from_slice(&1u32.to_be_bytes()); // action
            packet.extend_from_slice(&0xAABB_CCDDu32.to_be_bytes()); // transaction id
            packet.extend_from_slice(&[0x69; 20]); // info hash
            packet.extend_from_slice(b"-qB00000000000000001"); // peer id
            packet.extend_from_slice(&50i64.to_be_bytes()); // downloaded
            packet.extend_from_slice(&100i64.to_be_bytes()); // left
            packet.extend_from_slice(&25i64.to_be_bytes()); // uploaded
            packet.extend_from_slice(&2i32.to_be_bytes()); // event: started
            packet.extend_from_slice(&[0, 0, 0, 0]); // ip: use source
            packet.extend_from_slice(&0u32.to_be_bytes()); // key
            packet.extend_from_slice(&50i32.to_be_bytes()); // numwant
            packet.extend_from_slice(&10001u16.to_be_bytes()); // port
            packet.extend_from_slice(options);
            packet
        }

        #[test]
        fn parse_a_connect_packet_carrying_the_protocol_magic() {
            let Request::Connect(request) = Request::parse(&connect_packet(0xAABB_CCDD)).unwrap() else {
                panic!("expected a connect request");
            };

            assert_eq!(request.transaction_id, 0xAABB_CCDD);
        }

        #[test]
        fn reject_a_connect_packet_without_the_protocol_magic() {
            let mut packet = connect_packet(7);
            packet[0] = 0xFF;

            assert!(matches!(Request::parse(&packet), Err(Error::MalformedPacket { .. })));
        }

        #[test]
        fn parse_a_v4_announce_at_its_fixed_offsets() {
            let Request::Announce(request) = Request::parse(&announce_packet(&[])).unwrap() else {
                panic!("expected an announce request");
            };

            assert_eq!(request.action, 1);
            assert_eq!(request.transaction_id, 0xAABB_CCDD);
            assert_eq!(request.info_hash.0, [0x69; 20]);
            assert_eq!(request.downloaded, 50);
            assert_eq!(request.left, 100);
            assert_eq!(request.uploaded, 25);
            assert_eq!(request.event, AnnounceEvent::Started);
            assert_eq!(request.ip, None);
            assert_eq!(request.num_want, Some(50));
            assert_eq!(request.port, 10001);
            assert_eq!(request.url_data, None);
        }

        #[test]
        fn treat_a_negative_numwant_as_absent() {
            let mut packet = announce_packet(&[]);
            let numwant_offset = HEADER_LEN + 20 + 20 + 24 + 4 + 4 + 4;
            packet[numwant_offset..numwant_offset + 4].copy_from_slice(&(-1i32).to_be_bytes());

            let Request::Announce(request) = Request::parse(&packet).unwrap() else {
                panic!("expected an announce request");
            };

            assert_eq!(request.num_want, None);
        }

        #[test]
        fn reject_a_truncated_announce() {
            let packet = announce_packet(&[]);

            assert!(matches!(
                Request::parse(&packet[..packet.len() - 4]),
                Err(Error::MalformedPacket { .. })
            ));
        }

        #[test]
        fn parse_a_legacy_action_4_announce_with_a_16_byte_ip() {
            let mut packet = Vec::new();
            packet.extend_from_slice(&[0xAA; 8]);
            packet.extend_from_slice(&4u32.to_be_bytes());
            packet.extend_from_slice(&7u32.to_be_bytes());
            packet.extend_from_slice(&[0x69; 20]);
            packet.extend_from_slice(b"-qB00000000000000001");
            packet.extend_from_slice(&0i64.to_be_bytes());
            packet.extend_from_slice(&0i64.to_be_bytes());
            packet.extend_from_slice(&0i64.to_be_bytes());
            packet.extend_from_slice(&0i32.to_be_bytes());
            let ip = std::net::Ipv6Addr::LOCALHOST.octets();
            packet.extend_from_slice(&ip);
            packet.extend_from_slice(&0u32.to_be_bytes());
            packet.extend_from_slice(&(-1i32).to_be_bytes());
            packet.extend_from_slice(&6881u16.to_be_bytes());

            let Request::Announce(request) = Request::parse(&packet).unwrap() else {
                panic!("expected an announce request");
            };

            assert_eq!(request.action, 4);
            assert_eq!(request.ip, Some(std::net::IpAddr::V6(std::net::Ipv6Addr::LOCALHOST)));
        }

        #[test]
        fn concatenate_url_data_options() {
            let options = [
                0x01, // nop
                0x02, 0x03, b'/', b'a', b'n', // url-data "/an"
                0x02, 0x02, b'n', b'o', // url-data "no"
                0x00, // end of options
                0xFF, // garbage after the terminator is ignored
            ];

            let Request::Announce(request) = Request::parse(&announce_packet(&options)).unwrap() else {
                panic!("expected an announce request");
            };

            assert_eq!(request.url_data.as_deref(), Some(b"/anno".as_slice()));
        }

        #[test]
        fn reject_an_unknown_option_type() {
            assert!(matches!(
                Request::parse(&announce_packet(&[0x05])),
                Err(Error::UnknownOptionType { .. })
            ));
        }

        #[test]
        fn reject_an_option_length_running_past_the_packet() {
            assert!(matches!(
                Request::parse(&announce_packet(&[0x02, 0x10, b'x'])),
                Err(Error::MalformedPacket { .. })
            ));
        }

        #[test]
        fn parse_a_scrape_with_multiple_info_hashes() {
            let mut packet = Vec::new();
            packet.extend_from_slice(&[0xAA; 8]);
            packet.extend_from_slice(&2u32.to_be_bytes());
            packet.extend_from_slice(&9u32.to_be_bytes());
            packet.extend_from_slice(&[0x01; 20]);
            packet.extend_from_slice(&[0x02; 20]);

            let Request::Scrape(request) = Request::parse(&packet).unwrap() else {
                panic!("expected a scrape request");
            };

            assert_eq!(request.info_hashes.len(), 2);
            assert_eq!(request.info_hashes[0].0, [0x01; 20]);
        }

        #[test]
        fn reject_a_scrape_whose_body_is_not_a_multiple_of_20_bytes() {
            let mut packet = Vec::new();
            packet.extend_from_slice(&[0xAA; 8]);
            packet.extend_from_slice(&2u32.to_be_bytes());
            packet.extend_from_slice(&9u32.to_be_bytes());
            packet.extend_from_slice(&[0x01; 19]);

            assert!(matches!(Request::parse(&packet), Err(Error::MalformedPacket { .. })));
        }

        #[test]
        fn reject_a_scrape_without_info_hashes() {
            let mut packet = Vec::new();
            packet.extend_from_slice(&[0xAA; 8]);
            packet.extend_from_slice(&2u32.to_be_bytes());
            packet.extend_from_slice(&9u32.to_be_bytes());

            assert!(matches!(Request::parse(&packet), Err(Error::MalformedPacket { .. })));
        }

        #[test]
        fn reject_an_unknown_action() {
            let mut packet = Vec::new();
            packet.extend_from_slice(&[0xAA; 8]);
            packet.extend_from_slice(&9u32.to_be_bytes());
            packet.extend_from_slice(&9u32.to_be_bytes());

            assert!(matches!(Request::parse(&packet), Err(Error::UnknownAction { .. })));
        }
    }
}
