//! `Announce` request for the HTTP tracker.
//!
//! Data structures and logic for parsing the `announce` request.
use std::panic::Location;
use std::str::FromStr;

use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer;
use thiserror::Error;

use crate::servers::http::query::Query;

// Query param names
const INFO_HASH: &str = "info_hash";
const PEER_ID: &str = "peer_id";
const PORT: &str = "port";
const UPLOADED: &str = "uploaded";
const DOWNLOADED: &str = "downloaded";
const LEFT: &str = "left";
const EVENT: &str = "event";
const COMPACT: &str = "compact";
const NUMWANT: &str = "numwant";
const IP: &str = "ip";
const IPV4: &str = "ipv4";
const IPV6: &str = "ipv6";

/// The `Announce` request. Fields use the domain types after parsing the
/// query params of the request.
///
/// > **NOTICE**: the client IP params (`ip`, `ipv4`, `ipv6`) are kept as
/// > raw strings here. They are only honoured when IP spoofing is
/// > enabled, and resolving them belongs to the handler.
#[derive(Debug, PartialEq, Eq)]
pub struct Announce {
    // Mandatory params
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub port: u16,
    pub uploaded: i64,
    pub downloaded: i64,
    pub left: i64,

    // Optional params
    pub event: AnnounceEvent,
    /// `compact` is truthy iff the param is present, non-empty and not
    /// `"0"`.
    pub compact: bool,
    pub numwant: Option<u32>,
    pub ip: Option<String>,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

/// Errors that can occur when parsing the `Announce` request. The
/// display string is the failure reason the client receives.
#[derive(Error, Debug)]
pub enum ParseAnnounceError {
    #[error("missing param {param_name}")]
    MissingParam {
        location: &'static Location<'static>,
        param_name: &'static str,
    },

    #[error("invalid param {param_name}")]
    InvalidParam {
        location: &'static Location<'static>,
        param_name: &'static str,
    },

    /// Announces carry exactly one info-hash; multi-hash announces are
    /// non-standard and rejected.
    #[error("only one info_hash allowed on announce")]
    MultipleInfoHashes { location: &'static Location<'static> },

    #[error("unknown event")]
    UnknownEvent { location: &'static Location<'static> },
}

impl TryFrom<&Query> for Announce {
    type Error = ParseAnnounceError;

    fn try_from(query: &Query) -> Result<Self, Self::Error> {
        Ok(Self {
            info_hash: extract_info_hash(query)?,
            peer_id: extract_peer_id(query)?,
            port: extract_number(query, PORT)?,
            uploaded: extract_number(query, UPLOADED)?,
            downloaded: extract_number(query, DOWNLOADED)?,
            left: extract_number(query, LEFT)?,
            event: extract_event(query)?,
            compact: extract_compact(query),
            numwant: extract_optional_number(query, NUMWANT)?,
            ip: query.get_param(IP),
            ipv4: query.get_param(IPV4),
            ipv6: query.get_param(IPV6),
        })
    }
}

fn extract_info_hash(query: &Query) -> Result<InfoHash, ParseAnnounceError> {
    match query.info_hashes() {
        [] => Err(ParseAnnounceError::MissingParam {
            location: Location::caller(),
            param_name: INFO_HASH,
        }),
        [info_hash] => Ok(*info_hash),
        _ => Err(ParseAnnounceError::MultipleInfoHashes {
            location: Location::caller(),
        }),
    }
}

fn extract_peer_id(query: &Query) -> Result<peer::Id, ParseAnnounceError> {
    let bytes = query.get_param_bytes(PEER_ID).ok_or(ParseAnnounceError::MissingParam {
        location: Location::caller(),
        param_name: PEER_ID,
    })?;

    peer::Id::try_from(bytes.to_vec()).map_err(|_| ParseAnnounceError::InvalidParam {
        location: Location::caller(),
        param_name: PEER_ID,
    })
}

fn extract_number<T: FromStr>(query: &Query, param_name: &'static str) -> Result<T, ParseAnnounceError> {
    let raw = query.get_param(param_name).ok_or(ParseAnnounceError::MissingParam {
        location: Location::caller(),
        param_name,
    })?;

    raw.parse().map_err(|_| ParseAnnounceError::InvalidParam {
        location: Location::caller(),
        param_name,
    })
}

fn extract_optional_number<T: FromStr>(query: &Query, param_name: &'static str) -> Result<Option<T>, ParseAnnounceError> {
    match query.get_param(param_name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ParseAnnounceError::InvalidParam {
                location: Location::caller(),
                param_name,
            }),
    }
}

fn extract_event(query: &Query) -> Result<AnnounceEvent, ParseAnnounceError> {
    match query.get_param(EVENT).as_deref() {
        None | Some("") => Ok(AnnounceEvent::None),
        Some("started") => Ok(AnnounceEvent::Started),
        Some("stopped") => Ok(AnnounceEvent::Stopped),
        Some("completed") => Ok(AnnounceEvent::Completed),
        Some(_) => Err(ParseAnnounceError::UnknownEvent {
            location: Location::caller(),
        }),
    }
}

fn extract_compact(query: &Query) -> bool {
    match query.get_param(COMPACT) {
        Some(value) => !value.is_empty() && value != "0",
        None => false,
    }
}
