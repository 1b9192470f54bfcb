//! Handlers for the UDP frontend.
//!
//! [`handle_packet`] parses the datagram, dispatches it by action and
//! produces the response the server loop writes back. Anything shorter
//! than the request header is dropped without a response; everything
//! else is answered, errors included.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use swarm_tracker_clock::clock::Time;
use swarm_tracker_configuration::UdpTracker;
use swarm_tracker_primitives::AddressFamily;
use tracing::debug;
use zerocopy::FromBytes;

use super::connection_cookie;
use super::error::Error;
use super::request::{AnnounceRequest, ConnectRequest, Request, RequestHeader, ScrapeRequest, HEADER_LEN};
use super::response::{AnnounceResponse, ConnectResponse, ErrorResponse, Response, ScrapeEntry, ScrapeResponse};
use crate::core::sanitize::{self, Limits};
use crate::core::statistics::METRICS;
use crate::core::{self, Tracker};
use crate::CurrentClock;

/// It handles one incoming datagram and returns the response to write,
/// or `None` when the packet is dropped.
pub async fn handle_packet(
    payload: &[u8],
    from: SocketAddr,
    tracker: &Arc<Tracker>,
    config: &UdpTracker,
    key: &[u8],
) -> Option<Response> {
    if payload.len() < HEADER_LEN {
        debug!("dropping a {}-byte datagram from {from}", payload.len());
        return None;
    }

    let started_at = config.enable_request_timing.then(Instant::now);

    let header = RequestHeader::read_from_prefix(payload).expect("the header length was just checked");
    let transaction_id = header.transaction_id.get();

    let (action_label, result) = match Request::parse(payload) {
        Ok(Request::Connect(request)) => ("connect", Ok(handle_connect(&request, from, key))),
        Ok(Request::Announce(request)) => ("announce", handle_announce(&request, from, tracker, config, key)),
        Ok(Request::Scrape(request)) => ("scrape", handle_scrape(&request, from, tracker, config, key)),
        Err(e) => ("error", Err(e)),
    };

    let (response, error_label) = match result {
        Ok(response) => (response, None),
        Err(e) => {
            let failure_reason = e.to_string();
            debug!("udp request from {from} failed: {failure_reason}");
            (
                Response::Error(ErrorResponse {
                    transaction_id,
                    failure_reason,
                }),
                Some(e),
            )
        }
    };

    if let Some(started_at) = started_at {
        let family = AddressFamily::of(&from.ip());
        let error_label = error_label.as_ref().map(ToString::to_string);
        METRICS.observe_udp_response(action_label, family, error_label.as_deref(), started_at.elapsed());
    }

    Some(response)
}

/// It handles a `Connect` request: the reply carries a fresh connection
/// ID binding the source IP and the current time under the private key.
fn handle_connect(request: &ConnectRequest, from: SocketAddr, key: &[u8]) -> Response {
    let connection_id = connection_cookie::make(&from.ip(), CurrentClock::now(), key);

    Response::Connect(ConnectResponse {
        transaction_id: request.transaction_id,
        connection_id,
    })
}

/// It handles an `Announce` request (action 1 or the legacy action 4).
fn handle_announce(
    request: &AnnounceRequest,
    from: SocketAddr,
    tracker: &Arc<Tracker>,
    config: &UdpTracker,
    key: &[u8],
) -> Result<Response, Error> {
    connection_cookie::check(
        &request.connection_id,
        &from.ip(),
        CurrentClock::now(),
        config.max_clock_skew,
        key,
    )?;

    // An all-zero IP field means "use the source IP"; a filled one is
    // only honoured when spoofing is explicitly allowed.
    let ip = match request.ip {
        Some(ip) if config.allow_ip_spoofing => ip,
        _ => from.ip(),
    };

    let core_request = core::AnnounceRequest {
        info_hash: request.info_hash,
        peer_id: request.peer_id,
        ip,
        port: request.port,
        uploaded: request.uploaded,
        downloaded: request.downloaded,
        left: request.left,
        event: request.event,
        num_want: request.num_want,
    };

    let family = AddressFamily::of(&sanitize::canonical_ip(ip));
    let limits = Limits::from(config);

    let data = tracker
        .handle_announce(core_request.clone(), &limits)
        .map_err(|e| client_or_internal(&e))?;

    let response = Response::Announce(AnnounceResponse {
        action: request.action,
        transaction_id: request.transaction_id,
        interval: data.interval,
        leechers: data.incomplete,
        seeders: data.complete,
        peers: data.peers.iter().map(|peer| peer.peer_addr).collect(),
        wide_records: request.action == super::request::ACTION_ANNOUNCE_V6 || family == AddressFamily::V6,
    });

    tracker.dispatch_announce_post_hooks(core_request, data);

    Ok(response)
}

/// It handles a `Scrape` request. Entries keep the order of the
/// surviving info-hashes; `downloaded` is fixed at zero on this wire.
fn handle_scrape(
    request: &ScrapeRequest,
    from: SocketAddr,
    tracker: &Arc<Tracker>,
    config: &UdpTracker,
    key: &[u8],
) -> Result<Response, Error> {
    connection_cookie::check(
        &request.connection_id,
        &from.ip(),
        CurrentClock::now(),
        config.max_clock_skew,
        key,
    )?;

    let core_request = core::ScrapeRequest {
        info_hashes: request.info_hashes.clone(),
        family: AddressFamily::of(&sanitize::canonical_ip(from.ip())),
    };

    let data = tracker
        .handle_scrape(core_request.clone(), &Limits::from(config))
        .map_err(|e| client_or_internal(&e))?;

    let entries = data
        .files
        .iter()
        .map(|(_, metadata)| ScrapeEntry {
            complete: metadata.complete,
            downloaded: 0,
            incomplete: metadata.incomplete,
        })
        .collect();

    let response = Response::Scrape(ScrapeResponse {
        transaction_id: request.transaction_id,
        entries,
    });

    tracker.dispatch_scrape_post_hooks(core_request, data);

    Ok(response)
}

/// Maps a pipeline failure onto the wire: client errors keep their
/// message, everything else is logged and answered generically.
fn client_or_internal(error: &core::error::Error) -> Error {
    if !error.is_client_error() {
        tracing::error!("internal error serving a udp request: {error}");
    }

    Error::Pipeline {
        failure_reason: error.failure_reason(),
    }
}
