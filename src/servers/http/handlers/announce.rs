//! The `GET /announce` handler.
use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, RawQuery};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use swarm_tracker_primitives::AddressFamily;
use tracing::debug;

use super::{resolve_client_ip, State};
use crate::core::sanitize::Limits;
use crate::core::statistics::METRICS;
use crate::core::{self, AnnounceData};
use crate::servers::http::query::Query;
use crate::servers::http::requests::announce::Announce;
use crate::servers::http::responses;

/// It handles the `announce` request.
///
/// The response is always `200 OK`: protocol errors travel as a
/// bencoded `failure reason` body.
pub async fn handle(
    axum::extract::State(state): axum::extract::State<State>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    let started_at = Instant::now();

    let (response, error) = match announce(&state, raw_query.as_deref().unwrap_or_default(), &headers, remote_addr) {
        Ok(response) => (response, None),
        Err(failure_reason) => {
            debug!("announce from {remote_addr} failed: {failure_reason}");
            (
                responses::error::Error {
                    failure_reason: failure_reason.clone(),
                }
                .into_response(),
                Some(failure_reason),
            )
        }
    };

    METRICS.observe_http_response(
        "announce",
        AddressFamily::of(&remote_addr.ip()),
        error.as_deref(),
        started_at.elapsed(),
    );

    response
}

/// Parses, runs the pipeline and renders the body. The error string is
/// the client-facing failure reason.
fn announce(state: &State, raw_query: &str, headers: &HeaderMap, remote_addr: SocketAddr) -> Result<Response, String> {
    let query = Query::parse(raw_query).map_err(|e| e.to_string())?;
    let request = Announce::try_from(&query).map_err(|e| e.to_string())?;

    let ip = resolve_client_ip(
        [request.ip.as_deref(), request.ipv4.as_deref(), request.ipv6.as_deref()],
        headers,
        remote_addr,
        &state.cfg,
    )
    .map_err(|e| e.to_string())?;

    let core_request = core::AnnounceRequest {
        info_hash: request.info_hash,
        peer_id: request.peer_id,
        ip,
        port: request.port,
        uploaded: request.uploaded,
        downloaded: request.downloaded,
        left: request.left,
        event: request.event,
        num_want: request.numwant,
    };

    let data = state
        .tracker
        .handle_announce(core_request.clone(), &Limits::from(state.cfg.as_ref()))
        .map_err(|e| {
            if !e.is_client_error() {
                tracing::error!("internal error serving an announce: {e}");
            }
            e.failure_reason()
        })?;

    let response = render(&data, request.compact);

    state.tracker.dispatch_announce_post_hooks(core_request, data);

    Ok(response)
}

fn render(data: &AnnounceData, compact: bool) -> Response {
    if compact {
        responses::announce::Compact::from(data.clone()).into_response()
    } else {
        responses::announce::NonCompact::from(data.clone()).into_response()
    }
}
