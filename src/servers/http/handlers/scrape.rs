//! The `GET /scrape` handler.
use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, RawQuery};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use swarm_tracker_primitives::AddressFamily;
use tracing::debug;

use super::{resolve_client_ip, State};
use crate::core::sanitize::{self, Limits};
use crate::core::statistics::METRICS;
use crate::core;
use crate::servers::http::query::Query;
use crate::servers::http::requests::scrape::Scrape;
use crate::servers::http::responses;

/// It handles the `scrape` request.
pub async fn handle(
    axum::extract::State(state): axum::extract::State<State>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    let started_at = Instant::now();

    let (response, error) = match scrape(&state, raw_query.as_deref().unwrap_or_default(), &headers, remote_addr) {
        Ok(response) => (response, None),
        Err(failure_reason) => {
            debug!("scrape from {remote_addr} failed: {failure_reason}");
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
        "scrape",
        AddressFamily::of(&remote_addr.ip()),
        error.as_deref(),
        started_at.elapsed(),
    );

    response
}

fn scrape(state: &State, raw_query: &str, headers: &HeaderMap, remote_addr: SocketAddr) -> Result<Response, String> {
    let query = Query::parse(raw_query).map_err(|e| e.to_string())?;
    let request = Scrape::try_from(&query).map_err(|e| e.to_string())?;

    // Scrapes carry no IP params; the family comes from the header or
    // the connecting address.
    let ip = resolve_client_ip([None, None, None], headers, remote_addr, &state.cfg).map_err(|e| e.to_string())?;

    let core_request = core::ScrapeRequest {
        info_hashes: request.info_hashes,
        family: AddressFamily::of(&sanitize::canonical_ip(ip)),
    };

    let data = state
        .tracker
        .handle_scrape(core_request.clone(), &Limits::from(state.cfg.as_ref()))
        .map_err(|e| {
            if !e.is_client_error() {
                tracing::error!("internal error serving a scrape: {e}");
            }
            e.failure_reason()
        })?;

    let response = responses::scrape::Bencoded::from(data.clone()).into_response();

    state.tracker.dispatch_scrape_post_hooks(core_request, data);

    Ok(response)
}
