//! The URL query parser used by the announce and scrape routes.
//!
//! A single pass over the raw query string. Keys and values are
//! percent-unescaped; keys are lower-cased; for every key only the last
//! occurrence is kept — except `info_hash`, whose occurrences are all
//! collected in order, because a scrape may carry many. Values are kept
//! as raw bytes: info-hashes and peer ids are binary and routinely
//! invalid UTF-8.
use std::collections::HashMap;
use std::panic::Location;

use swarm_tracker_primitives::info_hash::InfoHash;
use thiserror::Error;

const INFO_HASH: &str = "info_hash";

/// The parsed query component of an announce or scrape URL.
#[derive(Debug, Default)]
pub struct Query {
    params: HashMap<String, Vec<u8>>,
    info_hashes: Vec<InfoHash>,
}

/// This error can be returned when parsing a [`Query`] from a string.
#[derive(Error, Debug)]
pub enum ParseQueryError {
    /// An `info_hash` value whose unescaped form is not exactly 20
    /// bytes.
    #[error("invalid infohash")]
    InvalidInfoHash { location: &'static Location<'static> },
}

impl Query {
    /// Parses the raw query string (without the leading `?`).
    ///
    /// # Errors
    ///
    /// Will return `Err` if an `info_hash` value does not unescape to
    /// exactly 20 bytes.
    pub fn parse(raw_query: &str) -> Result<Self, ParseQueryError> {
        let mut query = Query::default();

        for raw_param in raw_query.trim().trim_start_matches('?').split('&') {
            if raw_param.is_empty() {
                continue;
            }

            let (raw_name, raw_value) = raw_param.split_once('=').unwrap_or((raw_param, ""));

            let name = percent_encoding::percent_decode_str(raw_name)
                .decode_utf8_lossy()
                .to_lowercase();
            let value = percent_encoding::percent_decode_str(raw_value).collect::<Vec<u8>>();

            if name == INFO_HASH {
                let info_hash = InfoHash::try_from(value).map_err(|_| ParseQueryError::InvalidInfoHash {
                    location: Location::caller(),
                })?;
                query.info_hashes.push(info_hash);
            } else {
                // last occurrence wins
                query.params.insert(name, value);
            }
        }

        Ok(query)
    }

    /// The raw bytes of a param, if present.
    #[must_use]
    pub fn get_param_bytes(&self, name: &str) -> Option<&[u8]> {
        self.params.get(name).map(Vec::as_slice)
    }

    /// The param as UTF-8 text, if present and valid.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<String> {
        self.params.get(name).map(|value| String::from_utf8_lossy(value).into_owned())
    }

    /// All `info_hash` values, in query order.
    #[must_use]
    pub fn info_hashes(&self) -> &[InfoHash] {
        &self.info_hashes
    }
}
