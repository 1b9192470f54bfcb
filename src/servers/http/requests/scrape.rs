//! `Scrape` request for the HTTP tracker.
use std::panic::Location;

use swarm_tracker_primitives::info_hash::InfoHash;
use thiserror::Error;

use crate::servers::http::query::Query;

/// The `Scrape` request: one or more info-hashes, nothing else
/// required. The count is clamped later by the sanitiser, not here.
#[derive(Debug, PartialEq, Eq)]
pub struct Scrape {
    pub info_hashes: Vec<InfoHash>,
}

/// Errors that can occur when parsing the `Scrape` request.
#[derive(Error, Debug)]
pub enum ParseScrapeError {
    #[error("missing param info_hash")]
    MissingInfoHash { location: &'static Location<'static> },
}

impl TryFrom<&Query> for Scrape {
    type Error = ParseScrapeError;

    fn try_from(query: &Query) -> Result<Self, Self::Error> {
        if query.info_hashes().is_empty() {
            return Err(ParseScrapeError::MissingInfoHash {
                location: Location::caller(),
            });
        }

        Ok(Self {
            info_hashes: query.info_hashes().to_vec(),
        })
    }
}
