//! Error types for the UDP frontend.
//!
//! Every variant's display string is the failure reason written back to
//! the client in the error-action framing, except the ones marked
//! internal, which are logged and surfaced as a generic message.
use std::panic::Location;

use thiserror::Error;

/// Error returned by the UDP frontend.
#[derive(Error, Debug)]
pub enum Error {
    /// The packet does not match the layout its action requires.
    #[error("malformed packet")]
    MalformedPacket { location: &'static Location<'static> },

    /// The action field is none of connect/announce/scrape/announce-v6.
    #[error("unknown action")]
    UnknownAction { location: &'static Location<'static> },

    /// A BEP 41 option segment carries an unrecognised type byte.
    #[error("unknown option type")]
    UnknownOptionType { location: &'static Location<'static> },

    /// The connection ID of a non-connect packet did not verify.
    #[error("bad connection ID")]
    BadConnectionId { location: &'static Location<'static> },

    /// The request pipeline rejected the request; the reason is already
    /// the client-facing string.
    #[error("{failure_reason}")]
    Pipeline { failure_reason: String },
}

impl Error {
    #[track_caller]
    #[must_use]
    pub fn malformed_packet() -> Self {
        Self::MalformedPacket {
            location: Location::caller(),
        }
    }

    #[track_caller]
    #[must_use]
    pub fn unknown_action() -> Self {
        Self::UnknownAction {
            location: Location::caller(),
        }
    }

    #[track_caller]
    #[must_use]
    pub fn unknown_option_type() -> Self {
        Self::UnknownOptionType {
            location: Location::caller(),
        }
    }

    #[track_caller]
    #[must_use]
    pub fn bad_connection_id() -> Self {
        Self::BadConnectionId {
            location: Location::caller(),
        }
    }
}
