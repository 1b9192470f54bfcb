//! Errors of the request pipeline.
//!
//! The pipeline distinguishes three kinds of failure:
//!
//! - *Client errors*: the request was wrong. The short human message is
//!   surfaced to the client verbatim as the failure reason.
//! - *Resource errors*: the swarm or peer is not in the store. These
//!   stay internal; they decide between an empty response and a
//!   failure, and never reach a client directly.
//! - *Internal errors*: everything else. The detail is logged and the
//!   client only sees `internal server error`.
use thiserror::Error;

use crate::core::storage;

/// The string clients see in place of any non-client failure.
pub const INTERNAL_SERVER_ERROR: &str = "internal server error";

/// Error raised by the announce and scrape pipelines.
#[derive(Error, Debug)]
pub enum Error {
    /// The announced port is not usable.
    #[error("invalid port")]
    InvalidPort,

    /// The peer id belongs to a client that is not allowed here.
    #[error("client is not approved")]
    ClientNotApproved,

    /// The info-hash is not allowed here.
    #[error("info hash is not approved")]
    InfohashNotApproved,

    /// A hook implementation failed. Only the generic reason is
    /// surfaced.
    #[error("internal server error")]
    HookFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Client errors are surfaced verbatim; everything else is reported
    /// as `internal server error` while the detail goes to the log.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::InvalidPort | Error::ClientNotApproved | Error::InfohashNotApproved => true,
            Error::HookFailed { .. } => false,
        }
    }

    /// The failure reason written to the client.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            INTERNAL_SERVER_ERROR.to_owned()
        }
    }
}

impl From<storage::Error> for Error {
    fn from(err: storage::Error) -> Self {
        // A missing resource surfacing here means a pipeline bug: the
        // callers that expect absence handle it before converting.
        Error::HookFailed { source: Box::new(err) }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn client_errors_should_surface_their_message() {
        assert_eq!(Error::ClientNotApproved.failure_reason(), "client is not approved");
        assert_eq!(Error::InvalidPort.failure_reason(), "invalid port");
    }

    #[test]
    fn internal_errors_should_surface_a_generic_message() {
        let error = Error::HookFailed {
            source: "the hook exploded".into(),
        };

        assert!(!error.is_client_error());
        assert_eq!(error.failure_reason(), "internal server error");
    }
}
