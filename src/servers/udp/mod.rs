//! The UDP tracker frontend.
//!
//! Implements the tracker side of
//! [BEP 15](https://www.bittorrent.org/beps/bep_0015.html) with the
//! [BEP 41](https://www.bittorrent.org/beps/bep_0041.html) option
//! extension and the legacy action-4 announce carrying a 16-byte IP
//! field, which old dual-stack clients still send.
//!
//! # Connect
//!
//! UDP is connectionless, so the first exchange defeats source-address
//! spoofing: the client sends a connect packet carrying the protocol
//! magic, and the tracker answers with a [connection
//! ID](connection_cookie) binding the client's IP and the current time
//! under the tracker's private key. Every later announce or scrape must
//! carry a valid connection ID or is answered with an error.
//!
//! # Packet framing
//!
//! All requests share a 16-byte header: `connection_id (8) ‖ action (4)
//! ‖ transaction_id (4)`. Packets shorter than the header are dropped
//! without a response.
pub mod connection_cookie;
pub mod error;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

/// Maximum size of an accepted or produced datagram.
pub const MAX_PACKET_SIZE: usize = 1496;

/// Deadline of the blocking receive, so a closing signal is noticed
/// within this window.
pub const READ_DEADLINE: std::time::Duration = std::time::Duration::from_secs(1);
