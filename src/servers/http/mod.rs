//! The HTTP tracker frontend.
//!
//! Serves `GET /announce` and `GET /scrape` per
//! [BEP 3](https://www.bittorrent.org/beps/bep_0003.html),
//! [BEP 23](https://www.bittorrent.org/beps/bep_0023.html) (compact
//! responses) and [BEP 48](https://www.bittorrent.org/beps/bep_0048.html)
//! (scrape). There are no other routes.
//!
//! Responses are bencoded dictionaries and always ship with status
//! `200 OK`; failures carry a single `failure reason` key, as the
//! original protocol specifies.
pub mod handlers;
pub mod query;
pub mod requests;
pub mod responses;
pub mod server;
