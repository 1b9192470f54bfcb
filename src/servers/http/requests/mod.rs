//! Data structures and parsing for the `announce` and `scrape` requests.
pub mod announce;
pub mod scrape;
