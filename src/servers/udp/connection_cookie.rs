//! Logic for generating and verifying connection IDs.
//!
//! The UDP tracker requires the client to connect to the server before
//! it can announce or scrape. The server responds with an 8-byte
//! connection ID that the client must echo in all later requests, which
//! defeats source-address spoofing without keeping any per-client
//! state:
//!
//! ```text
//! connection ID = unix timestamp (4, big-endian)
//!               ‖ HMAC-SHA-256(private key, timestamp ‖ client IP)[..4]
//! ```
//!
//! The IP goes into the MAC exactly as received: 4 bytes for v4, 16 for
//! v6. Verification recomputes the MAC over the first four bytes of the
//! cookie and the source IP and compares the truncated tag in constant
//! time. A cookie older than two minutes is stale; one whose timestamp
//! lies further in the future than the configured clock skew is
//! rejected too. Forging a cookie without the key means guessing a
//! 32-bit tag, and the two-minute TTL bounds replay.
use std::net::IpAddr;
use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use swarm_tracker_primitives::DurationSinceUnixEpoch;

use super::error::Error;

pub type Cookie = [u8; 8];

type HmacSha256 = Hmac<Sha256>;

/// How long a connection ID stays valid.
pub const COOKIE_LIFETIME: Duration = Duration::from_secs(2 * 60);

/// Generates a new connection cookie for a client IP.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn make(remote_ip: &IpAddr, now: DurationSinceUnixEpoch, key: &[u8]) -> Cookie {
    let timestamp = (now.as_secs() as u32).to_be_bytes();
    let tag = truncated_tag(&timestamp, remote_ip, key);

    let mut cookie = [0u8; 8];
    cookie[..4].copy_from_slice(&timestamp);
    cookie[4..].copy_from_slice(&tag);
    cookie
}

/// Checks a connection cookie against the source IP and current time.
///
/// # Errors
///
/// Will return `Error::BadConnectionId` when the cookie is stale,
/// future-dated beyond `max_clock_skew`, or carries a wrong tag.
pub fn check(
    cookie: &Cookie,
    remote_ip: &IpAddr,
    now: DurationSinceUnixEpoch,
    max_clock_skew: Duration,
    key: &[u8],
) -> Result<(), Error> {
    let timestamp = u64::from(u32::from_be_bytes(cookie[..4].try_into().expect("a cookie has 8 bytes")));
    let now_secs = now.as_secs();

    if now_secs > timestamp + COOKIE_LIFETIME.as_secs() {
        return Err(Error::bad_connection_id());
    }

    if timestamp > now_secs + max_clock_skew.as_secs() {
        return Err(Error::bad_connection_id());
    }

    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts keys of any length");
    mac.update(&cookie[..4]);
    update_with_ip(&mut mac, remote_ip);

    mac.verify_truncated_left(&cookie[4..]).map_err(|_| Error::bad_connection_id())
}

fn truncated_tag(timestamp: &[u8; 4], remote_ip: &IpAddr, key: &[u8]) -> [u8; 4] {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts keys of any length");
    mac.update(timestamp);
    update_with_ip(&mut mac, remote_ip);

    let tag = mac.finalize().into_bytes();
    tag[..4].try_into().expect("a sha-256 tag has more than 4 bytes")
}

fn update_with_ip(mac: &mut HmacSha256, remote_ip: &IpAddr) {
    match remote_ip {
        IpAddr::V4(ip) => mac.update(&ip.octets()),
        IpAddr::V6(ip) => mac.update(&ip.octets()),
    }
}

#[cfg(test)]
mod tests {

    mod it_should {
        use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
        use std::time::Duration;

        use crate::servers::udp::connection_cookie::{check, make, COOKIE_LIFETIME};

        const KEY: &[u8] = b"test-private-key";
        const MAX_CLOCK_SKEW: Duration = Duration::from_secs(10);

        fn client_ip() -> IpAddr {
            IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4))
        }

        #[test]
        fn validate_a_fresh_cookie_for_the_same_ip() {
            let now = Duration::from_secs(1_000_000);
            let cookie = make(&client_ip(), now, KEY);

            assert!(check(&cookie, &client_ip(), now, MAX_CLOCK_SKEW, KEY).is_ok());
        }

        #[test]
        fn validate_a_cookie_for_its_whole_lifetime() {
            let now = Duration::from_secs(1_000_000);
            let cookie = make(&client_ip(), now, KEY);

            assert!(check(&cookie, &client_ip(), now + COOKIE_LIFETIME, MAX_CLOCK_SKEW, KEY).is_ok());
        }

        #[test]
        fn reject_a_cookie_past_its_lifetime() {
            let now = Duration::from_secs(1_000_000);
            let cookie = make(&client_ip(), now, KEY);

            assert!(check(
                &cookie,
                &client_ip(),
                now + COOKIE_LIFETIME + Duration::from_secs(1),
                MAX_CLOCK_SKEW,
                KEY
            )
            .is_err());
        }

        #[test]
        fn reject_a_cookie_dated_beyond_the_allowed_clock_skew() {
            let now = Duration::from_secs(1_000_000);
            let cookie = make(&client_ip(), now + MAX_CLOCK_SKEW + Duration::from_secs(5), KEY);

            assert!(check(&cookie, &client_ip(), now, MAX_CLOCK_SKEW, KEY).is_err());
        }

        #[test]
        fn accept_a_cookie_within_the_allowed_clock_skew() {
            let now = Duration::from_secs(1_000_000);
            let cookie = make(&client_ip(), now + MAX_CLOCK_SKEW - Duration::from_secs(1), KEY);

            assert!(check(&cookie, &client_ip(), now, MAX_CLOCK_SKEW, KEY).is_ok());
        }

        #[test]
        fn reject_a_cookie_presented_from_another_ip() {
            let now = Duration::from_secs(1_000_000);
            let cookie = make(&client_ip(), now, KEY);

            let other_ip = IpAddr::V4(Ipv4Addr::new(4, 3, 2, 1));
            assert!(check(&cookie, &other_ip, now, MAX_CLOCK_SKEW, KEY).is_err());
        }

        #[test]
        fn distinguish_ip_families() {
            let now = Duration::from_secs(1_000_000);
            let v6_ip = IpAddr::V6(Ipv6Addr::LOCALHOST);
            let cookie = make(&v6_ip, now, KEY);

            assert!(check(&cookie, &v6_ip, now, MAX_CLOCK_SKEW, KEY).is_ok());
            assert!(check(&cookie, &client_ip(), now, MAX_CLOCK_SKEW, KEY).is_err());
        }

        #[test]
        fn reject_any_tampered_cookie() {
            let now = Duration::from_secs(1_000_000);
            let cookie = make(&client_ip(), now, KEY);

            for byte in 0..8 {
                let mut tampered = cookie;
                tampered[byte] ^= 0x01;
                assert!(
                    check(&tampered, &client_ip(), now, MAX_CLOCK_SKEW, KEY).is_err(),
                    "flipping byte {byte} should invalidate the cookie"
                );
            }
        }

        #[test]
        fn reject_a_cookie_made_with_another_key() {
            let now = Duration::from_secs(1_000_000);
            let cookie = make(&client_ip(), now, b"other-key");

            assert!(check(&cookie, &client_ip(), now, MAX_CLOCK_SKEW, KEY).is_err());
        }
    }
}
