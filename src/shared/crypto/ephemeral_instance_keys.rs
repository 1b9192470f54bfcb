//! This module contains the ephemeral instance keys used by the application.
//!
//! They are ephemeral because they are generated at runtime when the
//! application starts and are not persisted anywhere. The UDP
//! connection-ID engine signs with this seed when no `private_key` is
//! configured, so connection IDs stop validating across restarts.
use rand::rngs::ThreadRng;
use rand::Rng;

pub type Seed = [u8; 32];

lazy_static! {
    /// The random static seed.
    pub static ref RANDOM_SEED: Seed = Rng::gen(&mut ThreadRng::default());
}

#[cfg(test)]
mod tests {
    use std::convert::TryInto;

    use super::RANDOM_SEED;

    #[test]
    fn it_should_have_a_large_random_seed() {
        assert!(u128::from_ne_bytes((*RANDOM_SEED)[..16].try_into().unwrap()) > u128::from(u64::MAX));
        assert!(u128::from_ne_bytes((*RANDOM_SEED)[16..].try_into().unwrap()) > u128::from(u64::MAX));
    }
}
