//! Hook approving or banning swarms by info-hash.
use std::collections::HashSet;

use swarm_tracker_configuration::ScrapeMode;
use swarm_tracker_primitives::info_hash::InfoHash;

use super::{BuildError, Hook};
use crate::core::error::Error;
use crate::core::{AnnounceData, AnnounceRequest, ScrapeData, ScrapeRequest};

/// Works as an allow-list when `whitelist` is configured, as a
/// block-list when `blacklist` is.
///
/// On scrape the behaviour depends on the configured [`ScrapeMode`]:
/// `filter` silently drops disallowed hashes, `block` fails the whole
/// request.
pub struct InfohashApproval {
    approved: HashSet<InfoHash>,
    banned: HashSet<InfoHash>,
    scrape_mode: ScrapeMode,
}

impl InfohashApproval {
    /// # Errors
    ///
    /// Will return `Err` when a listed value is not a 40-char hex hash.
    pub fn new(whitelist: &[String], blacklist: &[String], scrape_mode: ScrapeMode) -> Result<Self, BuildError> {
        Ok(Self {
            approved: parse_info_hashes(whitelist)?,
            banned: parse_info_hashes(blacklist)?,
            scrape_mode,
        })
    }

    fn is_approved(&self, info_hash: &InfoHash) -> bool {
        if !self.approved.is_empty() {
            return self.approved.contains(info_hash);
        }
        !self.banned.contains(info_hash)
    }
}

fn parse_info_hashes(values: &[String]) -> Result<HashSet<InfoHash>, BuildError> {
    values
        .iter()
        .map(|value| {
            value.parse::<InfoHash>().map_err(|_| BuildError::InvalidInfoHash {
                hook: "infohash_approval",
                value: value.clone(),
            })
        })
        .collect()
}

impl Hook for InfohashApproval {
    fn name(&self) -> &'static str {
        "infohash_approval"
    }

    fn on_announce(&self, request: &AnnounceRequest, _response: &mut AnnounceData) -> Result<(), Error> {
        if self.is_approved(&request.info_hash) {
            Ok(())
        } else {
            Err(Error::InfohashNotApproved)
        }
    }

    fn on_scrape(&self, request: &mut ScrapeRequest, _response: &mut ScrapeData) -> Result<(), Error> {
        match self.scrape_mode {
            ScrapeMode::Filter => {
                request.info_hashes.retain(|info_hash| self.is_approved(info_hash));
                Ok(())
            }
            ScrapeMode::Block => {
                if request.info_hashes.iter().all(|info_hash| self.is_approved(info_hash)) {
                    Ok(())
                } else {
                    Err(Error::InfohashNotApproved)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {

    mod it_should {
        use std::net::{IpAddr, Ipv4Addr};

        use swarm_tracker_configuration::ScrapeMode;
        use swarm_tracker_primitives::announce_event::AnnounceEvent;
        use swarm_tracker_primitives::info_hash::InfoHash;
        use swarm_tracker_primitives::{peer, AddressFamily};

        use crate::core::hooks::infohash_approval::InfohashApproval;
        use crate::core::hooks::Hook;
        use crate::core::{AnnounceData, AnnounceRequest, ScrapeData, ScrapeRequest};

        const ALLOWED: &str = "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0";

        fn allowed_hash() -> InfoHash {
            ALLOWED.parse().unwrap()
        }

        fn announce_for(info_hash: InfoHash) -> AnnounceRequest {
            AnnounceRequest {
                info_hash,
                peer_id: peer::Id(*b"-qB00000000000000001"),
                ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 6881,
                uploaded: 0,
                downloaded: 0,
                left: 100,
                event: AnnounceEvent::Started,
                num_want: None,
            }
        }

        #[test]
        fn deny_an_announce_for_a_hash_missing_from_the_whitelist() {
            let hook = InfohashApproval::new(&[ALLOWED.to_owned()], &[], ScrapeMode::Filter).unwrap();

            assert!(hook
                .on_announce(&announce_for(allowed_hash()), &mut AnnounceData::default())
                .is_ok());
            assert!(hook
                .on_announce(&announce_for(InfoHash([0; 20])), &mut AnnounceData::default())
                .is_err());
        }

        #[test]
        fn silently_drop_disallowed_hashes_from_a_scrape_in_filter_mode() {
            let hook = InfohashApproval::new(&[ALLOWED.to_owned()], &[], ScrapeMode::Filter).unwrap();

            let mut request = ScrapeRequest {
                info_hashes: vec![allowed_hash(), InfoHash([0; 20])],
                family: AddressFamily::V4,
            };

            hook.on_scrape(&mut request, &mut ScrapeData::default()).unwrap();

            assert_eq!(request.info_hashes, vec![allowed_hash()]);
        }

        #[test]
        fn fail_the_whole_scrape_in_block_mode() {
            let hook = InfohashApproval::new(&[ALLOWED.to_owned()], &[], ScrapeMode::Block).unwrap();

            let mut request = ScrapeRequest {
                info_hashes: vec![allowed_hash(), InfoHash([0; 20])],
                family: AddressFamily::V4,
            };

            assert!(hook.on_scrape(&mut request, &mut ScrapeData::default()).is_err());
        }

        #[test]
        fn allow_everything_not_blacklisted() {
            let hook = InfohashApproval::new(&[], &[ALLOWED.to_owned()], ScrapeMode::Filter).unwrap();

            assert!(hook
                .on_announce(&announce_for(InfoHash([0; 20])), &mut AnnounceData::default())
                .is_ok());
            assert!(hook
                .on_announce(&announce_for(allowed_hash()), &mut AnnounceData::default())
                .is_err());
        }
    }
}
