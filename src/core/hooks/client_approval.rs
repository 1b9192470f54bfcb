//! Hook approving or banning clients by the fingerprint in their peer id.
use std::collections::HashSet;

use swarm_tracker_primitives::peer::ClientId;

use super::{BuildError, Hook};
use crate::core::error::Error;
use crate::core::{AnnounceData, AnnounceRequest};

/// Works as an allow-list when `whitelist` is configured, as a
/// block-list when `blacklist` is. The two are mutually exclusive,
/// enforced at configuration load time.
pub struct ClientApproval {
    approved: HashSet<ClientId>,
    banned: HashSet<ClientId>,
}

impl ClientApproval {
    /// # Errors
    ///
    /// Will return `Err` when a listed client id is not exactly 6 bytes.
    pub fn new(whitelist: &[String], blacklist: &[String]) -> Result<Self, BuildError> {
        Ok(Self {
            approved: parse_client_ids(whitelist)?,
            banned: parse_client_ids(blacklist)?,
        })
    }

    fn is_approved(&self, client_id: &ClientId) -> bool {
        if !self.approved.is_empty() {
            return self.approved.contains(client_id);
        }
        !self.banned.contains(client_id)
    }
}

fn parse_client_ids(values: &[String]) -> Result<HashSet<ClientId>, BuildError> {
    values
        .iter()
        .map(|value| {
            let bytes: [u8; 6] = value.as_bytes().try_into().map_err(|_| BuildError::InvalidClientId {
                hook: "client_approval",
                value: value.clone(),
            })?;
            Ok(ClientId(bytes))
        })
        .collect()
}

impl Hook for ClientApproval {
    fn name(&self) -> &'static str {
        "client_approval"
    }

    fn on_announce(&self, request: &AnnounceRequest, _response: &mut AnnounceData) -> Result<(), Error> {
        if self.is_approved(&request.peer_id.client_id()) {
            Ok(())
        } else {
            Err(Error::ClientNotApproved)
        }
    }
}

#[cfg(test)]
mod tests {

    mod it_should {
        use std::net::{IpAddr, Ipv4Addr};

        use swarm_tracker_primitives::announce_event::AnnounceEvent;
        use swarm_tracker_primitives::info_hash::InfoHash;
        use swarm_tracker_primitives::peer;

        use crate::core::hooks::client_approval::ClientApproval;
        use crate::core::hooks::Hook;
        use crate::core::{AnnounceData, AnnounceRequest};

        fn request_from(peer_id: &[u8; 20]) -> AnnounceRequest {
            AnnounceRequest {
                info_hash: InfoHash([0x69; 20]),
                peer_id: peer::Id(*peer_id),
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
        fn allow_whitelisted_clients_and_deny_the_rest() {
            let hook = ClientApproval::new(&["TR2820".to_owned()], &[]).unwrap();

            assert!(hook
                .on_announce(&request_from(b"-TR2820-l71jtqkl898b"), &mut AnnounceData::default())
                .is_ok());
            assert!(hook
                .on_announce(&request_from(b"-qB4500-l71jtqkl898b"), &mut AnnounceData::default())
                .is_err());
        }

        #[test]
        fn deny_blacklisted_clients_and_allow_the_rest() {
            let hook = ClientApproval::new(&[], &["qB4500".to_owned()]).unwrap();

            assert!(hook
                .on_announce(&request_from(b"-qB4500-l71jtqkl898b"), &mut AnnounceData::default())
                .is_err());
            assert!(hook
                .on_announce(&request_from(b"-TR2820-l71jtqkl898b"), &mut AnnounceData::default())
                .is_ok());
        }

        #[test]
        fn fail_building_with_a_client_id_that_is_not_6_bytes() {
            assert!(ClientApproval::new(&["TR".to_owned()], &[]).is_err());
        }
    }
}
