//! Hook filling the announce intervals from the configuration.
use swarm_tracker_configuration::AnnouncePolicy;

use super::Hook;
use crate::core::error::Error;
use crate::core::{AnnounceData, AnnounceRequest};

pub struct SetInterval {
    policy: AnnouncePolicy,
}

impl SetInterval {
    #[must_use]
    pub fn new(policy: AnnouncePolicy) -> Self {
        Self { policy }
    }
}

impl Hook for SetInterval {
    fn name(&self) -> &'static str {
        "interval"
    }

    fn on_announce(&self, _request: &AnnounceRequest, response: &mut AnnounceData) -> Result<(), Error> {
        response.interval = self.policy.interval;
        response.interval_min = self.policy.interval_min;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use swarm_tracker_configuration::AnnouncePolicy;
    use swarm_tracker_primitives::announce_event::AnnounceEvent;
    use swarm_tracker_primitives::info_hash::InfoHash;
    use swarm_tracker_primitives::peer;

    use super::SetInterval;
    use crate::core::hooks::Hook;
    use crate::core::{AnnounceData, AnnounceRequest};

    #[test]
    fn it_should_copy_the_configured_intervals_into_the_response() {
        let hook = SetInterval::new(AnnouncePolicy {
            interval: 1800,
            interval_min: 900,
        });

        let request = AnnounceRequest {
            info_hash: InfoHash([0x69; 20]),
            peer_id: peer::Id(*b"-qB00000000000000001"),
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 6881,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: AnnounceEvent::None,
            num_want: None,
        };
        let mut response = AnnounceData::default();

        hook.on_announce(&request, &mut response).unwrap();

        assert_eq!(response.interval, 1800);
        assert_eq!(response.interval_min, 900);
    }
}
