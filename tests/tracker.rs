//! Integration tests driving the tracker through its public API: the
//! request pipeline plus the frontend serialisers, without sockets.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use swarm_tracker::core::storage::sharded::ShardedStore;
use swarm_tracker::core::{sanitize, AnnounceRequest, Tracker};
use swarm_tracker_configuration::{Configuration, Storage};
use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer;

fn tracker() -> Arc<Tracker> {
    let config = Configuration::default();
    let store = Arc::new(ShardedStore::new(&Storage::default()));
    Arc::new(Tracker::new(&config, store).unwrap())
}

fn limits() -> sanitize::Limits {
    sanitize::Limits {
        max_numwant: 100,
        default_numwant: 50,
        max_scrape_infohashes: 50,
    }
}

fn sample_info_hash() -> InfoHash {
    "89d4bc52111d8b21fa075ad8bd15acc2e0354aaf".parse().unwrap()
}

mod http_announce {
    use swarm_tracker::servers::http::responses::announce::Compact;

    use super::*;

    #[test]
    fn a_stopped_event_against_an_empty_swarm_yields_a_bare_compact_response() {
        let tracker = tracker();

        let request = AnnounceRequest {
            info_hash: sample_info_hash(),
            peer_id: peer::Id(*b"-TR2820-l71jtqkl898b"),
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            port: 51413,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: AnnounceEvent::Stopped,
            num_want: Some(0),
        };

        let data = tracker.handle_announce(request, &limits()).unwrap();
        let body = Compact::from(data).body();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            "d8:completei0e10:incompletei0e8:intervali1800e12:min intervali1200ee"
        );

        // The swarm stayed empty: a later scrape sees nothing.
        let scrape = tracker
            .handle_scrape(
                swarm_tracker::core::ScrapeRequest {
                    info_hashes: vec![sample_info_hash()],
                    family: swarm_tracker_primitives::AddressFamily::V4,
                },
                &limits(),
            )
            .unwrap();
        assert_eq!(scrape.files[0].1.complete, 0);
        assert_eq!(scrape.files[0].1.incomplete, 0);
    }

    #[test]
    fn a_started_leecher_receives_the_known_seeder_as_six_compact_bytes() {
        let tracker = tracker();

        // One seeder at 1.2.3.4:6881 with an all-zero peer id.
        let seeder = AnnounceRequest {
            info_hash: sample_info_hash(),
            peer_id: peer::Id([0u8; 20]),
            ip: IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)),
            port: 6881,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: AnnounceEvent::None,
            num_want: Some(0),
        };
        tracker.handle_announce(seeder, &limits()).unwrap();

        let leecher = AnnounceRequest {
            info_hash: sample_info_hash(),
            peer_id: peer::Id(*b"-TR2820-l71jtqkl898b"),
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            port: 6882,
            uploaded: 0,
            downloaded: 0,
            left: 100,
            event: AnnounceEvent::Started,
            num_want: Some(50),
        };

        let data = tracker.handle_announce(leecher, &limits()).unwrap();
        let body = Compact::from(data).body();

        let mut expected = b"d8:completei1e10:incompletei1e8:intervali1800e12:min intervali1200e5:peers6:".to_vec();
        expected.extend_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x1A, 0xE1]);
        expected.push(b'e');

        assert_eq!(body, expected);
    }
}

mod udp_exchange {
    use swarm_tracker::servers::udp::connection_cookie;
    use swarm_tracker::servers::udp::handlers::handle_packet;
    use swarm_tracker::servers::udp::request::PROTOCOL_ID;
    use swarm_tracker::servers::udp::response::Response;
    use swarm_tracker_clock::clock::{Time, Working};
    use swarm_tracker_configuration::UdpTracker;

    use super::*;

    const KEY: &[u8] = b"integration-test-key";

    fn connect_packet(transaction_id: u32) -> Vec<u8> {
        let mut packet = Vec::new();
        packet.extend_from_slice(&PROTOCOL_ID);
        packet.extend_from_slice(&0u32.to_be_bytes());
        packet.extend_from_slice(&transaction_id.to_be_bytes());
        packet
    }

    fn announce_packet(connection_id: [u8; 8], info_hash: &InfoHash, peer_id: &[u8; 20], port: u16) -> Vec<u8> {
        let mut packet = Vec::new();
        packet.extend_from_slice(&connection_id);
        packet.extend_from_slice(&1u32.to_be_bytes());
        packet.extend_from_slice(&0x1234_5678u32.to_be_bytes());
        packet.extend_from_slice(&info_hash.0);
        packet.extend_from_slice(peer_id);
        packet.extend_from_slice(&50i64.to_be_bytes()); // downloaded
        packet.extend_from_slice(&100i64.to_be_bytes()); // left
        packet.extend_from_slice(&50i64.to_be_bytes()); // uploaded
        packet.extend_from_slice(&2i32.to_be_bytes()); // event: started
        packet.extend_from_slice(&[0, 0, 0, 0]); // ip: use source
        packet.extend_from_slice(&0u32.to_be_bytes()); // key
        packet.extend_from_slice(&50i32.to_be_bytes()); // numwant
        packet.extend_from_slice(&port.to_be_bytes());
        packet
    }

    #[tokio::test]
    async fn a_connect_yields_a_cookie_that_validates_for_the_source_ip() {
        let tracker = tracker();
        let config = UdpTracker::default();
        let from = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 40000);

        let response = handle_packet(&connect_packet(0xAABB_CCDD), from, &tracker, &config, KEY)
            .await
            .unwrap();

        let Response::Connect(connect) = response else {
            panic!("expected a connect response");
        };

        assert_eq!(connect.transaction_id, 0xAABB_CCDD);
        assert!(connection_cookie::check(&connect.connection_id, &from.ip(), Working::now(), config.max_clock_skew, KEY).is_ok());
    }

    #[tokio::test]
    async fn two_clients_connecting_and_announcing_discover_each_other() {
        let tracker = tracker();
        let config = UdpTracker::default();
        let info_hash = sample_info_hash();

        let first = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 10001);
        let second = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 10002);

        // First client: connect, then announce.
        let Response::Connect(connect) = handle_packet(&connect_packet(1), first, &tracker, &config, KEY).await.unwrap() else {
            panic!("expected a connect response");
        };
        let packet = announce_packet(connect.connection_id, &info_hash, b"-TR2820-000000000001", 10001);
        let Response::Announce(announce) = handle_packet(&packet, first, &tracker, &config, KEY).await.unwrap() else {
            panic!("expected an announce response");
        };
        assert!(announce.peers.is_empty());

        // Second client from another address.
        let Response::Connect(connect) = handle_packet(&connect_packet(2), second, &tracker, &config, KEY).await.unwrap() else {
            panic!("expected a connect response");
        };
        let packet = announce_packet(connect.connection_id, &info_hash, b"-TR2820-000000000002", 10002);
        let Response::Announce(announce) = handle_packet(&packet, second, &tracker, &config, KEY).await.unwrap() else {
            panic!("expected an announce response");
        };

        assert_eq!(announce.action, 1);
        assert_eq!(announce.peers, vec![first]);

        // And the first client now sees the second.
        let Response::Connect(connect) = handle_packet(&connect_packet(3), first, &tracker, &config, KEY).await.unwrap() else {
            panic!("expected a connect response");
        };
        let packet = announce_packet(connect.connection_id, &info_hash, b"-TR2820-000000000001", 10001);
        let Response::Announce(announce) = handle_packet(&packet, first, &tracker, &config, KEY).await.unwrap() else {
            panic!("expected an announce response");
        };
        assert_eq!(announce.peers, vec![second]);
    }
}
