use std::net::{IpAddr, Ipv6Addr};

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::runtime::Runtime;
use crate::session::{ConnRecord, Event, EventBody, Transport};
use crate::testing::*;
use crate::time::{Duration, Instant};

use super::*;

fn run(runtime: &mut Runtime, packets: &[Vec<u8>]) -> Vec<Event> {
    for (i, packet) in packets.iter().enumerate() {
        runtime.process_ip(packet, Instant::from_secs(1 + i as i64)).unwrap();
    }
    runtime.take_events()
}

fn icmp_events(events: &[Event]) -> Vec<IcmpEvent> {
    events.iter()
        .filter_map(|event| match &event.body {
            EventBody::Icmp(icmp) => Some(icmp.clone()),
            _ => None,
        })
        .collect()
}

fn single(events: &[Event]) -> IcmpEvent {
    let icmp = icmp_events(events);
    assert_eq!(icmp.len(), 1, "Expected one ICMP event in {:?}", events);
    icmp[0].clone()
}

fn v6_message(msg_type: u8, code: u8, rest: [u8; 4], body: &[u8]) -> Vec<u8> {
    v6_between("fe80::1", "fe80::2", msg_type, code, rest, body)
}

fn v6_between(src: &str, dst: &str, msg_type: u8, code: u8, rest: [u8; 4], body: &[u8]) -> Vec<u8> {
    let message = icmpv6(src, dst, msg_type, code, rest, body);
    ipv6(src, dst, PROTO_ICMPV6, 0, &message)
}

#[test]
fn counterparts() {
    assert_eq!(icmp4_counterpart(8, 0), (0, false));
    assert_eq!(icmp4_counterpart(13, 0), (14, false));
    assert_eq!(icmp4_counterpart(10, 0), (9, false));
    assert_eq!(icmp4_counterpart(3, 1), (1, true));
    assert_eq!(icmp4_counterpart(5, 2), (2, true));

    assert_eq!(icmp6_counterpart(128, 0), (129, false));
    assert_eq!(icmp6_counterpart(135, 0), (136, false));
    assert_eq!(icmp6_counterpart(130, 0), (131, false));
    assert_eq!(icmp6_counterpart(144, 0), (145, false));
    assert_eq!(icmp6_counterpart(1, 4), (4, true));
    assert_eq!(icmp6_counterpart(137, 0), (0, true));
}

#[test]
fn echo_request_and_reply() {
    let mut runtime = Runtime::new(Config::default());
    let request = ipv4("192.0.2.1", "192.0.2.2", PROTO_ICMP, &icmpv4(8, 0, [0, 7, 0, 1], b"ping"));
    let reply = ipv4("192.0.2.2", "192.0.2.1", PROTO_ICMP, &icmpv4(0, 0, [0, 7, 0, 1], b"ping"));
    let events = run(&mut runtime, &[request, reply]);

    assert_eq!(runtime.table().len(), 1);
    assert!(weirds(&events).is_empty(), "Unexpected weirds {:?}", events);
    let icmp = icmp_events(&events);
    assert_eq!(icmp.len(), 2);

    match &icmp[0] {
        IcmpEvent::EchoRequest { info, id, seq, payload } => {
            assert!(!info.v6);
            assert_eq!((info.itype, info.icode, info.len, info.ttl), (8, 0, 4, 64));
            assert_eq!((*id, *seq), (7, 1));
            assert_eq!(payload, b"ping");
        },
        other => panic!("Unexpected event {:?}", other),
    }
    assert!(matches!(icmp[1], IcmpEvent::EchoReply { id: 7, seq: 1, .. }));

    let last = events.last().unwrap().conn.clone().unwrap();
    assert_eq!(last.id.src_port, 8);
    assert_eq!(last.id.dst_port, 0);
    assert!(!last.id.is_one_way);
    assert_eq!((last.orig.size, last.orig.state), (4, ICMP_ACTIVE));
    assert_eq!((last.resp.size, last.resp.state), (4, ICMP_ACTIVE));
    assert_eq!((last.orig.num_pkts, last.resp.num_pkts), (1, 1));
    assert_eq!(last.duration, Duration::from_secs(1));
    assert_eq!(last.service, vec!["ICMP"]);
}

#[test]
fn bad_checksum() {
    let message = icmp_unchecked(8, 0, [0, 1, 0, 1], b"data");
    let packet = ipv4("192.0.2.1", "192.0.2.2", PROTO_ICMP, &message);

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[packet.clone()]);
    assert_eq!(weirds(&events), vec!["bad_ICMP_checksum"]);
    assert!(icmp_events(&events).is_empty());
    assert_eq!(runtime.table().weird_count("bad_ICMP_checksum"), 1);

    let config = Config { ignore_checksums: true, ..Config::default() };
    let mut runtime = Runtime::new(config);
    let events = run(&mut runtime, &[packet]);
    assert!(weirds(&events).is_empty());
    assert!(matches!(single(&events), IcmpEvent::EchoRequest { .. }));
}

#[test]
fn short_capture_skips_checksum() {
    let message = icmp_unchecked(8, 0, [0, 1, 0, 1], b"long payload");
    let mut packet = ipv4("192.0.2.1", "192.0.2.2", PROTO_ICMP, &message);
    packet.truncate(packet.len() - 4);

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[packet]);
    assert!(weirds(&events).is_empty());
    match single(&events) {
        IcmpEvent::EchoRequest { info, payload, .. } => {
            // The declared length counts, not the captured one.
            assert_eq!(info.len, 12);
            assert_eq!(payload, b"long pay");
        },
        other => panic!("Unexpected event {:?}", other),
    }
}

#[test]
fn unreachable_refers_to_live_connection() {
    let datagram = ipv4("192.0.2.1", "192.0.2.2", PROTO_UDP, &udp(40000, 53, b"abcd"));
    let error = ipv4("192.0.2.2", "192.0.2.1", PROTO_ICMP, &icmpv4(3, 3, [0; 4], &datagram));

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[datagram.clone(), error]);
    assert!(weirds(&events).is_empty(), "Unexpected weirds {:?}", events);

    let udp_uid = events[0].conn.as_ref().unwrap().uid;
    let icmp_event = events.iter()
        .find(|event| matches!(event.body, EventBody::Icmp(_)))
        .unwrap();

    let record: &ConnRecord = icmp_event.conn.as_ref().unwrap();
    assert_eq!((record.id.src_port, record.id.dst_port), (3, 3));
    assert!(record.id.is_one_way);
    assert_ne!(record.uid, udp_uid);

    match &icmp_event.body {
        EventBody::Icmp(IcmpEvent::Unreachable { code, context, .. }) => {
            assert_eq!(*code, 3);
            let id = context.id.unwrap();
            assert_eq!(id.src_addr, IpAddr::V4(v4("192.0.2.1")));
            assert_eq!(id.dst_addr, IpAddr::V4(v4("192.0.2.2")));
            assert_eq!((id.src_port, id.dst_port), (40000, 53));
            assert_eq!(context.proto, Transport::Udp);
            assert_eq!(context.len, datagram.len());
            assert!(context.dont_frag);
            assert!(!context.more_frags);
            assert!(!context.bad_hdr_len);
            assert!(!context.bad_checksum);
            assert_eq!(context.related, Some(udp_uid));
        },
        other => panic!("Unexpected event {:?}", other),
    }
}

#[test]
fn unreachable_without_connection() {
    let datagram = ipv4("192.0.2.1", "192.0.2.2", PROTO_UDP, &udp(40000, 53, b"abcd"));
    let error = ipv4("192.0.2.2", "192.0.2.1", PROTO_ICMP, &icmpv4(3, 3, [0; 4], &datagram));

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[error]);
    let context = single(&events).context().cloned().unwrap();
    assert!(context.id.is_some());
    assert_eq!(context.related, None);
}

#[test]
fn truncated_context() {
    let error = ipv4("192.0.2.2", "192.0.2.1", PROTO_ICMP, &icmpv4(11, 0, [0; 4], &[0x45; 10]));

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[error]);
    assert_eq!(weirds(&events), vec!["ICMP_context_truncated"]);
    match single(&events) {
        IcmpEvent::TimeExceeded { context, .. } => {
            assert!(context.bad_hdr_len);
            assert_eq!(context.id, None);
        },
        other => panic!("Unexpected event {:?}", other),
    }
}

#[test]
fn v4_context_checksum() {
    let mut datagram = ipv4("192.0.2.1", "192.0.2.2", PROTO_UDP, &udp(40000, 53, b""));
    datagram[10] ^= 0xff;
    let error = icmpv4(3, 1, [0; 4], &datagram);

    let context = IcmpContext::extract_v4(&error[8..], false, 0);
    assert!(context.bad_checksum);
    // The interface already verified it.
    let context = IcmpContext::extract_v4(&error[8..], true, 0);
    assert!(!context.bad_checksum);
}

#[test]
fn other_v4_messages_are_sent() {
    let mut runtime = Runtime::new(Config::default());
    let redirect = ipv4("192.0.2.254", "192.0.2.1", PROTO_ICMP, &icmpv4(5, 1, [192, 0, 2, 253], b""));
    let events = run(&mut runtime, &[redirect]);
    match single(&events) {
        IcmpEvent::Sent { info, payload } => {
            assert_eq!((info.itype, info.icode), (5, 1));
            assert!(payload.is_empty());
        },
        other => panic!("Unexpected event {:?}", other),
    }
}

#[test]
fn v6_packet_too_big() {
    let echo = icmpv6("2001:db8::1", "2001:db8::2", 128, 0, [0, 1, 0, 1], b"");
    let original = ipv6("2001:db8::1", "2001:db8::2", PROTO_ICMPV6, 0, &echo);
    let error = icmpv6("2001:db8::ff", "2001:db8::1", 2, 0, [0, 0, 0x05, 0x00], &original);
    let packet = ipv6("2001:db8::ff", "2001:db8::1", PROTO_ICMPV6, 0, &error);

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[original.clone(), packet]);
    let echo_uid = events[0].conn.as_ref().unwrap().uid;

    let icmp = icmp_events(&events);
    assert_eq!(icmp.len(), 2);
    match &icmp[1] {
        IcmpEvent::PacketTooBig { info, context, .. } => {
            assert!(info.v6);
            let id = context.id.unwrap();
            assert_eq!((id.src_port, id.dst_port, id.is_one_way), (128, 129, false));
            assert_eq!(context.proto, Transport::Icmp);
            assert_eq!(context.len, original.len());
            assert_eq!(context.related, Some(echo_uid));
        },
        other => panic!("Unexpected event {:?}", other),
    }
}

#[test]
fn v6_errors() {
    let original = ipv6("fe80::2", "fe80::1", PROTO_UDP, 0, &udp(5353, 5353, b""));
    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[
        v6_message(1, 4, [0; 4], &original),
        v6_message(3, 0, [0; 4], &original),
        v6_message(4, 1, [0, 0, 0, 6], &original),
        v6_message(5, 0, [0; 4], &original),
    ]);

    let icmp = icmp_events(&events);
    assert_eq!(icmp.len(), 4);
    assert!(matches!(icmp[0], IcmpEvent::Unreachable { code: 4, .. }));
    assert!(matches!(icmp[1], IcmpEvent::TimeExceeded { code: 0, .. }));
    assert!(matches!(icmp[2], IcmpEvent::ParameterProblem { code: 1, .. }));
    assert!(matches!(icmp[3], IcmpEvent::ErrorMessage { code: 0, .. }));
    for event in &icmp {
        let id = event.context().unwrap().id.unwrap();
        assert_eq!((id.src_port, id.dst_port), (5353, 5353));
    }
}

#[test]
fn router_advertisement() {
    let mut body = Vec::new();
    body.extend_from_slice(&30_000u32.to_be_bytes());
    body.extend_from_slice(&1_000u32.to_be_bytes());
    // Source link-layer address.
    body.extend_from_slice(&[1, 1, 0x02, 0x00, 0x5e, 0x00, 0x53, 0x01]);
    // Prefix information.
    body.extend_from_slice(&[3, 4, 64, 0xc0]);
    body.extend_from_slice(&86_400u32.to_be_bytes());
    body.extend_from_slice(&14_400u32.to_be_bytes());
    body.extend_from_slice(&[0; 4]);
    body.extend_from_slice(&v6("2001:db8::").octets());
    // MTU.
    body.extend_from_slice(&[5, 1, 0, 0]);
    body.extend_from_slice(&1500u32.to_be_bytes());

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[v6_message(134, 0, [64, 0xca, 0x07, 0x08], &body)]);
    assert!(weirds(&events).is_empty(), "Unexpected weirds {:?}", events);

    let advert = match single(&events) {
        IcmpEvent::RouterAdvertisement(advert) => advert,
        other => panic!("Unexpected event {:?}", other),
    };
    assert_eq!(advert.cur_hop_limit, 64);
    assert!(advert.managed);
    assert!(advert.other);
    assert!(!advert.home_agent);
    assert_eq!(advert.preference, 1);
    assert!(!advert.proxy);
    assert!(advert.reserved);
    assert_eq!(advert.router_lifetime, Duration::from_secs(1800));
    assert_eq!(advert.reachable_time, Duration::from_millis(30_000));
    assert_eq!(advert.retrans_timer, Duration::from_millis(1_000));

    assert_eq!(advert.options.len(), 3);
    assert_eq!(advert.options[0].data, NdOptionData::LinkAddress(vec![0x02, 0x00, 0x5e, 0x00, 0x53, 0x01]));
    assert_eq!(advert.options[1].data, NdOptionData::Prefix(PrefixInfo {
        prefix_len: 64,
        on_link: true,
        autonomous: true,
        valid_lifetime: Duration::from_secs(86_400),
        preferred_lifetime: Duration::from_secs(14_400),
        prefix: v6("2001:db8::"),
    }));
    assert_eq!(advert.options[2].data, NdOptionData::Mtu(1500));
}

#[test]
fn neighbor_discovery() {
    let target = v6("fe80::2");
    let mut solicitation = target.octets().to_vec();
    solicitation.extend_from_slice(&[1, 1, 0x02, 0x00, 0x5e, 0x00, 0x53, 0x01]);
    let advertisement = target.octets().to_vec();

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[
        v6_message(135, 0, [0; 4], &solicitation),
        v6_between("fe80::2", "fe80::1", 136, 0, [0xe0, 0, 0, 0], &advertisement),
    ]);
    assert!(weirds(&events).is_empty(), "Unexpected weirds {:?}", events);

    let icmp = icmp_events(&events);
    match &icmp[0] {
        IcmpEvent::NeighborSolicitation { target: got, options, .. } => {
            assert_eq!(*got, target);
            assert_eq!(options.len(), 1);
            assert_eq!((options[0].otype, options[0].len), (1, 1));
        },
        other => panic!("Unexpected event {:?}", other),
    }
    match &icmp[1] {
        IcmpEvent::NeighborAdvertisement { router, solicited, overrides, options, .. } => {
            assert!(*router && *solicited && *overrides);
            assert!(options.is_empty());
        },
        other => panic!("Unexpected event {:?}", other),
    }
    // Solicitation and advertisement are counterparts.
    assert_eq!(runtime.table().len(), 1);
}

#[test]
fn zero_length_option() {
    let mut body = v6("fe80::2").octets().to_vec();
    body.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);
    body.extend_from_slice(&[5, 1, 0, 0, 0, 0, 5, 0xdc]);

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[v6_message(135, 0, [0; 4], &body)]);
    assert_eq!(weirds(&events), vec!["zero_length_ICMPv6_ND_option"]);
    // Parsing stops at the broken option.
    assert!(single(&events).options().is_empty());
}

#[test]
fn truncated_options() {
    let mut body = v6("fe80::2").octets().to_vec();
    body.push(1);

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[v6_message(135, 0, [0; 4], &body)]);
    assert_eq!(weirds(&events), vec!["truncated_ICMPv6_ND_options"]);
}

#[test]
fn short_option_keeps_payload() {
    let mut body = v6("fe80::2").octets().to_vec();
    // A prefix option claiming 32 octets with only 6 present.
    body.extend_from_slice(&[3, 4, 64, 0xc0, 0, 0, 0, 1]);

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[v6_message(135, 0, [0; 4], &body)]);
    let options = single(&events).options().to_vec();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].data, NdOptionData::Payload(vec![64, 0xc0, 0, 0, 0, 1]));
}

#[test]
fn short_mtu_option_keeps_payload() {
    let mut body = v6("fe80::2").octets().to_vec();
    // An MTU option claiming 8 octets with the MTU cut short.
    body.extend_from_slice(&[5, 1, 0, 0, 0x05]);

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[v6_message(135, 0, [0; 4], &body)]);
    let options = single(&events).options().to_vec();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].data, NdOptionData::Payload(vec![0, 0, 0x05]));
}

#[test]
fn truncated_message() {
    // The target address is cut in half.
    let body = &v6("fe80::2").octets()[..8];

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[v6_message(135, 0, [0; 4], body)]);
    assert_eq!(weirds(&events), vec!["truncated_ICMP_message"]);
    match single(&events) {
        IcmpEvent::NeighborSolicitation { target, options, .. } => {
            assert_eq!(target, Ipv6Addr::UNSPECIFIED);
            assert!(options.is_empty());
        },
        other => panic!("Unexpected event {:?}", other),
    }
}

#[test]
fn redirect_with_header() {
    let quoted = ipv6("fe80::1", "2001:db8::5", PROTO_UDP, 0, &udp(40000, 53, b""));
    let mut body = Vec::new();
    body.extend_from_slice(&v6("fe80::3").octets());
    body.extend_from_slice(&v6("2001:db8::5").octets());
    body.extend_from_slice(&[4, 7, 0, 0, 0, 0, 0, 0]);
    body.extend_from_slice(&quoted);

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[v6_message(137, 0, [0; 4], &body)]);
    assert!(weirds(&events).is_empty(), "Unexpected weirds {:?}", events);

    match single(&events) {
        IcmpEvent::Redirect { target, dest, options, .. } => {
            assert_eq!(target, v6("fe80::3"));
            assert_eq!(dest, v6("2001:db8::5"));
            assert_eq!(options.len(), 1);
            match &options[0].data {
                NdOptionData::RedirectedHeader(context) => {
                    let id = context.id.unwrap();
                    assert_eq!(context.proto, Transport::Udp);
                    assert_eq!((id.src_port, id.dst_port), (40000, 53));
                    assert_eq!(context.related, None);
                },
                other => panic!("Unexpected option {:?}", other),
            }
        },
        other => panic!("Unexpected event {:?}", other),
    }
}

#[test]
fn redirected_header_refers_to_live_connection() {
    let quoted = ipv6("fe80::1", "2001:db8::5", PROTO_UDP, 0, &udp(40000, 53, b""));
    let mut body = Vec::new();
    body.extend_from_slice(&v6("fe80::3").octets());
    body.extend_from_slice(&v6("2001:db8::5").octets());
    body.extend_from_slice(&[4, 7, 0, 0, 0, 0, 0, 0]);
    body.extend_from_slice(&quoted);

    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[quoted.clone(), v6_message(137, 0, [0; 4], &body)]);
    assert!(weirds(&events).is_empty(), "Unexpected weirds {:?}", events);
    let udp_uid = events[0].conn.as_ref().unwrap().uid;

    let redirect = single(&events);
    match &redirect.options()[0].data {
        NdOptionData::RedirectedHeader(context) => assert_eq!(context.related, Some(udp_uid)),
        other => panic!("Unexpected option {:?}", other),
    }
}

#[test]
fn router_renumbering_is_sent() {
    let mut runtime = Runtime::new(Config::default());
    let events = run(&mut runtime, &[v6_message(138, 0, [0; 4], b"abcd")]);
    assert!(matches!(single(&events), IcmpEvent::Sent { .. }));
}

#[test]
fn record_of_silent_analyzer() {
    let analyzer = IcmpAnalyzer::new();
    let mut runtime = Runtime::new(Config::default());
    let request = ipv4("192.0.2.1", "192.0.2.2", PROTO_ICMP, &icmpv4(8, 0, [0, 7, 0, 1], b""));
    let events = run(&mut runtime, &[request]);

    let mut record = events[0].conn.clone().unwrap();
    analyzer.update_record(&mut record);
    assert_eq!((record.orig.size, record.orig.state), (0, ICMP_INACTIVE));
    assert_eq!((record.resp.size, record.resp.state), (0, ICMP_INACTIVE));

    // Only the originator spoke.
    assert_eq!(events[0].conn.as_ref().unwrap().orig.state, ICMP_ACTIVE);
    assert_eq!(events[0].conn.as_ref().unwrap().resp.state, ICMP_INACTIVE);
    assert_eq!(analyzer.request_len(), None);
}
