//! Builders for the packets used in tests.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use byteorder::{ByteOrder, NetworkEndian};

use crate::session::{Event, EventBody};
use crate::wire::checksum;

pub(crate) const PROTO_ICMP: u8 = 1;
pub(crate) const PROTO_UDP: u8 = 17;
pub(crate) const PROTO_ICMPV6: u8 = 58;

pub(crate) fn v4(addr: &str) -> Ipv4Addr {
    addr.parse().unwrap()
}

pub(crate) fn v6(addr: &str) -> Ipv6Addr {
    addr.parse().unwrap()
}

/// An IPv4 packet with a valid header checksum.
pub(crate) fn ipv4(src: &str, dst: &str, protocol: u8, payload: &[u8]) -> Vec<u8> {
    ipv4_with(src, dst, protocol, 0x4000, payload)
}

/// An IPv4 packet with explicit flags and fragment offset.
pub(crate) fn ipv4_with(src: &str, dst: &str, protocol: u8, frag: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = vec![0; 20];
    packet[0] = 0x45;
    NetworkEndian::write_u16(&mut packet[2..4], (20 + payload.len()) as u16);
    NetworkEndian::write_u16(&mut packet[4..6], 0x1234);
    NetworkEndian::write_u16(&mut packet[6..8], frag);
    packet[8] = 64;
    packet[9] = protocol;
    packet[12..16].copy_from_slice(&v4(src).octets());
    packet[16..20].copy_from_slice(&v4(dst).octets());
    let sum = !checksum::data(&packet);
    NetworkEndian::write_u16(&mut packet[10..12], sum);
    packet.extend_from_slice(payload);
    packet
}

/// An IPv6 packet without extension headers.
pub(crate) fn ipv6(src: &str, dst: &str, next_header: u8, flow_label: u32, payload: &[u8]) -> Vec<u8> {
    let mut packet = vec![0; 40];
    NetworkEndian::write_u32(&mut packet[0..4], 0x6000_0000 | (flow_label & 0xf_ffff));
    NetworkEndian::write_u16(&mut packet[4..6], payload.len() as u16);
    packet[6] = next_header;
    packet[7] = 255;
    packet[8..24].copy_from_slice(&v6(src).octets());
    packet[24..40].copy_from_slice(&v6(dst).octets());
    packet.extend_from_slice(payload);
    packet
}

/// An ICMPv4 message with a valid checksum.
pub(crate) fn icmpv4(msg_type: u8, code: u8, rest: [u8; 4], body: &[u8]) -> Vec<u8> {
    let mut message = icmp_unchecked(msg_type, code, rest, body);
    let sum = !checksum::data(&message);
    NetworkEndian::write_u16(&mut message[2..4], sum);
    message
}

/// An ICMPv6 message with a valid checksum for the given addresses.
pub(crate) fn icmpv6(src: &str, dst: &str, msg_type: u8, code: u8, rest: [u8; 4], body: &[u8])
    -> Vec<u8>
{
    let mut message = icmp_unchecked(msg_type, code, rest, body);
    let src = IpAddr::V6(v6(src));
    let dst = IpAddr::V6(v6(dst));
    let pseudo = checksum::pseudo_header(src, dst, PROTO_ICMPV6, message.len() as u32).unwrap();
    let sum = !checksum::combine(&[pseudo, checksum::data(&message)]);
    NetworkEndian::write_u16(&mut message[2..4], sum);
    message
}

/// An ICMP message with a zero checksum field.
pub(crate) fn icmp_unchecked(msg_type: u8, code: u8, rest: [u8; 4], body: &[u8]) -> Vec<u8> {
    let mut message = vec![msg_type, code, 0, 0];
    message.extend_from_slice(&rest);
    message.extend_from_slice(body);
    message
}

/// A UDP datagram without checksum.
pub(crate) fn udp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut datagram = vec![0; 8];
    NetworkEndian::write_u16(&mut datagram[0..2], src_port);
    NetworkEndian::write_u16(&mut datagram[2..4], dst_port);
    NetworkEndian::write_u16(&mut datagram[4..6], (8 + payload.len()) as u16);
    datagram.extend_from_slice(payload);
    datagram
}

/// The names of all weirds among the events.
pub(crate) fn weirds(events: &[Event]) -> Vec<&'static str> {
    events.iter()
        .filter_map(|event| match &event.body {
            EventBody::Weird(weird) => Some(weird.name),
            _ => None,
        })
        .collect()
}
