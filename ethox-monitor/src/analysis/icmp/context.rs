use byteorder::{ByteOrder, NetworkEndian};

use crate::session::{ConnUid, ConnectionId, Transport};
use crate::wire::{
    IpProtocol,
    Ipv6Chain,
    ipv4_packet,
    ipv6_packet,
    IPV6_HEADER_LEN,
};

use super::message_ports;

/// The datagram embedded in an ICMP error message.
///
/// Errors quote the IP header and at least the first eight octets of the offending datagram.
/// Everything here is parsed from that quote, never from the ICMP packet itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpContext {
    /// The identity of the embedded datagram, from its own perspective.
    ///
    /// Ports are zero when the transport has none or too little of it was quoted. `None` when the
    /// embedded header could not be parsed.
    pub id: Option<ConnectionId>,
    /// The declared total length of the embedded datagram.
    pub len: usize,
    pub proto: Transport,
    pub frag_offset: u16,
    /// The embedded header is shorter than its own length fields claim.
    pub bad_hdr_len: bool,
    /// The embedded IPv4 header checksum does not verify.
    pub bad_checksum: bool,
    pub more_frags: bool,
    pub dont_frag: bool,
    /// The live connection the embedded datagram belongs to.
    ///
    /// Resolved by the session table when the event is flushed.
    pub related: Option<ConnUid>,
}

impl IcmpContext {
    fn bad_header() -> Self {
        IcmpContext {
            id: None,
            len: 0,
            proto: Transport::Unknown,
            frag_offset: 0,
            bad_hdr_len: true,
            bad_checksum: false,
            more_frags: false,
            dont_frag: false,
            related: None,
        }
    }

    /// Parse an embedded IPv4 datagram.
    ///
    /// The header checksum is only validated if the interface did not already do so for the
    /// outer packet.
    pub fn extract_v4(data: &[u8], l3_checksummed: bool, encapsulation: u32) -> Self {
        let packet = match ipv4_packet::new_checked(data) {
            Ok(packet) => packet,
            Err(_) => return IcmpContext::bad_header(),
        };

        let header_len = packet.header_len();
        let end = usize::from(packet.total_len()).min(data.len());
        let transport = data.get(header_len..end).unwrap_or(&[]);
        let (src_port, dst_port, is_one_way) = transport_ports(packet.protocol(), transport);

        IcmpContext {
            id: Some(ConnectionId {
                src_addr: packet.src_addr().into(),
                dst_addr: packet.dst_addr().into(),
                src_port,
                dst_port,
                transport: Transport::of_protocol(packet.protocol()),
                is_one_way,
                encapsulation,
            }),
            len: usize::from(packet.total_len()),
            proto: Transport::of_protocol(packet.protocol()),
            frag_offset: packet.frag_offset(),
            bad_hdr_len: false,
            bad_checksum: !l3_checksummed && !packet.verify_checksum(),
            more_frags: packet.more_frags(),
            dont_frag: packet.dont_frag(),
            related: None,
        }
    }

    /// Parse an embedded IPv6 datagram.
    ///
    /// Extension headers are skipped as far as they were quoted.
    pub fn extract_v6(data: &[u8], encapsulation: u32) -> Self {
        let packet = match ipv6_packet::new_checked(data) {
            Ok(packet) => packet,
            Err(_) => return IcmpContext::bad_header(),
        };

        let chain = Ipv6Chain::walk(packet.next_header(), &data[IPV6_HEADER_LEN..]);
        let header_len = IPV6_HEADER_LEN + chain.len;
        let transport = if chain.truncated {
            &[][..]
        } else {
            data.get(header_len..).unwrap_or(&[])
        };
        let (src_port, dst_port, is_one_way) = transport_ports(chain.next_header, transport);
        let fragment = chain.fragment();

        IcmpContext {
            id: Some(ConnectionId {
                src_addr: packet.src_addr().into(),
                dst_addr: packet.dst_addr().into(),
                src_port,
                dst_port,
                transport: Transport::of_protocol(chain.next_header),
                is_one_way,
                encapsulation,
            }),
            len: IPV6_HEADER_LEN + usize::from(packet.payload_len()),
            proto: Transport::of_protocol(chain.next_header),
            frag_offset: fragment.map_or(0, |frag| frag.offset),
            bad_hdr_len: false,
            bad_checksum: false,
            more_frags: fragment.map_or(false, |frag| frag.more_frags),
            dont_frag: true,
            related: None,
        }
    }
}

/// The ports of a quoted transport header.
///
/// TCP and UDP need both port fields, ICMP type and code.
fn transport_ports(protocol: IpProtocol, data: &[u8]) -> (u16, u16, bool) {
    match protocol {
        IpProtocol::Tcp | IpProtocol::Udp if data.len() >= 4 => {
            (NetworkEndian::read_u16(&data[0..2]), NetworkEndian::read_u16(&data[2..4]), false)
        },
        IpProtocol::Icmp | IpProtocol::Icmpv6 if data.len() >= 2 => {
            message_ports(protocol == IpProtocol::Icmpv6, data[0], data[1])
        },
        _ => (0, 0, false),
    }
}
