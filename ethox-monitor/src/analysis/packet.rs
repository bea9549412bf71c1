use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::session::EncapsulationStack;
use crate::time::Instant;
use crate::wire::{
    self,
    IpProtocol,
    IpVersion,
    Ipv6Chain,
    Ipv6Extension,
    ipv4_packet,
    ipv6_packet,
    IPV6_HEADER_LEN,
};

/// A captured packet handed to the monitor by the capture front end.
///
/// The capture buffer may start with a link layer header, the network layer header begins at
/// `ip_offset`. The IP header, including all IPv6 extension headers, is parsed on construction.
#[derive(Debug, Clone)]
pub struct Packet<'a> {
    capture: &'a [u8],
    ip_offset: usize,
    ts: Instant,
    ip: IpHeader,
    encapsulation: EncapsulationStack,
    encapsulation_id: u32,
    reassembled: bool,
    l3_checksummed: bool,
    recording: Recording,
}

/// The parsed network layer header of a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpHeader {
    pub version: IpVersion,
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    /// The upper layer protocol, after all IPv6 extension headers.
    pub protocol: IpProtocol,
    /// The length of the header including all extension headers.
    pub header_len: usize,
    /// The declared length of header and payload.
    pub total_len: usize,
    /// Time to live, or the IPv6 hop limit.
    pub ttl: u8,
    /// The IPv6 flow label, zero for IPv4.
    pub flow_label: u32,
    pub dont_frag: bool,
    pub more_frags: bool,
    /// Fragment offset in octets.
    pub frag_offset: u16,
    pub extensions: Vec<Ipv6Extension>,
    summary: PacketHeader,
}

/// A structural summary of a packet header, as seen by event consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketHeader {
    Ipv4(Ipv4Summary),
    Ipv6(Ipv6Summary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Summary {
    pub hl: u8,
    pub tos: u8,
    pub len: u16,
    pub id: u16,
    pub df: bool,
    pub mf: bool,
    pub offset: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Summary {
    pub class: u8,
    pub flow: u32,
    pub len: u16,
    /// The next header of the fixed header.
    pub nxt: IpProtocol,
    pub hlim: u8,
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
    pub exts: Vec<Ipv6Extension>,
}

/// The decision whether a packet should be written to a trace, and how much of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recording {
    pub record: bool,
    /// The number of captured octets to record, counted from the start of the capture.
    pub size: usize,
}

impl IpHeader {
    /// Parse the network layer header at the start of `data`.
    pub fn parse(data: &[u8]) -> wire::Result<IpHeader> {
        match IpVersion::of_packet(data)? {
            IpVersion::Ipv4 => Self::parse_v4(data),
            IpVersion::Ipv6 => Self::parse_v6(data),
        }
    }

    fn parse_v4(data: &[u8]) -> wire::Result<IpHeader> {
        let packet = ipv4_packet::new_checked(data)?;
        let summary = Ipv4Summary {
            hl: packet.header_len() as u8,
            tos: packet.tos(),
            len: packet.total_len(),
            id: packet.ident(),
            df: packet.dont_frag(),
            mf: packet.more_frags(),
            offset: packet.frag_offset(),
            ttl: packet.hop_limit(),
            protocol: packet.protocol(),
            src: packet.src_addr(),
            dst: packet.dst_addr(),
        };

        Ok(IpHeader {
            version: IpVersion::Ipv4,
            src_addr: summary.src.into(),
            dst_addr: summary.dst.into(),
            protocol: summary.protocol,
            header_len: packet.header_len(),
            total_len: usize::from(summary.len),
            ttl: summary.ttl,
            flow_label: 0,
            dont_frag: summary.df,
            more_frags: summary.mf,
            frag_offset: summary.offset,
            extensions: Vec::new(),
            summary: PacketHeader::Ipv4(summary),
        })
    }

    fn parse_v6(data: &[u8]) -> wire::Result<IpHeader> {
        let packet = ipv6_packet::new_checked(data)?;
        let chain = Ipv6Chain::walk(packet.next_header(), &data[IPV6_HEADER_LEN..]);
        if chain.truncated {
            return Err(wire::Error::Truncated);
        }

        let header_len = IPV6_HEADER_LEN + chain.len;
        let total_len = IPV6_HEADER_LEN + usize::from(packet.payload_len());
        if header_len > total_len {
            return Err(wire::Error::Malformed);
        }

        let fragment = chain.fragment();
        let summary = Ipv6Summary {
            class: packet.traffic_class(),
            flow: packet.flow_label(),
            len: packet.payload_len(),
            nxt: packet.next_header(),
            hlim: packet.hop_limit(),
            src: packet.src_addr(),
            dst: packet.dst_addr(),
            exts: chain.headers.clone(),
        };

        Ok(IpHeader {
            version: IpVersion::Ipv6,
            src_addr: summary.src.into(),
            dst_addr: summary.dst.into(),
            protocol: chain.next_header,
            header_len,
            total_len,
            ttl: summary.hlim,
            flow_label: summary.flow,
            // Routers never fragment IPv6.
            dont_frag: true,
            more_frags: fragment.map_or(false, |frag| frag.more_frags),
            frag_offset: fragment.map_or(0, |frag| frag.offset),
            extensions: chain.headers,
            summary: PacketHeader::Ipv6(summary),
        })
    }

    /// The declared length of the payload after all headers.
    pub fn payload_len(&self) -> usize {
        self.total_len.saturating_sub(self.header_len)
    }

    /// Check if this is one fragment of a larger datagram.
    pub fn is_fragment(&self) -> bool {
        self.more_frags || self.frag_offset != 0
    }

    /// The summary handed to event consumers.
    pub fn summary(&self) -> &PacketHeader {
        &self.summary
    }
}

impl<'a> Packet<'a> {
    /// A packet whose capture starts with the IP header.
    pub fn from_ip(data: &'a [u8], ts: Instant) -> wire::Result<Self> {
        Packet::new(data, 0, ts)
    }

    /// A packet whose IP header starts at `ip_offset` in the capture.
    pub fn new(capture: &'a [u8], ip_offset: usize, ts: Instant) -> wire::Result<Self> {
        let ip = IpHeader::parse(capture.get(ip_offset..).ok_or(wire::Error::Truncated)?)?;
        Ok(Packet {
            capture,
            ip_offset,
            ts,
            ip,
            encapsulation: EncapsulationStack::new(),
            encapsulation_id: 0,
            reassembled: false,
            l3_checksummed: false,
            recording: Recording { record: false, size: capture.len() },
        })
    }

    /// Set the tunnels the packet was found in and the id of its encapsulation context.
    pub fn with_encapsulation(self, encapsulation: EncapsulationStack, id: u32) -> Self {
        Packet { encapsulation, encapsulation_id: id, ..self }
    }

    /// Mark the packet as the product of fragment reassembly.
    pub fn with_reassembled(self, reassembled: bool) -> Self {
        Packet { reassembled, ..self }
    }

    /// Mark the network layer checksum as already verified by the interface.
    pub fn with_l3_checksummed(self, l3_checksummed: bool) -> Self {
        Packet { l3_checksummed, ..self }
    }

    pub fn timestamp(&self) -> Instant {
        self.ts
    }

    pub fn ip(&self) -> &IpHeader {
        &self.ip
    }

    pub fn encapsulation(&self) -> &EncapsulationStack {
        &self.encapsulation
    }

    pub fn encapsulation_id(&self) -> u32 {
        self.encapsulation_id
    }

    pub fn is_reassembled(&self) -> bool {
        self.reassembled
    }

    pub fn l3_checksummed(&self) -> bool {
        self.l3_checksummed
    }

    /// The number of captured octets.
    pub fn cap_len(&self) -> usize {
        self.capture.len()
    }

    /// The offset of the transport header within the capture.
    pub fn transport_offset(&self) -> usize {
        self.ip_offset + self.ip.header_len
    }

    /// The number of captured octets after the network layer headers.
    ///
    /// Not clipped to the declared length, a capture may contain trailing link layer padding.
    pub fn remaining(&self) -> usize {
        self.capture.len().saturating_sub(self.transport_offset())
    }

    /// The declared length of the transport data.
    pub fn payload_len(&self) -> usize {
        self.ip.payload_len()
    }

    /// The captured transport data, clipped to the declared length.
    pub fn transport_data(&self) -> &'a [u8] {
        let start = self.transport_offset().min(self.capture.len());
        let end = (start + self.payload_len()).min(self.capture.len());
        &self.capture[start..end]
    }

    /// The decision taken for recording the packet.
    pub fn recording(&self) -> Recording {
        self.recording
    }

    pub(crate) fn set_recording(&mut self, recording: Recording) {
        self.recording = recording;
    }
}
