use std::net::Ipv6Addr;

use crate::time::Duration;

use super::{IcmpContext, NdOption};

/// The common facts about an ICMP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpInfo {
    pub v6: bool,
    pub itype: u8,
    pub icode: u8,
    /// The declared length of the message after the common header.
    pub len: usize,
    /// The hop limit of the carrying IP packet.
    pub ttl: u8,
}

/// A parsed ICMP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcmpEvent {
    /// A message without dedicated handling.
    Sent {
        info: IcmpInfo,
        /// The captured bytes after the common header.
        payload: Vec<u8>,
    },
    EchoRequest {
        info: IcmpInfo,
        id: u16,
        seq: u16,
        payload: Vec<u8>,
    },
    EchoReply {
        info: IcmpInfo,
        id: u16,
        seq: u16,
        payload: Vec<u8>,
    },
    /// Destination unreachable, in either version.
    Unreachable {
        info: IcmpInfo,
        code: u8,
        context: IcmpContext,
    },
    PacketTooBig {
        info: IcmpInfo,
        code: u8,
        context: IcmpContext,
    },
    TimeExceeded {
        info: IcmpInfo,
        code: u8,
        context: IcmpContext,
    },
    ParameterProblem {
        info: IcmpInfo,
        code: u8,
        context: IcmpContext,
    },
    /// An ICMPv6 error of a type without dedicated handling.
    ErrorMessage {
        info: IcmpInfo,
        code: u8,
        context: IcmpContext,
    },
    Redirect {
        info: IcmpInfo,
        target: Ipv6Addr,
        dest: Ipv6Addr,
        options: Vec<NdOption>,
    },
    RouterAdvertisement(RouterAdvert),
    RouterSolicitation {
        info: IcmpInfo,
        options: Vec<NdOption>,
    },
    NeighborAdvertisement {
        info: IcmpInfo,
        /// The sender is a router.
        router: bool,
        /// Sent in response to a solicitation.
        solicited: bool,
        /// Should override an existing cache entry.
        overrides: bool,
        target: Ipv6Addr,
        options: Vec<NdOption>,
    },
    NeighborSolicitation {
        info: IcmpInfo,
        target: Ipv6Addr,
        options: Vec<NdOption>,
    },
}

/// An ICMPv6 router advertisement, RFC 4861 § 4.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterAdvert {
    pub info: IcmpInfo,
    pub cur_hop_limit: u8,
    /// Addresses are available via DHCPv6.
    pub managed: bool,
    /// Other configuration is available via DHCPv6.
    pub other: bool,
    pub home_agent: bool,
    /// The default router preference, RFC 4191.
    pub preference: u8,
    pub proxy: bool,
    pub reserved: bool,
    pub router_lifetime: Duration,
    pub reachable_time: Duration,
    pub retrans_timer: Duration,
    pub options: Vec<NdOption>,
}

impl RouterAdvert {
    /// Decode the flag octet of the advertisement.
    pub(crate) fn set_flags(&mut self, flags: u8) {
        self.managed = flags & 0x80 != 0;
        self.other = flags & 0x40 != 0;
        self.home_agent = flags & 0x20 != 0;
        self.preference = (flags & 0x18) >> 3;
        self.proxy = flags & 0x04 != 0;
        self.reserved = flags & 0x02 != 0;
    }
}

impl IcmpEvent {
    pub fn info(&self) -> &IcmpInfo {
        match self {
            IcmpEvent::Sent { info, .. }
            | IcmpEvent::EchoRequest { info, .. }
            | IcmpEvent::EchoReply { info, .. }
            | IcmpEvent::Unreachable { info, .. }
            | IcmpEvent::PacketTooBig { info, .. }
            | IcmpEvent::TimeExceeded { info, .. }
            | IcmpEvent::ParameterProblem { info, .. }
            | IcmpEvent::ErrorMessage { info, .. }
            | IcmpEvent::Redirect { info, .. }
            | IcmpEvent::RouterSolicitation { info, .. }
            | IcmpEvent::NeighborAdvertisement { info, .. }
            | IcmpEvent::NeighborSolicitation { info, .. } => info,
            IcmpEvent::RouterAdvertisement(advert) => &advert.info,
        }
    }

    /// The embedded datagram of an error message.
    pub fn context(&self) -> Option<&IcmpContext> {
        match self {
            IcmpEvent::Unreachable { context, .. }
            | IcmpEvent::PacketTooBig { context, .. }
            | IcmpEvent::TimeExceeded { context, .. }
            | IcmpEvent::ParameterProblem { context, .. }
            | IcmpEvent::ErrorMessage { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn context_mut(&mut self) -> Option<&mut IcmpContext> {
        match self {
            IcmpEvent::Unreachable { context, .. }
            | IcmpEvent::PacketTooBig { context, .. }
            | IcmpEvent::TimeExceeded { context, .. }
            | IcmpEvent::ParameterProblem { context, .. }
            | IcmpEvent::ErrorMessage { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The options of a neighbor discovery message.
    pub fn options(&self) -> &[NdOption] {
        match self {
            IcmpEvent::Redirect { options, .. }
            | IcmpEvent::RouterSolicitation { options, .. }
            | IcmpEvent::NeighborAdvertisement { options, .. }
            | IcmpEvent::NeighborSolicitation { options, .. } => options,
            IcmpEvent::RouterAdvertisement(advert) => &advert.options,
            _ => &[],
        }
    }

    pub fn options_mut(&mut self) -> &mut [NdOption] {
        match self {
            IcmpEvent::Redirect { options, .. }
            | IcmpEvent::RouterSolicitation { options, .. }
            | IcmpEvent::NeighborAdvertisement { options, .. }
            | IcmpEvent::NeighborSolicitation { options, .. } => options,
            IcmpEvent::RouterAdvertisement(advert) => &mut advert.options,
            _ => Default::default(),
        }
    }

    /// A short name of the message kind.
    pub fn name(&self) -> &'static str {
        match self {
            IcmpEvent::Sent { .. } => "icmp_sent",
            IcmpEvent::EchoRequest { .. } => "icmp_echo_request",
            IcmpEvent::EchoReply { .. } => "icmp_echo_reply",
            IcmpEvent::Unreachable { .. } => "icmp_unreachable",
            IcmpEvent::PacketTooBig { .. } => "icmp_packet_too_big",
            IcmpEvent::TimeExceeded { .. } => "icmp_time_exceeded",
            IcmpEvent::ParameterProblem { .. } => "icmp_parameter_problem",
            IcmpEvent::ErrorMessage { .. } => "icmp_error_message",
            IcmpEvent::Redirect { .. } => "icmp_redirect",
            IcmpEvent::RouterAdvertisement(_) => "icmp_router_advertisement",
            IcmpEvent::RouterSolicitation { .. } => "icmp_router_solicitation",
            IcmpEvent::NeighborAdvertisement { .. } => "icmp_neighbor_advertisement",
            IcmpEvent::NeighborSolicitation { .. } => "icmp_neighbor_solicitation",
        }
    }
}
