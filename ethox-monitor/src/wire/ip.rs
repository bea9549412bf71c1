use core::fmt;

use super::{Error, Result};

/// Internet protocol version.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Version {
    Ipv4,
    Ipv6,
}

impl Version {
    /// Return the version of an IP packet stored in the provided buffer.
    pub fn of_packet(data: &[u8]) -> Result<Version> {
        match data.first().map(|byte| byte >> 4) {
            Some(4) => Ok(Version::Ipv4),
            Some(6) => Ok(Version::Ipv6),
            Some(_) => Err(Error::Unrecognized),
            None => Err(Error::Truncated),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Version::Ipv4 => write!(f, "IPv4"),
            Version::Ipv6 => write!(f, "IPv6"),
        }
    }
}

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    pub enum Protocol(u8) {
        HopByHop    = 0x00,
        Icmp        = 0x01,
        Igmp        = 0x02,
        Tcp         = 0x06,
        Udp         = 0x11,
        Ipv6Route   = 0x2b,
        Ipv6Frag    = 0x2c,
        Esp         = 0x32,
        Ah          = 0x33,
        Icmpv6      = 0x3a,
        Ipv6NoNxt   = 0x3b,
        Ipv6Opts    = 0x3c,
        Ipv6Mobility = 0x87,
    }
}

impl Protocol {
    /// Check if this identifies an IPv6 extension header that can be skipped over.
    ///
    /// ESP is not in this list. Everything after its header is encrypted so the chain ends there.
    pub fn is_ipv6_extension(self) -> bool {
        matches!(self,
            Protocol::HopByHop
            | Protocol::Ipv6Route
            | Protocol::Ipv6Frag
            | Protocol::Ah
            | Protocol::Ipv6Opts
            | Protocol::Ipv6Mobility)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::HopByHop     => write!(f, "Hop-by-Hop"),
            Protocol::Icmp         => write!(f, "ICMP"),
            Protocol::Igmp         => write!(f, "IGMP"),
            Protocol::Tcp          => write!(f, "TCP"),
            Protocol::Udp          => write!(f, "UDP"),
            Protocol::Ipv6Route    => write!(f, "IPv6-Route"),
            Protocol::Ipv6Frag     => write!(f, "IPv6-Frag"),
            Protocol::Esp          => write!(f, "ESP"),
            Protocol::Ah           => write!(f, "AH"),
            Protocol::Icmpv6       => write!(f, "ICMPv6"),
            Protocol::Ipv6NoNxt    => write!(f, "IPv6-NoNxt"),
            Protocol::Ipv6Opts     => write!(f, "IPv6-Opts"),
            Protocol::Ipv6Mobility => write!(f, "IPv6-Mobility"),
            Protocol::Unknown(id)  => write!(f, "0x{:02x}", id)
        }
    }
}
