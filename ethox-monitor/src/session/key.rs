use core::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::wire::IpProtocol;

/// The transport of a connection.
///
/// ICMPv4 and ICMPv6 share one transport. Their message types overlap numerically with
/// different meanings but the address family already keeps their connections apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Tcp,
    Udp,
    Icmp,
    Unknown,
}

impl Transport {
    /// The bit combined with a port number before looking it up in the likely server port cache.
    ///
    /// Port numbers only fill the lower 16 bits so the masks keep equal port numbers of
    /// different transports apart within one set.
    pub fn server_port_mask(self) -> u32 {
        match self {
            Transport::Tcp => 0x10000,
            Transport::Udp => 0x20000,
            Transport::Icmp => 0x30000,
            Transport::Unknown => 0,
        }
    }

    /// The transport carried by an IP protocol number.
    pub fn of_protocol(protocol: IpProtocol) -> Transport {
        match protocol {
            IpProtocol::Tcp => Transport::Tcp,
            IpProtocol::Udp => Transport::Udp,
            IpProtocol::Icmp | IpProtocol::Icmpv6 => Transport::Icmp,
            _ => Transport::Unknown,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Transport::Tcp => write!(f, "tcp"),
            Transport::Udp => write!(f, "udp"),
            Transport::Icmp => write!(f, "icmp"),
            Transport::Unknown => write!(f, "unknown_transport"),
        }
    }
}

/// The identity of a flow as seen in one packet.
///
/// Ports are in host byte order and oriented in packet direction. For ICMP the ports are the
/// message type and its counterpart, see `analysis::icmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub transport: Transport,
    /// The flow never has a reply, e.g. ICMP error messages.
    ///
    /// One-way identities are not put into canonical order so that the reverse direction is a
    /// different connection.
    pub is_one_way: bool,
    /// Context of an outer encapsulation, such as a VLAN or tunnel id, zero when there is none.
    pub encapsulation: u32,
}

/// The direction independent table key of a flow.
///
/// Built from a [`ConnectionId`] by ordering the two endpoints, so that both directions of a
/// flow produce the same key. The encapsulation context is part of the key, two flows with
/// identical tuples in different VLANs are different connections.
///
/// [`ConnectionId`]: struct.ConnectionId.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionKey {
    addr1: IpAddr,
    addr2: IpAddr,
    port1: u16,
    port2: u16,
    transport: Transport,
    encapsulation: u32,
}

impl ConnectionId {
    /// Derive the table key.
    pub fn key(&self) -> ConnectionKey {
        let forward = (self.src_addr, self.src_port) <= (self.dst_addr, self.dst_port);
        let (addr1, port1, addr2, port2) = if self.is_one_way || forward {
            (self.src_addr, self.src_port, self.dst_addr, self.dst_port)
        } else {
            (self.dst_addr, self.dst_port, self.src_addr, self.src_port)
        };

        ConnectionKey {
            addr1,
            addr2,
            port1,
            port2,
            transport: self.transport,
            encapsulation: self.encapsulation,
        }
    }

    /// The same flow seen from the other side.
    pub fn reversed(&self) -> ConnectionId {
        ConnectionId {
            src_addr: self.dst_addr,
            dst_addr: self.src_addr,
            src_port: self.dst_port,
            dst_port: self.src_port,
            ..*self
        }
    }
}

impl ConnectionKey {
    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn encapsulation(&self) -> u32 {
        self.encapsulation
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{} -> {}:{}/{}",
            self.src_addr, self.src_port, self.dst_addr, self.dst_port, self.transport)
    }
}

/// The kind of an encapsulating tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelKind {
    /// IP in IP, including 6in4 and 4in6.
    Ip,
    Gre,
    Teredo,
    Vxlan,
    Geneve,
    Gtpv1,
}

/// One outer layer of an encapsulated packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncapsulatingConn {
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub kind: TunnelKind,
}

/// The tunnels a packet was found in, outermost first.
///
/// This is secondary identity. It is not part of the [`ConnectionKey`], a flow whose packets
/// move to a different tunnel is still the same flow and only reports the change.
///
/// [`ConnectionKey`]: struct.ConnectionKey.html
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EncapsulationStack {
    layers: Vec<EncapsulatingConn>,
}

impl EncapsulationStack {
    pub fn new() -> Self {
        EncapsulationStack::default()
    }

    /// Add an inner layer.
    pub fn push(&mut self, layer: EncapsulatingConn) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[EncapsulatingConn] {
        &self.layers
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl FromIterator<EncapsulatingConn> for EncapsulationStack {
    fn from_iter<I: IntoIterator<Item = EncapsulatingConn>>(iter: I) -> Self {
        EncapsulationStack { layers: iter.into_iter().collect() }
    }
}
