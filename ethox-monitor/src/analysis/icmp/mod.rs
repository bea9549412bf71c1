//! Analysis of ICMPv4 and ICMPv6.
//!
//! ICMP has no ports. The identity of a message uses its type as the source port and the type of
//! the expected answer as the destination port, so that a request and its reply map to the same
//! connection. Messages without an answer, errors in particular, use their code as the destination
//! port and are one-way: the reverse direction is a different connection.
//!
//! Error messages embed the start of the datagram that caused them. The analyzer extracts the
//! identity of that datagram, see [`IcmpContext`], and the session table resolves it to the live
//! connection it belongs to when the event is flushed.
//!
//! [`IcmpContext`]: struct.IcmpContext.html
use crate::error::Result;
use crate::session::{ConnState, ConnectionId, Transport};
use crate::wire::{icmpv4, icmpv6, IpProtocol, ICMP_HEADER_LEN};

use super::{Admission, AnalyzerTree, Context, Packet, ServerPorts, TransportProtocol};

mod analyzer;
mod context;
mod event;
mod nd;
#[cfg(test)]
mod tests;

pub use analyzer::IcmpAnalyzer;
pub use context::IcmpContext;
pub use event::{IcmpEvent, IcmpInfo, RouterAdvert};
pub use nd::{NdOption, NdOptionData, PrefixInfo};

/// The connection state of a direction that sent at least one message.
pub const ICMP_ACTIVE: u32 = 1;
/// The connection state of a direction that never sent anything.
pub const ICMP_INACTIVE: u32 = 0;

/// The ICMP transport, for both ICMPv4 and ICMPv6.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcmpProtocol;

/// The destination port of an ICMPv4 message and whether the message is one-way.
///
/// Two-way messages map to the type of their counterpart. All other messages map to their code.
pub fn icmp4_counterpart(msg_type: u8, code: u8) -> (u8, bool) {
    match icmpv4::Message::from(msg_type).counterpart() {
        Some(reply) => (u8::from(reply), false),
        None => (code, true),
    }
}

/// The destination port of an ICMPv6 message and whether the message is one-way.
pub fn icmp6_counterpart(msg_type: u8, code: u8) -> (u8, bool) {
    match icmpv6::Message::from(msg_type).counterpart() {
        Some(reply) => (u8::from(reply), false),
        None => (code, true),
    }
}

/// The identity of an ICMP message.
///
/// `v6` selects the counterpart table, the two versions assign different meanings to the same
/// type numbers.
pub(crate) fn message_ports(v6: bool, msg_type: u8, code: u8) -> (u16, u16, bool) {
    let (counterpart, one_way) = if v6 {
        icmp6_counterpart(msg_type, code)
    } else {
        icmp4_counterpart(msg_type, code)
    };
    (u16::from(msg_type), u16::from(counterpart), one_way)
}

impl TransportProtocol for IcmpProtocol {
    fn name(&self) -> &'static str {
        "ICMP"
    }

    fn transport(&self) -> Transport {
        Transport::Icmp
    }

    fn min_header_len(&self) -> usize {
        ICMP_HEADER_LEN
    }

    fn connection_id(&self, packet: &Packet) -> Option<ConnectionId> {
        let data = packet.transport_data();
        let (&msg_type, &code) = (data.first()?, data.get(1)?);
        let ip = packet.ip();
        let v6 = ip.protocol == IpProtocol::Icmpv6;
        let (src_port, dst_port, is_one_way) = message_ports(v6, msg_type, code);

        Some(ConnectionId {
            src_addr: ip.src_addr,
            dst_addr: ip.dst_addr,
            src_port,
            dst_port,
            transport: Transport::Icmp,
            is_one_way,
            encapsulation: packet.encapsulation_id(),
        })
    }

    fn want_connection(&self, _: u16, _: u16, _: &[u8], _: ServerPorts) -> Admission {
        Admission::Accept { flip: false }
    }

    fn build_tree(&self, conn: &ConnState, ctx: &Context) -> Result<AnalyzerTree> {
        AnalyzerTree::with_signatures(Box::new(IcmpAnalyzer::new()), conn, ctx)
    }
}
