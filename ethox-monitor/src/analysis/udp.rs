//! Analysis of UDP.
//!
//! UDP only needs identity and byte accounting, the payload is handed to the children of the
//! analyzer tree as is.
use crate::error::Result;
use crate::session::{ConnRecord, ConnState, ConnectionId, Transport};
use crate::wire::{checksum, udp_packet, IpProtocol, UDP_HEADER_LEN};

use super::{
    Admission,
    Analyzer,
    AnalyzerTree,
    Context,
    Delivery,
    Packet,
    ServerPorts,
    TransportProtocol,
};

/// The connection state of a direction that sent at least one datagram.
pub const UDP_ACTIVE: u32 = 1;
/// The connection state of a direction that never sent anything.
pub const UDP_INACTIVE: u32 = 0;

/// The UDP transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpProtocol;

/// The root analyzer of UDP connections.
#[derive(Debug, Default)]
pub struct UdpAnalyzer {
    request_len: Option<u64>,
    reply_len: Option<u64>,
}

impl TransportProtocol for UdpProtocol {
    fn name(&self) -> &'static str {
        "UDP"
    }

    fn transport(&self) -> Transport {
        Transport::Udp
    }

    fn min_header_len(&self) -> usize {
        UDP_HEADER_LEN
    }

    fn connection_id(&self, packet: &Packet) -> Option<ConnectionId> {
        let udp = udp_packet::new_checked(packet.transport_data()).ok()?;
        let ip = packet.ip();
        Some(ConnectionId {
            src_addr: ip.src_addr,
            dst_addr: ip.dst_addr,
            src_port: udp.src_port(),
            dst_port: udp.dst_port(),
            transport: Transport::Udp,
            is_one_way: false,
            encapsulation: packet.encapsulation_id(),
        })
    }

    /// Accepts every tuple. A datagram from a likely server port to a port that is not is a reply,
    /// its receiver is the originator.
    fn want_connection(&self, src_port: u16, dst_port: u16, _: &[u8], ports: ServerPorts)
        -> Admission
    {
        let flip = ports.contains(src_port) && !ports.contains(dst_port);
        Admission::Accept { flip }
    }

    fn build_tree(&self, conn: &ConnState, ctx: &Context) -> Result<AnalyzerTree> {
        AnalyzerTree::with_signatures(Box::new(UdpAnalyzer::new()), conn, ctx)
    }
}

impl UdpAnalyzer {
    pub fn new() -> Self {
        UdpAnalyzer::default()
    }

    fn checksum_ok(datagram: &udp_packet, d: &Delivery) -> bool {
        let proto = u8::from(IpProtocol::Udp);
        match checksum::pseudo_header(d.ip.src_addr, d.ip.dst_addr, proto, d.len as u32) {
            Some(pseudo) => datagram.verify_checksum(pseudo),
            None => true,
        }
    }
}

impl Analyzer for UdpAnalyzer {
    fn name(&self) -> &'static str {
        "UDP"
    }

    fn deliver_packet(&mut self, conn: &mut ConnState, d: &mut Delivery) {
        let data = d.data;
        let datagram = match udp_packet::new_checked(data) {
            Ok(datagram) => datagram,
            Err(_) => return,
        };

        let udp_len = usize::from(datagram.len());
        if udp_len != d.len {
            let addl = format!("{} declared by UDP, {} by IP", udp_len, d.len);
            conn.weird("UDP_datagram_length_mismatch", Some(addl));
        }

        let complete = data.len() >= d.len;
        if !d.ignore_checksums && complete && udp_len == d.len && !Self::checksum_ok(datagram, d) {
            net_trace!("udp: bad checksum from {}", d.ip.src_addr);
            conn.weird("bad_UDP_checksum", None);
            return;
        }

        // The shorter of both lengths bounds the payload.
        let len = udp_len.min(d.len).saturating_sub(UDP_HEADER_LEN);
        let total = if d.is_orig { &mut self.request_len } else { &mut self.reply_len };
        *total = Some(total.unwrap_or(0) + len as u64);

        let end = (UDP_HEADER_LEN + len).min(data.len());
        d.forward = Some(&data[UDP_HEADER_LEN..end]);
    }

    fn update_record(&self, record: &mut ConnRecord) {
        let state = |len: Option<u64>| if len.is_some() { UDP_ACTIVE } else { UDP_INACTIVE };
        record.orig.size = self.request_len.unwrap_or(0);
        record.orig.state = state(self.request_len);
        record.resp.size = self.reply_len.unwrap_or(0);
        record.resp.state = state(self.reply_len);
    }
}
