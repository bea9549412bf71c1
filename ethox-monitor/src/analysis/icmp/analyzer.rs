use std::net::Ipv6Addr;

use crate::analysis::{Analyzer, Delivery};
use crate::session::{ConnRecord, ConnState, EventBody};
use crate::time::Duration;
use crate::wire::{self, checksum, icmp_packet, icmpv4, icmpv6, Cursor, IpProtocol, ICMP_HEADER_LEN};

use super::{nd, IcmpContext, IcmpEvent, IcmpInfo, NdOption, RouterAdvert, ICMP_ACTIVE, ICMP_INACTIVE};

/// The root analyzer of ICMP connections.
///
/// Turns every message into an [`IcmpEvent`] and keeps the number of octets sent in each
/// direction.
///
/// [`IcmpEvent`]: enum.IcmpEvent.html
#[derive(Debug, Default)]
pub struct IcmpAnalyzer {
    request_len: Option<u64>,
    reply_len: Option<u64>,
}

/// Reads the fields of a message body.
///
/// The first read that runs out of data queues one `truncated_ICMP_message` weird and yields the
/// default value. All later reads fail the same way without another weird.
struct Fields<'a, 'c> {
    cursor: Cursor<'a>,
    conn: &'c mut ConnState,
    message: &'static str,
    short: bool,
}

impl IcmpAnalyzer {
    pub fn new() -> Self {
        IcmpAnalyzer::default()
    }

    /// The payload octets sent by the originator, `None` before its first message.
    pub fn request_len(&self) -> Option<u64> {
        self.request_len
    }

    /// The payload octets sent by the responder, `None` before its first message.
    pub fn reply_len(&self) -> Option<u64> {
        self.reply_len
    }

    fn next_v4(conn: &mut ConnState, packet: &icmp_packet, info: IcmpInfo, d: &Delivery) -> IcmpEvent {
        let body = packet.body();
        match icmpv4::Message::from(info.itype) {
            icmpv4::Message::EchoRequest => IcmpEvent::EchoRequest {
                info,
                id: packet.echo_ident(),
                seq: packet.echo_seq_no(),
                payload: body.to_vec(),
            },
            icmpv4::Message::EchoReply => IcmpEvent::EchoReply {
                info,
                id: packet.echo_ident(),
                seq: packet.echo_seq_no(),
                payload: body.to_vec(),
            },
            icmpv4::Message::DstUnreachable => IcmpEvent::Unreachable {
                info,
                code: info.icode,
                context: Self::context(conn, IcmpContext::extract_v4(body, d.l3_checksummed, d.encapsulation)),
            },
            icmpv4::Message::TimeExceeded => IcmpEvent::TimeExceeded {
                info,
                code: info.icode,
                context: Self::context(conn, IcmpContext::extract_v4(body, d.l3_checksummed, d.encapsulation)),
            },
            _ => IcmpEvent::Sent { info, payload: body.to_vec() },
        }
    }

    fn next_v6(conn: &mut ConnState, packet: &icmp_packet, info: IcmpInfo, d: &Delivery) -> IcmpEvent {
        let body = packet.body();
        let context = |conn: &mut ConnState| {
            Self::context(conn, IcmpContext::extract_v6(body, d.encapsulation))
        };

        match icmpv6::Message::from(info.itype) {
            icmpv6::Message::EchoRequest => IcmpEvent::EchoRequest {
                info,
                id: packet.echo_ident(),
                seq: packet.echo_seq_no(),
                payload: body.to_vec(),
            },
            icmpv6::Message::EchoReply => IcmpEvent::EchoReply {
                info,
                id: packet.echo_ident(),
                seq: packet.echo_seq_no(),
                payload: body.to_vec(),
            },
            icmpv6::Message::DstUnreachable => {
                IcmpEvent::Unreachable { info, code: info.icode, context: context(conn) }
            },
            icmpv6::Message::PktTooBig => {
                IcmpEvent::PacketTooBig { info, code: info.icode, context: context(conn) }
            },
            icmpv6::Message::TimeExceeded => {
                IcmpEvent::TimeExceeded { info, code: info.icode, context: context(conn) }
            },
            icmpv6::Message::ParamProblem => {
                IcmpEvent::ParameterProblem { info, code: info.icode, context: context(conn) }
            },
            icmpv6::Message::Redirect => {
                let mut fields = Fields::new(body, conn, "redirect");
                let target = fields.ipv6();
                let dest = fields.ipv6();
                let options = fields.options(d.encapsulation);
                IcmpEvent::Redirect { info, target, dest, options }
            },
            icmpv6::Message::RouterAdvert => {
                let mut fields = Fields::new(body, conn, "router_advertisement");
                let reachable = fields.u32();
                let retrans = fields.u32();
                let mut advert = RouterAdvert {
                    info,
                    cur_hop_limit: packet.router_hop_limit(),
                    managed: false,
                    other: false,
                    home_agent: false,
                    preference: 0,
                    proxy: false,
                    reserved: false,
                    router_lifetime: Duration::from_secs(packet.router_lifetime().into()),
                    reachable_time: Duration::from_millis(reachable.into()),
                    retrans_timer: Duration::from_millis(retrans.into()),
                    options: fields.options(d.encapsulation),
                };
                advert.set_flags(packet.router_flags());
                IcmpEvent::RouterAdvertisement(advert)
            },
            icmpv6::Message::NeighborAdvert => {
                let flags = packet.neighbor_flags();
                let mut fields = Fields::new(body, conn, "neighbor_advertisement");
                let target = fields.ipv6();
                IcmpEvent::NeighborAdvertisement {
                    info,
                    router: flags & 0x80 != 0,
                    solicited: flags & 0x40 != 0,
                    overrides: flags & 0x20 != 0,
                    target,
                    options: fields.options(d.encapsulation),
                }
            },
            icmpv6::Message::NeighborSolicit => {
                let mut fields = Fields::new(body, conn, "neighbor_solicitation");
                let target = fields.ipv6();
                let options = fields.options(d.encapsulation);
                IcmpEvent::NeighborSolicitation { info, target, options }
            },
            icmpv6::Message::RouterSolicit => {
                let options = Fields::new(body, conn, "router_solicitation").options(d.encapsulation);
                IcmpEvent::RouterSolicitation { info, options }
            },
            // Router renumbering is passed on as is.
            icmpv6::Message::RouterRenumber => IcmpEvent::Sent { info, payload: body.to_vec() },
            message if message.is_error() => {
                IcmpEvent::ErrorMessage { info, code: info.icode, context: context(conn) }
            },
            _ => IcmpEvent::Sent { info, payload: body.to_vec() },
        }
    }

    fn context(conn: &mut ConnState, context: IcmpContext) -> IcmpContext {
        if context.bad_hdr_len {
            conn.weird("ICMP_context_truncated", None);
        }
        context
    }

    fn checksum_ok(packet: &icmp_packet, v6: bool, d: &Delivery) -> bool {
        if !v6 {
            return packet.verify_checksum(None);
        }

        let proto = u8::from(IpProtocol::Icmpv6);
        match checksum::pseudo_header(d.ip.src_addr, d.ip.dst_addr, proto, d.len as u32) {
            Some(pseudo) => packet.verify_checksum(Some(pseudo)),
            // Mixed address families, nothing to check against.
            None => true,
        }
    }
}

impl Analyzer for IcmpAnalyzer {
    fn name(&self) -> &'static str {
        "ICMP"
    }

    fn deliver_packet(&mut self, conn: &mut ConnState, d: &mut Delivery) {
        let data = d.data;
        let packet = match icmp_packet::new_checked(data) {
            Ok(packet) => packet,
            Err(_) => return,
        };

        let v6 = d.ip.protocol == IpProtocol::Icmpv6;
        let complete = data.len() >= d.len;
        if !d.ignore_checksums && complete && !Self::checksum_ok(packet, v6, d) {
            net_trace!("icmp: bad checksum from {}", d.ip.src_addr);
            conn.weird("bad_ICMP_checksum", None);
            return;
        }

        let len = d.len.saturating_sub(ICMP_HEADER_LEN);
        let total = if d.is_orig { &mut self.request_len } else { &mut self.reply_len };
        *total = Some(total.unwrap_or(0) + len as u64);

        let info = IcmpInfo {
            v6,
            itype: packet.msg_type(),
            icode: packet.msg_code(),
            len,
            ttl: d.ip.ttl,
        };

        let event = if v6 {
            Self::next_v6(conn, packet, info, d)
        } else {
            Self::next_v4(conn, packet, info, d)
        };

        conn.enqueue(EventBody::Icmp(event));
        d.forward = Some(&data[ICMP_HEADER_LEN..]);
    }

    fn update_record(&self, record: &mut ConnRecord) {
        let state = |len: Option<u64>| if len.is_some() { ICMP_ACTIVE } else { ICMP_INACTIVE };
        record.orig.size = self.request_len.unwrap_or(0);
        record.orig.state = state(self.request_len);
        record.resp.size = self.reply_len.unwrap_or(0);
        record.resp.state = state(self.reply_len);
    }
}

impl<'a, 'c> Fields<'a, 'c> {
    fn new(body: &'a [u8], conn: &'c mut ConnState, message: &'static str) -> Self {
        Fields {
            cursor: Cursor::new(body),
            conn,
            message,
            short: false,
        }
    }

    fn u32(&mut self) -> u32 {
        let value = self.cursor.read_u32();
        self.checked(value).unwrap_or(0)
    }

    fn ipv6(&mut self) -> Ipv6Addr {
        let value = self.cursor.read_ipv6();
        self.checked(value).unwrap_or(Ipv6Addr::UNSPECIFIED)
    }

    /// Parse the remaining body as neighbor discovery options.
    fn options(mut self, encapsulation: u32) -> Vec<NdOption> {
        let rest = Cursor::new(self.cursor.take_up_to(usize::MAX));
        nd::parse_options(rest, &mut *self.conn, encapsulation)
    }

    fn checked<T>(&mut self, value: wire::Result<T>) -> Option<T> {
        match value {
            Ok(value) => Some(value),
            Err(_) => {
                if !self.short {
                    self.short = true;
                    self.conn.weird("truncated_ICMP_message", Some(self.message.to_string()));
                }
                // Nothing after a missing field can be trusted.
                self.cursor.take_up_to(usize::MAX);
                None
            },
        }
    }
}
