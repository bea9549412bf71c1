use crate::session::{
    ConnState,
    Connection,
    ConnectionId,
    ConnectionKey,
    EventBody,
    EventKind,
    SessionTable,
    Transport,
    Weird,
};

use super::{
    Admission,
    Context,
    Delivery,
    NeverReuse,
    Packet,
    Recording,
    ReusePolicy,
    TransportProtocol,
};

/// Drives the packets of one transport protocol into their connections.
pub struct Dispatcher<P> {
    protocol: P,
    reuse: Box<dyn ReusePolicy>,
}

/// A type erased dispatcher, as kept in the registry of the runtime.
pub trait ProtocolHandler {
    fn transport(&self) -> Transport;

    /// Analyze one packet carrying this protocol.
    fn analyze_packet(&self, ctx: &mut Context, packet: &mut Packet);
}

/// Check that a transport header of `min_len` octets is present.
///
/// Reports `internally_truncated_header` when fewer than `min_len` octets were captured after the
/// network layer headers, which points at a too short capture length. Otherwise reports
/// `truncated_header` when the declared payload length is below `min_len`, which is a malformed
/// packet. Returns whether the header is complete.
pub fn check_header_truncation(
    table: &mut SessionTable,
    source: &'static str,
    min_len: usize,
    remaining: usize,
    packet: &Packet,
) -> bool {
    let declared = packet.payload_len();
    let name = if remaining < min_len {
        "internally_truncated_header"
    } else if declared < min_len {
        "truncated_header"
    } else {
        return true;
    };

    let addl = format!("{} captured, {} declared, {} required", remaining, declared, min_len);
    table.weird(Weird::new(name).with_addl(addl).with_source(source));
    false
}

impl<P: TransportProtocol> Dispatcher<P> {
    /// A dispatcher that never considers a tuple reused.
    pub fn new(protocol: P) -> Self {
        Dispatcher {
            protocol,
            reuse: Box::new(NeverReuse),
        }
    }

    /// Replace the reuse policy.
    pub fn with_reuse(self, reuse: impl ReusePolicy + 'static) -> Self {
        Dispatcher { reuse: Box::new(reuse), ..self }
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Analyze one packet.
    ///
    /// Validates the transport header, derives the identity and hands both to `process`.
    pub fn analyze_packet(&self, ctx: &mut Context, packet: &mut Packet) {
        let min_len = self.protocol.min_header_len();
        let remaining = packet.remaining();
        if !check_header_truncation(ctx.table, self.protocol.name(), min_len, remaining, packet) {
            return;
        }

        let id = match self.protocol.connection_id(packet) {
            Some(id) => id,
            None => return,
        };

        self.process(ctx, &id, packet);
    }

    /// Resolve a packet of known identity to its connection and forward it.
    pub fn process(&self, ctx: &mut Context, id: &ConnectionId, packet: &mut Packet) {
        let key = id.key();
        let transport = self.protocol.transport();
        let now = packet.timestamp();
        let payload = packet.transport_data();

        let reuse = match ctx.table.find_mut(&key, transport) {
            None => None,
            Some(conn) => {
                let reuse = self.reuse.is_reuse(conn, now, payload);
                if reuse {
                    conn.state_mut().enqueue(EventBody::ConnectionReused);
                } else {
                    conn.state_mut().check_encapsulation(packet.encapsulation());
                }
                Some(reuse)
            },
        };

        match reuse {
            Some(false) => {},
            Some(true) => {
                net_trace!("{}: tuple {} reused", self.protocol.name(), id);
                // Finishes the old connection, its events leave before the replacement exists.
                ctx.table.remove(&key);
                match self.new_connection(ctx, id, key, packet) {
                    Some(conn) => ctx.table.insert(conn, false),
                    None => return,
                }
            },
            None => match self.new_connection(ctx, id, key, packet) {
                Some(conn) => ctx.table.insert(conn, false),
                None => return,
            },
        }

        let observers = ctx.table.observers();
        let header_only = ctx.config.recording.header_only;
        let ignore_checksums = ctx.config.ignore_checksums;
        let conn = match ctx.table.find_mut(&key, transport) {
            Some(conn) => conn,
            None => return,
        };

        let ip = packet.ip();
        let is_orig = conn.state().is_orig(ip.src_addr, id.src_port);
        conn.state_mut().check_flow_label(is_orig, ip.flow_label);

        if !ip.extensions.is_empty() && observers.contains(EventKind::Ipv6ExtHeaders) {
            conn.state_mut().enqueue(EventBody::Ipv6ExtHeaders {
                headers: ip.extensions.clone(),
            });
        }

        if observers.contains(EventKind::NewPacket) {
            conn.state_mut().enqueue(EventBody::NewPacket {
                header: ip.summary().clone(),
            });
        }

        conn.state_mut().next_packet(now, is_orig, ip.total_len as u64, header_only);

        let mut delivery = Delivery {
            data: payload,
            len: packet.payload_len(),
            is_orig,
            ip,
            ts: now,
            encapsulation: packet.encapsulation_id(),
            ignore_checksums,
            l3_checksummed: packet.l3_checksummed(),
            forward: None,
        };
        conn.deliver(&mut delivery);

        let recording = Self::recording(conn.state(), packet);
        packet.set_recording(recording);
        ctx.table.flush(&key);
    }

    /// Check if a port is a likely server port of this protocol.
    pub fn is_likely_server_port(&self, ctx: &Context, port: u16) -> bool {
        ctx.server_ports(self.protocol.server_port_mask()).contains(port)
    }

    /// Admit and build a connection for a tuple without one.
    ///
    /// Returns `None` when the protocol rejects the tuple or its analyzers could not be built.
    /// Neither is reported as a weird.
    pub fn new_connection(
        &self,
        ctx: &mut Context,
        id: &ConnectionId,
        key: ConnectionKey,
        packet: &Packet,
    ) -> Option<Connection> {
        let ports = ctx.server_ports(self.protocol.server_port_mask());
        let flip = match self.protocol.want_connection(
            id.src_port,
            id.dst_port,
            packet.transport_data(),
            ports,
        ) {
            Admission::Reject => {
                net_trace!("{}: not tracking {}", self.protocol.name(), id);
                return None;
            },
            Admission::Accept { flip } => flip,
        };

        let uid = ctx.table.next_uid();
        let mut state = ConnState::new(uid, id, packet.timestamp(), packet.encapsulation().clone());
        debug_assert_eq!(*state.key(), key);
        if flip {
            state.flip_roles();
        }

        let tree = match self.protocol.build_tree(&state, ctx) {
            Ok(tree) => tree,
            Err(err) => {
                net_trace!("{}: dropping {}: {}", self.protocol.name(), id, err);
                return None;
            },
        };

        state.enqueue(EventBody::NewConnection);
        Some(Connection::new(state, tree))
    }

    fn recording(conn: &ConnState, packet: &Packet) -> Recording {
        if packet.is_reassembled() {
            // Offsets into reassembled data do not correspond to the capture.
            Recording { record: false, size: packet.cap_len() }
        } else if !conn.record_packets() {
            Recording { record: false, size: packet.cap_len() }
        } else if !conn.record_contents() {
            Recording { record: true, size: packet.transport_offset() }
        } else {
            Recording { record: true, size: packet.cap_len() }
        }
    }
}

impl<P: TransportProtocol> ProtocolHandler for Dispatcher<P> {
    fn transport(&self) -> Transport {
        self.protocol.transport()
    }

    fn analyze_packet(&self, ctx: &mut Context, packet: &mut Packet) {
        Dispatcher::analyze_packet(self, ctx, packet)
    }
}
