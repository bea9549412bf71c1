use core::fmt;
use std::net::IpAddr;

use crate::analysis::{AnalyzerTree, Delivery};
use crate::time::{Duration, Instant};

use super::{
    ConnectionId,
    ConnectionKey,
    EncapsulationStack,
    EventBody,
    EventQueue,
    Transport,
    Weird,
};

/// The runtime unique identity of a connection.
///
/// Allocated by the session table in increasing order. A flow that replaces another one under
/// the same key gets a new uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnUid(pub(crate) u64);

/// One side of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub addr: IpAddr,
    pub port: u16,
}

/// The mutable per flow state that analyzers work on.
///
/// Split from the analyzer tree so that an analyzer can be handed the state mutably while the
/// tree itself is borrowed for the call.
#[derive(Debug)]
pub struct ConnState {
    uid: ConnUid,
    key: ConnectionKey,
    orig: Endpoint,
    resp: Endpoint,
    transport: Transport,
    one_way: bool,
    encapsulation_id: u32,
    flipped: bool,
    encapsulation: EncapsulationStack,
    start: Instant,
    last: Instant,
    orig_side: Side,
    resp_side: Side,
    record_packets: bool,
    record_contents: bool,
    events: EventQueue<EventBody>,
}

/// Per direction counters.
#[derive(Debug, Clone, Copy, Default)]
struct Side {
    packets: u64,
    bytes_ip: u64,
    flow_label: u32,
    seen: bool,
}

/// A tracked flow: its state and the analyzers attached to it.
pub struct Connection {
    pub(crate) state: ConnState,
    pub(crate) tree: AnalyzerTree,
}

/// The externally visible projection of a connection.
///
/// Computed on demand, analyzers fold their own state into it when it is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnRecord {
    pub uid: ConnUid,
    /// The identity from the perspective of the originator.
    pub id: ConnectionId,
    pub start: Instant,
    pub duration: Duration,
    pub orig: EndpointRecord,
    pub resp: EndpointRecord,
    pub tunnel: EncapsulationStack,
    /// The names of the analyzers attached to the connection.
    pub service: Vec<&'static str>,
}

/// The externally visible state of one side of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointRecord {
    /// Payload octets, as counted by the transport analyzer.
    pub size: u64,
    /// Transport specific state, filled in by the transport analyzer.
    pub state: u32,
    pub num_pkts: u64,
    pub num_bytes_ip: u64,
    pub flow_label: u32,
}

impl ConnState {
    /// State for a flow first seen with `id`, which then names the originator.
    pub fn new(uid: ConnUid, id: &ConnectionId, start: Instant, encapsulation: EncapsulationStack)
        -> Self
    {
        ConnState {
            uid,
            key: id.key(),
            orig: Endpoint { addr: id.src_addr, port: id.src_port },
            resp: Endpoint { addr: id.dst_addr, port: id.dst_port },
            transport: id.transport,
            one_way: id.is_one_way,
            encapsulation_id: id.encapsulation,
            flipped: false,
            encapsulation,
            start,
            last: start,
            orig_side: Side::default(),
            resp_side: Side::default(),
            record_packets: true,
            record_contents: true,
            events: EventQueue::new(),
        }
    }

    pub fn uid(&self) -> ConnUid {
        self.uid
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn orig(&self) -> Endpoint {
        self.orig
    }

    pub fn resp(&self) -> Endpoint {
        self.resp
    }

    /// Whether the originator is not the endpoint that sent the first packet.
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn start_time(&self) -> Instant {
        self.start
    }

    pub fn last_time(&self) -> Instant {
        self.last
    }

    pub fn encapsulation(&self) -> &EncapsulationStack {
        &self.encapsulation
    }

    /// Exchange originator and responder.
    pub fn flip_roles(&mut self) {
        core::mem::swap(&mut self.orig, &mut self.resp);
        core::mem::swap(&mut self.orig_side, &mut self.resp_side);
        self.flipped = !self.flipped;
    }

    /// Check if a packet sent from `addr`/`port` travels in originator direction.
    pub fn is_orig(&self, addr: IpAddr, port: u16) -> bool {
        addr == self.orig.addr && port == self.orig.port
    }

    /// Adopt the tunnels of the latest packet, queueing `TunnelChanged` if they differ.
    pub fn check_encapsulation(&mut self, stack: &EncapsulationStack) {
        if self.encapsulation != *stack {
            self.encapsulation = stack.clone();
            self.enqueue(EventBody::TunnelChanged { stack: stack.clone() });
        }
    }

    /// Adopt the IPv6 flow label of the latest packet of one direction.
    ///
    /// The very first packet of a direction sets the label silently.
    pub fn check_flow_label(&mut self, is_orig: bool, label: u32) {
        let side = if is_orig { &mut self.orig_side } else { &mut self.resp_side };
        let old_label = side.flow_label;
        let seen = side.seen;
        side.flow_label = label;
        side.seen = true;

        if seen && old_label != label {
            self.enqueue(EventBody::ConnectionFlowLabelChanged {
                is_orig,
                old_label,
                new_label: label,
            });
        }
    }

    /// Account for one packet and reset the recording decision for it.
    pub(crate) fn next_packet(&mut self, ts: Instant, is_orig: bool, ip_len: u64, header_only: bool) {
        self.last = self.last.max(ts);
        let side = if is_orig { &mut self.orig_side } else { &mut self.resp_side };
        side.packets += 1;
        side.bytes_ip += ip_len;
        self.record_packets = true;
        self.record_contents = !header_only;
    }

    /// Do not record the current packet at all.
    pub fn skip_recording(&mut self) {
        self.record_packets = false;
    }

    /// Record only the headers of the current packet.
    pub fn skip_contents(&mut self) {
        self.record_contents = false;
    }

    pub fn record_packets(&self) -> bool {
        self.record_packets
    }

    pub fn record_contents(&self) -> bool {
        self.record_contents
    }

    /// Queue an event about this connection.
    pub fn enqueue(&mut self, body: EventBody) {
        self.events.push(body);
    }

    /// Queue a weird about this connection.
    pub fn weird(&mut self, name: &'static str, addl: Option<String>) {
        let weird = Weird { name, addl, source: None };
        self.enqueue(EventBody::Weird(weird));
    }

    pub(crate) fn take_events(&mut self) -> Vec<EventBody> {
        self.events.drain().collect()
    }

    pub(crate) fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn base_record(&self) -> ConnRecord {
        let endpoint = |side: &Side| EndpointRecord {
            size: 0,
            state: 0,
            num_pkts: side.packets,
            num_bytes_ip: side.bytes_ip,
            flow_label: side.flow_label,
        };

        ConnRecord {
            uid: self.uid,
            id: ConnectionId {
                src_addr: self.orig.addr,
                dst_addr: self.resp.addr,
                src_port: self.orig.port,
                dst_port: self.resp.port,
                transport: self.transport,
                is_one_way: self.one_way,
                encapsulation: self.encapsulation_id,
            },
            start: self.start,
            duration: self.last.saturating_since(self.start),
            orig: endpoint(&self.orig_side),
            resp: endpoint(&self.resp_side),
            tunnel: self.encapsulation.clone(),
            service: Vec::new(),
        }
    }
}

impl Connection {
    pub fn new(state: ConnState, tree: AnalyzerTree) -> Self {
        Connection { state, tree }
    }

    pub fn state(&self) -> &ConnState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConnState {
        &mut self.state
    }

    pub fn uid(&self) -> ConnUid {
        self.state.uid
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.state.key
    }

    pub fn transport(&self) -> Transport {
        self.state.transport
    }

    /// The record as it currently stands.
    pub fn record(&self) -> ConnRecord {
        let mut record = self.state.base_record();
        self.tree.update_record(&mut record);
        record
    }

    /// Forward one packet into the analyzer tree.
    pub(crate) fn deliver(&mut self, delivery: &mut Delivery) {
        self.tree.deliver(&mut self.state, delivery);
    }

    /// Tell the analyzers that the connection ends.
    pub(crate) fn done(&mut self) {
        self.tree.done(&mut self.state);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("analyzers", &self.tree.names())
            .finish()
    }
}

impl fmt::Display for ConnUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "C{:08x}", self.0)
    }
}
