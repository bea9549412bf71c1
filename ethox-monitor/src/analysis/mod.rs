//! Protocol analysis of captured packets.
//!
//! ## Dispatch
//!
//! Each transport protocol implements [`TransportProtocol`]. It names the identity of a packet,
//! decides whether a new tuple should be tracked at all and builds the analyzers of a new
//! connection. The generic [`Dispatcher`] does everything else: it resolves the identity against
//! the session table, creates, replaces or continues connections and forwards the packet into the
//! analyzer tree of the connection. The runtime keeps one dispatcher per IP protocol number.
//!
//! ## Analyzer trees
//!
//! Every connection owns an [`AnalyzerTree`]: a root transport [`Analyzer`] and its children,
//! such as the signature matching node. The tree is built once, when the connection is created,
//! and never changes afterwards. A connection that needs a different tree is replaced as a whole.
//!
//! The root sees every packet first and decides which bytes, if any, its children get to see by
//! setting `Delivery::forward`.
//!
//! [`TransportProtocol`]: trait.TransportProtocol.html
//! [`Dispatcher`]: struct.Dispatcher.html
//! [`AnalyzerTree`]: struct.AnalyzerTree.html
//! [`Analyzer`]: trait.Analyzer.html
use crate::config::Config;
use crate::error::Result;
use crate::session::{ConnRecord, ConnState, ConnectionId, SessionTable, Transport};
use crate::time::Instant;

mod dispatcher;
pub mod icmp;
mod packet;
mod ports;
mod reuse;
mod signature;
pub mod udp;

pub use dispatcher::{
    check_header_truncation,
    Dispatcher,
    ProtocolHandler,
};

pub use packet::{
    IpHeader,
    Ipv4Summary,
    Ipv6Summary,
    Packet,
    PacketHeader,
    Recording,
};

pub use ports::{
    masked,
    PortCache,
    ServerPorts,
};

pub use reuse::{
    FnReuse,
    IdleReuse,
    NeverReuse,
    ReusePolicy,
};

pub use signature::{
    MatchState,
    SignatureEngine,
    SignatureNode,
};

/// The capabilities of a transport protocol needed by the [`Dispatcher`].
///
/// [`Dispatcher`]: struct.Dispatcher.html
pub trait TransportProtocol {
    /// A short name for diagnostics.
    fn name(&self) -> &'static str;

    /// The transport of the connections of this protocol.
    fn transport(&self) -> Transport;

    /// The mask combined with ports before looking them up in the likely server port cache.
    fn server_port_mask(&self) -> u32 {
        self.transport().server_port_mask()
    }

    /// The minimum number of octets of a transport header.
    fn min_header_len(&self) -> usize;

    /// The identity of a packet, `None` if it does not belong to any connection.
    ///
    /// Called only when at least `min_header_len` octets were captured.
    fn connection_id(&self, packet: &Packet) -> Option<ConnectionId>;

    /// Decide whether a tuple not yet in the table should be tracked.
    ///
    /// The ports are in host byte order and in the direction of the packet.
    fn want_connection(&self, src_port: u16, dst_port: u16, payload: &[u8], ports: ServerPorts)
        -> Admission;

    /// Build the analyzers of a new connection.
    fn build_tree(&self, conn: &ConnState, ctx: &Context) -> Result<AnalyzerTree>;
}

/// The outcome of admission for a new tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Do not track the tuple. Not an error.
    Reject,
    /// Track the tuple.
    Accept {
        /// The receiver of the first packet is the originator.
        flip: bool,
    },
}

/// A node of an analyzer tree.
pub trait Analyzer {
    /// The name shown in the service list of the connection record.
    fn name(&self) -> &'static str;

    /// Process one packet of the connection.
    fn deliver_packet(&mut self, conn: &mut ConnState, delivery: &mut Delivery);

    /// Fold the analyzer state into the record of the connection.
    fn update_record(&self, record: &mut ConnRecord) {
        let _ = record;
    }

    /// The connection ends.
    fn done(&mut self, conn: &mut ConnState) {
        let _ = conn;
    }
}

/// The analyzers of one connection.
pub struct AnalyzerTree {
    root: Box<dyn Analyzer>,
    children: Vec<Box<dyn Analyzer>>,
}

/// One packet as presented to the analyzers of a connection.
#[derive(Clone, Copy)]
pub struct Delivery<'a> {
    /// The captured transport data, starting with the transport header.
    ///
    /// Never extends past the declared length but may be shorter when the capture was cut.
    pub data: &'a [u8],
    /// The declared length of the transport data.
    pub len: usize,
    pub is_orig: bool,
    pub ip: &'a IpHeader,
    pub ts: Instant,
    /// The encapsulation context of the packet, used for identities found inside it.
    pub encapsulation: u32,
    pub ignore_checksums: bool,
    pub l3_checksummed: bool,
    /// The data the root hands to the child analyzers.
    pub forward: Option<&'a [u8]>,
}

/// Everything a dispatcher needs besides the packet.
pub struct Context<'a> {
    pub table: &'a mut SessionTable,
    pub ports: &'a PortCache,
    pub config: &'a Config,
    pub signatures: Option<&'a dyn SignatureEngine>,
}

impl AnalyzerTree {
    pub fn new(root: Box<dyn Analyzer>) -> Self {
        AnalyzerTree { root, children: Vec::new() }
    }

    /// A tree with the given root and, if an engine is configured, a signature matching child.
    pub fn with_signatures(root: Box<dyn Analyzer>, conn: &ConnState, ctx: &Context)
        -> Result<Self>
    {
        let mut tree = AnalyzerTree::new(root);
        if let Some(engine) = ctx.signatures {
            let state = engine.init_state(conn)?;
            tree.add_child(Box::new(SignatureNode::new(state)));
        }
        Ok(tree)
    }

    pub fn add_child(&mut self, child: Box<dyn Analyzer>) {
        self.children.push(child);
    }

    /// The names of all analyzers, root first.
    pub fn names(&self) -> Vec<&'static str> {
        core::iter::once(&self.root)
            .chain(self.children.iter())
            .map(|analyzer| analyzer.name())
            .collect()
    }

    pub(crate) fn deliver(&mut self, conn: &mut ConnState, delivery: &mut Delivery) {
        self.root.deliver_packet(conn, delivery);

        let forward = match delivery.forward.take() {
            Some(forward) => forward,
            None => return,
        };

        for child in self.children.iter_mut() {
            let mut inner = Delivery {
                data: forward,
                len: forward.len(),
                forward: None,
                ..*delivery
            };
            child.deliver_packet(conn, &mut inner);
        }
    }

    pub(crate) fn update_record(&self, record: &mut ConnRecord) {
        self.root.update_record(record);
        for child in &self.children {
            child.update_record(record);
        }
        record.service = self.names();
    }

    pub(crate) fn done(&mut self, conn: &mut ConnState) {
        self.root.done(conn);
        for child in self.children.iter_mut() {
            child.done(conn);
        }
    }
}

impl<'a> Context<'a> {
    /// The likely server ports of a transport.
    pub fn server_ports(&self, mask: u32) -> ServerPorts<'_> {
        self.ports.for_mask(self.config, mask)
    }
}
