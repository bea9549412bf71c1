//! The packet processing loop of a monitor.
//!
//! A [`Runtime`] owns everything that lives across packets: the configuration, the session table,
//! the likely server port cache and one handler per IP protocol number. Packets are processed one
//! at a time, to completion, and all events they produce are available from the runtime before
//! the next packet starts.
//!
//! [`Runtime`]: struct.Runtime.html
use std::collections::HashMap;

use crate::analysis::{
    Context,
    Dispatcher,
    Packet,
    PortCache,
    ProtocolHandler,
    Recording,
    SignatureEngine,
};
use crate::analysis::icmp::IcmpProtocol;
use crate::analysis::udp::UdpProtocol;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::{Event, SessionStats, SessionTable, Weird};
use crate::time::Instant;
use crate::wire::{self, IpProtocol};

/// The owner of all monitor state.
pub struct Runtime {
    config: Config,
    table: SessionTable,
    ports: PortCache,
    signatures: Option<Box<dyn SignatureEngine>>,
    handlers: HashMap<IpProtocol, Box<dyn ProtocolHandler>>,
}

impl Runtime {
    /// A runtime with the built-in ICMP and UDP analysis.
    pub fn new(config: Config) -> Self {
        let mut runtime = Runtime::empty(config);
        runtime.register(IpProtocol::Icmp, Dispatcher::new(IcmpProtocol));
        runtime.register(IpProtocol::Icmpv6, Dispatcher::new(IcmpProtocol));
        runtime.register(IpProtocol::Udp, Dispatcher::new(UdpProtocol));
        runtime
    }

    /// A runtime without any registered protocol.
    pub fn empty(config: Config) -> Self {
        let table = SessionTable::new(config.observers());
        Runtime {
            config,
            table,
            ports: PortCache::new(),
            signatures: None,
            handlers: HashMap::new(),
        }
    }

    /// Handle all packets of an IP protocol number, replacing any previous handler.
    pub fn register(&mut self, protocol: IpProtocol, handler: impl ProtocolHandler + 'static) {
        if self.handlers.insert(protocol, Box::new(handler)).is_some() {
            net_debug!("runtime: replaced handler of {}", protocol);
        }
    }

    /// Attach signature matching to every connection created from now on.
    pub fn set_signature_engine(&mut self, engine: impl SignatureEngine + 'static) {
        self.signatures = Some(Box::new(engine));
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Modify the configuration.
    ///
    /// The likely server ports are read once, on the first lookup. Changing them afterwards has
    /// no effect. Neither has changing the observed event kinds.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn table(&self) -> &SessionTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut SessionTable {
        &mut self.table
    }

    /// Process one packet.
    ///
    /// Fragments are only analyzed once reassembled, a fragment that was not is counted and
    /// otherwise ignored. Packets of an IP protocol without handler are reported as
    /// `UnsupportedProtocol`, which is not fatal.
    pub fn process_packet(&mut self, packet: &mut Packet) -> Result<()> {
        self.table.count_packet();

        if packet.ip().is_fragment() && !packet.is_reassembled() {
            net_trace!("runtime: skipping fragment of {}", packet.ip().src_addr);
            return Ok(());
        }

        let protocol = packet.ip().protocol;
        let handler = match self.handlers.get(&protocol) {
            Some(handler) => handler,
            None => return Err(Error::UnsupportedProtocol(protocol)),
        };

        let mut ctx = Context {
            table: &mut self.table,
            ports: &self.ports,
            config: &self.config,
            signatures: self.signatures.as_deref(),
        };

        handler.analyze_packet(&mut ctx, packet);
        Ok(())
    }

    /// Process a capture starting with an IP header, returning the recording decision.
    ///
    /// A network layer header that can not be parsed is counted and reported as a weird before
    /// the error is returned.
    pub fn process_ip(&mut self, data: &[u8], ts: Instant) -> Result<Recording> {
        let mut packet = match Packet::from_ip(data, ts) {
            Ok(packet) => packet,
            Err(err) => {
                self.table.count_packet();
                self.unparsable(err);
                return Err(err.into());
            },
        };

        self.process_packet(&mut packet)?;
        Ok(packet.recording())
    }

    /// Take all events produced so far, oldest first.
    pub fn take_events(&mut self) -> Vec<Event> {
        self.table.take_events()
    }

    /// Report every live connection as pending, at the end of the input.
    pub fn drain(&mut self) {
        self.table.drain();
    }

    /// Drop all connections without further events.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Remove connections that have been inactive for longer than their configured timeout.
    pub fn expire_idle(&mut self, now: Instant) -> usize {
        let timeouts = &self.config.timeouts;
        self.table.expire_idle(now, |transport| timeouts.of(transport))
    }

    pub fn stats(&self) -> SessionStats {
        self.table.stats()
    }

    /// Record the number of fragments an external reassembler currently holds.
    pub fn note_fragments(&mut self, current: u64) {
        self.table.note_fragments(current);
    }

    fn unparsable(&mut self, err: wire::Error) {
        let name = match err {
            wire::Error::Truncated => "truncated_IP",
            wire::Error::Unrecognized => "unknown_IP_version",
            _ => "bad_IP_header",
        };
        net_debug!("runtime: unparsable packet: {}", err);
        self.table.weird(Weird::new(name).with_addl(err.to_string()).with_source("IP"));
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(Config::default())
    }
}
