use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::analysis::icmp::IcmpEvent;
use crate::analysis::PacketHeader;
use crate::wire::Ipv6Extension;

use super::{ConnRecord, EncapsulationStack};

/// An event for the consumer of the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The connection the event is about, as it was when the event was flushed.
    ///
    /// Only weirds reported on the table itself have none.
    pub conn: Option<ConnRecord>,
    pub body: EventBody,
}

/// What happened.
#[derive(Debug, Clone, PartialEq)]
pub enum EventBody {
    /// A connection was created and inserted.
    NewConnection,
    /// The tuple of the connection now belongs to a different flow, the connection is removed.
    ConnectionReused,
    /// The connection was still live when the table was drained.
    ConnectionPending,
    /// The connection is about to be removed from the table.
    ConnectionStateRemove,
    /// The IPv6 flow label of one direction changed.
    ConnectionFlowLabelChanged {
        is_orig: bool,
        old_label: u32,
        new_label: u32,
    },
    /// The connection continues in a different set of tunnels.
    TunnelChanged {
        stack: EncapsulationStack,
    },
    /// The packet carried IPv6 extension headers.
    Ipv6ExtHeaders {
        headers: Vec<Ipv6Extension>,
    },
    /// Any packet belonging to the connection.
    NewPacket {
        header: PacketHeader,
    },
    /// A parsed ICMP message.
    Icmp(IcmpEvent),
    /// The signature engine matched a rule on the connection.
    SignatureMatch {
        rule: String,
        is_orig: bool,
    },
    /// An anomaly.
    Weird(Weird),
}

/// A named, advisory report of an anomalous but non-fatal observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weird {
    /// Short machine stable name such as `truncated_header`.
    pub name: &'static str,
    /// Free text elaboration.
    pub addl: Option<String>,
    /// The component reporting it.
    pub source: Option<&'static str>,
}

/// The kind of an event, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewConnection,
    ConnectionReused,
    ConnectionPending,
    ConnectionStateRemove,
    ConnectionFlowLabelChanged,
    TunnelChanged,
    Ipv6ExtHeaders,
    NewPacket,
    Icmp,
    SignatureMatch,
    Weird,
}

/// A set of event kinds with an interested consumer.
///
/// Events of kinds outside the set are dropped when flushed. Some events are also expensive to
/// build and their producers check the set first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Observers(u16);

/// A FIFO of events not yet handed to the consumer.
#[derive(Debug, Clone)]
pub struct EventQueue<T> {
    events: VecDeque<T>,
}

impl EventBody {
    pub fn kind(&self) -> EventKind {
        match self {
            EventBody::NewConnection => EventKind::NewConnection,
            EventBody::ConnectionReused => EventKind::ConnectionReused,
            EventBody::ConnectionPending => EventKind::ConnectionPending,
            EventBody::ConnectionStateRemove => EventKind::ConnectionStateRemove,
            EventBody::ConnectionFlowLabelChanged { .. } => EventKind::ConnectionFlowLabelChanged,
            EventBody::TunnelChanged { .. } => EventKind::TunnelChanged,
            EventBody::Ipv6ExtHeaders { .. } => EventKind::Ipv6ExtHeaders,
            EventBody::NewPacket { .. } => EventKind::NewPacket,
            EventBody::Icmp(_) => EventKind::Icmp,
            EventBody::SignatureMatch { .. } => EventKind::SignatureMatch,
            EventBody::Weird(_) => EventKind::Weird,
        }
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.body.kind()
    }
}

impl Weird {
    pub fn new(name: &'static str) -> Self {
        Weird { name, addl: None, source: None }
    }

    pub fn with_addl(self, addl: impl Into<String>) -> Self {
        Weird { addl: Some(addl.into()), ..self }
    }

    pub fn with_source(self, source: &'static str) -> Self {
        Weird { source: Some(source), ..self }
    }
}

impl EventKind {
    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl Observers {
    /// Every event is observed.
    pub fn all() -> Self {
        Observers(!0)
    }

    /// No event is observed.
    pub fn none() -> Self {
        Observers(0)
    }

    pub fn insert(&mut self, kind: EventKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: EventKind) {
        self.0 &= !kind.bit();
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl Default for Observers {
    fn default() -> Self {
        Observers::all()
    }
}

impl FromIterator<EventKind> for Observers {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        let mut observers = Observers::none();
        iter.into_iter().for_each(|kind| observers.insert(kind));
        observers
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        EventQueue::new()
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        EventQueue { events: VecDeque::new() }
    }

    pub fn push(&mut self, event: T) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all events, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.events.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.events.iter()
    }
}
