//! Connection tracking.
//!
//! The [`SessionTable`] maps direction independent [`ConnectionKey`]s to [`Connection`]s. A
//! connection is only ever created by a dispatcher in `analysis` and from then on exclusively
//! owned by the table. Analyzers see the mutable [`ConnState`] of the connection they are attached
//! to for the duration of one packet.
//!
//! ## Events
//!
//! Nothing in this crate calls back into the consumer. Events produced while a packet is processed
//! are queued on the connection, moved to the outbound queue of the table when the connection is
//! flushed at the end of the packet, and finally taken by the consumer with
//! [`SessionTable::take_events`]. Every step is first in, first out so the consumer sees events in
//! the order they were produced.
//!
//! [`SessionTable`]: struct.SessionTable.html
//! [`ConnectionKey`]: struct.ConnectionKey.html
//! [`Connection`]: struct.Connection.html
//! [`ConnState`]: struct.ConnState.html
//! [`SessionTable::take_events`]: struct.SessionTable.html#method.take_events
mod connection;
mod event;
mod key;
mod stats;
mod table;

pub use connection::{
    ConnRecord,
    ConnState,
    ConnUid,
    Connection,
    Endpoint,
    EndpointRecord,
};

pub use event::{
    Event,
    EventBody,
    EventKind,
    EventQueue,
    Observers,
    Weird,
};

pub use key::{
    ConnectionId,
    ConnectionKey,
    EncapsulatingConn,
    EncapsulationStack,
    Transport,
    TunnelKind,
};

pub use stats::{
    Counts,
    SessionStats,
};

pub use table::SessionTable;
