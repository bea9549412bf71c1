use std::collections::HashMap;

use crate::analysis::icmp::{IcmpContext, NdOptionData};
use crate::time::{Duration, Instant};

use super::{
    ConnRecord,
    ConnUid,
    Connection,
    ConnectionKey,
    Event,
    EventBody,
    EventQueue,
    Observers,
    SessionStats,
    Transport,
    Weird,
};

/// The table of live connections.
///
/// Owns every inserted connection. Events queued on a connection reach the outbound queue of the
/// table when the connection is flushed or removed, in the order they were queued.
#[derive(Debug)]
pub struct SessionTable {
    conns: HashMap<ConnectionKey, Connection>,
    stats: SessionStats,
    events: EventQueue<Event>,
    weirds: HashMap<&'static str, u64>,
    observers: Observers,
    next_uid: u64,
}

impl SessionTable {
    /// Create an empty table delivering events of the observed kinds.
    pub fn new(observers: Observers) -> Self {
        SessionTable {
            conns: HashMap::new(),
            stats: SessionStats::default(),
            events: EventQueue::new(),
            weirds: HashMap::new(),
            observers,
            next_uid: 1,
        }
    }

    pub fn observers(&self) -> Observers {
        self.observers
    }

    /// Allocate the uid for a new connection.
    pub fn next_uid(&mut self) -> ConnUid {
        let uid = ConnUid(self.next_uid);
        self.next_uid += 1;
        uid
    }

    /// The number of live connections.
    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// Look up the connection of a key.
    ///
    /// A connection stored under the key with a different transport is not returned.
    pub fn find(&self, key: &ConnectionKey, transport: Transport) -> Option<&Connection> {
        self.conns.get(key).filter(|conn| conn.transport() == transport)
    }

    /// Look up the connection of a key for modification.
    pub fn find_mut(&mut self, key: &ConnectionKey, transport: Transport)
        -> Option<&mut Connection>
    {
        self.conns.get_mut(key).filter(|conn| conn.transport() == transport)
    }

    /// Add a connection under its key.
    ///
    /// The statistics count the new connection even if it displaces another one, whose live count
    /// is not taken back. Callers check for an existing entry first.
    ///
    /// With `remove_existing` a displaced connection is finished properly: its analyzers are told
    /// that it is done and its events are flushed. Without, the caller asserts that the slot is
    /// empty and a displaced connection is dropped silently.
    pub fn insert(&mut self, conn: Connection, remove_existing: bool) {
        let transport = conn.transport();
        let key = *conn.key();
        self.stats.of_mut(transport).insert();

        match self.conns.insert(key, conn) {
            Some(old) if remove_existing => {
                self.finish(old);
            },
            Some(old) => {
                net_warn!("session table: dropping displaced connection {}", old.uid());
            },
            None => {},
        }
    }

    /// Remove the connection of a key, returning its final record.
    ///
    /// The analyzers of the connection are told that it is done and all its events, including a
    /// final `ConnectionStateRemove`, are flushed. Removing an absent key does nothing.
    pub fn remove(&mut self, key: &ConnectionKey) -> Option<ConnRecord> {
        let conn = self.conns.remove(key)?;
        self.stats.of_mut(conn.transport()).remove();
        Some(self.finish(conn))
    }

    /// Queue a `ConnectionPending` event for every live connection.
    ///
    /// Used at shutdown so that consumers learn about flows that never finished. The connections
    /// stay in the table.
    pub fn drain(&mut self) {
        let mut keys: Vec<_> = self.conns.iter()
            .map(|(key, conn)| (conn.uid(), *key))
            .collect();
        keys.sort();

        for (_, key) in keys {
            if let Some(conn) = self.conns.get_mut(&key) {
                conn.state_mut().enqueue(EventBody::ConnectionPending);
            }
            self.flush(&key);
        }
    }

    /// Drop every connection without any further events.
    ///
    /// Live counts are reset, cumulative and maximum counts are kept.
    pub fn clear(&mut self) {
        self.conns.clear();
        for transport in [Transport::Tcp, Transport::Udp, Transport::Icmp, Transport::Unknown] {
            self.stats.of_mut(transport).current = 0;
        }
    }

    /// A snapshot of the statistics.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Report an anomaly that is not about a particular connection.
    pub fn weird(&mut self, weird: Weird) {
        self.emit(None, EventBody::Weird(weird));
    }

    /// The number of weirds reported under a name so far.
    pub fn weird_count(&self, name: &str) -> u64 {
        self.weirds.get(name).copied().unwrap_or(0)
    }

    /// Move the queued events of a connection to the outbound queue.
    pub fn flush(&mut self, key: &ConnectionKey) {
        let (record, bodies) = match self.conns.get_mut(key) {
            Some(conn) if conn.state().has_events() => {
                let bodies = conn.state_mut().take_events();
                (conn.record(), bodies)
            },
            _ => return,
        };

        self.emit_all(record, bodies);
    }

    /// Take all events in the order they were produced.
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.drain().collect()
    }

    /// Remove every connection that was inactive for longer than its transport's timeout.
    ///
    /// Returns the number of removed connections.
    pub fn expire_idle(&mut self, now: Instant, timeout_of: impl Fn(Transport) -> Duration)
        -> usize
    {
        let mut expired: Vec<_> = self.conns.iter()
            .filter(|(_, conn)| {
                let idle = now.saturating_since(conn.state().last_time());
                idle > timeout_of(conn.transport())
            })
            .map(|(key, conn)| (conn.uid(), *key))
            .collect();
        expired.sort();

        for (uid, key) in &expired {
            net_trace!("session table: expiring idle connection {}", uid);
            self.remove(key);
        }

        expired.len()
    }

    /// Record the number of fragments the reassembler currently holds.
    pub fn note_fragments(&mut self, current: u64) {
        self.stats.note_fragments(current);
    }

    /// Count one processed packet.
    pub fn count_packet(&mut self) {
        self.stats.num_packets += 1;
    }

    /// End a connection that already left the map.
    fn finish(&mut self, mut conn: Connection) -> ConnRecord {
        conn.done();
        conn.state_mut().enqueue(EventBody::ConnectionStateRemove);
        let bodies = conn.state_mut().take_events();
        let record = conn.record();
        self.emit_all(record.clone(), bodies);
        record
    }

    fn emit_all(&mut self, record: ConnRecord, bodies: Vec<EventBody>) {
        for mut body in bodies {
            self.correlate(&mut body);
            self.emit(Some(record.clone()), body);
        }
    }

    /// Point the packets embedded in an ICMP message to their connections, if those are live.
    ///
    /// Covers the context of error messages and the redirected header option of redirects.
    fn correlate(&self, body: &mut EventBody) {
        let event = match body {
            EventBody::Icmp(event) => event,
            _ => return,
        };

        if let Some(context) = event.context_mut() {
            self.relate(context);
        }

        for option in event.options_mut() {
            if let NdOptionData::RedirectedHeader(context) = &mut option.data {
                self.relate(context);
            }
        }
    }

    fn relate(&self, context: &mut IcmpContext) {
        if let Some(id) = context.id {
            context.related = self.find(&id.key(), id.transport).map(Connection::uid);
        }
    }

    fn emit(&mut self, conn: Option<ConnRecord>, body: EventBody) {
        if let EventBody::Weird(weird) = &body {
            net_debug!("weird: {} {:?} {:?}", weird.name, weird.addl, weird.source);
            *self.weirds.entry(weird.name).or_insert(0) += 1;
        }

        if self.observers.contains(body.kind()) {
            self.events.push(Event { conn, body });
        }
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        SessionTable::new(Observers::all())
    }
}
