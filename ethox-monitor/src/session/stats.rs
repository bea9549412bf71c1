use super::Transport;

/// Live and historic connection counts of one transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Connections currently in the table.
    pub current: u64,
    /// The highest `current` value ever observed.
    pub max: u64,
    /// Every connection ever inserted.
    pub cumulative: u64,
}

/// Aggregate statistics of a session table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub tcp: Counts,
    pub udp: Counts,
    pub icmp: Counts,
    pub unknown: Counts,
    /// Fragments currently held by the reassembler in front of the table.
    pub num_fragments: u64,
    pub max_fragments: u64,
    /// Packets counted by the runtime, whether or not they reached a connection.
    pub num_packets: u64,
}

impl Counts {
    pub(crate) fn insert(&mut self) {
        self.current += 1;
        self.cumulative += 1;
        self.max = self.max.max(self.current);
    }

    pub(crate) fn remove(&mut self) {
        self.current = self.current.saturating_sub(1);
    }
}

impl SessionStats {
    pub fn of(&self, transport: Transport) -> &Counts {
        match transport {
            Transport::Tcp => &self.tcp,
            Transport::Udp => &self.udp,
            Transport::Icmp => &self.icmp,
            Transport::Unknown => &self.unknown,
        }
    }

    pub(crate) fn of_mut(&mut self, transport: Transport) -> &mut Counts {
        match transport {
            Transport::Tcp => &mut self.tcp,
            Transport::Udp => &mut self.udp,
            Transport::Icmp => &mut self.icmp,
            Transport::Unknown => &mut self.unknown,
        }
    }

    /// The sum of live connections over all transports.
    pub fn current(&self) -> u64 {
        self.tcp.current + self.udp.current + self.icmp.current + self.unknown.current
    }

    /// The sum of inserted connections over all transports.
    pub fn cumulative(&self) -> u64 {
        self.tcp.cumulative + self.udp.cumulative + self.icmp.cumulative + self.unknown.cumulative
    }

    pub(crate) fn note_fragments(&mut self, current: u64) {
        self.num_fragments = current;
        self.max_fragments = self.max_fragments.max(current);
    }
}
