//! Programmatic configuration of the monitor.
//!
//! The configuration is plain data. It derives `serde` so that an embedding application can load
//! it from whatever format it already uses, this crate itself does not read files.
use serde::{Deserialize, Serialize};

use crate::session::{EventKind, Observers, Transport};
use crate::time::Duration;

/// Root configuration structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ports that are usually served, not used as a client port.
    ///
    /// Consulted when deciding which endpoint of a new connection is the originator. The port
    /// cache is built from this list once, on first use, and never rebuilt.
    pub likely_server_ports: Vec<PortSpec>,

    /// Skip transport checksum validation.
    ///
    /// Useful for traces taken on the sending host where checksum offload leaves the field empty.
    pub ignore_checksums: bool,

    /// Packet recording settings.
    pub recording: RecordingConfig,

    /// Inactivity timeouts per transport.
    pub timeouts: Timeouts,

    /// Event kinds with an interested consumer, `None` for all of them.
    pub observers: Option<Vec<EventKind>>,
}

/// A port number qualified by its transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortSpec {
    pub port: u16,
    pub transport: Transport,
}

/// Packet recording settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Only record up to the start of the transport header payload.
    pub header_only: bool,
}

/// Inactivity timeouts, in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub tcp: u64,
    pub udp: u64,
    pub icmp: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            likely_server_ports: default_likely_server_ports(),
            ignore_checksums: false,
            recording: RecordingConfig::default(),
            timeouts: Timeouts::default(),
            observers: None,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            tcp: 300,
            udp: 60,
            icmp: 60,
        }
    }
}

impl Config {
    /// The set of observed event kinds.
    pub fn observers(&self) -> Observers {
        match &self.observers {
            None => Observers::all(),
            Some(kinds) => kinds.iter().copied().collect(),
        }
    }
}

impl Timeouts {
    /// The inactivity timeout for connections of a transport.
    ///
    /// Connections with an unknown transport share the UDP timeout.
    pub fn of(&self, transport: Transport) -> Duration {
        let secs = match transport {
            Transport::Tcp => self.tcp,
            Transport::Icmp => self.icmp,
            Transport::Udp | Transport::Unknown => self.udp,
        };
        Duration::from_secs(secs)
    }
}

fn default_likely_server_ports() -> Vec<PortSpec> {
    const TCP: &[u16] = &[
        21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 389, 443, 445, 465, 587, 636, 993, 995,
        1433, 1521, 3306, 3389, 5432, 5900, 6379, 8080, 8443,
    ];
    const UDP: &[u16] = &[
        53, 67, 69, 88, 123, 137, 138, 161, 162, 500, 514, 1812, 1900, 3478, 4500, 5060, 5353,
    ];

    let tcp = TCP.iter().map(|&port| PortSpec { port, transport: Transport::Tcp });
    let udp = UDP.iter().map(|&port| PortSpec { port, transport: Transport::Udp });
    tcp.chain(udp).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.likely_server_ports.contains(&PortSpec { port: 80, transport: Transport::Tcp }));
        assert!(!config.likely_server_ports.contains(&PortSpec { port: 80, transport: Transport::Udp }));
    }

    #[test]
    fn partial_document() {
        let config: Config = serde_json::from_str(r#"{
            "likely_server_ports": [{ "port": 8000, "transport": "tcp" }],
            "recording": { "header_only": true },
            "timeouts": { "icmp": 5 },
            "observers": ["new_connection", "icmp"]
        }"#).unwrap();

        assert_eq!(config.likely_server_ports, [PortSpec { port: 8000, transport: Transport::Tcp }]);
        assert!(config.recording.header_only);
        assert_eq!(config.timeouts.of(Transport::Icmp), Duration::from_secs(5));
        assert_eq!(config.timeouts.of(Transport::Tcp), Duration::from_secs(300));

        let observers = config.observers();
        assert!(observers.contains(EventKind::NewConnection));
        assert!(observers.contains(EventKind::Icmp));
        assert!(!observers.contains(EventKind::NewPacket));
    }
}
