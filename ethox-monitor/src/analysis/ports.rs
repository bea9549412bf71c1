use std::cell::OnceCell;
use std::collections::HashSet;

use crate::config::{Config, PortSpec};
use crate::session::Transport;

/// The set of ports that likely belong to a server.
///
/// Built from `Config::likely_server_ports` on the first lookup and never rebuilt. Changes to the
/// configuration after that are not observed.
///
/// All transports share one set. Each entry is the port number combined with the server port mask
/// of its transport, so port 80 of TCP and port 80 of UDP are different entries.
#[derive(Debug, Default)]
pub struct PortCache {
    ports: OnceCell<HashSet<u32>>,
}

/// The view of the port cache for one transport.
#[derive(Clone, Copy)]
pub struct ServerPorts<'a> {
    cache: &'a PortCache,
    config: &'a Config,
    mask: u32,
}

impl PortCache {
    pub fn new() -> Self {
        PortCache::default()
    }

    /// Look up a port already combined with its transport mask.
    pub fn contains(&self, config: &Config, masked_port: u32) -> bool {
        self.ports
            .get_or_init(|| Self::build(&config.likely_server_ports))
            .contains(&masked_port)
    }

    /// Check if the cache was already built.
    pub fn is_built(&self) -> bool {
        self.ports.get().is_some()
    }

    /// The view for ports of a transport given by its mask.
    pub fn for_mask<'a>(&'a self, config: &'a Config, mask: u32) -> ServerPorts<'a> {
        ServerPorts { cache: self, config, mask }
    }

    fn build(specs: &[PortSpec]) -> HashSet<u32> {
        net_trace!("building likely server port cache from {} entries", specs.len());
        specs.iter()
            .map(|spec| masked(spec.port, spec.transport))
            .collect()
    }
}

impl ServerPorts<'_> {
    pub fn contains(&self, port: u16) -> bool {
        self.cache.contains(self.config, u32::from(port) | self.mask)
    }
}

/// Combine a port with the server port mask of its transport.
pub fn masked(port: u16, transport: Transport) -> u32 {
    u32::from(port) | transport.server_port_mask()
}

#[cfg(test)]
mod test {
    use super::*;

    fn config(specs: &[(u16, Transport)]) -> Config {
        Config {
            likely_server_ports: specs.iter()
                .map(|&(port, transport)| PortSpec { port, transport })
                .collect(),
            ..Config::default()
        }
    }

    #[test]
    fn transports_are_disjoint() {
        let config = config(&[(80, Transport::Tcp)]);
        let cache = PortCache::new();
        assert!(cache.contains(&config, masked(80, Transport::Tcp)));
        assert!(!cache.contains(&config, masked(80, Transport::Udp)));
        assert!(!cache.contains(&config, masked(80, Transport::Icmp)));
        assert!(cache.for_mask(&config, Transport::Tcp.server_port_mask()).contains(80));
        assert!(!cache.for_mask(&config, Transport::Udp.server_port_mask()).contains(80));
    }

    #[test]
    fn built_once() {
        let cache = PortCache::new();
        assert!(!cache.is_built());
        assert!(cache.contains(&config(&[(53, Transport::Udp)]), masked(53, Transport::Udp)));
        assert!(cache.is_built());

        // A later configuration is not observed.
        let changed = config(&[(123, Transport::Udp)]);
        assert!(cache.contains(&changed, masked(53, Transport::Udp)));
        assert!(!cache.contains(&changed, masked(123, Transport::Udp)));
    }
}
