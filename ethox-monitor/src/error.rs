use thiserror::Error as ThisError;

use crate::wire::{self, IpProtocol};

/// Failures of the monitor outside of wire level parsing.
///
/// None of these abort the monitor. A failed packet simply contributes no further analysis.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An analyzer could not be attached to a new connection.
    ///
    /// The dispatcher treats this as a rejection of the connection, it is never returned from
    /// packet processing.
    #[error("could not build analyzer {analyzer}: {reason}")]
    AnalyzerTree {
        analyzer: &'static str,
        reason: String,
    },

    /// No dispatcher is registered for the transport of the packet.
    #[error("no analyzer registered for protocol {0}")]
    UnsupportedProtocol(IpProtocol),

    /// The network layer header of a packet could not be parsed at all.
    #[error("unparsable packet: {0}")]
    Packet(#[from] wire::Error),
}

/// The result type of the monitor.
pub type Result<T> = core::result::Result<T, Error>;
