use thiserror::Error as ThisError;

/// The error type for parsing captured packet data.
///
/// None of these are fatal to the monitor. They only say why one layer of one packet could not
/// be analyzed further.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// The captured data is shorter than what the structure requires.
    ///
    /// This is the common case for snap-length limited captures and for embedded packets inside
    /// ICMP errors, which only carry a prefix of the original datagram.
    #[error("truncated packet")]
    Truncated,

    /// The packet was recognized but is self-contradictory.
    ///
    /// Examples: an IPv4 header length larger than the total length, an IPv6 extension header
    /// that claims to extend past the payload length.
    #[error("malformed packet")]
    Malformed,

    /// The packet could not be recognized, e.g. an IP version other than 4 or 6.
    #[error("unrecognized packet")]
    Unrecognized,

    /// A checksum did not verify.
    #[error("checksum error")]
    WrongChecksum,
}

/// The result type for wire level parsing.
pub type Result<T> = core::result::Result<T, Error>;
