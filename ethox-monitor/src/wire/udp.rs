use byteorder::{ByteOrder, NetworkEndian};

use super::{checksum, Error, Result};

byte_wrapper! {
    /// A view of a User Datagram Protocol header.
    ///
    /// Only the eight header octets need to be captured. The length field is reported as is, it
    /// is up to the caller to compare it with the network layer.
    #[derive(Debug, PartialEq, Eq)]
    pub struct udp([u8]);
}

mod field {
    use crate::wire::field::{Field, Rest};

    pub(crate) const SRC_PORT: Field = 0..2;
    pub(crate) const DST_PORT: Field = 2..4;
    pub(crate) const LENGTH:   Field = 4..6;
    pub(crate) const CHECKSUM: Field = 6..8;
    pub(crate) const PAYLOAD:  Rest  = 8..;
}

/// The length of a UDP header.
pub const HEADER_LEN: usize = field::PAYLOAD.start;

impl udp {
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        Self::new_unchecked(data).check_len()?;
        Ok(Self::new_unchecked(data))
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the source port field.
    #[inline]
    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::SRC_PORT])
    }

    /// Return the destination port field.
    #[inline]
    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::DST_PORT])
    }

    /// Return the length field.
    #[inline]
    pub fn len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Validate the checksum over the whole captured datagram.
    ///
    /// `pseudo` is the partial sum of the pseudo header. A zero checksum field means that the
    /// sender did not compute one, which IPv4 permits, and always validates.
    ///
    /// # Fuzzing
    /// This function always returns `true` when fuzzing.
    pub fn verify_checksum(&self, pseudo: u16) -> bool {
        if cfg!(fuzzing) { return true }
        if self.checksum() == 0 { return true }

        checksum::verify(&self.0, Some(pseudo))
    }

    /// The captured bytes after the header.
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[field::PAYLOAD]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static PACKET_BYTES: [u8; 12] =
        [0xbf, 0x00, 0x00, 0x35,
         0x00, 0x0c, 0x12, 0x4d,
         0xaa, 0x00, 0x00, 0xff];

    #[test]
    fn test_deconstruct() {
        let packet = udp::new_checked(&PACKET_BYTES[..]).unwrap();
        assert_eq!(packet.src_port(), 48896);
        assert_eq!(packet.dst_port(), 53);
        assert_eq!(packet.len(), 12);
        assert_eq!(packet.checksum(), 0x124d);
        assert_eq!(packet.payload_slice(), &[0xaa, 0x00, 0x00, 0xff]);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(udp::new_checked(&PACKET_BYTES[..7]).err(), Some(Error::Truncated));
    }

    #[test]
    fn test_zero_checksum() {
        let mut bytes = PACKET_BYTES;
        bytes[6] = 0;
        bytes[7] = 0;
        assert!(udp::new_unchecked(&bytes[..]).verify_checksum(0x1234));
    }
}
