use byteorder::{ByteOrder, NetworkEndian};

use super::{checksum, Error, Result};

byte_wrapper! {
    /// A view of the fixed part shared by all ICMPv4 and ICMPv6 messages.
    ///
    /// Every message starts with type, code and checksum, followed by four octets whose meaning
    /// depends on the message type. The view only validates that these eight octets were
    /// captured, the message body is read through a [`Cursor`].
    ///
    /// [`Cursor`]: struct.Cursor.html
    #[derive(Debug, PartialEq, Eq)]
    pub struct icmp([u8]);
}

mod field {
    use crate::wire::field::{Field, Rest};

    pub(crate) const TYPE:       usize = 0;
    pub(crate) const CODE:       usize = 1;
    pub(crate) const CHECKSUM:   Field = 2..4;

    pub(crate) const ECHO_IDENT: Field = 4..6;
    pub(crate) const ECHO_SEQNO: Field = 6..8;

    pub(crate) const RA_HOP_LIMIT: usize = 4;
    pub(crate) const RA_FLAGS:     usize = 5;
    pub(crate) const RA_LIFETIME:  Field = 6..8;

    pub(crate) const NA_FLAGS:   usize = 4;

    pub(crate) const BODY:       Rest = 8..;
}

/// The length of the common header, including the type specific four octets.
pub const HEADER_LEN: usize = field::BODY.start;

impl icmp {
    /// Imbue a raw octet buffer with ICMP structure.
    pub fn new_unchecked(buffer: &[u8]) -> &icmp {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&icmp> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
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

    /// Return the raw message type field.
    #[inline]
    pub fn msg_type(&self) -> u8 {
        self.0[field::TYPE]
    }

    /// Return the message code field.
    #[inline]
    pub fn msg_code(&self) -> u8 {
        self.0[field::CODE]
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the identifier field of echo messages.
    #[inline]
    pub fn echo_ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_IDENT])
    }

    /// Return the sequence number field of echo messages.
    #[inline]
    pub fn echo_seq_no(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_SEQNO])
    }

    /// Return the current hop limit of an ICMPv6 router advertisement.
    #[inline]
    pub fn router_hop_limit(&self) -> u8 {
        self.0[field::RA_HOP_LIMIT]
    }

    /// Return the flag octet of an ICMPv6 router advertisement.
    #[inline]
    pub fn router_flags(&self) -> u8 {
        self.0[field::RA_FLAGS]
    }

    /// Return the router lifetime of an ICMPv6 router advertisement, in seconds.
    #[inline]
    pub fn router_lifetime(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::RA_LIFETIME])
    }

    /// Return the flag octet of an ICMPv6 neighbor advertisement.
    #[inline]
    pub fn neighbor_flags(&self) -> u8 {
        self.0[field::NA_FLAGS]
    }

    /// The captured bytes after the common header.
    pub fn body(&self) -> &[u8] {
        &self.0[field::BODY]
    }

    /// Validate the checksum over the whole captured message.
    ///
    /// ICMPv6 covers the IPv6 pseudo header, pass its partial sum as `pseudo`. ICMPv4 does not
    /// and passes `None`. The caller is responsible for only checking completely captured
    /// messages.
    ///
    /// # Fuzzing
    /// This function always returns `true` when fuzzing.
    pub fn verify_checksum(&self, pseudo: Option<u16>) -> bool {
        if cfg!(fuzzing) { return true }

        checksum::verify(&self.0, pseudo)
    }
}

impl AsRef<[u8]> for icmp {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static ECHO_BYTES: [u8; 12] =
        [0x08, 0x00, 0x8e, 0xfe,
         0x12, 0x34, 0xab, 0xcd,
         0xaa, 0x00, 0x00, 0xff];

    #[test]
    fn test_echo_deconstruct() {
        let packet = icmp::new_checked(&ECHO_BYTES[..]).unwrap();
        assert_eq!(packet.msg_type(), 8);
        assert_eq!(packet.msg_code(), 0);
        assert_eq!(packet.checksum(), 0x8efe);
        assert_eq!(packet.echo_ident(), 0x1234);
        assert_eq!(packet.echo_seq_no(), 0xabcd);
        assert_eq!(packet.body(), &ECHO_BYTES[8..]);
        assert!(packet.verify_checksum(None));
    }

    #[test]
    fn test_check_len() {
        assert_eq!(icmp::new_checked(&ECHO_BYTES[..7]), Err(Error::Truncated));
        assert!(icmp::new_checked(&ECHO_BYTES[..8]).is_ok());
    }

    #[test]
    fn test_router_advert_fields() {
        let bytes = [0x86, 0x00, 0x00, 0x00, 0x40, 0xc0, 0x07, 0x08];
        let packet = icmp::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.router_hop_limit(), 64);
        assert_eq!(packet.router_flags(), 0xc0);
        assert_eq!(packet.router_lifetime(), 1800);
        assert!(packet.body().is_empty());
    }
}
