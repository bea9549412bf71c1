use std::net::Ipv6Addr;

use byteorder::{ByteOrder, NetworkEndian};

use super::{Cursor, Error, Protocol, Result};

byte_wrapper! {
    /// A view of a captured IPv6 fixed header.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ipv6([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub(crate) const VER_TC_FLOW: Field = 0..4;
    pub(crate) const LENGTH:      Field = 4..6;
    pub(crate) const NXT_HDR:     usize = 6;
    pub(crate) const HOP_LIMIT:   usize = 7;
    pub(crate) const SRC_ADDR:    Field = 8..24;
    pub(crate) const DST_ADDR:    Field = 24..40;
}

/// The length of the fixed IPv6 header.
pub const HEADER_LEN: usize = field::DST_ADDR.end;

impl ipv6 {
    /// Imbue a raw octet buffer with IPv6 packet structure.
    pub fn new_unchecked(buffer: &[u8]) -> &ipv6 {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&ipv6> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            Err(Error::Truncated)
        } else if self.version() != 6 {
            Err(Error::Unrecognized)
        } else {
            Ok(())
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the version field.
    #[inline]
    pub fn version(&self) -> u8 {
        self.0[field::VER_TC_FLOW.start] >> 4
    }

    /// Return the traffic class field.
    #[inline]
    pub fn traffic_class(&self) -> u8 {
        ((NetworkEndian::read_u16(&self.0[0..2]) & 0x0ff0) >> 4) as u8
    }

    /// Return the flow label field.
    #[inline]
    pub fn flow_label(&self) -> u32 {
        NetworkEndian::read_u32(&self.0[field::VER_TC_FLOW]) & 0x000f_ffff
    }

    /// Return the payload length field.
    #[inline]
    pub fn payload_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    /// Return the next header field.
    #[inline]
    pub fn next_header(&self) -> Protocol {
        Protocol::from(self.0[field::NXT_HDR])
    }

    /// Return the hop limit field.
    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.0[field::HOP_LIMIT]
    }

    /// Return the source address field.
    #[inline]
    pub fn src_addr(&self) -> Ipv6Addr {
        let mut octets = [0; 16];
        octets.copy_from_slice(&self.0[field::SRC_ADDR]);
        Ipv6Addr::from(octets)
    }

    /// Return the destination address field.
    #[inline]
    pub fn dst_addr(&self) -> Ipv6Addr {
        let mut octets = [0; 16];
        octets.copy_from_slice(&self.0[field::DST_ADDR]);
        Ipv6Addr::from(octets)
    }

    /// The captured bytes following the fixed header, clipped to the payload length.
    pub fn payload_slice(&self) -> &[u8] {
        let end = (HEADER_LEN + usize::from(self.payload_len())).min(self.0.len());
        &self.0[HEADER_LEN..end]
    }
}

/// Information from an IPv6 fragment extension header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fragment {
    /// The fragment offset, in octets.
    pub offset: u16,
    pub more_frags: bool,
    pub ident: u32,
}

/// One extension header in the chain after the fixed IPv6 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extension {
    /// The protocol number identifying this header.
    pub protocol: Protocol,
    /// The protocol number of the header following this one.
    pub next_header: Protocol,
    /// The length of this header, in octets.
    pub len: usize,
    /// Set for fragment headers.
    pub fragment: Option<Fragment>,
}

/// The walked extension header chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub headers: Vec<Extension>,
    /// The total length of all walked extension headers.
    pub len: usize,
    /// The header that follows the last walked extension.
    ///
    /// This is the upper layer protocol unless `truncated` is set.
    pub next_header: Protocol,
    /// The captured data ended within an extension header.
    pub truncated: bool,
}

impl Chain {
    /// Walk the extension headers starting with the header identified by `first`.
    ///
    /// The walk stops at the first protocol that is not a skippable extension or when the data
    /// ends in the middle of a header, in which case `truncated` is set and `next_header` names
    /// the header that could not be walked.
    pub fn walk(first: Protocol, data: &[u8]) -> Chain {
        let mut chain = Chain {
            headers: Vec::new(),
            len: 0,
            next_header: first,
            truncated: false,
        };
        let mut cursor = Cursor::new(data);
        let mut current = first;

        while current.is_ipv6_extension() {
            match Self::extension(current, &mut cursor) {
                Ok(extension) => {
                    chain.len += extension.len;
                    current = extension.next_header;
                    chain.headers.push(extension);
                },
                Err(_) => {
                    chain.truncated = true;
                    break;
                },
            }
        }

        chain.next_header = current;
        chain
    }

    /// The fragment information, if any header in the chain carries some.
    pub fn fragment(&self) -> Option<Fragment> {
        self.headers.iter().find_map(|header| header.fragment)
    }

    fn extension(protocol: Protocol, cursor: &mut Cursor) -> Result<Extension> {
        let head = cursor.peek(2)?;
        let next_header = Protocol::from(head[0]);
        let len = match protocol {
            Protocol::Ipv6Frag => 8,
            // The authentication header counts in 4-octet units, minus two.
            Protocol::Ah => (usize::from(head[1]) + 2) * 4,
            _ => (usize::from(head[1]) + 1) * 8,
        };

        let mut header = cursor.split(len)?;
        let fragment = match protocol {
            Protocol::Ipv6Frag => {
                header.skip(2)?;
                let off_flags = header.read_u16()?;
                let ident = header.read_u32()?;
                Some(Fragment {
                    offset: off_flags & 0xfff8,
                    more_frags: off_flags & 0x1 != 0,
                    ident,
                })
            },
            _ => None,
        };

        Ok(Extension { protocol, next_header, len, fragment })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static HEADER_BYTES: [u8; 40] =
        [0x60, 0x00, 0x00, 0x01,
         0x00, 0x0c, 0x11, 0x40,
         0xfe, 0x80, 0x00, 0x00,
         0x00, 0x00, 0x00, 0x00,
         0x00, 0x00, 0x00, 0x00,
         0x00, 0x00, 0x00, 0x01,
         0xff, 0x02, 0x00, 0x00,
         0x00, 0x00, 0x00, 0x00,
         0x00, 0x00, 0x00, 0x00,
         0x00, 0x00, 0x00, 0x01];

    #[test]
    fn test_deconstruct() {
        let packet = ipv6::new_checked(&HEADER_BYTES[..]).unwrap();
        assert_eq!(packet.version(), 6);
        assert_eq!(packet.traffic_class(), 0);
        assert_eq!(packet.flow_label(), 1);
        assert_eq!(packet.payload_len(), 12);
        assert_eq!(packet.next_header(), Protocol::Udp);
        assert_eq!(packet.hop_limit(), 0x40);
        assert_eq!(packet.src_addr(), "fe80::1".parse::<Ipv6Addr>().unwrap());
        assert_eq!(packet.dst_addr(), "ff02::1".parse::<Ipv6Addr>().unwrap());
        assert!(packet.payload_slice().is_empty());
    }

    #[test]
    fn test_check_len() {
        assert_eq!(ipv6::new_checked(&HEADER_BYTES[..39]), Err(Error::Truncated));
        let mut bytes = HEADER_BYTES;
        bytes[0] = 0x40;
        assert_eq!(ipv6::new_checked(&bytes[..]), Err(Error::Unrecognized));
    }

    #[test]
    fn walk_hop_by_hop_and_fragment() {
        let data = [
            // Hop-by-hop, next is fragment, 8 octets.
            0x2c, 0x00, 0x01, 0x04, 0x00, 0x00, 0x00, 0x00,
            // Fragment, next is udp, offset 8 with more fragments.
            0x11, 0x00, 0x00, 0x09, 0x12, 0x34, 0x56, 0x78,
            // Udp header starts here.
            0x00, 0x35,
        ];
        let chain = Chain::walk(Protocol::HopByHop, &data);
        assert!(!chain.truncated);
        assert_eq!(chain.len, 16);
        assert_eq!(chain.next_header, Protocol::Udp);
        assert_eq!(chain.headers.len(), 2);
        assert_eq!(chain.fragment(), Some(Fragment {
            offset: 8,
            more_frags: true,
            ident: 0x1234_5678,
        }));
    }

    #[test]
    fn walk_stops_in_truncated_header() {
        // A destination options header claiming 16 octets with only 10 captured.
        let data = [0x06, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
        let chain = Chain::walk(Protocol::Ipv6Opts, &data);
        assert!(chain.truncated);
        assert_eq!(chain.len, 0);
        assert_eq!(chain.next_header, Protocol::Ipv6Opts);
    }

    #[test]
    fn no_extensions() {
        let chain = Chain::walk(Protocol::Tcp, &[]);
        assert!(chain.headers.is_empty());
        assert_eq!(chain.next_header, Protocol::Tcp);
    }
}
