use std::net::Ipv6Addr;

use crate::session::ConnState;
use crate::time::Duration;
use crate::wire::Cursor;

use super::IcmpContext;

/// A neighbor discovery option, RFC 4861 § 4.6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdOption {
    pub otype: u8,
    /// The length of the option, including type and length, in units of eight octets.
    pub len: u8,
    pub data: NdOptionData,
}

/// The parsed body of a neighbor discovery option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdOptionData {
    /// Source or target link layer address, types 1 and 2.
    LinkAddress(Vec<u8>),
    /// Prefix information, type 3.
    Prefix(PrefixInfo),
    /// The start of a redirected packet, type 4.
    RedirectedHeader(IcmpContext),
    /// Link MTU, type 5.
    Mtu(u32),
    /// Any other option, or a known one that was not captured in full.
    Payload(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixInfo {
    pub prefix_len: u8,
    /// The prefix can be used for on-link determination.
    pub on_link: bool,
    /// The prefix can be used for stateless address configuration.
    pub autonomous: bool,
    pub valid_lifetime: Duration,
    pub preferred_lifetime: Duration,
    pub prefix: Ipv6Addr,
}

/// The captured length of a prefix information option body.
const PREFIX_INFO_LEN: usize = 30;

/// Parse all options in the rest of a neighbor discovery message.
///
/// Stops with a weird at an option header that is cut short and at an option of length zero,
/// which would otherwise never advance.
pub(crate) fn parse_options(mut cursor: Cursor, conn: &mut ConnState, encapsulation: u32)
    -> Vec<NdOption>
{
    let mut options = Vec::new();

    while !cursor.is_empty() {
        let (otype, len) = match (cursor.read_u8(), cursor.read_u8()) {
            (Ok(otype), Ok(len)) => (otype, len),
            _ => {
                conn.weird("truncated_ICMPv6_ND_options", None);
                break;
            },
        };

        if len == 0 {
            conn.weird("zero_length_ICMPv6_ND_option", None);
            break;
        }

        // The length covers the type and length octets.
        let body_len = usize::from(len) * 8 - 2;
        let body = cursor.take_up_to(body_len);
        let complete = body.len() == body_len;

        let data = match otype {
            1 | 2 if complete => NdOptionData::LinkAddress(body.to_vec()),
            3 if body.len() >= PREFIX_INFO_LEN => prefix_info(body),
            4 if complete => {
                // Six reserved octets precede the quoted packet.
                let quoted = body.get(6..).unwrap_or(&[]);
                NdOptionData::RedirectedHeader(IcmpContext::extract_v6(quoted, encapsulation))
            },
            5 => mtu(body),
            _ => NdOptionData::Payload(body.to_vec()),
        };

        options.push(NdOption { otype, len, data });
    }

    options
}

fn mtu(body: &[u8]) -> NdOptionData {
    let mut cursor = Cursor::new(body);
    // Two reserved octets precede the MTU.
    match cursor.skip(2).and_then(|()| cursor.read_u32()) {
        Ok(mtu) => NdOptionData::Mtu(mtu),
        Err(_) => NdOptionData::Payload(body.to_vec()),
    }
}

fn prefix_info(body: &[u8]) -> NdOptionData {
    let mut cursor = Cursor::new(body);
    let read = |cursor: &mut Cursor| -> crate::wire::Result<PrefixInfo> {
        let prefix_len = cursor.read_u8()?;
        let flags = cursor.read_u8()?;
        let valid = cursor.read_u32()?;
        let preferred = cursor.read_u32()?;
        cursor.skip(4)?;
        let prefix = cursor.read_ipv6()?;
        Ok(PrefixInfo {
            prefix_len,
            on_link: flags & 0x80 != 0,
            autonomous: flags & 0x40 != 0,
            valid_lifetime: Duration::from_secs(valid.into()),
            preferred_lifetime: Duration::from_secs(preferred.into()),
            prefix,
        })
    };

    match read(&mut cursor) {
        Ok(info) => NdOptionData::Prefix(info),
        Err(_) => NdOptionData::Payload(body.to_vec()),
    }
}
