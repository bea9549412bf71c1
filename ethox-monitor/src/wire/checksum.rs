//! The internet checksum of RFC 1071.
use std::net::IpAddr;

use byteorder::{ByteOrder, NetworkEndian};

fn propagate_carries(word: u32) -> u16 {
    let sum = (word >> 16) + (word & 0xffff);
    ((sum >> 16) as u16) + (sum as u16)
}

/// Compute an RFC 1071 compliant checksum (without the final complement).
pub fn data(mut data: &[u8]) -> u16 {
    let mut accum = 0;

    // For each 32-byte chunk...
    const CHUNK_SIZE: usize = 32;
    while data.len() >= CHUNK_SIZE {
        let mut d = &data[..CHUNK_SIZE];
        // ... take by 2 bytes and sum them.
        while d.len() >= 2 {
            accum += NetworkEndian::read_u16(d) as u32;
            d = &d[2..];
        }

        data = &data[CHUNK_SIZE..];
    }

    // Sum the rest that does not fit the last 32-byte chunk,
    // taking by 2 bytes.
    while data.len() >= 2 {
        accum += NetworkEndian::read_u16(data) as u32;
        data = &data[2..];
    }

    // Add the last remaining odd byte, if any.
    if let Some(&value) = data.first() {
        accum += (value as u32) << 8;
    }

    propagate_carries(accum)
}

/// Combine several RFC 1071 compliant checksums.
pub fn combine(checksums: &[u16]) -> u16 {
    let mut accum: u32 = 0;
    for &word in checksums {
        accum += word as u32;
    }
    propagate_carries(accum)
}

/// Compute an IP pseudo header checksum.
///
/// Returns `None` when the address families of source and destination differ, such a header does
/// not exist.
pub fn pseudo_header(src_addr: IpAddr, dst_addr: IpAddr, protocol: u8, length: u32)
    -> Option<u16>
{
    match (src_addr, dst_addr) {
        (IpAddr::V4(src_addr), IpAddr::V4(dst_addr)) => {
            let mut proto_len = [0u8; 4];
            proto_len[1] = protocol;
            NetworkEndian::write_u16(&mut proto_len[2..4], length as u16);

            Some(combine(&[
                data(&src_addr.octets()),
                data(&dst_addr.octets()),
                data(&proto_len[..])
            ]))
        },

        (IpAddr::V6(src_addr), IpAddr::V6(dst_addr)) => {
            let mut proto_len = [0u8; 8];
            proto_len[7] = protocol;
            NetworkEndian::write_u32(&mut proto_len[0..4], length);

            Some(combine(&[
                data(&src_addr.octets()),
                data(&dst_addr.octets()),
                data(&proto_len[..])
            ]))
        },

        _ => None,
    }
}

/// Check that data, including its checksum field, sums to all ones.
pub fn verify(bytes: &[u8], pseudo: Option<u16>) -> bool {
    let sum = data(bytes);
    let sum = match pseudo {
        Some(pseudo) => combine(&[pseudo, sum]),
        None => sum,
    };
    sum == !0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rfc1071_example() {
        // The worked example of RFC 1071, section 3.
        let bytes = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(data(&bytes), 0xddf2);
    }

    #[test]
    fn odd_length() {
        assert_eq!(data(&[0x12]), 0x1200);
        assert_eq!(data(&[0x12, 0x34, 0x56]), 0x1234 + 0x5600);
    }

    #[test]
    fn mixed_families_have_no_pseudo_header() {
        let v4: IpAddr = "192.0.2.1".parse().unwrap();
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert_eq!(pseudo_header(v4, v6, 58, 8), None);
        assert!(pseudo_header(v6, v6, 58, 8).is_some());
    }
}
