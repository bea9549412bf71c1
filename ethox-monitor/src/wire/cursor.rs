//! A bounded reader over captured bytes.
//!
//! Variable layout protocols (ICMP message bodies, neighbor discovery options, embedded context
//! headers) do not have a fixed set of fields that a single `check_len` could validate up front.
//! The cursor tracks the position and the remaining length and every read is checked against it.
//! A failed read does not advance.
use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};

/// A read position within a byte slice.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    /// The number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The number of bytes that can still be read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Check if all bytes were consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread bytes.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Take the next `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::Truncated);
        }

        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Take at most `len` bytes, fewer if the data ends before.
    pub fn take_up_to(&mut self, len: usize) -> &'a [u8] {
        let len = len.min(self.remaining());
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        bytes
    }

    /// Skip over `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Look at the next `len` bytes without consuming them.
    pub fn peek(&self, len: usize) -> Result<&'a [u8]> {
        let mut ahead = *self;
        ahead.take(len)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.take(2).map(NetworkEndian::read_u16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.take(4).map(NetworkEndian::read_u32)
    }

    pub fn read_ipv4(&mut self) -> Result<Ipv4Addr> {
        let bytes = self.take(4)?;
        Ok(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
    }

    pub fn read_ipv6(&mut self) -> Result<Ipv6Addr> {
        let mut octets = [0; 16];
        octets.copy_from_slice(self.take(16)?);
        Ok(Ipv6Addr::from(octets))
    }

    /// A new cursor over the next `len` bytes, which are consumed from this one.
    pub fn split(&mut self, len: usize) -> Result<Cursor<'a>> {
        self.take(len).map(Cursor::new)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_are_bounded() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9a];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_u32(), Ok(0x1234_5678));
        assert_eq!(cursor.read_u16(), Err(Error::Truncated));
        // A failed read does not consume.
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_u8(), Ok(0x9a));
        assert!(cursor.is_empty());
        assert_eq!(cursor.read_u8(), Err(Error::Truncated));
    }

    #[test]
    fn take_up_to_clips() {
        let data = [1, 2, 3];
        let mut cursor = Cursor::new(&data);
        cursor.skip(1).unwrap();
        assert_eq!(cursor.take_up_to(10), &[2, 3]);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn addresses() {
        let mut data = [0u8; 20];
        data[..4].copy_from_slice(&[192, 0, 2, 1]);
        data[4] = 0xfe;
        data[5] = 0x80;
        data[19] = 1;
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_ipv4(), Ok(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(cursor.read_ipv6(), Ok("fe80::1".parse().unwrap()));
    }
}
