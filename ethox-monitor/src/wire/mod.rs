/*! Bounds checked access to captured packet headers.

# Packet representations

The `wire` module only reads. A monitor never emits packets, it inspects what was captured, and
what was captured is frequently incomplete: the capture length cuts datagrams short, ICMP errors
carry only a prefix of the offending datagram and hostile senders put arbitrary values into
length fields. Two tools cover this:

 * The lowercase views such as [`ipv4_packet`], [`ipv6_packet`] and [`icmp_packet`] wrap a byte
   slice. Once their `check_len` succeeded no accessor will panic. They are meant for fixed
   layout headers.
 * A [`Cursor`] reads variable layout data one checked field at a time. Every read either
   succeeds or returns [`Error::Truncated`] without advancing.

Protocol numbers and message types are `enum_with_unknown!` enums so that every value on the wire
can be represented, known or not.

[`ipv4_packet`]: struct.ipv4_packet.html
[`ipv6_packet`]: struct.ipv6_packet.html
[`icmp_packet`]: struct.icmp_packet.html
[`Cursor`]: struct.Cursor.html
[`Error::Truncated`]: enum.Error.html#variant.Truncated
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in parts from `smoltcp` originally distributed under 0-clause BSD
#![allow(missing_docs)]

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
    pub(crate) type Rest  = ::core::ops::RangeFrom<usize>;
}

pub mod checksum;

mod cursor;
mod error;
mod icmp;
pub mod icmpv4;
pub mod icmpv6;
mod ip;
mod ipv4;
mod ipv6;
mod udp;

pub use self::cursor::Cursor;

pub use self::error::{
    Error,
    Result};

pub use self::icmp::{
    icmp as icmp_packet,
    HEADER_LEN as ICMP_HEADER_LEN};

pub use self::ip::{
    Protocol as IpProtocol,
    Version as IpVersion};

pub use self::ipv4::{
    ipv4 as ipv4_packet,
    HEADER_LEN as IPV4_HEADER_LEN};

pub use self::ipv6::{
    ipv6 as ipv6_packet,
    Chain as Ipv6Chain,
    Extension as Ipv6Extension,
    Fragment as Ipv6Fragment,
    HEADER_LEN as IPV6_HEADER_LEN};

pub use self::udp::{
    udp as udp_packet,
    HEADER_LEN as UDP_HEADER_LEN};

// Sibling modules name the protocol without the prefix.
use self::ip::Protocol;
