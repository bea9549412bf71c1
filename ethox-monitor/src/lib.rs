//! A packet to event front end for passive network monitoring.
//!
//! ## Table of contents
//!
//! 1. [Design](#design)
//! 2. [The wire module](wire/index.html)
//! 3. [Sessions](session/index.html)
//!    1. [The session table](session/struct.SessionTable.html)
//!    1. [Events](session/enum.EventBody.html)
//! 4. [Analysis](analysis/index.html)
//!    1. [Dispatch](analysis/index.html#dispatch)
//!    1. [Analyzer trees](analysis/index.html#analyzer-trees)
//!    1. [ICMP](analysis/icmp/index.html)
//!    1. [UDP](analysis/udp/index.html)
//! 5. [The runtime](runtime/index.html)
//!
//! ## Design
//!
//! Captured packets go in, typed events come out. Each packet is resolved to the connection it
//! belongs to, creating one when a protocol decides the tuple is worth tracking, and is then handed
//! to the analyzers attached to that connection. Analyzers queue events on the connection. The
//! session table moves them, together with a snapshot of the connection record, to a single
//! outbound queue once the packet has been processed. Events therefore leave in exactly the order
//! in which they were produced.
//!
//! Nothing is ever fatal. Malformed or truncated input is reported as a `Weird` event, counted by
//! name, and analysis continues with the next packet.
//!
//! The monitor is single threaded and processes one packet to completion before the next. It never
//! reads the clock, all time comes from packet timestamps.
//!
//! ```
//! use ethox_monitor::{Config, Runtime};
//! use ethox_monitor::time::Instant;
//!
//! let mut runtime = Runtime::new(Config::default());
//! // An ICMPv4 echo request from 192.0.2.1 to 192.0.2.2.
//! let packet = [
//!     0x45, 0x00, 0x00, 0x1c, 0x00, 0x01, 0x00, 0x00,
//!     0x40, 0x01, 0xf6, 0xdc, 192, 0, 2, 1,
//!     192, 0, 2, 2,
//!     0x08, 0x00, 0xf7, 0xfe, 0x00, 0x01, 0x00, 0x00,
//! ];
//! runtime.process_ip(&packet, Instant::from_secs(1)).unwrap();
//! assert_eq!(runtime.table().len(), 1);
//! assert!(!runtime.take_events().is_empty());
//! ```
#[macro_use] mod macros;

pub mod analysis;
pub mod config;
pub mod error;
pub mod runtime;
pub mod session;
pub mod time;
pub mod wire;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use runtime::Runtime;
