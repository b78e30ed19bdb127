//! # sg-protocol
//!
//! Wire codec for the ScatterGather block-storage protocol.
//!
//! A ScatterGather packet carries one storage operation between two nodes and
//! optionally one 1024-byte data block. This crate fixes the byte-for-byte
//! contract between sender and receiver:
//!
//! - [`core::layout`]: the explicit wire schema
//! - [`core::packet`]: `encode` / `decode` with strict field validation and
//!   framing checks
//! - [`core::codec`]: a `tokio-util` codec for byte streams
//!
//! Transport, storage and session logic are left to callers.
//!
//! ```rust
//! use sg_protocol::{decode, encode, PacketStatus, SgPacket};
//!
//! let packet = SgPacket::new(5, 7, 3, 1, 10, 20).with_payload(Box::new([0xAB; 1024]));
//! let mut buf = [0u8; sg_protocol::core::layout::MAX_FRAME_SPAN];
//! let len = encode(&packet, &mut buf).unwrap();
//! assert_eq!(len, 1061);
//!
//! let decoded = decode(&buf, len);
//! assert_eq!(PacketStatus::of(&decoded), PacketStatus::Ok);
//! assert_eq!(decoded.unwrap(), packet);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use crate::core::codec::PacketCodec;
pub use crate::core::packet::{decode, encode, Direction, SgPacket};
pub use crate::error::{PacketError, PacketStatus, ProtocolError, Result};
