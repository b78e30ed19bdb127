//! # Core Protocol Components
//!
//! Packet layout, encode/decode, and stream framing.
//!
//! ## Components
//! - **Layout**: The fixed wire schema shared by both directions
//! - **Packet**: Logical packet, validation, `encode` / `decode`
//! - **Codec**: Tokio codec for framing packets over byte streams
//!
//! ## Wire Format
//! ```text
//! [Magic(4)] [Local(8)] [Remote(8)] [Block(8)] [Op(4)] [SSeq(2)] [RSeq(2)] [Flag(1)] [Block(0|1024)] [Magic(4)]
//! ```
//!
//! ## Integrity
//! - Both magic markers are verified on every decode
//! - Only two frame lengths exist: 41 and 1065 bytes
//! - Zero identifiers and sequence numbers are rejected

pub mod codec;
pub mod layout;
pub mod packet;
