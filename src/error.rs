//! # Error Types
//!
//! Error handling for the ScatterGather packet codec.
//!
//! Two layers are defined here:
//! - [`PacketError`]: one variant per way a packet can fail to encode or decode.
//!   Every variant maps onto exactly one [`PacketStatus`] code.
//! - [`ProtocolError`]: the crate-level error, wrapping packet failures together
//!   with I/O and configuration errors raised by the stream codec and config loader.
//!
//! ## Status Codes
//! Peers and callers that speak numeric status codes rather than `Result`
//! use [`PacketStatus`]:
//!
//! ```rust
//! use sg_protocol::core::packet::SgPacket;
//! use sg_protocol::error::PacketStatus;
//!
//! let packet = SgPacket::new(0, 7, 3, 1, 10, 20);
//! let status = PacketStatus::of(&packet.to_bytes());
//! assert_eq!(status, PacketStatus::BadLocalId);
//! assert_eq!(status.code(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Which of the two framing markers failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    Leading,
    Trailing,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Leading => f.write_str("leading"),
            Marker::Trailing => f.write_str("trailing"),
        }
    }
}

/// Enumerated packet status, one code per failure kind plus success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum PacketStatus {
    Ok = 0,
    BadLocalId = 1,
    BadRemoteId = 2,
    BadBlockId = 3,
    BadOperation = 4,
    BadSenderSeq = 5,
    BadReceiverSeq = 6,
    /// Leading or trailing magic marker did not match
    BadFraming = 7,
    /// Wire length is not one of the two legal frame lengths
    BadLength = 8,
    /// Payload-presence flag outside {0, 1}
    BadPayloadFlag = 9,
}

impl PacketStatus {
    /// Numeric wire/ABI code
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(PacketStatus::Ok),
            1 => Some(PacketStatus::BadLocalId),
            2 => Some(PacketStatus::BadRemoteId),
            3 => Some(PacketStatus::BadBlockId),
            4 => Some(PacketStatus::BadOperation),
            5 => Some(PacketStatus::BadSenderSeq),
            6 => Some(PacketStatus::BadReceiverSeq),
            7 => Some(PacketStatus::BadFraming),
            8 => Some(PacketStatus::BadLength),
            9 => Some(PacketStatus::BadPayloadFlag),
            _ => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == PacketStatus::Ok
    }

    /// Upper-case name used in logs and diagnostics
    pub fn name(self) -> &'static str {
        match self {
            PacketStatus::Ok => "OK",
            PacketStatus::BadLocalId => "BAD_LOCAL_ID",
            PacketStatus::BadRemoteId => "BAD_REMOTE_ID",
            PacketStatus::BadBlockId => "BAD_BLOCK_ID",
            PacketStatus::BadOperation => "BAD_OPERATION",
            PacketStatus::BadSenderSeq => "BAD_SENDER_SEQ",
            PacketStatus::BadReceiverSeq => "BAD_RECEIVER_SEQ",
            PacketStatus::BadFraming => "BAD_FRAMING",
            PacketStatus::BadLength => "BAD_LENGTH",
            PacketStatus::BadPayloadFlag => "BAD_PAYLOAD_FLAG",
        }
    }

    /// Collapse an encode/decode result into its status code
    pub fn of<T>(result: &std::result::Result<T, PacketError>) -> Self {
        match result {
            Ok(_) => PacketStatus::Ok,
            Err(e) => e.status(),
        }
    }
}

impl fmt::Display for PacketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure of a single encode or decode call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketError {
    #[error("bad local id [{0}]")]
    BadLocalId(u64),

    #[error("bad remote id [{0}]")]
    BadRemoteId(u64),

    #[error("bad block id [{0}]")]
    BadBlockId(u64),

    #[error("bad op code ({0})")]
    BadOperation(i32),

    #[error("bad sender sequence number [{0}]")]
    BadSenderSeq(u16),

    #[error("bad receiver sequence number [{0}]")]
    BadReceiverSeq(u16),

    #[error("corrupt {marker} magic marker [{found:#010x}]")]
    BadFraming { marker: Marker, found: u32 },

    #[error("bad wire length [{0}] (expected 41 or 1065 bytes)")]
    BadLength(usize),

    #[error("bad payload flag [{0}]")]
    BadPayloadFlag(u8),

    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

impl PacketError {
    /// Status code reported for this failure
    pub fn status(&self) -> PacketStatus {
        match self {
            PacketError::BadLocalId(_) => PacketStatus::BadLocalId,
            PacketError::BadRemoteId(_) => PacketStatus::BadRemoteId,
            PacketError::BadBlockId(_) => PacketStatus::BadBlockId,
            PacketError::BadOperation(_) => PacketStatus::BadOperation,
            PacketError::BadSenderSeq(_) => PacketStatus::BadSenderSeq,
            PacketError::BadReceiverSeq(_) => PacketStatus::BadReceiverSeq,
            PacketError::BadFraming { .. } => PacketStatus::BadFraming,
            PacketError::BadLength(_) | PacketError::BufferTooSmall { .. } => {
                PacketStatus::BadLength
            }
            PacketError::BadPayloadFlag(_) => PacketStatus::BadPayloadFlag,
        }
    }

    /// Name of the wire field the failure refers to
    pub fn field(&self) -> &'static str {
        match self {
            PacketError::BadLocalId(_) => "local_id",
            PacketError::BadRemoteId(_) => "remote_id",
            PacketError::BadBlockId(_) => "block_id",
            PacketError::BadOperation(_) => "operation",
            PacketError::BadSenderSeq(_) => "sender_seq",
            PacketError::BadReceiverSeq(_) => "receiver_seq",
            PacketError::BadFraming {
                marker: Marker::Leading,
                ..
            } => "leading_magic",
            PacketError::BadFraming {
                marker: Marker::Trailing,
                ..
            } => "trailing_magic",
            PacketError::BadLength(_) | PacketError::BufferTooSmall { .. } => "length",
            PacketError::BadPayloadFlag(_) => "payload_flag",
        }
    }
}

// ProtocolError is the primary error type for stream and configuration operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Packet status if this error came from the codec
    pub fn status(&self) -> Option<PacketStatus> {
        match self {
            ProtocolError::Packet(e) => Some(e.status()),
            _ => None,
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Type alias for encode/decode results
pub type PacketResult<T> = std::result::Result<T, PacketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_roundtrip() {
        for code in 0..=9 {
            let status = PacketStatus::from_code(code).expect("known code");
            assert_eq!(status.code(), code);
        }
        assert_eq!(PacketStatus::from_code(10), None);
        assert_eq!(PacketStatus::from_code(-1), None);
    }

    #[test]
    fn test_every_error_has_distinct_field_status() {
        let errors = [
            PacketError::BadLocalId(0),
            PacketError::BadRemoteId(0),
            PacketError::BadBlockId(0),
            PacketError::BadOperation(10),
            PacketError::BadSenderSeq(0),
            PacketError::BadReceiverSeq(0),
        ];
        let mut statuses: Vec<_> = errors.iter().map(PacketError::status).collect();
        statuses.dedup();
        assert_eq!(statuses.len(), errors.len());
        assert!(statuses.iter().all(|s| !s.is_ok()));
    }

    #[test]
    fn test_display_names_value() {
        let err = PacketError::BadOperation(-1);
        assert_eq!(err.to_string(), "bad op code (-1)");

        let err = PacketError::BadFraming {
            marker: Marker::Trailing,
            found: 0xFEFF,
        };
        assert_eq!(err.to_string(), "corrupt trailing magic marker [0x0000feff]");
        assert_eq!(err.field(), "trailing_magic");
    }

    #[test]
    fn test_buffer_too_small_reports_bad_length() {
        let err = PacketError::BufferTooSmall {
            needed: 41,
            available: 8,
        };
        assert_eq!(err.status(), PacketStatus::BadLength);
    }

    #[test]
    fn test_protocol_error_status() {
        let err = ProtocolError::from(PacketError::BadPayloadFlag(2));
        assert_eq!(err.status(), Some(PacketStatus::BadPayloadFlag));

        let err = ProtocolError::ConfigError("nope".into());
        assert_eq!(err.status(), None);
    }
}
