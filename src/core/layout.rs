//! # Wire Layout
//!
//! The single schema both directions of the codec read and write through.
//!
//! Every field is declared once, chained from its predecessor so offsets cannot
//! drift apart, and checked at compile time against the published table:
//!
//! ```text
//! offset  size  field
//!      0     4  leading magic (0xFEFE, little-endian)
//!      4     8  local node id
//!     12     8  remote node id
//!     20     8  block id
//!     28     4  operation code
//!     32     2  sender sequence number
//!     34     2  receiver sequence number
//!     36     1  payload-presence flag
//!     37  1024  payload (flag = 1 only)
//!  37|1061   4  trailing magic
//! ```
//!
//! All integers are fixed-width little-endian. The reported wire length is the
//! offset of the trailing marker (37 or 1061); a buffer holding a frame must
//! extend four bytes further to carry the marker itself.

use crate::config::BLOCK_SIZE;

/// A named region of the wire frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl Field {
    const fn first(name: &'static str, width: usize) -> Self {
        Self {
            name,
            offset: 0,
            width,
        }
    }

    const fn after(prev: Field, name: &'static str, width: usize) -> Self {
        Self {
            name,
            offset: prev.offset + prev.width,
            width,
        }
    }

    /// One past the last byte of this field
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    /// Copy this field out of `buf`. Caller guarantees `buf` spans the field.
    #[inline]
    pub fn read<const N: usize>(&self, buf: &[u8]) -> [u8; N] {
        debug_assert_eq!(N, self.width, "width mismatch reading {}", self.name);
        let mut out = [0u8; N];
        out.copy_from_slice(&buf[self.offset..self.offset + N]);
        out
    }

    /// Copy `bytes` into this field of `buf`. Caller guarantees `buf` spans the field.
    #[inline]
    pub fn write(&self, buf: &mut [u8], bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), self.width, "width mismatch writing {}", self.name);
        buf[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
    }
}

pub const LEADING_MAGIC: Field = Field::first("leading_magic", 4);
pub const LOCAL_ID: Field = Field::after(LEADING_MAGIC, "local_id", 8);
pub const REMOTE_ID: Field = Field::after(LOCAL_ID, "remote_id", 8);
pub const BLOCK_ID: Field = Field::after(REMOTE_ID, "block_id", 8);
pub const OPERATION: Field = Field::after(BLOCK_ID, "operation", 4);
pub const SENDER_SEQ: Field = Field::after(OPERATION, "sender_seq", 2);
pub const RECEIVER_SEQ: Field = Field::after(SENDER_SEQ, "receiver_seq", 2);
pub const PAYLOAD_FLAG: Field = Field::after(RECEIVER_SEQ, "payload_flag", 1);
pub const PAYLOAD: Field = Field::after(PAYLOAD_FLAG, "payload", BLOCK_SIZE);

/// Width of each magic marker
pub const MAGIC_WIDTH: usize = LEADING_MAGIC.width;

/// Fixed header, leading magic through the payload flag
pub const HEADER: [Field; 8] = [
    LEADING_MAGIC,
    LOCAL_ID,
    REMOTE_ID,
    BLOCK_ID,
    OPERATION,
    SENDER_SEQ,
    RECEIVER_SEQ,
    PAYLOAD_FLAG,
];

/// Bytes before the optional payload
pub const HEADER_LEN: usize = PAYLOAD_FLAG.end();

/// Payload flag values
pub const FLAG_NO_PAYLOAD: u8 = 0;
pub const FLAG_PAYLOAD: u8 = 1;

/// Wire length without payload
pub const BASE_PACKET_SIZE: usize = wire_len(false);

/// Wire length with payload
pub const DATA_PACKET_SIZE: usize = wire_len(true);

/// Largest wire length the codec reports
pub const MAX_PACKET_SIZE: usize = DATA_PACKET_SIZE;

/// Buffer space a payload frame needs, trailing marker included
pub const MAX_FRAME_SPAN: usize = frame_span(true);

const _: () = {
    assert!(LOCAL_ID.offset == 4);
    assert!(REMOTE_ID.offset == 12);
    assert!(BLOCK_ID.offset == 20);
    assert!(OPERATION.offset == 28);
    assert!(SENDER_SEQ.offset == 32);
    assert!(RECEIVER_SEQ.offset == 34);
    assert!(PAYLOAD_FLAG.offset == 36);
    assert!(PAYLOAD.offset == 37);
    assert!(BASE_PACKET_SIZE == 37);
    assert!(DATA_PACKET_SIZE == 1061);
    assert!(MAX_FRAME_SPAN == 1065);
};

/// Reported wire length of a frame.
///
/// The trailing magic marker starts here and is written past it, so the
/// reported length never counts the marker's four bytes.
pub const fn wire_len(has_payload: bool) -> usize {
    if has_payload {
        PAYLOAD.end()
    } else {
        HEADER_LEN
    }
}

/// Trailing magic marker placed after the header or the payload
pub const fn trailing_magic(has_payload: bool) -> Field {
    Field {
        name: "trailing_magic",
        offset: wire_len(has_payload),
        width: MAGIC_WIDTH,
    }
}

/// Bytes a frame occupies in a buffer or on a stream, trailing marker included
pub const fn frame_span(has_payload: bool) -> usize {
    wire_len(has_payload) + MAGIC_WIDTH
}

/// Whether `len` is one of the two legal wire lengths
pub const fn is_legal_len(len: usize) -> bool {
    len == BASE_PACKET_SIZE || len == DATA_PACKET_SIZE
}
