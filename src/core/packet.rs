//! # Packet
//!
//! The logical ScatterGather packet and the two operations that move it on and
//! off the wire.
//!
//! [`encode`] validates a packet, writes its frame into a caller-supplied
//! buffer and reports the wire length (37 or 1061). [`decode`] takes the
//! buffer and that wire length, verifies framing, length and payload flag,
//! reads every field back and validates them again.
//!
//! The trailing magic marker starts at the reported wire length, so a buffer
//! carrying a frame is always four bytes longer than the length reported for
//! it. Both go through the schema in
//! [`crate::core::layout`], so the two directions cannot disagree on offsets.
//!
//! ## Validation Order
//! Fields are checked local id, remote id, block id, operation, sender
//! sequence, receiver sequence. The first failure wins and is logged once at
//! `ERROR` with the field name and offending value.
//!
//! ## Example
//! ```rust
//! use sg_protocol::core::packet::{decode, SgPacket};
//!
//! let packet = SgPacket::new(5, 7, 3, 1, 10, 20);
//! let bytes = packet.to_bytes().unwrap();
//! assert_eq!(packet.wire_len(), 37);
//! assert_eq!(decode(&bytes, 37).unwrap(), packet);
//! ```

use crate::config::{OpcodeLimits, BLOCK_SIZE, MAGIC_BYTES};
use crate::core::layout::{
    self, BLOCK_ID, FLAG_NO_PAYLOAD, FLAG_PAYLOAD, HEADER_LEN, LEADING_MAGIC, LOCAL_ID, OPERATION,
    PAYLOAD, PAYLOAD_FLAG, RECEIVER_SEQ, REMOTE_ID, SENDER_SEQ,
};
use crate::error::{Marker, PacketError, PacketResult};
use tracing::error;

pub type NodeId = u64;
pub type BlockId = u64;
pub type OpCode = i32;
pub type SeqNum = u16;

/// Fixed-size data block carried by a packet
pub type Block = [u8; BLOCK_SIZE];

/// Which way a packet is travelling; selects the opcode bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Decode,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Encode => "encode",
            Direction::Decode => "decode",
        }
    }
}

/// A decoded ScatterGather packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgPacket {
    pub local_id: NodeId,
    pub remote_id: NodeId,
    pub block_id: BlockId,
    pub operation: OpCode,
    pub sender_seq: SeqNum,
    pub receiver_seq: SeqNum,
    pub payload: Option<Box<Block>>,
}

impl SgPacket {
    /// Build a packet without a data block
    pub fn new(
        local_id: NodeId,
        remote_id: NodeId,
        block_id: BlockId,
        operation: OpCode,
        sender_seq: SeqNum,
        receiver_seq: SeqNum,
    ) -> Self {
        Self {
            local_id,
            remote_id,
            block_id,
            operation,
            sender_seq,
            receiver_seq,
            payload: None,
        }
    }

    /// Attach a data block
    pub fn with_payload(mut self, block: Box<Block>) -> Self {
        self.payload = Some(block);
        self
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Wire length encode reports for this packet
    pub fn wire_len(&self) -> usize {
        layout::wire_len(self.has_payload())
    }

    /// Buffer space the encoded frame occupies, trailing marker included
    pub fn frame_span(&self) -> usize {
        layout::frame_span(self.has_payload())
    }

    /// Run the six-field check with the protocol's default opcode bounds
    pub fn validate(&self, direction: Direction) -> PacketResult<()> {
        self.validate_with(direction, &OpcodeLimits::default())
    }

    /// Run the six-field check, stopping at (and logging) the first failure
    pub fn validate_with(&self, direction: Direction, limits: &OpcodeLimits) -> PacketResult<()> {
        let failure = if self.local_id == 0 {
            Some(PacketError::BadLocalId(self.local_id))
        } else if self.remote_id == 0 {
            Some(PacketError::BadRemoteId(self.remote_id))
        } else if self.block_id == 0 {
            Some(PacketError::BadBlockId(self.block_id))
        } else if !limits.accepts(direction, self.operation) {
            Some(PacketError::BadOperation(self.operation))
        } else if self.sender_seq == 0 {
            Some(PacketError::BadSenderSeq(self.sender_seq))
        } else if self.receiver_seq == 0 {
            Some(PacketError::BadReceiverSeq(self.receiver_seq))
        } else {
            None
        };

        match failure {
            Some(err) => Err(reject(direction, err)),
            None => Ok(()),
        }
    }

    /// Encode into `buf`, returning the wire length
    pub fn encode_into(&self, buf: &mut [u8]) -> PacketResult<usize> {
        encode_with(self, buf, &OpcodeLimits::default())
    }

    /// Encode into a freshly allocated frame, trailing marker included
    pub fn to_bytes(&self) -> PacketResult<Vec<u8>> {
        let mut out = vec![0u8; self.frame_span()];
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Decode a frame produced by [`SgPacket::to_bytes`]: everything before
    /// the last four bytes is the wire length.
    pub fn from_bytes(frame: &[u8]) -> PacketResult<Self> {
        let wire_len = frame.len().saturating_sub(layout::MAGIC_WIDTH);
        decode(frame, wire_len)
    }
}

/// Validate `packet` and write its frame into the front of `buf`.
///
/// Returns the wire length: 37 bytes without payload, 1061 with. The trailing
/// marker is written at that offset, so `buf` must hold four bytes more
/// (41 or 1065). Nothing is written when validation fails or `buf` is too
/// small.
pub fn encode(packet: &SgPacket, buf: &mut [u8]) -> PacketResult<usize> {
    encode_with(packet, buf, &OpcodeLimits::default())
}

/// [`encode`] with explicit opcode bounds
pub fn encode_with(
    packet: &SgPacket,
    buf: &mut [u8],
    limits: &OpcodeLimits,
) -> PacketResult<usize> {
    packet.validate_with(Direction::Encode, limits)?;

    let span = packet.frame_span();
    if buf.len() < span {
        return Err(reject(
            Direction::Encode,
            PacketError::BufferTooSmall {
                needed: span,
                available: buf.len(),
            },
        ));
    }

    LEADING_MAGIC.write(buf, &MAGIC_BYTES);
    LOCAL_ID.write(buf, &packet.local_id.to_le_bytes());
    REMOTE_ID.write(buf, &packet.remote_id.to_le_bytes());
    BLOCK_ID.write(buf, &packet.block_id.to_le_bytes());
    OPERATION.write(buf, &packet.operation.to_le_bytes());
    SENDER_SEQ.write(buf, &packet.sender_seq.to_le_bytes());
    RECEIVER_SEQ.write(buf, &packet.receiver_seq.to_le_bytes());

    match &packet.payload {
        Some(block) => {
            PAYLOAD_FLAG.write(buf, &[FLAG_PAYLOAD]);
            PAYLOAD.write(buf, &block[..]);
        }
        None => PAYLOAD_FLAG.write(buf, &[FLAG_NO_PAYLOAD]),
    }
    layout::trailing_magic(packet.has_payload()).write(buf, &MAGIC_BYTES);

    Ok(packet.wire_len())
}

/// Decode the frame at the front of `buf` whose reported wire length is
/// `wire_len`.
///
/// Only 37 and 1061 are legal, and `buf` must extend past `wire_len` far
/// enough to hold the trailing marker. Bytes beyond the marker are ignored.
pub fn decode(buf: &[u8], wire_len: usize) -> PacketResult<SgPacket> {
    decode_with(buf, wire_len, &OpcodeLimits::default())
}

/// [`decode`] with explicit opcode bounds
pub fn decode_with(
    buf: &[u8],
    wire_len: usize,
    limits: &OpcodeLimits,
) -> PacketResult<SgPacket> {
    if !layout::is_legal_len(wire_len) {
        return Err(reject(Direction::Decode, PacketError::BadLength(wire_len)));
    }

    let span = wire_len + layout::MAGIC_WIDTH;
    if buf.len() < span {
        return Err(reject(
            Direction::Decode,
            PacketError::BufferTooSmall {
                needed: span,
                available: buf.len(),
            },
        ));
    }

    let has_payload = check_prefix(buf)?;
    if wire_len != layout::wire_len(has_payload) {
        return Err(reject(Direction::Decode, PacketError::BadLength(wire_len)));
    }
    check_marker(buf, layout::trailing_magic(has_payload), Marker::Trailing)?;

    let payload = if has_payload {
        Some(Box::new(PAYLOAD.read::<BLOCK_SIZE>(buf)))
    } else {
        None
    };

    let packet = SgPacket {
        local_id: u64::from_le_bytes(LOCAL_ID.read(buf)),
        remote_id: u64::from_le_bytes(REMOTE_ID.read(buf)),
        block_id: u64::from_le_bytes(BLOCK_ID.read(buf)),
        operation: i32::from_le_bytes(OPERATION.read(buf)),
        sender_seq: u16::from_le_bytes(SENDER_SEQ.read(buf)),
        receiver_seq: u16::from_le_bytes(RECEIVER_SEQ.read(buf)),
        payload,
    };

    packet.validate_with(Direction::Decode, limits)?;
    Ok(packet)
}

/// Bytes the frame starting at `buf[0]` occupies on a stream, trailing marker
/// included, once enough of it is visible.
///
/// Returns `Ok(None)` until the payload flag has arrived. A bad leading marker
/// is reported as soon as its four bytes are present.
pub fn frame_span_hint(buf: &[u8]) -> PacketResult<Option<usize>> {
    if buf.len() < LEADING_MAGIC.width {
        return Ok(None);
    }
    check_marker(buf, LEADING_MAGIC, Marker::Leading)?;

    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let has_payload = payload_flag(buf)?;
    Ok(Some(layout::frame_span(has_payload)))
}

// Leading marker and flag; `buf` must cover the whole header
fn check_prefix(buf: &[u8]) -> PacketResult<bool> {
    check_marker(buf, LEADING_MAGIC, Marker::Leading)?;
    payload_flag(buf)
}

fn payload_flag(buf: &[u8]) -> PacketResult<bool> {
    match PAYLOAD_FLAG.read::<1>(buf)[0] {
        FLAG_NO_PAYLOAD => Ok(false),
        FLAG_PAYLOAD => Ok(true),
        other => Err(reject(Direction::Decode, PacketError::BadPayloadFlag(other))),
    }
}

fn check_marker(buf: &[u8], field: layout::Field, marker: Marker) -> PacketResult<()> {
    let found: [u8; 4] = field.read(buf);
    if found == MAGIC_BYTES {
        Ok(())
    } else {
        Err(reject(
            Direction::Decode,
            PacketError::BadFraming {
                marker,
                found: u32::from_le_bytes(found),
            },
        ))
    }
}

// Single diagnostic per failed call
fn reject(direction: Direction, err: PacketError) -> PacketError {
    error!(
        direction = direction.label(),
        field = err.field(),
        status = %err.status(),
        "{}: {}",
        direction.label(),
        err
    );
    err
}
