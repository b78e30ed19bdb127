//! Stream framing for ScatterGather packets.
//!
//! Frames carry no length prefix: the payload flag at offset 36 decides
//! whether the wire length is 37 or 1061. Each frame travels with its trailing
//! marker, so it occupies 41 or 1065 bytes of the stream. The decoder waits
//! for the flag, then for the whole frame, and hands exactly one frame to
//! [`decode_with`](crate::core::packet::decode_with).

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::config::{CodecConfig, OpcodeLimits};
use crate::core::layout::MAGIC_WIDTH;
use crate::core::packet::{self, SgPacket};
use crate::error::{PacketError, ProtocolError};
use crate::utils::metrics::global_metrics;

/// Tokio codec for framing [`SgPacket`] values over a byte stream
#[derive(Debug, Clone)]
pub struct PacketCodec {
    limits: OpcodeLimits,
    record_metrics: bool,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::from_config(&CodecConfig::default())
    }
}

impl PacketCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            limits: config.opcode_limits(),
            record_metrics: config.record_metrics,
        }
    }

    /// Codec using explicit opcode bounds
    pub fn with_limits(limits: OpcodeLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &OpcodeLimits {
        &self.limits
    }

    fn failed(&self, err: PacketError) -> ProtocolError {
        if self.record_metrics {
            global_metrics().packet_failed(&err);
        }
        ProtocolError::Packet(err)
    }
}

impl Decoder for PacketCodec {
    type Item = SgPacket;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let span = match packet::frame_span_hint(&src[..]) {
            Ok(Some(span)) => span,
            Ok(None) => return Ok(None),
            Err(e) => return Err(self.failed(e)),
        };

        if src.len() < span {
            src.reserve(span - src.len());
            return Ok(None);
        }

        let frame = src.split_to(span);
        let wire_len = span - MAGIC_WIDTH;
        let decoded =
            packet::decode_with(&frame, wire_len, &self.limits).map_err(|e| self.failed(e))?;

        if self.record_metrics {
            global_metrics().packet_decoded(span as u64, decoded.has_payload());
        }
        Ok(Some(decoded))
    }
}

impl Encoder<SgPacket> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: SgPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&SgPacket>>::encode(self, &item, dst)
    }
}

impl Encoder<&SgPacket> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: &SgPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();
        let span = item.frame_span();
        dst.resize(start + span, 0);

        match packet::encode_with(item, &mut dst[start..], &self.limits) {
            Ok(_) => {
                if self.record_metrics {
                    global_metrics().packet_encoded(span as u64, item.has_payload());
                }
                Ok(())
            }
            Err(e) => {
                // Rejected packets leave dst as it was
                dst.truncate(start);
                Err(self.failed(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BLOCK_SIZE;
    use crate::error::PacketStatus;

    fn sample(op: i32) -> SgPacket {
        SgPacket::new(5, 7, 3, op, 10, 20)
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut codec = PacketCodec::new();
        let packet = sample(2).with_payload(Box::new([7u8; BLOCK_SIZE]));

        let mut buf = BytesMut::new();
        codec.encode(&packet, &mut buf).unwrap();
        assert_eq!(buf.len(), 1065);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, packet);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(sample(1), &mut buf).unwrap();

        let mut partial = buf.split_to(20);
        assert!(codec.decode(&mut partial).unwrap().is_none());
        assert_eq!(partial.len(), 20);
    }

    #[test]
    fn test_rejected_packet_leaves_dst_unchanged() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&b"xyz"[..]);

        let err = codec.encode(sample(10), &mut buf).unwrap_err();
        assert_eq!(err.status(), Some(PacketStatus::BadOperation));
        assert_eq!(&buf[..], b"xyz");
    }

    #[test]
    fn test_garbage_prefix_fails_fast() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&[0xDE, 0xAD, 0xBE, 0xEF][..]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.status(), Some(PacketStatus::BadFraming));
    }

    #[test]
    fn test_with_limits_overrides_bounds() {
        let limits = OpcodeLimits {
            encode_max: 3,
            decode_max: 3,
        };
        let mut codec = PacketCodec::with_limits(limits);
        assert_eq!(codec.limits(), &limits);

        let mut buf = BytesMut::new();
        let err = codec.encode(sample(4), &mut buf).unwrap_err();
        assert_eq!(err.status(), Some(PacketStatus::BadOperation));
        assert!(buf.is_empty());

        codec.encode(sample(3), &mut buf).unwrap();
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().operation, 3);
    }

    #[test]
    fn test_limits_from_config() {
        let config = CodecConfig {
            decode_max_opcode: 9,
            ..CodecConfig::default()
        };
        let mut codec = PacketCodec::from_config(&config);
        let mut buf = BytesMut::new();
        codec.encode(sample(9), &mut buf).unwrap();
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().operation, 9);
    }
}
