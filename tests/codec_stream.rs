//! Integration tests for the stream codec
//!
//! These tests feed frames through `PacketCodec` the way a transport would:
//! split across reads, packed back to back, and wrapped in `FramedRead`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use futures::StreamExt;
use sg_protocol::config::BLOCK_SIZE;
use sg_protocol::core::codec::PacketCodec;
use sg_protocol::core::packet::SgPacket;
use sg_protocol::PacketStatus;
use tokio_util::codec::{Decoder, Encoder, FramedRead};

fn packet(seq: u16, with_payload: bool) -> SgPacket {
    let packet = SgPacket::new(5, 7, 3, 4, seq, seq.wrapping_add(1).max(1));
    if with_payload {
        packet.with_payload(Box::new([seq as u8; BLOCK_SIZE]))
    } else {
        packet
    }
}

#[test]
fn test_codec_incremental_buffer_fill() {
    let mut codec = PacketCodec::new();
    let expected = packet(1, true);
    let full_bytes = expected.to_bytes().unwrap();

    let mut buffer = BytesMut::new();

    // Add data byte by byte (simulating slow network)
    for (i, byte) in full_bytes.iter().enumerate() {
        buffer.extend_from_slice(&[*byte]);

        let result = codec.decode(&mut buffer).expect("Should not error");

        if i < full_bytes.len() - 1 {
            assert!(result.is_none());
            assert!(!buffer.is_empty());
        } else {
            assert_eq!(result, Some(expected.clone()));
            assert_eq!(buffer.len(), 0);
        }
    }
}

#[test]
fn test_codec_mixed_frames_in_buffer() {
    let mut codec = PacketCodec::new();
    let packets: Vec<_> = (1..=6).map(|seq| packet(seq, seq % 2 == 0)).collect();

    let mut buffer = BytesMut::new();
    for p in &packets {
        codec.encode(p, &mut buffer).expect("Failed to encode");
    }
    assert_eq!(buffer.len(), 3 * 41 + 3 * 1065);

    let mut decoded = Vec::new();
    while let Some(p) = codec.decode(&mut buffer).expect("Failed to decode") {
        decoded.push(p);
    }

    assert_eq!(decoded, packets);
    assert!(buffer.is_empty());
}

#[test]
fn test_codec_partial_second_frame_preserved() {
    let mut codec = PacketCodec::new();
    let mut buffer = BytesMut::new();
    codec.encode(packet(1, false), &mut buffer).unwrap();
    codec.encode(packet(2, true), &mut buffer).unwrap();
    buffer.truncate(41 + 500);

    assert!(codec.decode(&mut buffer).unwrap().is_some());
    assert!(codec.decode(&mut buffer).unwrap().is_none());
    assert_eq!(buffer.len(), 500);
}

#[test]
fn test_codec_bad_flag_reported_before_frame_complete() {
    let mut codec = PacketCodec::new();
    let mut buffer = BytesMut::new();
    codec.encode(packet(1, false), &mut buffer).unwrap();
    buffer[36] = 4;
    buffer.truncate(37);

    let err = codec.decode(&mut buffer).unwrap_err();
    assert_eq!(err.status(), Some(PacketStatus::BadPayloadFlag));
}

#[test]
fn test_codec_corrupt_trailer_is_error() {
    let mut codec = PacketCodec::new();
    let mut buffer = BytesMut::new();
    codec.encode(packet(3, true), &mut buffer).unwrap();
    let last = buffer.len() - 1;
    buffer[last] = 0x7F;

    let err = codec.decode(&mut buffer).unwrap_err();
    assert_eq!(err.status(), Some(PacketStatus::BadFraming));
}

#[tokio::test]
async fn test_framed_read_over_async_reader() {
    let mut codec = PacketCodec::new();
    let packets: Vec<_> = (1..=20).map(|seq| packet(seq, seq % 3 == 0)).collect();

    let mut wire = BytesMut::new();
    for p in &packets {
        codec.encode(p, &mut wire).unwrap();
    }

    let reader: &[u8] = &wire;
    let mut framed = FramedRead::new(reader, PacketCodec::new());

    let mut received = Vec::new();
    while let Some(frame) = framed.next().await {
        received.push(frame.expect("frame"));
    }
    assert_eq!(received, packets);
}

#[tokio::test]
async fn test_framed_read_truncated_stream_errors() {
    let mut wire = BytesMut::new();
    PacketCodec::new().encode(packet(1, true), &mut wire).unwrap();
    wire.truncate(600);

    let reader: &[u8] = &wire;
    let mut framed = FramedRead::new(reader, PacketCodec::new());

    // Leftover bytes at EOF surface as an I/O error from decode_eof
    let result = framed.next().await.expect("one item");
    assert!(result.is_err());
}
