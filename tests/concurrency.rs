use bytes::BytesMut;
use sg_protocol::{config::BLOCK_SIZE, core::codec::PacketCodec, core::packet::SgPacket};
use tokio_util::codec::{Decoder, Encoder};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_heavy() {
    use tokio::task::JoinSet;

    let iterations = 20_000u64;
    let mut tasks = JoinSet::new();

    for worker in 1..=8u64 {
        tasks.spawn(async move {
            let mut codec = PacketCodec::new();
            let mut buf = BytesMut::new();
            for i in 0..iterations {
                let seq = (i % u16::MAX as u64) as u16 + 1;
                let mut p = SgPacket::new(worker, worker + 100, i + 1, (i % 7) as i32, seq, seq);
                if i % 4 == 0 {
                    p = p.with_payload(Box::new([(i & 0xFF) as u8; BLOCK_SIZE]));
                }
                codec.encode(&p, &mut buf).unwrap();
                let decoded = codec.decode(&mut buf).unwrap();
                assert_eq!(decoded, Some(p));
                assert!(buf.is_empty());
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
}
