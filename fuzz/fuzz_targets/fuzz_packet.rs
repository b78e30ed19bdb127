#![no_main]

use libfuzzer_sys::fuzz_target;
use sg_protocol::SgPacket;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic; anything accepted must re-encode identically
    if let Ok(packet) = SgPacket::from_bytes(data) {
        let bytes = packet.to_bytes().expect("decoded packet re-encodes");
        assert_eq!(bytes.as_slice(), data);
    }
});
