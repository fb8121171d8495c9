#![no_main]

use libfuzzer_sys::fuzz_target;
use tidepool::cbor::Parser;
use tidepool::{Buffer, Pool};

/// Throws arbitrary bytes at the CBOR scanner and checks the
/// transactional contract: a rejected message is handed back
/// byte-identical, an accepted one is consumed in full, and in both
/// cases every segment returns to the pool afterwards.
fn scan_arbitrary(data: &[u8]) {
    if data.is_empty() {
        return;
    }
    let max_depth = data[0] % 16;
    let message = &data[1..];
    if message.len() > 4096 {
        return;
    }

    let pool: Pool<64> = Pool::new(256);
    let mut source: Buffer<64> = Buffer::new();
    if source.append(&pool, message).is_err() {
        return;
    }

    let mut parser: Parser<64> = Parser::new();
    match parser.scan(&pool, &mut source, max_depth) {
        Ok(()) => {
            assert!(source.is_empty(), "accepted scan left source bytes behind");
            // Walk every token through the typed accessors; none of
            // them may panic or read out of bounds.
            let mut scratch = [0u8; 64];
            for index in 0..parser.token_total() {
                let _ = parser.token_count(index);
                let _ = parser.decode_bool(index);
                let _ = parser.decode_u32(index);
                let _ = parser.decode_i32(index);
                let _ = parser.decode_text(index, &mut scratch);
                let _ = parser.decode_bytes(index, &mut scratch);
                let _ = parser.decode_tag(index);
                if let Some(len) = parser.decode_array(index) {
                    let _ = parser.lookup_array_entry(index, len.saturating_sub(1));
                }
                if let Some(_len) = parser.decode_map(index) {
                    let _ = parser.lookup_map_int_key(index, 0);
                    let _ = parser.lookup_map_text_key(index, "key");
                }
            }
        }
        Err(_) => {
            assert_eq!(
                usize::from(source.len()),
                message.len(),
                "rejected scan did not restore the source"
            );
            let mut restored = vec![0u8; message.len()];
            source.read(0, &mut restored).unwrap();
            assert_eq!(restored.as_slice(), message, "restored bytes differ");
        }
    }

    parser.reset(&pool);
    source.clear(&pool);
    assert_eq!(pool.available(), 256, "segments leaked");
}

fuzz_target!(|data: &[u8]| scan_arbitrary(data));
