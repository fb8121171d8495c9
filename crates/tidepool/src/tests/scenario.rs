//! Cross-component scenarios: the full path from pooled segments
//! through buffers and streams into the codec.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::buffer::Buffer;
use crate::cbor::{self, Parser};
use crate::pool::Pool;
use crate::stream::{Consumer, Stream};

/// The canonical small-pool walkthrough: two-segment buffer, direct
/// segment access, and a shrink that returns exactly one segment.
#[test]
fn eight_byte_segment_walkthrough() {
    let pool: Pool<8> = Pool::new(4);
    let mut buffer: Buffer<8> = Buffer::new();
    buffer.append(&pool, b"HELLOWORLD").unwrap();
    assert_eq!(buffer.len(), 10);
    assert_eq!(pool.available(), 2);

    // Byte 9 lives in the second segment.
    let second = buffer.segment_at(9).unwrap();
    let first = buffer.segment_at(0).unwrap();
    assert!(!core::ptr::eq(first, second));
    assert_eq!(&second.bytes()[..2], b"LD");

    let before = pool.available();
    buffer.resize(&pool, 3).unwrap();
    let mut out = [0u8; 3];
    buffer.read(0, &mut out).unwrap();
    assert_eq!(&out, b"HEL");
    assert_eq!(pool.available(), before + 1);
}

struct WakeFlag {
    woken: Cell<bool>,
}

impl Consumer for WakeFlag {
    fn resume(&self) {
        self.woken.set(true);
    }
}

/// A producer task encodes a reading, hands the whole buffer through a
/// stream without copying, and the consumer parses it back out.
#[test]
fn encoded_message_handoff_between_tasks() {
    let pool: Pool<64> = Pool::new(32);
    let mut channel: Stream<64> = Stream::new(256);

    let flag = Rc::new(WakeFlag { woken: Cell::new(false) });
    let consumer: Rc<dyn Consumer> = flag.clone();
    channel.set_consumer(Rc::downgrade(&consumer));

    // Producer: {"sensor": "bme280", "reading": [21, -3], "valid": true}
    let mut message: Buffer<64> = Buffer::new();
    cbor::encode_map_header(&pool, &mut message, 3).unwrap();
    cbor::encode_text(&pool, &mut message, "sensor").unwrap();
    cbor::encode_text(&pool, &mut message, "bme280").unwrap();
    cbor::encode_text(&pool, &mut message, "reading").unwrap();
    cbor::encode_array_header(&pool, &mut message, 2).unwrap();
    cbor::encode_i32(&pool, &mut message, 21).unwrap();
    cbor::encode_i32(&pool, &mut message, -3).unwrap();
    cbor::encode_text(&pool, &mut message, "valid").unwrap();
    cbor::encode_bool(&pool, &mut message, true).unwrap();

    channel.send_buffer(&pool, &mut message).unwrap();
    assert!(message.is_empty());
    assert!(flag.woken.get());

    // Consumer: accept the buffer and scan it in place.
    let mut received: Buffer<64> = Buffer::new();
    channel.accept_buffer(&pool, &mut received).unwrap();

    let mut parser: Parser<64> = Parser::new();
    parser.scan(&pool, &mut received, 4).unwrap();

    let sensor = parser.lookup_map_text_key(0, "sensor").unwrap();
    let mut name = [0u8; 16];
    let copied = parser.decode_text(sensor, &mut name).unwrap();
    assert_eq!(&name[..usize::from(copied.copied)], b"bme280");

    let reading = parser.lookup_map_text_key(0, "reading").unwrap();
    assert_eq!(parser.decode_array(reading), Some(2));
    let first = parser.lookup_array_entry(reading, 0).unwrap();
    let second = parser.lookup_array_entry(reading, 1).unwrap();
    assert_eq!(parser.decode_i32(first), Some(21));
    assert_eq!(parser.decode_i32(second), Some(-3));

    let valid = parser.lookup_map_text_key(0, "valid").unwrap();
    assert_eq!(parser.decode_bool(valid), Some(true));

    // Everything drains back to the pool.
    parser.reset(&pool);
    channel.reset(&pool);
    assert_eq!(pool.available(), 32);
}

/// Length-framed byte messages interleave with buffer handoffs on the
/// same stream, in order.
#[test]
fn framed_messages_and_handoffs_interleave() {
    let pool: Pool<64> = Pool::new(32);
    let mut channel: Stream<64> = Stream::new(256);

    channel.write_message(&pool, b"first").unwrap();
    let mut payload: Buffer<64> = Buffer::new();
    payload.append(&pool, b"bulk transfer payload").unwrap();
    channel.send_buffer(&pool, &mut payload).unwrap();
    channel.write_message(&pool, b"last").unwrap();

    let mut scratch = [0u8; 32];
    assert_eq!(
        channel.read_message(&pool, &mut scratch),
        crate::stream::MessageRead::Complete(5)
    );
    assert_eq!(&scratch[..5], b"first");

    let mut received: Buffer<64> = Buffer::new();
    channel.accept_buffer(&pool, &mut received).unwrap();
    let mut bulk = Vec::new();
    bulk.resize(usize::from(received.len()), 0);
    received.read(0, &mut bulk).unwrap();
    assert_eq!(bulk.as_slice(), b"bulk transfer payload");

    assert_eq!(
        channel.read_message(&pool, &mut scratch),
        crate::stream::MessageRead::Complete(4)
    );
    assert_eq!(&scratch[..4], b"last");
}
