//! FIFO byte streams for inter-task data transfer.
//!
//! A [`Stream`] is a byte channel between one producer and one
//! registered consumer, built from the same pooled segment chains as
//! [`Buffer`](crate::buffer::Buffer) but with independent read and
//! write cursors: segments are allocated as the write cursor crosses a
//! boundary and released as soon as the read cursor drains them, so
//! per-byte cost stays O(1) amortized no matter how long the stream
//! lives.
//!
//! Nothing here blocks. Every operation is a finite computation whose
//! return value tells the caller whether to retry later; the only
//! cross-task signal is the one-directional consumer wake issued after
//! successful producer-side writes.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Weak;
use core::fmt;
use core::mem;

use thiserror::Error;

use crate::buffer::{Buffer, chain_write};
use crate::pool::{Pool, Segment};

/// Wake target for a stream's registered consumer task.
///
/// `resume` is a signal, not a function call into the consumer: the
/// scheduling consequence belongs entirely to the external scheduler.
/// The stream never suspends, allocates or destroys the task behind the
/// reference.
pub trait Consumer {
    fn resume(&self);
}

/// Failure conditions for stream transfer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The stream ceiling or the segment pool cannot take the transfer.
    #[error("insufficient stream or pool capacity")]
    InsufficientSpace,
    /// Fewer bytes are queued than the transfer requires.
    #[error("insufficient buffered data")]
    InsufficientData,
    /// `accept_buffer` was called with no buffer handoff in flight.
    #[error("no buffer queued for handoff")]
    NoBufferQueued,
}

/// Outcome of [`Stream::read_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRead {
    /// No complete message is buffered yet; nothing was consumed.
    Pending,
    /// A message of the given length was copied out and removed.
    Complete(u16),
    /// A complete message exists but exceeds the caller's buffer;
    /// nothing was consumed, so the caller can retry with more space.
    Oversize,
}

/// Size of the in-band placeholder record written for each buffer
/// handoff, keeping handoffs ordered relative to interleaved byte
/// writes.
pub const HANDOFF_RECORD_LEN: u16 = 2;

/// A FIFO byte channel with a capacity ceiling and a single registered
/// consumer.
pub struct Stream<const S: usize = 64> {
    head: Option<Box<Segment<S>>>,
    length: u16,
    max_length: u16,
    /// Offset of the next write within the last segment; `S` means the
    /// last segment is full.
    write_offset: u16,
    /// Offset of the next read within the first segment.
    read_offset: u16,
    consumer: Option<Weak<dyn Consumer>>,
    /// Buffers in flight through [`Stream::send_buffer`], in the same
    /// order as their placeholder records in the byte sequence.
    handoff: VecDeque<Buffer<S>>,
}

impl<const S: usize> Stream<S> {
    /// Creates an empty stream that will queue at most `max_length`
    /// bytes.
    #[must_use]
    pub fn new(max_length: u16) -> Self {
        Stream {
            head: None,
            length: 0,
            max_length,
            write_offset: 0,
            read_offset: 0,
            consumer: None,
            handoff: VecDeque::new(),
        }
    }

    /// Rebinds the consumer wake target. If data is already queued the
    /// new consumer is signalled immediately.
    pub fn set_consumer(&mut self, consumer: Weak<dyn Consumer>) {
        self.consumer = Some(consumer);
        if self.length > 0 || !self.handoff.is_empty() {
            self.notify();
        }
    }

    pub fn clear_consumer(&mut self) {
        self.consumer = None;
    }

    /// Releases all queued bytes and in-flight buffers back to the
    /// pool.
    pub fn reset(&mut self, pool: &Pool<S>) {
        pool.free_chain(self.head.take());
        self.length = 0;
        self.write_offset = 0;
        self.read_offset = 0;
        while let Some(mut buffer) = self.handoff.pop_front() {
            buffer.clear(pool);
        }
    }

    /// Largest write that can currently succeed, limited by both the
    /// stream ceiling and pool availability.
    #[must_use]
    pub fn write_capacity(&self, pool: &Pool<S>) -> u16 {
        let tail_room = if self.head.is_some() {
            u32::from(S as u16 - self.write_offset)
        } else {
            0
        };
        let free = tail_room + S as u32 * u32::from(pool.available());
        let ceiling = u32::from(self.max_length - self.length);
        free.min(ceiling) as u16
    }

    /// Number of bytes currently queued for reading.
    #[must_use]
    pub fn read_capacity(&self) -> u16 {
        self.length
    }

    /// Largest push-back that can currently succeed: head-room in the
    /// first segment plus whole segments from the pool, capped by the
    /// stream ceiling.
    #[must_use]
    pub fn push_back_capacity(&self, pool: &Pool<S>) -> u16 {
        let head_room = if self.head.is_some() {
            u32::from(self.read_offset)
        } else {
            0
        };
        let free = head_room + S as u32 * u32::from(pool.available());
        let ceiling = u32::from(self.max_length - self.length);
        free.min(ceiling) as u16
    }

    /// Writes up to `data.len()` bytes, returning how many were
    /// actually queued.
    pub fn write(&mut self, pool: &Pool<S>, data: &[u8]) -> u16 {
        let capacity = usize::from(self.write_capacity(pool));
        let transfer = data.len().min(capacity) as u16;
        if transfer > 0 {
            self.common_write(pool, &data[..usize::from(transfer)]);
            self.notify();
        }
        transfer
    }

    /// Writes all of `data` or nothing.
    pub fn write_all(&mut self, pool: &Pool<S>, data: &[u8]) -> Result<(), StreamError> {
        let len = u16::try_from(data.len()).map_err(|_| StreamError::InsufficientSpace)?;
        if self.write_capacity(pool) < len {
            return Err(StreamError::InsufficientSpace);
        }
        if len > 0 {
            self.common_write(pool, data);
            self.notify();
        }
        Ok(())
    }

    /// Queues a single byte.
    pub fn write_byte(&mut self, pool: &Pool<S>, byte: u8) -> Result<(), StreamError> {
        if self.write_capacity(pool) == 0 {
            return Err(StreamError::InsufficientSpace);
        }
        self.common_write(pool, &[byte]);
        self.notify();
        Ok(())
    }

    /// Writes `data` framed with a little-endian 16-bit length header,
    /// atomically. A zero-length message is accepted and writes
    /// nothing.
    pub fn write_message(&mut self, pool: &Pool<S>, data: &[u8]) -> Result<(), StreamError> {
        let len = u16::try_from(data.len()).map_err(|_| StreamError::InsufficientSpace)?;
        let total = u32::from(len) + 2;
        if u32::from(self.write_capacity(pool)) < total {
            return Err(StreamError::InsufficientSpace);
        }
        if len > 0 {
            self.common_write(pool, &len.to_le_bytes());
            self.common_write(pool, data);
            self.notify();
        }
        Ok(())
    }

    /// Reads up to `dst.len()` bytes, returning how many were copied.
    pub fn read(&mut self, pool: &Pool<S>, dst: &mut [u8]) -> u16 {
        let transfer = dst.len().min(usize::from(self.length)) as u16;
        if transfer > 0 {
            self.common_read(pool, &mut dst[..usize::from(transfer)]);
        }
        transfer
    }

    /// Fills `dst` completely or reads nothing.
    pub fn read_all(&mut self, pool: &Pool<S>, dst: &mut [u8]) -> Result<(), StreamError> {
        let len = u16::try_from(dst.len()).map_err(|_| StreamError::InsufficientData)?;
        if self.length < len {
            return Err(StreamError::InsufficientData);
        }
        if len > 0 {
            self.common_read(pool, dst);
        }
        Ok(())
    }

    /// Removes and returns the next byte, if any.
    pub fn read_byte(&mut self, pool: &Pool<S>) -> Option<u8> {
        if self.length == 0 {
            return None;
        }
        let mut byte = [0u8; 1];
        self.common_read(pool, &mut byte);
        Some(byte[0])
    }

    /// Copies the byte at `offset` from the head of the stream without
    /// removing it.
    #[must_use]
    pub fn peek_byte(&self, offset: u16) -> Option<u8> {
        if offset >= self.length {
            return None;
        }
        let mut pos = usize::from(self.read_offset) + usize::from(offset);
        let mut segment = self.head.as_deref();
        while pos >= S {
            segment = segment?.next.as_deref();
            pos -= S;
        }
        segment.map(|seg| seg.bytes[pos])
    }

    /// Reads one length-framed message into `dst`. See [`MessageRead`]
    /// for the three possible outcomes; only `Complete` consumes
    /// anything.
    pub fn read_message(&mut self, pool: &Pool<S>, dst: &mut [u8]) -> MessageRead {
        let (Some(low), Some(high)) = (self.peek_byte(0), self.peek_byte(1)) else {
            return MessageRead::Pending;
        };
        let msg_len = u16::from_le_bytes([low, high]);
        if u32::from(self.length) < u32::from(msg_len) + 2 {
            return MessageRead::Pending;
        }
        if usize::from(msg_len) > dst.len() {
            return MessageRead::Oversize;
        }
        let mut header = [0u8; 2];
        self.common_read(pool, &mut header);
        if msg_len > 0 {
            self.common_read(pool, &mut dst[..usize::from(msg_len)]);
        }
        MessageRead::Complete(msg_len)
    }

    /// Re-inserts `data` at the head of the stream, as if it had never
    /// been read. Atomic. Does not signal the consumer: push-back is a
    /// consumer-side correction.
    pub fn push_back(&mut self, pool: &Pool<S>, data: &[u8]) -> Result<(), StreamError> {
        let len = u16::try_from(data.len()).map_err(|_| StreamError::InsufficientSpace)?;
        if len == 0 {
            return Ok(());
        }
        if self.push_back_capacity(pool) < len {
            return Err(StreamError::InsufficientSpace);
        }
        if self.head.is_none() {
            self.common_write(pool, data);
            return Ok(());
        }
        let head_room = usize::from(self.read_offset);
        if usize::from(len) <= head_room {
            self.read_offset -= len;
        } else {
            let short = u32::from(len) - u32::from(self.read_offset);
            let added = short.div_ceil(S as u32) as u16;
            let Some(mut chain) = pool.alloc_chain(added) else {
                return Err(StreamError::InsufficientSpace);
            };
            let mut slot = &mut chain.next;
            while let Some(segment) = slot {
                slot = &mut segment.next;
            }
            *slot = self.head.take();
            self.head = Some(chain);
            let offset =
                u32::from(self.read_offset) + u32::from(added) * S as u32 - u32::from(len);
            self.read_offset = offset as u16;
        }
        self.length += len;
        chain_write(&mut self.head, usize::from(self.read_offset), data);
        Ok(())
    }

    /// Moves a whole `Buffer` value through the stream as one opaque
    /// fixed-size unit: the byte sequence carries a placeholder record
    /// for ordering while the buffer's storage moves through a typed
    /// side queue. Zero-copy regardless of the payload size.
    pub fn send_buffer(&mut self, pool: &Pool<S>, buffer: &mut Buffer<S>) -> Result<(), StreamError> {
        if self.write_capacity(pool) < HANDOFF_RECORD_LEN {
            return Err(StreamError::InsufficientSpace);
        }
        let record = buffer.len().to_le_bytes();
        self.common_write(pool, &record);
        self.handoff.push_back(mem::take(buffer));
        self.notify();
        Ok(())
    }

    /// Receives the buffer at the head of the stream. The next queued
    /// bytes must be a handoff placeholder: interleaved reads must
    /// respect the same framing discipline the producer used.
    pub fn accept_buffer(&mut self, pool: &Pool<S>, dst: &mut Buffer<S>) -> Result<(), StreamError> {
        if self.length < HANDOFF_RECORD_LEN {
            return Err(StreamError::InsufficientData);
        }
        if self.handoff.is_empty() {
            return Err(StreamError::NoBufferQueued);
        }
        let mut record = [0u8; HANDOFF_RECORD_LEN as usize];
        self.common_read(pool, &mut record);
        let Some(mut buffer) = self.handoff.pop_front() else {
            return Err(StreamError::NoBufferQueued);
        };
        buffer.move_to(pool, dst);
        Ok(())
    }

    /// Returns a previously accepted buffer to the head of the stream.
    pub fn push_back_buffer(
        &mut self,
        pool: &Pool<S>,
        buffer: &mut Buffer<S>,
    ) -> Result<(), StreamError> {
        let record = buffer.len().to_le_bytes();
        self.push_back(pool, &record)?;
        self.handoff.push_front(mem::take(buffer));
        Ok(())
    }

    /// Appends `data` at the write cursor. The caller has already
    /// checked capacity, so segment allocation cannot fail here.
    fn common_write(&mut self, pool: &Pool<S>, data: &[u8]) {
        if self.head.is_none() {
            let Some(segment) = pool.alloc() else {
                debug_assert!(false, "stream write capacity exceeded");
                return;
            };
            self.head = Some(segment);
            self.length = 0;
            self.write_offset = 0;
            self.read_offset = 0;
        }
        let mut segment = match self.head.as_deref_mut() {
            Some(segment) => segment,
            None => return,
        };
        while segment.next.is_some() {
            segment = match segment.next.as_deref_mut() {
                Some(next) => next,
                None => return,
            };
        }
        let mut remaining = data;
        loop {
            let offset = usize::from(self.write_offset);
            let take = (S - offset).min(remaining.len());
            segment.bytes[offset..offset + take].copy_from_slice(&remaining[..take]);
            remaining = &remaining[take..];
            self.write_offset += take as u16;
            self.length += take as u16;
            if remaining.is_empty() {
                break;
            }
            let Some(fresh) = pool.alloc() else {
                debug_assert!(false, "stream write capacity exceeded");
                break;
            };
            segment.next = Some(fresh);
            segment = match segment.next.as_deref_mut() {
                Some(next) => next,
                None => break,
            };
            self.write_offset = 0;
        }
    }

    /// Removes `dst.len()` bytes from the read cursor, releasing each
    /// segment as soon as it is fully drained. The caller has already
    /// checked that enough data is queued.
    fn common_read(&mut self, pool: &Pool<S>, dst: &mut [u8]) {
        let mut copied = 0;
        while copied < dst.len() {
            let offset = usize::from(self.read_offset);
            let take = (S - offset).min(dst.len() - copied);
            let Some(segment) = self.head.as_deref() else {
                debug_assert!(false, "stream read past queued data");
                return;
            };
            dst[copied..copied + take].copy_from_slice(&segment.bytes[offset..offset + take]);
            copied += take;
            self.read_offset += take as u16;
            self.length -= take as u16;
            if usize::from(self.read_offset) == S || self.length == 0 {
                if let Some(mut segment) = self.head.take() {
                    self.head = segment.next.take();
                    pool.free(segment);
                }
                self.read_offset = 0;
            }
        }
    }

    fn notify(&self) {
        if let Some(consumer) = self.consumer.as_ref().and_then(Weak::upgrade) {
            consumer.resume();
        }
    }
}

impl<const S: usize> fmt::Debug for Stream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("length", &self.length)
            .field("max_length", &self.max_length)
            .field("handoffs", &self.handoff.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::Cell;

    use super::*;

    struct WakeCounter {
        wakes: Cell<u32>,
    }

    impl Consumer for WakeCounter {
        fn resume(&self) {
            self.wakes.set(self.wakes.get() + 1);
        }
    }

    fn counter() -> Rc<WakeCounter> {
        Rc::new(WakeCounter { wakes: Cell::new(0) })
    }

    #[test]
    fn fifo_order_across_segments() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(100);
        assert_eq!(stream.write(&pool, b"abcdefghij"), 10);
        assert_eq!(stream.write(&pool, b"KLM"), 3);

        let mut out = [0u8; 13];
        assert_eq!(stream.read(&pool, &mut out), 13);
        assert_eq!(&out, b"abcdefghijKLM");
        assert_eq!(stream.read_capacity(), 0);
        // All segments released on drain.
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn partial_write_up_to_ceiling() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(5);
        assert_eq!(stream.write(&pool, b"abcdefgh"), 5);
        let mut out = [0u8; 8];
        assert_eq!(stream.read(&pool, &mut out), 5);
        assert_eq!(&out[..5], b"abcde");
    }

    #[test]
    fn write_all_is_atomic() {
        let pool: Pool<8> = Pool::new(1);
        let mut stream: Stream<8> = Stream::new(100);
        assert_eq!(
            stream.write_all(&pool, b"too long for one segment"),
            Err(StreamError::InsufficientSpace)
        );
        assert_eq!(stream.read_capacity(), 0);
        stream.write_all(&pool, b"12345678").unwrap();
        assert_eq!(stream.read_capacity(), 8);
    }

    #[test]
    fn byte_io_and_peek() {
        let pool: Pool<8> = Pool::new(2);
        let mut stream: Stream<8> = Stream::new(16);
        for byte in b"hello" {
            stream.write_byte(&pool, *byte).unwrap();
        }
        assert_eq!(stream.peek_byte(0), Some(b'h'));
        assert_eq!(stream.peek_byte(4), Some(b'o'));
        assert_eq!(stream.peek_byte(5), None);
        assert_eq!(stream.read_byte(&pool), Some(b'h'));
        assert_eq!(stream.peek_byte(0), Some(b'e'));
    }

    #[test]
    fn message_round_trip() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(100);
        stream.write_message(&pool, b"ping").unwrap();
        stream.write_message(&pool, b"pong!").unwrap();

        let mut out = [0u8; 16];
        assert_eq!(stream.read_message(&pool, &mut out), MessageRead::Complete(4));
        assert_eq!(&out[..4], b"ping");
        assert_eq!(stream.read_message(&pool, &mut out), MessageRead::Complete(5));
        assert_eq!(&out[..5], b"pong!");
        assert_eq!(stream.read_message(&pool, &mut out), MessageRead::Pending);
    }

    #[test]
    fn oversize_message_left_intact() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(100);
        stream.write_message(&pool, b"payload").unwrap();

        let mut small = [0u8; 3];
        assert_eq!(stream.read_message(&pool, &mut small), MessageRead::Oversize);
        // Nothing consumed: a retry with enough space returns the
        // identical message.
        let mut big = [0u8; 16];
        assert_eq!(stream.read_message(&pool, &mut big), MessageRead::Complete(7));
        assert_eq!(&big[..7], b"payload");
    }

    #[test]
    fn incomplete_message_is_pending() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(100);
        let mut out = [0u8; 8];
        assert_eq!(stream.read_message(&pool, &mut out), MessageRead::Pending);
        // Header promising more payload than is queued.
        stream.write_all(&pool, &[5, 0, b'a', b'b']).unwrap();
        assert_eq!(stream.read_message(&pool, &mut out), MessageRead::Pending);
        assert_eq!(stream.read_capacity(), 4);
    }

    #[test]
    fn push_back_restores_read_order() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(100);
        stream.write_all(&pool, b"abcdefghij").unwrap();

        let mut out = [0u8; 4];
        assert_eq!(stream.read(&pool, &mut out), 4);
        assert_eq!(&out, b"abcd");
        stream.push_back(&pool, &out).unwrap();

        let mut rest = [0u8; 10];
        assert_eq!(stream.read(&pool, &mut rest), 10);
        assert_eq!(&rest, b"abcdefghij");
    }

    #[test]
    fn push_back_beyond_capacity_fails() {
        let pool: Pool<8> = Pool::new(2);
        let mut stream: Stream<8> = Stream::new(12);
        stream.write_all(&pool, b"0123456789ab").unwrap();
        // Ceiling reached: nothing can be pushed back.
        assert_eq!(
            stream.push_back(&pool, b"x"),
            Err(StreamError::InsufficientSpace)
        );
    }

    #[test]
    fn push_back_onto_empty_stream() {
        let pool: Pool<8> = Pool::new(2);
        let mut stream: Stream<8> = Stream::new(16);
        stream.push_back(&pool, b"abc").unwrap();
        let mut out = [0u8; 3];
        assert_eq!(stream.read(&pool, &mut out), 3);
        assert_eq!(&out, b"abc");
    }

    #[test]
    fn consumer_signalled_on_writes_only() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(100);
        let wakes = counter();
        let consumer: Rc<dyn Consumer> = wakes.clone();
        stream.set_consumer(Rc::downgrade(&consumer));
        assert_eq!(wakes.wakes.get(), 0);

        stream.write_byte(&pool, 1).unwrap();
        stream.write_all(&pool, b"ab").unwrap();
        assert_eq!(wakes.wakes.get(), 2);

        let mut out = [0u8; 3];
        assert_eq!(stream.read(&pool, &mut out), 3);
        assert_eq!(wakes.wakes.get(), 2);
    }

    #[test]
    fn rebinding_consumer_with_queued_data_signals() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(100);
        stream.write_all(&pool, b"x").unwrap();

        let wakes = counter();
        let consumer: Rc<dyn Consumer> = wakes.clone();
        stream.set_consumer(Rc::downgrade(&consumer));
        assert_eq!(wakes.wakes.get(), 1);
    }

    #[test]
    fn dropped_consumer_is_ignored() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(100);
        {
            let wakes = counter();
            let consumer: Rc<dyn Consumer> = wakes.clone();
            stream.set_consumer(Rc::downgrade(&consumer));
        }
        // The weak reference is dead; writes must not panic.
        stream.write_byte(&pool, 7).unwrap();
    }

    #[test]
    fn buffer_handoff_preserves_arrival_order() {
        let pool: Pool<8> = Pool::new(8);
        let mut stream: Stream<8> = Stream::new(100);

        let mut first = Buffer::new();
        first.append(&pool, b"first payload").unwrap();
        stream.write_all(&pool, b"AB").unwrap();
        stream.send_buffer(&pool, &mut first).unwrap();
        assert!(first.is_empty());
        stream.write_all(&pool, b"CD").unwrap();

        let mut out = [0u8; 2];
        stream.read_all(&pool, &mut out).unwrap();
        assert_eq!(&out, b"AB");

        let mut received = Buffer::new();
        stream.accept_buffer(&pool, &mut received).unwrap();
        assert_eq!(received.len(), 13);
        let mut payload = Vec::new();
        payload.resize(13, 0);
        received.read(0, &mut payload).unwrap();
        assert_eq!(payload.as_slice(), b"first payload");

        stream.read_all(&pool, &mut out).unwrap();
        assert_eq!(&out, b"CD");
    }

    #[test]
    fn accept_without_handoff_fails_cleanly() {
        let pool: Pool<8> = Pool::new(4);
        let mut stream: Stream<8> = Stream::new(100);
        let mut dst = Buffer::new();
        assert_eq!(
            stream.accept_buffer(&pool, &mut dst),
            Err(StreamError::InsufficientData)
        );
        stream.write_all(&pool, b"zz").unwrap();
        assert_eq!(
            stream.accept_buffer(&pool, &mut dst),
            Err(StreamError::NoBufferQueued)
        );
        // The framing bytes were not consumed by the failed accept.
        assert_eq!(stream.read_capacity(), 2);
    }

    #[test]
    fn push_back_buffer_returns_to_head() {
        let pool: Pool<8> = Pool::new(8);
        let mut stream: Stream<8> = Stream::new(100);

        let mut sent = Buffer::new();
        sent.append(&pool, b"payload").unwrap();
        stream.send_buffer(&pool, &mut sent).unwrap();

        let mut received = Buffer::new();
        stream.accept_buffer(&pool, &mut received).unwrap();

        stream.push_back_buffer(&pool, &mut received).unwrap();
        let mut again = Buffer::new();
        stream.accept_buffer(&pool, &mut again).unwrap();
        assert_eq!(again.len(), 7);
    }

    #[test]
    fn reset_releases_everything() {
        let pool: Pool<8> = Pool::new(8);
        let mut stream: Stream<8> = Stream::new(100);
        stream.write_all(&pool, b"some bytes").unwrap();
        let mut sent = Buffer::new();
        sent.append(&pool, b"payload").unwrap();
        stream.send_buffer(&pool, &mut sent).unwrap();

        stream.reset(&pool);
        assert_eq!(stream.read_capacity(), 0);
        assert_eq!(pool.available(), 8);
    }
}
