//! Segment-pool memory management and data movement for small,
//! cooperatively scheduled systems.
//!
//! Four tightly coupled subsystems share one storage substrate:
//!
//! - [`pool`]: a fixed-capacity pool of `S`-byte segments managed as a
//!   singly-linked free list, the sole allocation primitive for
//!   everything above it.
//! - [`buffer`]: [`Buffer`], a resizable zero-copy byte container
//!   built from a chain of pool segments plus a leading-byte offset,
//!   so it can grow from either end without moving data.
//! - [`stream`]: [`Stream`], a FIFO byte channel between a producer
//!   and a single registered consumer task, with message framing,
//!   push-back and zero-copy whole-buffer handoff.
//! - [`cbor`]: encoders that append RFC 8949 items to a `Buffer`, and
//!   a depth-bounded recursive parser producing a flat token array for
//!   O(n) typed lookups.
//!
//! Nothing in this crate blocks or suspends: every operation is a
//! finite computation whose return value tells the caller whether to
//! retry, and the only cross-task signal is the stream's one-way
//! consumer wake. All sizes are 16-bit; operations that would exceed
//! 65535 bytes fail cleanly instead of wrapping.

#![no_std]
extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod buffer;
pub mod cbor;
pub mod pool;
pub mod stream;

#[cfg(test)]
mod tests;

pub use buffer::{Buffer, BufferError};
pub use pool::{Pool, Segment};
pub use stream::{Consumer, MessageRead, Stream, StreamError};
