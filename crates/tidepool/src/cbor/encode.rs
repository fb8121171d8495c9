//! Stateless CBOR encoders appending to a [`Buffer`].
//!
//! Every encoder returns success or failure based solely on buffer
//! extension, and composite encodings (length prefix plus payload) roll
//! the buffer back to its pre-call size when a later step fails, so a
//! failed encode never leaves a partial item behind.

use thiserror::Error;

use super::{MAX_STRING_LEN, TypeParam, major, simple};
use crate::buffer::{Buffer, BufferError};
use crate::pool::Pool;

/// Failure conditions for the CBOR encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The string exceeds [`MAX_STRING_LEN`].
    #[error("string exceeds the configured CBOR limit")]
    StringTooLong,
    /// The underlying buffer could not be extended.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Appends a major type with its argument in the shortest valid
/// encoding (RFC 8949 §3: 1, 2, 3, 5 or 9 bytes).
fn encode_header<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    major: u8,
    param: TypeParam,
) -> Result<(), BufferError> {
    let mut raw = [0u8; 9];
    let len: usize;
    if param < 24 {
        raw[0] = major | param as u8;
        len = 1;
    } else if param <= 0xFF {
        raw[0] = major | 24;
        raw[1] = param as u8;
        len = 2;
    } else if param <= 0xFFFF {
        raw[0] = major | 25;
        raw[1..3].copy_from_slice(&(param as u16).to_be_bytes());
        len = 3;
    } else if TypeParam::BITS == 64 && param > 0xFFFF_FFFF {
        raw[0] = major | 27;
        raw[1..9].copy_from_slice(&u64::from(param).to_be_bytes());
        len = 9;
    } else {
        raw[0] = major | 26;
        raw[1..5].copy_from_slice(&(param as u32).to_be_bytes());
        len = 5;
    }
    buffer.append(pool, &raw[..len])
}

fn encode_simple<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    code: u8,
) -> Result<(), EncodeError> {
    buffer.append(pool, &[major::SIMPLE | code])?;
    Ok(())
}

/// Encodes a string-like item: argument is the payload length, payload
/// follows immediately. Rolls back the length prefix when the payload
/// append fails.
fn encode_blob<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    major: u8,
    data: &[u8],
) -> Result<(), EncodeError> {
    if data.len() > usize::from(MAX_STRING_LEN) {
        return Err(EncodeError::StringTooLong);
    }
    let rollback = buffer.len();
    encode_header(pool, buffer, major, data.len() as TypeParam)?;
    if let Err(err) = buffer.append(pool, data) {
        let _ = buffer.resize(pool, rollback);
        return Err(err.into());
    }
    Ok(())
}

/// Encodes an unsigned integer at the build's native argument width.
pub fn encode_uint<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    value: TypeParam,
) -> Result<(), EncodeError> {
    encode_header(pool, buffer, major::UINT, value)?;
    Ok(())
}

/// Encodes an unsigned integer of up to 32 bits.
pub fn encode_u32<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    value: u32,
) -> Result<(), EncodeError> {
    encode_header(pool, buffer, major::UINT, TypeParam::from(value))?;
    Ok(())
}

/// Encodes a signed integer of up to 32 bits. Negative values use the
/// CBOR `-(n + 1)` representation under the negative major type.
pub fn encode_i32<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    value: i32,
) -> Result<(), EncodeError> {
    if value >= 0 {
        encode_header(pool, buffer, major::UINT, value as u32 as TypeParam)?;
    } else {
        let magnitude = -(value + 1);
        encode_header(pool, buffer, major::NINT, magnitude as u32 as TypeParam)?;
    }
    Ok(())
}

/// Encodes an unsigned integer of up to 64 bits.
#[cfg(feature = "cbor-64")]
pub fn encode_u64<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    value: u64,
) -> Result<(), EncodeError> {
    encode_header(pool, buffer, major::UINT, value)?;
    Ok(())
}

/// Encodes a signed integer of up to 64 bits.
#[cfg(feature = "cbor-64")]
pub fn encode_i64<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    value: i64,
) -> Result<(), EncodeError> {
    if value >= 0 {
        encode_header(pool, buffer, major::UINT, value as u64)?;
    } else {
        encode_header(pool, buffer, major::NINT, (-(value + 1)) as u64)?;
    }
    Ok(())
}

/// Encodes a boolean simple value.
pub fn encode_bool<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    value: bool,
) -> Result<(), EncodeError> {
    encode_simple(pool, buffer, if value { simple::TRUE } else { simple::FALSE })
}

/// Encodes a null simple value.
pub fn encode_null<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
) -> Result<(), EncodeError> {
    encode_simple(pool, buffer, simple::NULL)
}

/// Encodes an undefined simple value.
pub fn encode_undefined<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
) -> Result<(), EncodeError> {
    encode_simple(pool, buffer, simple::UNDEFINED)
}

/// Encodes the break byte terminating an indefinite-length container.
pub fn encode_break<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
) -> Result<(), EncodeError> {
    encode_simple(pool, buffer, simple::BREAK)
}

/// Encodes a single-precision float as its fixed five-byte form.
#[cfg(feature = "cbor-float")]
pub fn encode_f32<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    value: f32,
) -> Result<(), EncodeError> {
    let mut raw = [0u8; 5];
    raw[0] = major::SIMPLE | simple::F32;
    raw[1..5].copy_from_slice(&value.to_bits().to_be_bytes());
    buffer.append(pool, &raw)?;
    Ok(())
}

/// Encodes a double-precision float as its fixed nine-byte form.
#[cfg(all(feature = "cbor-float", feature = "cbor-64"))]
pub fn encode_f64<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    value: f64,
) -> Result<(), EncodeError> {
    let mut raw = [0u8; 9];
    raw[0] = major::SIMPLE | simple::F64;
    raw[1..9].copy_from_slice(&value.to_bits().to_be_bytes());
    buffer.append(pool, &raw)?;
    Ok(())
}

/// Encodes a UTF-8 text string with a definite length.
pub fn encode_text<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    text: &str,
) -> Result<(), EncodeError> {
    encode_blob(pool, buffer, major::TEXT, text.as_bytes())
}

/// Encodes a byte string with a definite length.
pub fn encode_bytes<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    data: &[u8],
) -> Result<(), EncodeError> {
    encode_blob(pool, buffer, major::BYTES, data)
}

/// Encodes the descriptor for a definite-length array of `len`
/// elements. The elements follow as individually encoded items.
pub fn encode_array_header<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    len: u16,
) -> Result<(), EncodeError> {
    encode_header(pool, buffer, major::ARRAY, TypeParam::from(len))?;
    Ok(())
}

/// Encodes the descriptor for a definite-length map of `len` key/value
/// pairs.
pub fn encode_map_header<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    len: u16,
) -> Result<(), EncodeError> {
    encode_header(pool, buffer, major::MAP, TypeParam::from(len))?;
    Ok(())
}

/// Encodes the descriptor opening an indefinite-length array,
/// terminated later by [`encode_break`].
pub fn encode_indef_array_header<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
) -> Result<(), EncodeError> {
    buffer.append(pool, &[major::ARRAY | super::AI_INDEFINITE])?;
    Ok(())
}

/// Encodes the descriptor opening an indefinite-length map.
pub fn encode_indef_map_header<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
) -> Result<(), EncodeError> {
    buffer.append(pool, &[major::MAP | super::AI_INDEFINITE])?;
    Ok(())
}

/// Encodes a tag descriptor; exactly one tagged item must follow.
pub fn encode_tag<const S: usize>(
    pool: &Pool<S>,
    buffer: &mut Buffer<S>,
    tag: TypeParam,
) -> Result<(), EncodeError> {
    encode_header(pool, buffer, major::TAG, tag)?;
    Ok(())
}
