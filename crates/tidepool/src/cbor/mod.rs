//! CBOR (RFC 8949) encoding and decoding over pooled buffers.
//!
//! This codec is not universal: the decoder produces a flat array of
//! typed token descriptors in one bounded scan and relies on the
//! application to know the expected shape of the data. Deliberate
//! restrictions: no indefinite-length byte or text strings, container
//! sizes capped by [`MAX_ARRAY_LEN`] / [`MAX_MAP_LEN`], string sizes by
//! [`MAX_STRING_LEN`], and 64-bit argument widths compiled out when the
//! `cbor-64` feature is disabled.

mod decode;
mod encode;


pub use decode::{Parser, ScanError, StringLen};
pub use encode::{
    EncodeError, encode_array_header, encode_bool, encode_break, encode_bytes,
    encode_i32, encode_indef_array_header, encode_indef_map_header, encode_map_header,
    encode_null, encode_tag, encode_text, encode_u32, encode_uint, encode_undefined,
};
#[cfg(feature = "cbor-float")]
pub use encode::encode_f32;
#[cfg(all(feature = "cbor-float", feature = "cbor-64"))]
pub use encode::encode_f64;
#[cfg(feature = "cbor-64")]
pub use encode::{encode_i64, encode_u64};

/// Largest accepted byte/text string length.
pub const MAX_STRING_LEN: u16 = 1024;
/// Largest accepted array element count.
pub const MAX_ARRAY_LEN: u16 = 256;
/// Largest accepted map entry count.
pub const MAX_MAP_LEN: u16 = 256;

/// Native width of CBOR argument values in this build.
#[cfg(feature = "cbor-64")]
pub type TypeParam = u64;
/// Native width of CBOR argument values in this build.
#[cfg(not(feature = "cbor-64"))]
pub type TypeParam = u32;

/// Integer map key type matching the widest supported integer decode.
#[cfg(feature = "cbor-64")]
pub type MapIntKey = i64;
/// Integer map key type matching the widest supported integer decode.
#[cfg(not(feature = "cbor-64"))]
pub type MapIntKey = i32;

/// Major type bits (the top three bits of the initial byte).
pub(crate) mod major {
    pub const UINT: u8 = 0x00;
    pub const NINT: u8 = 0x20;
    pub const BYTES: u8 = 0x40;
    pub const TEXT: u8 = 0x60;
    pub const ARRAY: u8 = 0x80;
    pub const MAP: u8 = 0xA0;
    pub const TAG: u8 = 0xC0;
    pub const SIMPLE: u8 = 0xE0;
}

/// Simple-value argument codes under the simple/float major type.
pub(crate) mod simple {
    pub const FALSE: u8 = 20;
    pub const TRUE: u8 = 21;
    pub const NULL: u8 = 22;
    pub const UNDEFINED: u8 = 23;
    pub const F32: u8 = 26;
    pub const F64: u8 = 27;
    pub const BREAK: u8 = 31;
}

/// Additional-information code marking indefinite lengths and the
/// break byte.
pub(crate) const AI_INDEFINITE: u8 = 31;

const PARAM_LEN: usize = core::mem::size_of::<TypeParam>();

/// One parsed CBOR data item.
///
/// Tokens are produced in bulk by a [`Parser::scan`] pass and stored
/// contiguously in document (depth-first) order. `token_count` covers
/// the item itself plus every nested descendant, which makes skipping a
/// whole subtree an O(1) index increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Decoded argument value: integer magnitude, string length,
    /// element count, tag number or raw float bits.
    pub param: TypeParam,
    /// Offset of the item's payload in the message buffer.
    pub data_offset: u16,
    /// Subtree size in tokens, including this one.
    pub token_count: u16,
    /// The item's initial byte (major type and additional info).
    pub type_byte: u8,
}

impl Token {
    /// Serialized size of one token record in the token buffer.
    pub(crate) const ENCODED_LEN: u16 = (PARAM_LEN + 5) as u16;

    pub(crate) fn major(self) -> u8 {
        self.type_byte & 0xE0
    }

    pub(crate) fn additional(self) -> u8 {
        self.type_byte & 0x1F
    }

    pub(crate) fn to_bytes(self) -> [u8; Self::ENCODED_LEN as usize] {
        let mut raw = [0u8; Self::ENCODED_LEN as usize];
        raw[..PARAM_LEN].copy_from_slice(&self.param.to_le_bytes());
        raw[PARAM_LEN..PARAM_LEN + 2].copy_from_slice(&self.data_offset.to_le_bytes());
        raw[PARAM_LEN + 2..PARAM_LEN + 4].copy_from_slice(&self.token_count.to_le_bytes());
        raw[PARAM_LEN + 4] = self.type_byte;
        raw
    }

    pub(crate) fn from_bytes(raw: &[u8; Self::ENCODED_LEN as usize]) -> Self {
        let mut param = [0u8; PARAM_LEN];
        param.copy_from_slice(&raw[..PARAM_LEN]);
        Token {
            param: TypeParam::from_le_bytes(param),
            data_offset: u16::from_le_bytes([raw[PARAM_LEN], raw[PARAM_LEN + 1]]),
            token_count: u16::from_le_bytes([raw[PARAM_LEN + 2], raw[PARAM_LEN + 3]]),
            type_byte: raw[PARAM_LEN + 4],
        }
    }
}
