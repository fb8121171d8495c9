//! Depth-bounded CBOR scanning and token-array accessors.
//!
//! [`Parser::scan`] consumes a message buffer (moving its storage, not
//! copying it) and performs a single recursive pass that produces the
//! flat token array described in the module docs. The scan either
//! consumes the whole message exactly, or fails atomically: the
//! caller's buffer is handed back byte-identical and the parser returns
//! to the empty state. No partial token array is ever observable.
//!
//! Accessors then operate purely on the token array by index, touching
//! the original bytes only to fetch leaf payloads.

use log::trace;
use thiserror::Error;

use super::{
    AI_INDEFINITE, MAX_ARRAY_LEN, MAX_MAP_LEN, MAX_STRING_LEN, MapIntKey, Token, TypeParam,
    major, simple,
};
use crate::buffer::Buffer;
use crate::pool::Pool;

/// Reasons a [`Parser::scan`] pass can reject a message. All are
/// reported after the source buffer has been restored unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    /// An item's header or payload ran past the end of the message.
    #[error("message truncated")]
    Truncated,
    /// Bytes remained after the first complete item.
    #[error("trailing bytes after message")]
    TrailingData,
    /// Container/tag nesting exceeded the caller's depth bound.
    #[error("nesting depth limit exceeded")]
    DepthExceeded,
    /// A break byte appeared outside an indefinite-length container.
    #[error("break code outside an indefinite length container")]
    UnexpectedBreak,
    /// Indefinite-length strings are not supported.
    #[error("indefinite length string")]
    IndefiniteString,
    /// Additional-information codes 28 to 30 are reserved, and 31 is
    /// invalid for integers and tags.
    #[error("reserved argument encoding")]
    ReservedEncoding,
    /// An 8-byte argument in a build without `cbor-64`.
    #[error("64-bit arguments are not supported in this build")]
    Unsupported64Bit,
    /// A container exceeded the configured element maximum.
    #[error("container length exceeds the configured limit")]
    LimitExceeded,
    /// The pool could not supply storage for the token array.
    #[error("memory pool exhausted while storing tokens")]
    TokenStorage,
}

/// Result of copying a string payload out of the message: how many
/// bytes landed in the destination and the string's true length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLen {
    pub copied: u16,
    pub total: u16,
}

enum Step {
    /// Item scanned; the value is the offset just past it.
    Item(u16),
    /// Break byte consumed (only where the caller allows one).
    Break(u16),
}

/// CBOR message parser holding the scanned message and its token
/// array, both in pool-backed buffers.
///
/// A parser is either *empty* (after construction, [`Parser::reset`]
/// or a failed scan) or *scanned* (after a successful scan); accessors
/// on an empty parser simply find no tokens.
#[derive(Debug, Default)]
pub struct Parser<const S: usize = 64> {
    message: Buffer<S>,
    tokens: Buffer<S>,
}

impl<const S: usize> Parser<S> {
    #[must_use]
    pub fn new() -> Self {
        Parser {
            message: Buffer::new(),
            tokens: Buffer::new(),
        }
    }

    /// Scans the CBOR message held in `source`, taking ownership of its
    /// storage. On success `source` is left empty; on failure the
    /// storage moves back into `source` unchanged and the error
    /// describes the rejection. The scan succeeds only when exactly the
    /// whole message is one well-formed item.
    ///
    /// `max_depth` bounds container/tag nesting: the scan fails closed
    /// the moment recursion would exceed it, which is the defense
    /// against malformed input driving unbounded recursion.
    pub fn scan(
        &mut self,
        pool: &Pool<S>,
        source: &mut Buffer<S>,
        max_depth: u8,
    ) -> Result<(), ScanError> {
        self.reset(pool);
        source.move_to(pool, &mut self.message);
        match self.scan_message(pool, max_depth) {
            Ok(()) => Ok(()),
            Err(err) => {
                trace!("cbor scan rejected: {err}");
                self.message.move_to(pool, source);
                self.tokens.clear(pool);
                Err(err)
            }
        }
    }

    /// Releases both internal buffers and returns to the empty state.
    pub fn reset(&mut self, pool: &Pool<S>) {
        self.message.clear(pool);
        self.tokens.clear(pool);
    }

    /// Total number of scanned tokens.
    #[must_use]
    pub fn token_total(&self) -> u16 {
        self.tokens.len() / Token::ENCODED_LEN
    }

    fn scan_message(&mut self, pool: &Pool<S>, max_depth: u8) -> Result<(), ScanError> {
        let end = match self.scan_item(pool, 0, max_depth, false)? {
            Step::Item(end) => end,
            Step::Break(_) => return Err(ScanError::UnexpectedBreak),
        };
        if end == self.message.len() {
            Ok(())
        } else {
            Err(ScanError::TrailingData)
        }
    }

    /// Decodes one initial byte plus argument. Returns the token (with
    /// `token_count` still 1) and whether the additional info marked an
    /// indefinite length.
    fn read_header(&self, offset: u16) -> Result<(Token, bool), ScanError> {
        let len = u32::from(self.message.len());
        let mut first = [0u8; 1];
        self.message
            .read(offset, &mut first)
            .map_err(|_| ScanError::Truncated)?;
        let first = first[0];
        let ai = first & 0x1F;
        let (param, consumed): (TypeParam, u32) = match ai {
            0..=23 => (TypeParam::from(ai), 1),
            24 => {
                let mut raw = [0u8; 1];
                self.read_argument(offset, &mut raw)?;
                (TypeParam::from(raw[0]), 2)
            }
            25 => {
                let mut raw = [0u8; 2];
                self.read_argument(offset, &mut raw)?;
                (TypeParam::from(u16::from_be_bytes(raw)), 3)
            }
            26 => {
                let mut raw = [0u8; 4];
                self.read_argument(offset, &mut raw)?;
                (TypeParam::from(u32::from_be_bytes(raw)), 5)
            }
            27 => {
                #[cfg(feature = "cbor-64")]
                {
                    let mut raw = [0u8; 8];
                    self.read_argument(offset, &mut raw)?;
                    (u64::from_be_bytes(raw), 9)
                }
                #[cfg(not(feature = "cbor-64"))]
                {
                    return Err(ScanError::Unsupported64Bit);
                }
            }
            28..=30 => return Err(ScanError::ReservedEncoding),
            _ => (0, 1),
        };
        if u32::from(offset) + consumed > len {
            return Err(ScanError::Truncated);
        }
        let token = Token {
            param,
            data_offset: (u32::from(offset) + consumed) as u16,
            token_count: 1,
            type_byte: first,
        };
        Ok((token, ai == AI_INDEFINITE))
    }

    fn read_argument(&self, offset: u16, raw: &mut [u8]) -> Result<(), ScanError> {
        if u32::from(offset) + 1 + raw.len() as u32 > u32::from(self.message.len()) {
            return Err(ScanError::Truncated);
        }
        self.message
            .read(offset + 1, raw)
            .map_err(|_| ScanError::Truncated)
    }

    fn scan_item(
        &mut self,
        pool: &Pool<S>,
        offset: u16,
        depth: u8,
        allow_break: bool,
    ) -> Result<Step, ScanError> {
        let (token, indefinite) = self.read_header(offset)?;
        match token.major() {
            major::UINT | major::NINT => {
                if indefinite {
                    return Err(ScanError::ReservedEncoding);
                }
                self.push_token(pool, token)?;
                Ok(Step::Item(token.data_offset))
            }
            major::BYTES | major::TEXT => {
                if indefinite {
                    return Err(ScanError::IndefiniteString);
                }
                self.scan_string(pool, token)
            }
            major::ARRAY => {
                if indefinite {
                    self.scan_indefinite(pool, token, depth, false)
                } else {
                    self.scan_fixed(pool, token, depth, false)
                }
            }
            major::MAP => {
                if indefinite {
                    self.scan_indefinite(pool, token, depth, true)
                } else {
                    self.scan_fixed(pool, token, depth, true)
                }
            }
            major::TAG => {
                if indefinite {
                    return Err(ScanError::ReservedEncoding);
                }
                self.scan_tag(pool, token, depth)
            }
            _ => {
                if token.type_byte == major::SIMPLE | simple::BREAK {
                    if allow_break {
                        Ok(Step::Break(token.data_offset))
                    } else {
                        Err(ScanError::UnexpectedBreak)
                    }
                } else {
                    self.push_token(pool, token)?;
                    Ok(Step::Item(token.data_offset))
                }
            }
        }
    }

    /// Definite-length string: the declared payload must fit within the
    /// remaining message.
    fn scan_string(&mut self, pool: &Pool<S>, token: Token) -> Result<Step, ScanError> {
        let end = u64::from(token.data_offset) + u64::from(token.param);
        if end > u64::from(self.message.len()) {
            return Err(ScanError::Truncated);
        }
        self.push_token(pool, token)?;
        Ok(Step::Item(end as u16))
    }

    /// Definite-length array or map: a placeholder token followed by
    /// exactly `n` (array) or `2n` (map) child items, after which the
    /// placeholder's subtree count is patched in.
    fn scan_fixed(
        &mut self,
        pool: &Pool<S>,
        mut token: Token,
        depth: u8,
        is_map: bool,
    ) -> Result<Step, ScanError> {
        let depth = depth.checked_sub(1).ok_or(ScanError::DepthExceeded)?;
        let limit = if is_map { MAX_MAP_LEN } else { MAX_ARRAY_LEN };
        if token.param > TypeParam::from(limit) {
            return Err(ScanError::LimitExceeded);
        }
        let children = (token.param as u32) * if is_map { 2 } else { 1 };
        let location = self.push_token(pool, token)?;
        let mut next = token.data_offset;
        for _ in 0..children {
            next = match self.scan_item(pool, next, depth, false)? {
                Step::Item(next) => next,
                Step::Break(_) => return Err(ScanError::UnexpectedBreak),
            };
        }
        token.token_count = self.subtree_size(location);
        self.patch_token(location, token)?;
        Ok(Step::Item(next))
    }

    /// Indefinite-length array or map: children until the break byte,
    /// with the element count bounded by the configured maximum. The
    /// placeholder's argument is patched to the detected count.
    fn scan_indefinite(
        &mut self,
        pool: &Pool<S>,
        mut token: Token,
        depth: u8,
        is_map: bool,
    ) -> Result<Step, ScanError> {
        let depth = depth.checked_sub(1).ok_or(ScanError::DepthExceeded)?;
        let limit = u32::from(if is_map { MAX_MAP_LEN } else { MAX_ARRAY_LEN });
        let location = self.push_token(pool, token)?;
        let mut next = token.data_offset;
        let mut entries: u32 = 0;
        loop {
            match self.scan_item(pool, next, depth, true)? {
                Step::Break(after) => {
                    next = after;
                    break;
                }
                Step::Item(after) => {
                    if entries >= limit {
                        return Err(ScanError::LimitExceeded);
                    }
                    entries += 1;
                    next = after;
                    if is_map {
                        // A break between a key and its value is malformed.
                        next = match self.scan_item(pool, next, depth, false)? {
                            Step::Item(after) => after,
                            Step::Break(_) => return Err(ScanError::UnexpectedBreak),
                        };
                    }
                }
            }
        }
        token.param = TypeParam::from(entries);
        token.token_count = self.subtree_size(location);
        self.patch_token(location, token)?;
        Ok(Step::Item(next))
    }

    /// Tag: a placeholder token plus exactly one tagged child item.
    fn scan_tag(
        &mut self,
        pool: &Pool<S>,
        mut token: Token,
        depth: u8,
    ) -> Result<Step, ScanError> {
        let depth = depth.checked_sub(1).ok_or(ScanError::DepthExceeded)?;
        let location = self.push_token(pool, token)?;
        let next = match self.scan_item(pool, token.data_offset, depth, false)? {
            Step::Item(next) => next,
            Step::Break(_) => return Err(ScanError::UnexpectedBreak),
        };
        token.token_count = self.subtree_size(location);
        self.patch_token(location, token)?;
        Ok(Step::Item(next))
    }

    fn push_token(&mut self, pool: &Pool<S>, token: Token) -> Result<u16, ScanError> {
        let location = self.tokens.len();
        self.tokens
            .append(pool, &token.to_bytes())
            .map_err(|_| ScanError::TokenStorage)?;
        Ok(location)
    }

    fn patch_token(&mut self, location: u16, token: Token) -> Result<(), ScanError> {
        self.tokens
            .write(location, &token.to_bytes())
            .map_err(|_| ScanError::TokenStorage)
    }

    fn subtree_size(&self, location: u16) -> u16 {
        (self.tokens.len() - location) / Token::ENCODED_LEN
    }

    /// Fetches the token descriptor at `index`, if it exists.
    #[must_use]
    pub fn token_at(&self, index: u16) -> Option<Token> {
        let offset = u32::from(index) * u32::from(Token::ENCODED_LEN);
        let offset = u16::try_from(offset).ok()?;
        let mut raw = [0u8; Token::ENCODED_LEN as usize];
        self.tokens.read(offset, &mut raw).ok()?;
        Some(Token::from_bytes(&raw))
    }

    /// Subtree size of the item at `index`, for O(1) sibling skips.
    #[must_use]
    pub fn token_count(&self, index: u16) -> Option<u16> {
        Some(self.token_at(index)?.token_count)
    }

    /// Checks for a null simple value at `index`.
    #[must_use]
    pub fn match_null(&self, index: u16) -> bool {
        self.token_at(index)
            .is_some_and(|token| token.type_byte == major::SIMPLE | simple::NULL)
    }

    /// Checks for an undefined simple value at `index`.
    #[must_use]
    pub fn match_undefined(&self, index: u16) -> bool {
        self.token_at(index)
            .is_some_and(|token| token.type_byte == major::SIMPLE | simple::UNDEFINED)
    }

    /// Decodes a boolean simple value at `index`.
    #[must_use]
    pub fn decode_bool(&self, index: u16) -> Option<bool> {
        let token = self.token_at(index)?;
        match token.type_byte {
            b if b == major::SIMPLE | simple::FALSE => Some(false),
            b if b == major::SIMPLE | simple::TRUE => Some(true),
            _ => None,
        }
    }

    /// Decodes an unsigned integer whose magnitude fits 32 bits.
    #[must_use]
    pub fn decode_u32(&self, index: u16) -> Option<u32> {
        let token = self.token_at(index)?;
        if token.major() == major::UINT {
            u32::try_from(token.param).ok()
        } else {
            None
        }
    }

    /// Decodes a signed integer whose value fits 32 bits.
    #[must_use]
    pub fn decode_i32(&self, index: u16) -> Option<i32> {
        let token = self.token_at(index)?;
        match token.major() {
            major::UINT => i32::try_from(token.param).ok(),
            major::NINT => {
                let magnitude = i32::try_from(token.param).ok()?;
                Some(-1 - magnitude)
            }
            _ => None,
        }
    }

    /// Decodes an unsigned integer of up to 64 bits.
    #[cfg(feature = "cbor-64")]
    #[must_use]
    pub fn decode_u64(&self, index: u16) -> Option<u64> {
        let token = self.token_at(index)?;
        if token.major() == major::UINT {
            Some(token.param)
        } else {
            None
        }
    }

    /// Decodes a signed integer whose value fits 64 bits.
    #[cfg(feature = "cbor-64")]
    #[must_use]
    pub fn decode_i64(&self, index: u16) -> Option<i64> {
        let token = self.token_at(index)?;
        match token.major() {
            major::UINT => i64::try_from(token.param).ok(),
            major::NINT => {
                let magnitude = i64::try_from(token.param).ok()?;
                Some(-1 - magnitude)
            }
            _ => None,
        }
    }

    /// Decodes a single-precision float at `index`.
    #[cfg(feature = "cbor-float")]
    #[must_use]
    pub fn decode_f32(&self, index: u16) -> Option<f32> {
        let token = self.token_at(index)?;
        if token.type_byte == major::SIMPLE | simple::F32 {
            Some(f32::from_bits(token.param as u32))
        } else {
            None
        }
    }

    /// Decodes a double-precision float at `index`. A single-precision
    /// token is accepted and widened; the reverse never happens.
    #[cfg(all(feature = "cbor-float", feature = "cbor-64"))]
    #[must_use]
    pub fn decode_f64(&self, index: u16) -> Option<f64> {
        let token = self.token_at(index)?;
        if token.type_byte == major::SIMPLE | simple::F64 {
            Some(f64::from_bits(token.param))
        } else {
            self.decode_f32(index).map(f64::from)
        }
    }

    /// Decodes an array descriptor at `index`, returning the element
    /// count.
    #[must_use]
    pub fn decode_array(&self, index: u16) -> Option<u16> {
        let token = self.token_at(index)?;
        if token.major() == major::ARRAY && token.param <= TypeParam::from(MAX_ARRAY_LEN) {
            Some(token.param as u16)
        } else {
            None
        }
    }

    /// Finds the token index of array element `entry`, walking siblings
    /// with subtree skips: O(entry), not O(1).
    #[must_use]
    pub fn lookup_array_entry(&self, index: u16, entry: u16) -> Option<u16> {
        let len = self.decode_array(index)?;
        if entry >= len {
            return None;
        }
        let mut cursor = index + 1;
        for _ in 0..entry {
            cursor += self.token_count(cursor)?;
        }
        Some(cursor)
    }

    /// Decodes a map descriptor at `index`, returning the entry count.
    #[must_use]
    pub fn decode_map(&self, index: u16) -> Option<u16> {
        let token = self.token_at(index)?;
        if token.major() == major::MAP && token.param <= TypeParam::from(MAX_MAP_LEN) {
            Some(token.param as u16)
        } else {
            None
        }
    }

    /// Finds the value token for an integer map key. Linear scan over
    /// the key/value pairs; the first matching key wins on duplicates.
    #[must_use]
    pub fn lookup_map_int_key(&self, index: u16, key: MapIntKey) -> Option<u16> {
        let len = self.decode_map(index)?;
        let mut cursor = index + 1;
        for _ in 0..len {
            if self.decode_int_key(cursor) == Some(key) {
                return Some(cursor + 1);
            }
            cursor = cursor + 1 + self.token_count(cursor + 1)?;
        }
        None
    }

    /// Finds the value token for a text map key. Linear scan; the
    /// first matching key wins on duplicates.
    #[must_use]
    pub fn lookup_map_text_key(&self, index: u16, key: &str) -> Option<u16> {
        let len = self.decode_map(index)?;
        let mut cursor = index + 1;
        for _ in 0..len {
            if self.match_text(cursor, key) {
                return Some(cursor + 1);
            }
            cursor = cursor + 1 + self.token_count(cursor + 1)?;
        }
        None
    }

    fn decode_int_key(&self, index: u16) -> Option<MapIntKey> {
        #[cfg(feature = "cbor-64")]
        {
            self.decode_i64(index)
        }
        #[cfg(not(feature = "cbor-64"))]
        {
            self.decode_i32(index)
        }
    }

    /// Compares the text string at `index` against `text` in place,
    /// without copying it out of the message.
    #[must_use]
    pub fn match_text(&self, index: u16, text: &str) -> bool {
        if text.len() > usize::from(MAX_STRING_LEN) {
            return false;
        }
        let Some(token) = self.token_at(index) else {
            return false;
        };
        if token.major() != major::TEXT
            || token.additional() == AI_INDEFINITE
            || token.param != text.len() as TypeParam
        {
            return false;
        }
        let bytes = text.as_bytes();
        let mut block = [0u8; 16];
        let mut offset = 0usize;
        while offset < bytes.len() {
            let take = block.len().min(bytes.len() - offset);
            if self
                .message
                .read(token.data_offset + offset as u16, &mut block[..take])
                .is_err()
            {
                return false;
            }
            if block[..take] != bytes[offset..offset + take] {
                return false;
            }
            offset += take;
        }
        true
    }

    /// Copies the text string at `index` into `dst`, truncating when
    /// the destination is too small; `StringLen::total` always reports
    /// the true source length.
    #[must_use]
    pub fn decode_text(&self, index: u16, dst: &mut [u8]) -> Option<StringLen> {
        let token = self.token_at(index)?;
        if token.major() != major::TEXT || token.additional() == AI_INDEFINITE {
            return None;
        }
        self.copy_payload(&token, dst)
    }

    /// Copies the byte string at `index` into `dst`, truncating when
    /// the destination is too small.
    #[must_use]
    pub fn decode_bytes(&self, index: u16, dst: &mut [u8]) -> Option<StringLen> {
        let token = self.token_at(index)?;
        if token.major() != major::BYTES || token.additional() == AI_INDEFINITE {
            return None;
        }
        self.copy_payload(&token, dst)
    }

    fn copy_payload(&self, token: &Token, dst: &mut [u8]) -> Option<StringLen> {
        let total = u16::try_from(token.param).ok()?;
        let capacity = u16::try_from(dst.len()).unwrap_or(u16::MAX);
        let copied = total.min(capacity);
        self.message
            .read(token.data_offset, &mut dst[..usize::from(copied)])
            .ok()?;
        Some(StringLen { copied, total })
    }

    /// Decodes a tag descriptor at `index`, returning the tag number.
    /// The tagged content is the immediately following token.
    #[must_use]
    pub fn decode_tag(&self, index: u16) -> Option<TypeParam> {
        let token = self.token_at(index)?;
        if token.major() == major::TAG {
            Some(token.param)
        } else {
            None
        }
    }
}
