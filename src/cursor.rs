//! Forward-only byte cursor over an immutable replay buffer.
//!
//! # Invariants
//! The read position never decreases and never passes the end of the
//! buffer.  A failed read leaves the position where it was; the caller
//! decides whether the failure aborts the whole decode.
//!
//! # Endianness
//! Every fixed-width value is little-endian.  Decoding goes through
//! `byteorder::LittleEndian`; there is no runtime negotiation.
//!
//! # Variable-length fields
//! ULEB128 integers carry 7 payload bits per byte, low group first, with
//! the high bit as the continuation flag.  Tagged strings are either the
//! single byte `0x00` (empty) or `0x0B`, a ULEB128 length, and that many
//! bytes of UTF-8.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// Tag byte of an empty string.
pub const STRING_TAG_EMPTY:   u8 = 0x00;
/// Tag byte of a length-prefixed string.
pub const STRING_TAG_PRESENT: u8 = 0x0B;

/// Longest ULEB128 sequence accepted.  Nine groups carry 63 bits; needing a
/// tenth byte is an overflow.
pub const ULEB128_MAX_BYTES: usize = 9;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("Truncated: needed {requested} byte(s) at offset {offset}, {remaining} remaining")]
    Truncated { offset: usize, requested: usize, remaining: usize },
    #[error("Invalid string tag 0x{tag:02x} at offset {offset}")]
    InvalidTag { offset: usize, tag: u8 },
    #[error("ULEB128 value at offset {offset} exceeds 64 bits")]
    Overflow { offset: usize },
}

// ── Fixed-width values ───────────────────────────────────────────────────────

/// A value stored as exactly `SIZE` little-endian bytes.
pub trait FixedWidth: Sized {
    const SIZE: usize;
    fn from_le(bytes: &[u8]) -> Self;
}

macro_rules! fixed_width {
    ($($ty:ty => $size:expr, $read:expr;)*) => {
        $(
            impl FixedWidth for $ty {
                const SIZE: usize = $size;
                #[inline]
                fn from_le(bytes: &[u8]) -> Self { $read(bytes) }
            }
        )*
    };
}

fixed_width! {
    u8   => 1, |b: &[u8]| b[0];
    i8   => 1, |b: &[u8]| b[0] as i8;
    bool => 1, |b: &[u8]| b[0] != 0;
    u16  => 2, LittleEndian::read_u16;
    i16  => 2, LittleEndian::read_i16;
    u32  => 4, LittleEndian::read_u32;
    i32  => 4, LittleEndian::read_i32;
    u64  => 8, LittleEndian::read_u64;
    i64  => 8, LittleEndian::read_i64;
    f32  => 4, LittleEndian::read_f32;
    f64  => 8, LittleEndian::read_f64;
}

// ── Cursor ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Absolute offset of the next unread byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left unread.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Borrow the next `n` bytes and advance past them.
    ///
    /// Fails with [`CursorError::Truncated`] if fewer than `n` bytes remain,
    /// in which case the position is unchanged.
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        if n > self.remaining() {
            return Err(CursorError::Truncated {
                offset:    self.pos,
                requested: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Same contract as [`read_exact`](Self::read_exact).  Named separately
    /// for regions that are handed on to another decoder without copying.
    #[inline]
    pub fn slice(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        self.read_exact(n)
    }

    pub fn read_fixed<T: FixedWidth>(&mut self) -> Result<T, CursorError> {
        self.read_exact(T::SIZE).map(T::from_le)
    }

    pub fn read_uleb128(&mut self) -> Result<u64, CursorError> {
        let start = self.pos;
        let mut value = 0u64;

        for group in 0..ULEB128_MAX_BYTES {
            let byte: u8 = self.read_fixed()?;
            value |= u64::from(byte & 0x7F) << (group * 7);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(CursorError::Overflow { offset: start })
    }

    /// Decode a tagged string.  Any tag other than `0x00` or `0x0B` is a
    /// format violation, never an empty string.
    pub fn read_string(&mut self) -> Result<String, CursorError> {
        let offset = self.pos;
        let tag: u8 = self.read_fixed()?;

        match tag {
            STRING_TAG_EMPTY => Ok(String::new()),
            STRING_TAG_PRESENT => {
                let len_offset = self.pos;
                let len = self.read_uleb128()?;
                let len = usize::try_from(len).map_err(|_| CursorError::Truncated {
                    offset:    len_offset,
                    requested: usize::MAX,
                    remaining: self.remaining(),
                })?;
                let bytes = self.read_exact(len)?;
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
            tag => Err(CursorError::InvalidTag { offset, tag }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_reads_are_little_endian() {
        let bytes = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xFF];
        let mut c = Cursor::new(&bytes);
        assert!(c.read_fixed::<bool>().unwrap());
        assert_eq!(c.read_fixed::<i16>().unwrap(), 0x1234);
        assert_eq!(c.read_fixed::<u32>().unwrap(), 0x1234_5678);
        assert_eq!(c.read_fixed::<i8>().unwrap(), -1);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn failed_read_leaves_position_unchanged() {
        let bytes = [1u8, 2, 3];
        let mut c = Cursor::new(&bytes);
        c.read_exact(1).unwrap();

        let err = c.read_fixed::<u32>().unwrap_err();
        assert_eq!(err, CursorError::Truncated { offset: 1, requested: 4, remaining: 2 });
        assert_eq!(c.position(), 1);
        assert_eq!(c.slice(2).unwrap(), &[2, 3]);
        assert!(c.slice(1).is_err());
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn zero_length_slice_is_empty() {
        let mut c = Cursor::new(&[]);
        assert_eq!(c.slice(0).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn uleb128_multi_byte() {
        let mut c = Cursor::new(&[0xE5, 0x8E, 0x26, 0xAA]);
        assert_eq!(c.read_uleb128().unwrap(), 624_485);
        assert_eq!(c.position(), 3);
    }

    #[test]
    fn uleb128_nine_bytes_is_the_limit() {
        let max = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        assert_eq!(Cursor::new(&max).read_uleb128().unwrap(), i64::MAX as u64);

        let too_long = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(
            Cursor::new(&too_long).read_uleb128().unwrap_err(),
            CursorError::Overflow { offset: 0 },
        );
    }

    #[test]
    fn uleb128_truncated() {
        let err = Cursor::new(&[0x80, 0x80]).read_uleb128().unwrap_err();
        assert!(matches!(err, CursorError::Truncated { offset: 2, .. }));
    }

    #[test]
    fn tagged_strings() {
        let bytes = [0x00, 0x0B, 0x03, b'a', b'b', b'c'];
        let mut c = Cursor::new(&bytes);
        assert_eq!(c.read_string().unwrap(), "");
        assert_eq!(c.read_string().unwrap(), "abc");
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut c = Cursor::new(&[0x0C, 0x00]);
        assert_eq!(c.read_string().unwrap_err(), CursorError::InvalidTag { offset: 0, tag: 0x0C });
    }

    #[test]
    fn string_longer_than_buffer() {
        let err = Cursor::new(&[0x0B, 0x05, b'a']).read_string().unwrap_err();
        assert_eq!(err, CursorError::Truncated { offset: 2, requested: 5, remaining: 1 });
    }
}
