//! Zig-zag variable-length integers.
//!
//! Unsigned values are packed 7 bits at a time, low group first. The high
//! bit of each byte flags that another group follows. Signed values are
//! zig-zag mapped first, so small magnitudes of either sign stay short.
//!
//! Decoding only accepts the canonical (shortest) form, which keeps
//! `encode(decode(bytes)) == bytes` for every accepted input.
//!
//! # Examples
//!
//! ```
//! use vc_pack::varint;
//!
//! let mut out = [0u8; varint::MAX_VARINT_LEN];
//! let len = varint::encode_u64(300, &mut out);
//! assert_eq!(&out[..len], &[0xAC, 0x02]);
//!
//! assert_eq!(varint::zigzag_i64(-1), 1);
//! assert_eq!(varint::unzigzag_i64(1), -1);
//! ```

use crate::{PackError, PackResult};

/// Maximum encoded width of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Maximum encoded width of a 32-bit varint.
pub const MAX_VARINT32_LEN: usize = 5;

const CONTINUE: u8 = 0x80;
const PAYLOAD: u8 = 0x7F;

// -----------------------------------------------------------------------------
// Zig-zag

/// `(v << 1) ^ (v >> 63)`
#[inline(always)]
pub const fn zigzag_i64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Inverse of [`zigzag_i64`].
#[inline(always)]
pub const fn unzigzag_i64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// `(v << 1) ^ (v >> 31)`
#[inline(always)]
pub const fn zigzag_i32(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

/// Inverse of [`zigzag_i32`].
#[inline(always)]
pub const fn unzigzag_i32(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

/// `(v << 1) ^ (v >> 15)`
#[inline(always)]
pub const fn zigzag_i16(v: i16) -> u16 {
    ((v << 1) ^ (v >> 15)) as u16
}

/// Inverse of [`zigzag_i16`].
#[inline(always)]
pub const fn unzigzag_i16(v: u16) -> i16 {
    ((v >> 1) as i16) ^ -((v & 1) as i16)
}

// -----------------------------------------------------------------------------
// Encoding

/// Number of bytes [`encode_u64`] writes for `value`.
#[inline]
pub const fn encoded_len(value: u64) -> usize {
    // ceil(bits / 7), where a zero still takes one byte.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Writes `value` into `out` and returns the number of bytes used.
#[inline]
pub fn encode_u64(mut value: u64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut len = 0;
    while value >= CONTINUE as u64 {
        out[len] = (value as u8 & PAYLOAD) | CONTINUE;
        value >>= 7;
        len += 1;
    }
    out[len] = value as u8;
    len + 1
}

// -----------------------------------------------------------------------------
// Decoding

/// Reads a canonical 64-bit varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
///
/// - Running out of bytes mid-value fails with `UnexpectedEndOfData`.
/// - A continuation bit that never clears within [`MAX_VARINT_LEN`] bytes,
///   an overflowing tenth byte, or an overlong form fails with `InvalidEncoding`.
pub fn decode_u64(bytes: &[u8]) -> PackResult<(u64, usize)> {
    decode_bounded(bytes, MAX_VARINT_LEN, u64::MAX)
}

/// Reads a canonical varint that must fit into 32 bits.
pub fn decode_u32(bytes: &[u8]) -> PackResult<(u32, usize)> {
    let (value, len) = decode_bounded(bytes, MAX_VARINT32_LEN, u32::MAX as u64)?;
    Ok((value as u32, len))
}

fn decode_bounded(bytes: &[u8], max_len: usize, max_value: u64) -> PackResult<(u64, usize)> {
    let mut value = 0u64;

    for (index, &byte) in bytes.iter().take(max_len).enumerate() {
        let group = (byte & PAYLOAD) as u64;
        let shift = 7 * index as u32;

        if index == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(PackError::invalid("varint overflows 64 bits"));
        }

        value |= group << shift;

        if byte & CONTINUE == 0 {
            if index > 0 && byte == 0 {
                return Err(PackError::invalid("overlong varint"));
            }
            if value > max_value {
                return Err(PackError::invalid("varint exceeds target width"));
            }
            return Ok((value, index + 1));
        }
    }

    if bytes.len() >= max_len {
        Err(PackError::invalid("varint continuation bit never clears"))
    } else {
        Err(PackError::end_of_data(bytes.len() + 1, bytes.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> ([u8; MAX_VARINT_LEN], usize) {
        let mut out = [0u8; MAX_VARINT_LEN];
        let len = encode_u64(value, &mut out);
        (out, len)
    }

    #[test]
    fn zigzag_maps_small_magnitudes_to_small_codes() {
        assert_eq!(zigzag_i64(0), 0);
        assert_eq!(zigzag_i64(-1), 1);
        assert_eq!(zigzag_i64(1), 2);
        assert_eq!(zigzag_i64(-2), 3);
        assert_eq!(zigzag_i64(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_i64(i64::MIN), u64::MAX);

        for v in [0, 1, -1, 63, -64, i32::MIN, i32::MAX] {
            assert_eq!(unzigzag_i32(zigzag_i32(v)), v);
        }
        for v in [0, 1, -1, i16::MIN, i16::MAX] {
            assert_eq!(unzigzag_i16(zigzag_i16(v)), v);
        }
    }

    #[test]
    fn decode_inverts_encode() {
        for value in [0, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let (out, len) = encode(value);
            assert_eq!(len, encoded_len(value));
            assert_eq!(decode_u64(&out[..len]).unwrap(), (value, len));
        }
        for value in [i64::MIN, -1, 0, 1, i64::MAX] {
            let (out, len) = encode(zigzag_i64(value));
            let (code, _) = decode_u64(&out[..len]).unwrap();
            assert_eq!(unzigzag_i64(code), value);
        }
    }

    #[test]
    fn encode_inverts_decode() {
        let samples: [&[u8]; 4] = [&[0x00], &[0x7F], &[0xAC, 0x02], &[0xFF, 0xFF, 0x03]];
        for bytes in samples {
            let (value, len) = decode_u64(bytes).unwrap();
            let (out, out_len) = encode(value);
            assert_eq!(&out[..out_len], &bytes[..len]);
        }
    }

    #[test]
    fn rejects_malformed_input() {
        let endless = [0xFFu8; 11];
        assert!(matches!(
            decode_u64(&endless),
            Err(PackError::InvalidEncoding { .. })
        ));

        let overflow = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert!(matches!(
            decode_u64(&overflow),
            Err(PackError::InvalidEncoding { .. })
        ));

        assert!(matches!(
            decode_u64(&[0x80, 0x00]),
            Err(PackError::InvalidEncoding { .. })
        ));

        assert!(matches!(
            decode_u32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F]),
            Err(PackError::InvalidEncoding { .. })
        ));

        assert!(decode_u64(&[0x80]).unwrap_err().is_end_of_data());
    }
}
