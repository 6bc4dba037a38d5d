//! Length headers of the wire format.
//!
//! ## Map header
//!
//! Sequences, key/value collections and objects start with one tag byte.
//! The top two bits select the kind, the low six bits an inline length:
//!
//! | byte            | meaning                                        |
//! |-----------------|------------------------------------------------|
//! | `0x00`          | null                                           |
//! | `0x80`          | empty (inline length 0)                        |
//! | `0x81..=0xBE`   | inline length 1 to 62                          |
//! | `0x40`          | partial, a zig-zag varint length follows       |
//! | `0xC0`          | circular, a varint back-reference index follows|
//!
//! Every other byte is rejected. For sequences the length counts elements,
//! for objects it counts payload bytes.
//!
//! ## String header
//!
//! Strings store their UTF-8 byte length. The selector byte holds the
//! length inline up to 124; 125, 126 and 127 announce a following
//! `u8`, little-endian `u16` or little-endian `u32`. `0x80` marks null.
//!
//! UTF-16 input is measured before transcoding, so its header is sized
//! from an estimate and widened in place if the real byte count needs a
//! larger class, see [`write_utf16`].

use alloc::string::String;
use alloc::vec::Vec;
use core::char::REPLACEMENT_CHARACTER;

use crate::buffer::SerializerBuffer;
use crate::varint;
use crate::{PackError, PackResult};

// -----------------------------------------------------------------------------
// Map header

/// Tag of a null sequence or object.
pub const NULL_MAP: u8 = 0x00;
/// Tag of a zero-length sequence or object.
pub const EMPTY_MAP: u8 = 0x80;
/// Tag announcing a varint length.
pub const PARTIAL_MAP: u8 = 0x40;
/// Tag announcing a back-reference.
pub const CIRCULAR_MAP: u8 = 0xC0;
/// Mask of the inline length.
pub const INLINE_MASK: u8 = 0x3F;
/// Largest inline length.
pub const MAX_INLINE_MAP: usize = 62;

const KIND_MASK: u8 = 0xC0;

/// A decoded map header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapHeader {
    Null,
    /// Element count of a sequence, byte length of an object.
    Length(usize),
    /// Ordinal of a previously seen shared instance.
    Circular(u32),
}

impl MapHeader {
    /// The header of an empty sequence or object.
    pub const EMPTY: Self = Self::Length(0);
}

/// Number of bytes [`write_map_header`] uses for `header`.
#[inline]
pub const fn map_header_width(header: MapHeader) -> usize {
    match header {
        MapHeader::Null => 1,
        MapHeader::Length(len) if len <= MAX_INLINE_MAP => 1,
        MapHeader::Length(len) => 1 + varint::encoded_len(varint::zigzag_i64(len as i64)),
        MapHeader::Circular(index) => 1 + varint::encoded_len(index as u64),
    }
}

/// Encodes `header` into `out`, returning the number of bytes used.
pub fn encode_map_header(header: MapHeader, out: &mut [u8; 1 + varint::MAX_VARINT_LEN]) -> usize {
    let mut tail = [0u8; varint::MAX_VARINT_LEN];
    let (tag, tail_len) = match header {
        MapHeader::Null => (NULL_MAP, 0),
        MapHeader::Length(len) if len <= MAX_INLINE_MAP => (EMPTY_MAP | len as u8, 0),
        MapHeader::Length(len) => (
            PARTIAL_MAP,
            varint::encode_u64(varint::zigzag_i64(len as i64), &mut tail),
        ),
        MapHeader::Circular(index) => (CIRCULAR_MAP, varint::encode_u64(index as u64, &mut tail)),
    };
    out[0] = tag;
    out[1..1 + tail_len].copy_from_slice(&tail[..tail_len]);
    1 + tail_len
}

/// Decodes a map header from the front of `bytes`.
///
/// Returns the header and the number of bytes it occupies.
pub fn decode_map_header(bytes: &[u8]) -> PackResult<(MapHeader, usize)> {
    let Some(&tag) = bytes.first() else {
        return Err(PackError::end_of_data(1, 0));
    };

    match tag & KIND_MASK {
        0x00 if tag == NULL_MAP => Ok((MapHeader::Null, 1)),
        0x80 => {
            let len = (tag & INLINE_MASK) as usize;
            if len > MAX_INLINE_MAP {
                return Err(PackError::invalid("map header inline length out of range"));
            }
            Ok((MapHeader::Length(len), 1))
        }
        0x40 if tag == PARTIAL_MAP => {
            let (code, used) = varint::decode_u64(&bytes[1..])?;
            let len = varint::unzigzag_i64(code);
            if len < 0 {
                return Err(PackError::invalid("negative map length"));
            }
            let len = usize::try_from(len)
                .map_err(|_| PackError::invalid("map length exceeds address space"))?;
            Ok((MapHeader::Length(len), 1 + used))
        }
        0xC0 if tag == CIRCULAR_MAP => {
            let (index, used) = varint::decode_u32(&bytes[1..])?;
            Ok((MapHeader::Circular(index), 1 + used))
        }
        _ => Err(PackError::invalid(alloc::format!(
            "unknown map header tag {tag:#04x}"
        ))),
    }
}

/// Writes `header` at the cursor.
pub fn write_map_header(buf: &mut SerializerBuffer, header: MapHeader) -> PackResult<()> {
    let mut out = [0u8; 1 + varint::MAX_VARINT_LEN];
    let len = encode_map_header(header, &mut out);
    buf.write_bytes(&out[..len])
}

/// Reads and consumes a map header.
pub fn read_map_header(buf: &mut SerializerBuffer) -> PackResult<MapHeader> {
    let (header, used) = decode_map_header(buf.unread())?;
    buf.set_position(buf.position() + used)?;
    Ok(header)
}

/// Reads the upcoming map header without consuming it.
#[inline]
pub fn peek_map_header(buf: &SerializerBuffer) -> PackResult<MapHeader> {
    decode_map_header(buf.unread()).map(|(header, _)| header)
}

// -----------------------------------------------------------------------------
// String header

/// Selector of a null string.
pub const NULL_STRING: u8 = 0x80;
/// Largest length stored inline in the selector.
pub const MAX_INLINE_STRING: usize = 124;

const FOLLOW_U8: u8 = 125;
const FOLLOW_U16: u8 = 126;
const FOLLOW_U32: u8 = 127;

/// A decoded string header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringHeader {
    Null,
    /// UTF-8 byte length of the payload.
    Length(usize),
}

/// Width of the smallest string header class holding `len`: 1, 2, 3 or 5.
#[inline]
pub const fn string_header_width(len: usize) -> usize {
    if len <= MAX_INLINE_STRING {
        1
    } else if len <= u8::MAX as usize {
        2
    } else if len <= u16::MAX as usize {
        3
    } else {
        5
    }
}

/// Encodes a string length using a header of exactly `width` bytes.
///
/// `width` must be a valid class at least as wide as the smallest one
/// for `len`. Wider classes are legal on the wire.
fn encode_string_header_with(len: usize, width: usize, out: &mut [u8; 5]) -> PackResult<usize> {
    let len32 = u32::try_from(len).map_err(|_| PackError::invalid("string longer than 4 GiB"))?;
    match width {
        1 if len <= MAX_INLINE_STRING => out[0] = len as u8,
        2 if len <= u8::MAX as usize => {
            out[0] = FOLLOW_U8;
            out[1] = len as u8;
        }
        3 if len <= u16::MAX as usize => {
            out[0] = FOLLOW_U16;
            out[1..3].copy_from_slice(&(len as u16).to_le_bytes());
        }
        5 => {
            out[0] = FOLLOW_U32;
            out[1..5].copy_from_slice(&len32.to_le_bytes());
        }
        _ => return Err(PackError::invalid("string header class too narrow")),
    }
    Ok(width)
}

/// Decodes a string header from the front of `bytes`.
pub fn decode_string_header(bytes: &[u8]) -> PackResult<(StringHeader, usize)> {
    let Some(&selector) = bytes.first() else {
        return Err(PackError::end_of_data(1, 0));
    };

    fn follow(bytes: &[u8], n: usize) -> PackResult<&[u8]> {
        bytes
            .get(1..1 + n)
            .ok_or(PackError::end_of_data(1 + n, bytes.len()))
    }

    match selector {
        NULL_STRING => Ok((StringHeader::Null, 1)),
        0..=124 => Ok((StringHeader::Length(selector as usize), 1)),
        FOLLOW_U8 => Ok((StringHeader::Length(follow(bytes, 1)?[0] as usize), 2)),
        FOLLOW_U16 => {
            let raw = follow(bytes, 2)?;
            let len = u16::from_le_bytes([raw[0], raw[1]]);
            Ok((StringHeader::Length(len as usize), 3))
        }
        FOLLOW_U32 => {
            let raw = follow(bytes, 4)?;
            let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            Ok((StringHeader::Length(len as usize), 5))
        }
        _ => Err(PackError::invalid(alloc::format!(
            "unknown string header selector {selector:#04x}"
        ))),
    }
}

/// Writes a string header for a known byte length.
pub fn write_string_header(buf: &mut SerializerBuffer, header: StringHeader) -> PackResult<()> {
    match header {
        StringHeader::Null => buf.write_u8(NULL_STRING),
        StringHeader::Length(len) => {
            let mut out = [0u8; 5];
            let width = encode_string_header_with(len, string_header_width(len), &mut out)?;
            buf.write_bytes(&out[..width])
        }
    }
}

/// Reads and consumes a string header.
pub fn read_string_header(buf: &mut SerializerBuffer) -> PackResult<StringHeader> {
    let (header, used) = decode_string_header(buf.unread())?;
    buf.set_position(buf.position() + used)?;
    Ok(header)
}

/// Reads the upcoming string header without consuming it.
#[inline]
pub fn peek_string_header(buf: &SerializerBuffer) -> PackResult<StringHeader> {
    decode_string_header(buf.unread()).map(|(header, _)| header)
}

/// Writes a string header followed by the UTF-8 bytes of `value`.
pub fn write_str(buf: &mut SerializerBuffer, value: &str) -> PackResult<()> {
    write_string_header(buf, StringHeader::Length(value.len()))?;
    buf.write_bytes(value.as_bytes())
}

/// Reads a string written by [`write_str`] or [`write_utf16`].
///
/// Returns `None` for a null header.
pub fn read_string(buf: &mut SerializerBuffer) -> PackResult<Option<String>> {
    match read_string_header(buf)? {
        StringHeader::Null => Ok(None),
        StringHeader::Length(len) => {
            let bytes = buf.read_bytes(len)?;
            let text = core::str::from_utf8(bytes)
                .map_err(|_| PackError::invalid("string payload is not valid UTF-8"))?;
            Ok(Some(String::from(text)))
        }
    }
}

/// A header widening performed by [`write_utf16`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splice {
    /// Where the extra bytes were inserted.
    pub at: usize,
    /// Number of inserted bytes.
    pub len: usize,
}

/// Transcodes UTF-16 `units` to UTF-8 behind a string header.
///
/// The header class is chosen from the UTF-16 byte size. If the UTF-8
/// payload turns out to need a wider class, the missing header bytes are
/// spliced in after the fact and the payload shifts right; the applied
/// [`Splice`] is returned so callers can move their own recorded offsets.
/// A payload smaller than estimated keeps the reserved (wider) class.
///
/// Unpaired surrogates are replaced with U+FFFD.
///
/// # Examples
///
/// ```
/// use vc_pack::buffer::SerializerBuffer;
/// use vc_pack::header;
///
/// // 62 CJK characters: 124 bytes as UTF-16, 186 bytes as UTF-8.
/// let units = vec![0x4E2D_u16; 62];
/// let mut buf = SerializerBuffer::new();
/// let splice = header::write_utf16(&mut buf, &units).unwrap();
///
/// assert!(splice.is_some());
/// assert_eq!(buf.length(), 2 + 186);
///
/// buf.set_position(0).unwrap();
/// let text = header::read_string(&mut buf).unwrap().unwrap();
/// assert_eq!(text.chars().count(), 62);
/// ```
pub fn write_utf16(buf: &mut SerializerBuffer, units: &[u16]) -> PackResult<Option<Splice>> {
    let estimate = units.len().saturating_mul(2);
    let reserved = string_header_width(estimate);

    let header_at = buf.position();
    buf.write_zeros(reserved)?;
    let payload_at = buf.position();

    let mut utf8 = [0u8; 4];
    for ch in char::decode_utf16(units.iter().copied()) {
        let ch = ch.unwrap_or(REPLACEMENT_CHARACTER);
        buf.write_bytes(ch.encode_utf8(&mut utf8).as_bytes())?;
    }

    let actual = buf.position() - payload_at;
    let needed = string_header_width(actual);

    let splice = if needed > reserved {
        let len = needed - reserved;
        buf.insert_gap(payload_at, len)?;
        log::trace!("widened string header at {header_at} by {len} bytes");
        Some(Splice { at: payload_at, len })
    } else {
        None
    };

    let mut out = [0u8; 5];
    let width = encode_string_header_with(actual, needed.max(reserved), &mut out)?;
    buf.write_at(header_at, &out[..width])?;
    Ok(splice)
}

/// Reads a string and re-encodes it as UTF-16 code units.
pub fn read_utf16(buf: &mut SerializerBuffer) -> PackResult<Option<Vec<u16>>> {
    Ok(read_string(buf)?.map(|text| text.encode_utf16().collect()))
}
