use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::{NullForm, Pack, PackError, PackResult, Packer, Shape};

impl Pack for String {
    const SHAPE: Shape = Shape::Bytes;
    const NULL_FORM: NullForm = NullForm::Str;

    #[inline]
    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_str(self)
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        p.read_string()?
            .ok_or(PackError::invalid("null string where a value was expected"))
    }
}

// -----------------------------------------------------------------------------
// Utf16String

/// Text held as UTF-16 code units, packed as UTF-8.
///
/// The string header is sized from an estimate of two bytes per code unit
/// and widened in place when the transcoded text turns out longer.
/// Unpaired surrogates are written as U+FFFD.
///
/// # Examples
///
/// ```
/// use vc_pack::Packer;
/// use vc_pack::impls::Utf16String;
///
/// let text = Utf16String::from("€€€");
///
/// let mut packer = Packer::new();
/// packer.serialize(&text).unwrap();
/// assert_eq!(packer.get_buffer()[0], 9);
///
/// packer.set_position(0).unwrap();
/// assert_eq!(packer.deserialize::<Utf16String>().unwrap(), text);
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Utf16String(pub Vec<u16>);

impl Utf16String {
    #[inline]
    pub fn as_units(&self) -> &[u16] {
        &self.0
    }

    /// Converts to UTF-8, replacing unpaired surrogates with U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        char::decode_utf16(self.0.iter().copied())
            .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

impl From<&str> for Utf16String {
    fn from(value: &str) -> Self {
        Self(value.encode_utf16().collect())
    }
}

impl From<Vec<u16>> for Utf16String {
    #[inline]
    fn from(units: Vec<u16>) -> Self {
        Self(units)
    }
}

impl fmt::Debug for Utf16String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl Pack for Utf16String {
    const SHAPE: Shape = Shape::Bytes;
    const NULL_FORM: NullForm = NullForm::Str;

    #[inline]
    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_utf16(&self.0)
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let text = p
            .read_string()?
            .ok_or(PackError::invalid("null string where a value was expected"))?;
        Ok(Self::from(text.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;

    use super::Utf16String;
    use crate::{PackError, Packer};

    #[test]
    fn null_header_is_not_a_string() {
        let mut packer = Packer::from_bytes(vec![0x80]);
        let err = packer.deserialize::<String>().unwrap_err();
        assert!(matches!(err, PackError::InvalidEncoding { .. }));
    }

    #[test]
    fn lone_surrogate_is_replaced() {
        let text = Utf16String(vec![0x61, 0xD800, 0x62]);
        let mut packer = Packer::new();
        packer.serialize(&text).unwrap();

        packer.set_position(0).unwrap();
        assert_eq!(packer.deserialize::<String>().unwrap(), "a\u{FFFD}b");
    }

    #[test]
    fn widened_header_inside_object_frame() {
        // 50 units estimated at 100 bytes, transcoded to 150
        let text = Utf16String::from("€".repeat(50).as_str());
        let mut packer = Packer::new();
        packer
            .encode_framed(|p| {
                p.write_u8(1)?;
                p.write_utf16(text.as_units())
            })
            .unwrap();

        packer.set_position(0).unwrap();
        let inner = packer
            .decode_framed(|p| {
                assert_eq!(p.read_u8()?, 1);
                p.read_string()
            })
            .unwrap();
        assert_eq!(inner.unwrap(), "€".repeat(50));
        assert_eq!(packer.remaining(), 0);
    }
}
