//! Bridge to alternate backing codecs.
//!
//! A [`BackingCodec`] writes a `serde` value into the packer's own buffer,
//! at its cursor, with a different encoding. The codec only touches the
//! [`SerializerBuffer`] it is given and never calls back into the packer.
//!
//! [`Serde`] wraps a `serde` value so it can be a field of a packed type.

use alloc::string::ToString;
use core::fmt;

use crate::buffer::SerializerBuffer;
use crate::packer::Packer;
use crate::{Pack, PackResult, Shape};

// -----------------------------------------------------------------------------
// BackingCodec

/// An object-safe, `serde` based alternate encoder.
pub trait BackingCodec: Send + Sync + 'static {
    /// Name reported in [`PackError::Codec`](crate::PackError::Codec).
    fn name(&self) -> &'static str;

    /// Writes `value` at the cursor of `buffer`.
    fn encode(
        &self,
        buffer: &mut SerializerBuffer,
        value: &dyn erased_serde::Serialize,
    ) -> PackResult<()>;

    /// Reads one value at the cursor of `buffer`, handing a deserializer
    /// over it to `visit`.
    fn decode(
        &self,
        buffer: &mut SerializerBuffer,
        visit: &mut dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> PackResult<()>,
    ) -> PackResult<()>;
}

impl fmt::Debug for dyn BackingCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BackingCodec").field(&self.name()).finish()
    }
}

// -----------------------------------------------------------------------------
// JsonCodec

/// JSON text behind a string header.
///
/// # Examples
///
/// ```
/// use vc_pack::Packer;
///
/// let mut packer = Packer::new();
/// packer.serialize_with_codec(&vec![1, 2]).unwrap();
/// assert_eq!(packer.get_buffer(), b"\x05[1,2]");
///
/// packer.set_position(0).unwrap();
/// let back: Vec<i32> = packer.deserialize_with_codec().unwrap();
/// assert_eq!(back, [1, 2]);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl JsonCodec {
    const NAME: &'static str = "json";

    fn error(err: impl fmt::Display) -> crate::PackError {
        crate::PackError::Codec {
            codec: Self::NAME,
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "json")]
impl BackingCodec for JsonCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn encode(
        &self,
        buffer: &mut SerializerBuffer,
        value: &dyn erased_serde::Serialize,
    ) -> PackResult<()> {
        let text = serde_json::to_vec(value).map_err(Self::error)?;
        crate::header::write_string_header(buffer, crate::header::StringHeader::Length(text.len()))?;
        buffer.write_bytes(&text)
    }

    fn decode(
        &self,
        buffer: &mut SerializerBuffer,
        visit: &mut dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> PackResult<()>,
    ) -> PackResult<()> {
        let len = match crate::header::read_string_header(buffer)? {
            crate::header::StringHeader::Length(len) => len,
            crate::header::StringHeader::Null => {
                return Err(Self::error("null header where a JSON value was expected"));
            }
        };
        let text = buffer.read_bytes(len)?;

        let mut de = serde_json::Deserializer::from_slice(text);
        {
            let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
            visit(&mut erased)?;
        }
        de.end().map_err(Self::error)
    }
}

// -----------------------------------------------------------------------------
// Serde

/// A `serde` value packed through the packer's backing codec.
///
/// Lets a type without a [`Pack`] impl be a field of a derived object.
/// Encoding fails with `PackError::Codec` if no codec is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Serde<T>(pub T);

impl<T> Pack for Serde<T>
where
    T: serde_core::Serialize + serde_core::de::DeserializeOwned + 'static,
{
    const SHAPE: Shape = Shape::Custom;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.serialize_with_codec(&self.0)
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        p.deserialize_with_codec().map(Serde)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec;

    use super::{JsonCodec, Serde};
    use crate::{PackError, PackOptions, Packer};

    #[test]
    fn serde_field_shares_cursor() {
        let mut packer = Packer::new();
        packer.serialize(&7u8).unwrap();
        packer
            .serialize(&Serde(vec![String::from("a")]))
            .unwrap();
        packer.serialize(&9u8).unwrap();
        assert_eq!(packer.get_buffer(), b"\x07\x05[\"a\"]\x09");

        packer.set_position(1).unwrap();
        let Serde(list) = packer.deserialize::<Serde<alloc::vec::Vec<String>>>().unwrap();
        assert_eq!(list, ["a"]);
        assert_eq!(packer.read_u8().unwrap(), 9);
    }

    #[test]
    fn missing_codec_is_reported() {
        let mut packer = Packer::with_options(PackOptions::new().without_codec()).unwrap();
        let err = packer.serialize_with_codec(&1u8).unwrap_err();
        assert!(matches!(err, PackError::Codec { codec: "none", .. }));

        packer.set_codec(Some(Arc::new(JsonCodec)));
        packer.serialize_with_codec(&1u8).unwrap();
        assert_eq!(packer.get_buffer(), b"\x011");
    }

    #[test]
    fn malformed_json_fails_and_rewinds() {
        let mut packer = Packer::from_bytes(b"\x03[1,".to_vec());
        let err = packer.deserialize_with_codec::<alloc::vec::Vec<u8>>().unwrap_err();
        assert!(matches!(err, PackError::Codec { codec: "json", .. }));
        assert_eq!(packer.position(), 0);
    }
}
