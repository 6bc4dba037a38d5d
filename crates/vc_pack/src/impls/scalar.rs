use alloc::format;
use alloc::vec::Vec;
use core::any::type_name;
use core::fmt::Display;

use crate::{Flat, Pack, PackError, PackResult, Packer, Shape, decode_flat_seq, encode_flat_seq};

#[cold]
fn out_of_range<T>(value: impl Display) -> PackError {
    PackError::invalid(format!("{value} is out of range for `{}`", type_name::<T>()))
}

// -----------------------------------------------------------------------------
// Flat

macro_rules! impl_flat_le {
    ($($ty:ty),* $(,)?) => {$(
        impl Flat for $ty {
            const WIDTH: usize = size_of::<$ty>();

            #[inline]
            fn write_flat(&self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_flat(bytes: &[u8]) -> PackResult<Self> {
                bytes
                    .try_into()
                    .map(<$ty>::from_le_bytes)
                    .map_err(|_| PackError::invalid("flat element width mismatch"))
            }
        }
    )*};
}

impl_flat_le!(
    u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64,
);

impl Flat for usize {
    const WIDTH: usize = 8;

    #[inline]
    fn write_flat(&self, out: &mut [u8]) {
        (*self as u64).write_flat(out);
    }

    fn read_flat(bytes: &[u8]) -> PackResult<Self> {
        let value = u64::read_flat(bytes)?;
        usize::try_from(value).map_err(|_| out_of_range::<usize>(value))
    }
}

impl Flat for isize {
    const WIDTH: usize = 8;

    #[inline]
    fn write_flat(&self, out: &mut [u8]) {
        (*self as i64).write_flat(out);
    }

    fn read_flat(bytes: &[u8]) -> PackResult<Self> {
        let value = i64::read_flat(bytes)?;
        isize::try_from(value).map_err(|_| out_of_range::<isize>(value))
    }
}

impl Flat for bool {
    const WIDTH: usize = 1;

    #[inline]
    fn write_flat(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    fn read_flat(bytes: &[u8]) -> PackResult<Self> {
        match bytes {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(PackError::invalid("boolean byte is neither 0 nor 1")),
        }
    }
}

impl Flat for char {
    const WIDTH: usize = 4;

    #[inline]
    fn write_flat(&self, out: &mut [u8]) {
        (*self as u32).write_flat(out);
    }

    fn read_flat(bytes: &[u8]) -> PackResult<Self> {
        let value = u32::read_flat(bytes)?;
        char::from_u32(value).ok_or_else(|| out_of_range::<char>(value))
    }
}

// -----------------------------------------------------------------------------
// Pack

// Single values are varints; sequences of them are one flat little-endian run.
macro_rules! impl_pack_varint {
    ($($ty:ty),* $(,)?) => {$(
        impl Pack for $ty {
            const SHAPE: Shape = Shape::Scalar;

            #[inline]
            fn encode(&self, p: &mut Packer) -> PackResult<()> {
                p.write_varint(*self as u64)
            }

            fn decode(p: &mut Packer) -> PackResult<Self> {
                let value = p.read_varint()?;
                <$ty>::try_from(value).map_err(|_| out_of_range::<$ty>(value))
            }

            #[inline]
            fn encode_seq(items: &[Self], p: &mut Packer) -> PackResult<()> {
                encode_flat_seq(items, p)
            }

            #[inline]
            fn decode_seq(count: Option<usize>, p: &mut Packer) -> PackResult<Vec<Self>> {
                decode_flat_seq(count, p)
            }
        }
    )*};
}

macro_rules! impl_pack_zigzag {
    ($($ty:ty),* $(,)?) => {$(
        impl Pack for $ty {
            const SHAPE: Shape = Shape::Scalar;

            #[inline]
            fn encode(&self, p: &mut Packer) -> PackResult<()> {
                p.write_zigzag(*self as i64)
            }

            fn decode(p: &mut Packer) -> PackResult<Self> {
                let value = p.read_zigzag()?;
                <$ty>::try_from(value).map_err(|_| out_of_range::<$ty>(value))
            }

            #[inline]
            fn encode_seq(items: &[Self], p: &mut Packer) -> PackResult<()> {
                encode_flat_seq(items, p)
            }

            #[inline]
            fn decode_seq(count: Option<usize>, p: &mut Packer) -> PackResult<Vec<Self>> {
                decode_flat_seq(count, p)
            }
        }
    )*};
}

// Fixed-width types without a compact form.
macro_rules! impl_pack_flat {
    ($($ty:ty),* $(,)?) => {$(
        impl Pack for $ty {
            const SHAPE: Shape = Shape::Scalar;

            #[inline]
            fn encode(&self, p: &mut Packer) -> PackResult<()> {
                p.write_bytes(&self.to_le_bytes())
            }

            #[inline]
            fn decode(p: &mut Packer) -> PackResult<Self> {
                p.read_array().map(<$ty>::from_le_bytes)
            }

            #[inline]
            fn encode_seq(items: &[Self], p: &mut Packer) -> PackResult<()> {
                encode_flat_seq(items, p)
            }

            #[inline]
            fn decode_seq(count: Option<usize>, p: &mut Packer) -> PackResult<Vec<Self>> {
                decode_flat_seq(count, p)
            }
        }
    )*};
}

impl_pack_varint!(u16, u32, u64, usize);
impl_pack_zigzag!(i16, i32, i64, isize);
impl_pack_flat!(i8, u128, i128, f32, f64);

impl Pack for bool {
    const SHAPE: Shape = Shape::Scalar;

    #[inline]
    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_u8(u8::from(*self))
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        bool::read_flat(&[p.read_u8()?])
    }

    fn encode_seq(items: &[Self], p: &mut Packer) -> PackResult<()> {
        encode_flat_seq(items, p)
    }

    fn decode_seq(count: Option<usize>, p: &mut Packer) -> PackResult<Vec<Self>> {
        decode_flat_seq(count, p)
    }
}

impl Pack for u8 {
    const SHAPE: Shape = Shape::Scalar;
    const SEQ_SHAPE: Shape = Shape::Bytes;

    #[inline]
    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_u8(*self)
    }

    #[inline]
    fn decode(p: &mut Packer) -> PackResult<Self> {
        p.read_u8()
    }

    #[inline]
    fn encode_seq(items: &[Self], p: &mut Packer) -> PackResult<()> {
        p.write_bytes(items)
    }

    fn decode_seq(count: Option<usize>, p: &mut Packer) -> PackResult<Vec<Self>> {
        let count = count.unwrap_or(p.remaining());
        p.read_bytes(count).map(<[u8]>::to_vec)
    }
}

// -----------------------------------------------------------------------------
// char

/// Width of the UTF-8 sequence starting with `lead`.
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

fn read_utf8_char(p: &mut Packer) -> PackResult<char> {
    let lead = p.peek_u8()?;
    let width = utf8_width(lead).ok_or(PackError::invalid("invalid UTF-8 lead byte"))?;
    let bytes = p.read_bytes(width)?;
    core::str::from_utf8(bytes)
        .ok()
        .and_then(|text| text.chars().next())
        .ok_or(PackError::invalid("invalid UTF-8 sequence"))
}

/// A single `char` is its scalar value as a varint. A `Vec<char>` is a
/// UTF-8 run whose header counts characters, not bytes.
impl Pack for char {
    const SHAPE: Shape = Shape::Scalar;
    const SEQ_SHAPE: Shape = Shape::Bytes;

    #[inline]
    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_varint(u64::from(*self))
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let value = p.read_varint_u32()?;
        char::from_u32(value).ok_or_else(|| out_of_range::<char>(value))
    }

    fn encode_seq(items: &[Self], p: &mut Packer) -> PackResult<()> {
        let total = items.iter().map(|ch| ch.len_utf8()).sum();
        p.buffer_mut().write_with(total, |out| {
            let mut at = 0;
            for ch in items {
                at += ch.encode_utf8(&mut out[at..]).len();
            }
        })
    }

    fn decode_seq(count: Option<usize>, p: &mut Packer) -> PackResult<Vec<Self>> {
        match count {
            Some(count) => {
                let mut chars = Vec::with_capacity(count.min(p.remaining()));
                for _ in 0..count {
                    chars.push(read_utf8_char(p)?);
                }
                Ok(chars)
            }
            None => {
                let mut chars = Vec::new();
                while p.remaining() > 0 {
                    chars.push(read_utf8_char(p)?);
                }
                Ok(chars)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Unit

impl Pack for () {
    const SHAPE: Shape = Shape::Custom;

    #[inline]
    fn encode(&self, _: &mut Packer) -> PackResult<()> {
        Ok(())
    }

    #[inline]
    fn decode(_: &mut Packer) -> PackResult<Self> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::{PackError, Packer};

    #[test]
    fn integers_use_compact_forms() {
        let mut packer = Packer::new();
        packer.serialize(&300u32).unwrap();
        packer.serialize(&-1i32).unwrap();
        packer.serialize(&-2i8).unwrap();
        assert_eq!(packer.get_buffer(), &[0xAC, 0x02, 0x01, 0xFE]);

        packer.set_position(0).unwrap();
        assert_eq!(packer.deserialize::<u32>().unwrap(), 300);
        assert_eq!(packer.deserialize::<i32>().unwrap(), -1);
        assert_eq!(packer.deserialize::<i8>().unwrap(), -2);
    }

    #[test]
    fn narrowing_rejects_out_of_range() {
        let mut packer = Packer::new();
        packer.serialize(&70_000u32).unwrap();
        packer.set_position(0).unwrap();
        let err = packer.deserialize::<u16>().unwrap_err();
        assert!(matches!(err, PackError::InvalidEncoding { .. }));
    }

    #[test]
    fn bool_is_strict() {
        let mut packer = Packer::from_bytes(vec![2]);
        assert!(packer.deserialize::<bool>().is_err());
    }

    #[test]
    fn floats_keep_special_values() {
        let values = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.0, f64::MIN_POSITIVE];
        let mut packer = Packer::new();
        for value in values {
            packer.serialize(&value).unwrap();
        }
        assert_eq!(packer.length(), 40);

        packer.set_position(0).unwrap();
        for value in values {
            let back = packer.deserialize::<f64>().unwrap();
            assert_eq!(back.to_bits(), value.to_bits());
        }
    }

    #[test]
    fn scalar_sequences_are_flat() {
        let mut packer = Packer::new();
        packer.serialize(&vec![1u16, 0x0203]).unwrap();
        assert_eq!(packer.get_buffer(), &[0x82, 1, 0, 3, 2]);

        packer.set_position(0).unwrap();
        assert_eq!(packer.deserialize::<Vec<u16>>().unwrap(), [1, 0x0203]);
    }

    #[test]
    fn chars_pack_as_utf8_run() {
        let text: Vec<char> = "aé€".chars().collect();
        let mut packer = Packer::new();
        packer.serialize(&text).unwrap();
        assert_eq!(packer.get_buffer()[0], 0x83);
        assert_eq!(&packer.get_buffer()[1..], "aé€".as_bytes());

        packer.set_position(0).unwrap();
        assert_eq!(packer.deserialize::<Vec<char>>().unwrap(), text);
    }
}
