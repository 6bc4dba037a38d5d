use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::packer::{Packer, RefSlot};
use crate::registry::TypeDescriptor;
use crate::{PackError, PackResult};

// -----------------------------------------------------------------------------
// Shape

/// The packing strategy of a type, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A hand-written [`Pack`] impl with its own layout.
    Custom,
    /// A fieldless enum, packed as its zig-zag `i64` discriminant.
    Enum,
    /// A byte or character run, copied without per-element framing.
    Bytes,
    /// A sequence of one element type.
    Sequence,
    /// Key/value pairs.
    KeyValue,
    /// One key with many values.
    Grouping,
    /// Fixed-width data without nested references, copied flat.
    Plain,
    /// A field-walking, length-framed object.
    Object,
    /// A primitive.
    Scalar,
}

/// How an absent value of a type is written inside an `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullForm {
    /// A presence byte, `0` or `1`, precedes the value.
    Flag,
    /// The value starts with a map header; `None` is a null map header.
    Map,
    /// The value starts with a string header; `None` is a null string header.
    Str,
}

// -----------------------------------------------------------------------------
// Pack

/// A type that can be written to and read from a [`Packer`].
///
/// Implemented for scalars, strings, collections and smart pointers by
/// this crate, and for user types by `#[derive(Pack)]`. A hand-written
/// impl is the custom-serialization contract: it fully owns its layout
/// and should use [`Shape::Custom`].
///
/// # Examples
///
/// ```
/// use vc_pack::{NullForm, Pack, PackResult, Packer, Shape};
///
/// /// A color packed as three raw bytes.
/// #[derive(Debug, PartialEq)]
/// struct Rgb(u8, u8, u8);
///
/// impl Pack for Rgb {
///     const SHAPE: Shape = Shape::Custom;
///
///     fn encode(&self, p: &mut Packer) -> PackResult<()> {
///         p.write_bytes(&[self.0, self.1, self.2])
///     }
///
///     fn decode(p: &mut Packer) -> PackResult<Self> {
///         let [r, g, b] = p.read_array()?;
///         Ok(Rgb(r, g, b))
///     }
/// }
///
/// let mut packer = Packer::new();
/// packer.serialize(&Rgb(1, 2, 3)).unwrap();
/// assert_eq!(packer.get_buffer(), &[1, 2, 3]);
/// ```
pub trait Pack: Sized + 'static {
    /// Dispatch classification of the type.
    const SHAPE: Shape;

    /// Null representation used by `Option<Self>`.
    ///
    /// Only `Map` or `Str` when every encoding of `Self` starts with a
    /// non-null header of that kind.
    const NULL_FORM: NullForm = NullForm::Flag;

    /// `true` if an encoding of `Self` may start with a back-reference,
    /// as `Rc` and `Arc` do and wrappers packed as their content do.
    ///
    /// The first occurrence of a shared `Self` is then length-framed, so
    /// that its payload cannot be read as a back-reference to itself.
    const SHARED: bool = false;

    /// Dispatch classification of `Vec<Self>`.
    const SEQ_SHAPE: Shape = Shape::Sequence;

    fn encode(&self, p: &mut Packer) -> PackResult<()>;

    fn decode(p: &mut Packer) -> PackResult<Self>;

    /// Writes the elements of a sequence whose header is already written.
    ///
    /// Overridden by flat types to copy the whole run at once.
    fn encode_seq(items: &[Self], p: &mut Packer) -> PackResult<()> {
        for item in items {
            item.encode(p)?;
        }
        Ok(())
    }

    /// Reads `count` elements, or every remaining element when `count`
    /// is `None` (raw mode, where sequences carry no header).
    fn decode_seq(count: Option<usize>, p: &mut Packer) -> PackResult<Vec<Self>> {
        match count {
            Some(count) => {
                let mut items = Vec::with_capacity(count.min(p.remaining()));
                for _ in 0..count {
                    items.push(Self::decode(p)?);
                }
                Ok(items)
            }
            None => {
                let mut items = Vec::new();
                while p.remaining() > 0 {
                    items.push(decode_raw_element(p)?);
                }
                Ok(items)
            }
        }
    }

    /// Decodes the first occurrence of a shared `Rc<Self>`.
    ///
    /// `slot` is the ordinal reserved for the instance; it must be bound
    /// with [`Packer::bind_ref`] for later back-references to resolve.
    /// The default binds after decoding. Types able to exist before their
    /// content is known (such as `RefCell<T: Default>`) bind first, which
    /// allows true cycles.
    fn decode_rc(p: &mut Packer, slot: RefSlot) -> PackResult<Rc<Self>> {
        let value = Rc::new(p.decode_shared::<Self>()?);
        p.bind_ref(slot, Rc::clone(&value));
        Ok(value)
    }

    /// Name written by [`Tagged`](crate::registry::Tagged) and used in
    /// error reports.
    fn type_path() -> &'static str {
        core::any::type_name::<Self>()
    }

    /// Field layout of derived object types.
    fn descriptor() -> Option<&'static TypeDescriptor> {
        None
    }
}

// -----------------------------------------------------------------------------
// PackObject

/// The field walk of a length-framed object.
///
/// Implemented by `#[derive(Pack)]`. [`Packer::encode_object`] and
/// [`Packer::decode_object`] wrap these in a length frame, depth checks
/// and error wrapping.
pub trait PackObject: Pack {
    /// Writes every included field, own fields first, then base fields.
    fn encode_fields(&self, p: &mut Packer) -> PackResult<()>;

    /// Reads the fields written by [`encode_fields`](Self::encode_fields).
    fn decode_fields(p: &mut Packer) -> PackResult<Self>;
}

// -----------------------------------------------------------------------------
// Flat

/// Fixed-width data copied as little-endian bytes.
///
/// Sequences of flat types are written as one contiguous run.
/// `#[derive(Pack)]` with `#[pack(plain)]` implements this for structs
/// whose fields are all flat, in declaration order.
pub trait Flat: Sized {
    /// Encoded size in bytes.
    const WIDTH: usize;

    /// Writes exactly `WIDTH` bytes into `out`.
    fn write_flat(&self, out: &mut [u8]);

    /// Reads a value from exactly `WIDTH` bytes.
    fn read_flat(bytes: &[u8]) -> PackResult<Self>;
}

/// Writes a run of flat values with a single capacity check.
pub fn encode_flat_seq<T: Flat>(items: &[T], p: &mut Packer) -> PackResult<()> {
    let total = items
        .len()
        .checked_mul(T::WIDTH)
        .ok_or(PackError::invalid("flat sequence size overflows"))?;
    p.buffer_mut().write_with(total, |out| {
        for (item, chunk) in items.iter().zip(out.chunks_exact_mut(T::WIDTH.max(1))) {
            item.write_flat(chunk);
        }
    })
}

/// Reads one element of a raw sequence, which has to consume input for
/// the sequence to end.
pub(crate) fn decode_raw_element<T: Pack>(p: &mut Packer) -> PackResult<T> {
    let start = p.position();
    let item = T::decode(p)?;
    if p.position() == start {
        return Err(PackError::invalid("raw sequence element consumed no bytes"));
    }
    Ok(item)
}

/// Reads a run of flat values, see [`Pack::decode_seq`] for `count`.
pub fn decode_flat_seq<T: Flat>(count: Option<usize>, p: &mut Packer) -> PackResult<Vec<T>> {
    let width = T::WIDTH;
    if width == 0 {
        // Nothing is stored, so only a known count can rebuild the run.
        return match count {
            Some(count) => (0..count).map(|_| T::read_flat(&[])).collect(),
            None if p.remaining() == 0 => Ok(Vec::new()),
            None => Err(PackError::invalid("trailing bytes after zero-width sequence")),
        };
    }

    let count = match count {
        Some(count) => count,
        None => {
            let remaining = p.remaining();
            if remaining % width != 0 {
                return Err(PackError::invalid("trailing bytes after flat sequence"));
            }
            remaining / width
        }
    };

    let total = count
        .checked_mul(width)
        .ok_or(PackError::invalid("flat sequence size overflows"))?;
    let bytes = p.buffer_mut().read_bytes(total)?;
    bytes.chunks_exact(width).map(T::read_flat).collect()
}
