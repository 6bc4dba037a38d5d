use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::sync::Arc;
use core::cell::RefCell;

use crate::header::{MapHeader, NULL_MAP, NULL_STRING, StringHeader};
use crate::packer::RefSlot;
use crate::{NullForm, Pack, PackError, PackResult, Packer, Shape};

// -----------------------------------------------------------------------------
// Option

/// `None` uses the null form of `T`: a null map header, a null string
/// header or a `0` presence byte. Raw mode always uses presence bytes.
impl<T: Pack> Pack for Option<T> {
    const SHAPE: Shape = T::SHAPE;
    const SHARED: bool = T::SHARED;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        match (null_form::<T>(p), self) {
            (NullForm::Map, None) => p.write_map_header(MapHeader::Null),
            (NullForm::Str, None) => p.write_string_header(StringHeader::Null),
            (NullForm::Flag, None) => p.write_u8(0),
            (NullForm::Flag, Some(value)) => {
                p.write_u8(1)?;
                value.encode(p)
            }
            (_, Some(value)) => value.encode(p),
        }
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let null = match null_form::<T>(p) {
            NullForm::Map => p.peek_u8()? == NULL_MAP,
            NullForm::Str => p.peek_u8()? == NULL_STRING,
            NullForm::Flag => match p.read_u8()? {
                0 => return Ok(None),
                1 => return T::decode(p).map(Some),
                _ => return Err(PackError::invalid("presence byte is neither 0 nor 1")),
            },
        };
        if null {
            p.read_u8()?;
            Ok(None)
        } else {
            T::decode(p).map(Some)
        }
    }
}

#[inline]
fn null_form<T: Pack>(p: &Packer) -> NullForm {
    if p.is_raw() { NullForm::Flag } else { T::NULL_FORM }
}

// -----------------------------------------------------------------------------
// Box

/// Unique ownership: packed as `T`, without identity tracking.
impl<T: Pack> Pack for Box<T> {
    const SHAPE: Shape = T::SHAPE;
    const NULL_FORM: NullForm = T::NULL_FORM;
    const SHARED: bool = T::SHARED;

    #[inline]
    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        (**self).encode(p)
    }

    #[inline]
    fn decode(p: &mut Packer) -> PackResult<Self> {
        T::decode(p).map(Box::new)
    }
}

// -----------------------------------------------------------------------------
// Shared references

/// Written once per root call; repeats are back-references.
///
/// See [`Packer::encode_rc`].
impl<T: Pack> Pack for Rc<T> {
    const SHAPE: Shape = T::SHAPE;
    const NULL_FORM: NullForm = NullForm::Map;
    const SHARED: bool = true;

    #[inline]
    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.encode_rc(self)
    }

    #[inline]
    fn decode(p: &mut Packer) -> PackResult<Self> {
        p.decode_rc()
    }
}

impl<T: Pack> Pack for Arc<T> {
    const SHAPE: Shape = T::SHAPE;
    const NULL_FORM: NullForm = NullForm::Map;
    const SHARED: bool = true;

    #[inline]
    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.encode_arc(self)
    }

    #[inline]
    fn decode(p: &mut Packer) -> PackResult<Self> {
        p.decode_arc()
    }
}

/// Packed as the borrowed `T`.
///
/// Inside an `Rc`, the cell is shared with back-references before its
/// content is decoded, so `Rc<RefCell<T>>` graphs may contain cycles.
impl<T: Pack + Default> Pack for RefCell<T> {
    const SHAPE: Shape = T::SHAPE;
    const NULL_FORM: NullForm = T::NULL_FORM;
    const SHARED: bool = T::SHARED;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        let value = self
            .try_borrow()
            .map_err(|_| PackError::AlreadyBorrowed {
                type_path: Self::type_path(),
            })?;
        value.encode(p)
    }

    #[inline]
    fn decode(p: &mut Packer) -> PackResult<Self> {
        T::decode(p).map(RefCell::new)
    }

    fn decode_rc(p: &mut Packer, slot: RefSlot) -> PackResult<Rc<Self>> {
        let cell = Rc::new(RefCell::new(T::default()));
        p.bind_ref(slot, Rc::clone(&cell));

        let value = p.decode_shared::<T>()?;
        let mut inner = cell
            .try_borrow_mut()
            .map_err(|_| PackError::AlreadyBorrowed {
                type_path: Self::type_path(),
            })?;
        *inner = value;
        drop(inner);
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use crate::{PackError, Packer};

    #[test]
    fn option_null_forms() {
        let mut packer = Packer::new();
        packer.serialize(&None::<Vec<u8>>).unwrap();
        packer.serialize(&None::<String>).unwrap();
        packer.serialize(&None::<u32>).unwrap();
        packer.serialize(&Some(String::new())).unwrap();
        packer.serialize(&Some(5u32)).unwrap();
        assert_eq!(packer.get_buffer(), &[0x00, 0x80, 0, 0, 1, 5]);

        packer.set_position(0).unwrap();
        assert_eq!(packer.deserialize::<Option<Vec<u8>>>().unwrap(), None);
        assert_eq!(packer.deserialize::<Option<String>>().unwrap(), None);
        assert_eq!(packer.deserialize::<Option<u32>>().unwrap(), None);
        assert_eq!(packer.deserialize::<Option<String>>().unwrap(), Some(String::new()));
        assert_eq!(packer.deserialize::<Option<u32>>().unwrap(), Some(5));
    }

    #[test]
    fn shared_instance_written_once() {
        let shared = Rc::new(String::from("hi"));
        let list = vec![Rc::clone(&shared), Rc::clone(&shared)];

        let mut packer = Packer::new();
        packer.serialize(&list).unwrap();
        // count, frame(len 3) around "hi", back-reference to 0
        assert_eq!(packer.get_buffer(), &[0x82, 0x83, 2, b'h', b'i', 0xC0, 0]);

        packer.set_position(0).unwrap();
        let back: Vec<Rc<String>> = packer.deserialize().unwrap();
        assert!(Rc::ptr_eq(&back[0], &back[1]));
        assert_eq!(*back[0], "hi");
    }

    #[test]
    fn identity_resets_between_root_calls() {
        let shared = Arc::new(7u64);
        let mut packer = Packer::new();
        packer.serialize(&shared).unwrap();
        packer.serialize(&shared).unwrap();
        assert_eq!(packer.get_buffer(), &[0x81, 7, 0x81, 7]);
    }

    #[test]
    fn borrowed_cell_is_reported() {
        let cell = RefCell::new(1u8);
        let _guard = cell.borrow_mut();
        let err = Packer::new().serialize(&cell).unwrap_err();
        assert!(matches!(err, PackError::AlreadyBorrowed { .. }));
    }
}
