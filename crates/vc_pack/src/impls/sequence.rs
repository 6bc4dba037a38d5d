use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};

use crate::pack::decode_raw_element;
use crate::{NullForm, Pack, PackError, PackResult, Packer, Shape};

/// Reads `count` items one by one, or every remaining item for `None`.
///
/// Used by collections that cannot hand a slice to [`Pack::encode_seq`],
/// so both sides go through the per-item encoding.
pub(crate) fn decode_each<T: Pack>(
    count: Option<usize>,
    p: &mut Packer,
    mut push: impl FnMut(T),
) -> PackResult<()> {
    match count {
        Some(count) => {
            for _ in 0..count {
                push(T::decode(p)?);
            }
        }
        None => {
            while p.remaining() > 0 {
                push(decode_raw_element(p)?);
            }
        }
    }
    Ok(())
}

/// Capacity to preallocate for `count` items, bounded by the unread bytes
/// so a corrupt count cannot force a huge allocation.
#[inline]
pub(crate) fn preallocate(count: Option<usize>, p: &Packer) -> usize {
    count.unwrap_or(0).min(p.remaining())
}

// -----------------------------------------------------------------------------
// Vec

impl<T: Pack> Pack for Vec<T> {
    const SHAPE: Shape = T::SEQ_SHAPE;
    const NULL_FORM: NullForm = NullForm::Map;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_count(self.len())?;
        T::encode_seq(self, p)
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let count = p.read_count()?;
        T::decode_seq(count, p)
    }
}

impl<T: Pack> Pack for VecDeque<T> {
    const SHAPE: Shape = T::SEQ_SHAPE;
    const NULL_FORM: NullForm = NullForm::Map;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_count(self.len())?;
        let (front, back) = self.as_slices();
        T::encode_seq(front, p)?;
        T::encode_seq(back, p)
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let count = p.read_count()?;
        T::decode_seq(count, p).map(VecDeque::from)
    }
}

/// Arrays have a known length and carry no header.
impl<T: Pack, const N: usize> Pack for [T; N] {
    const SHAPE: Shape = T::SEQ_SHAPE;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        T::encode_seq(self, p)
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let items = T::decode_seq(Some(N), p)?;
        <[T; N]>::try_from(items).map_err(|_| PackError::invalid("array length mismatch"))
    }
}

// -----------------------------------------------------------------------------
// Sets

impl<T, S> Pack for std::collections::HashSet<T, S>
where
    T: Pack + Eq + Hash,
    S: BuildHasher + Default + 'static,
{
    const SHAPE: Shape = Shape::Sequence;
    const NULL_FORM: NullForm = NullForm::Map;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_count(self.len())?;
        self.iter().try_for_each(|item| item.encode(p))
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let count = p.read_count()?;
        let mut set = Self::with_capacity_and_hasher(preallocate(count, p), S::default());
        decode_each(count, p, |item| {
            set.insert(item);
        })?;
        Ok(set)
    }
}

impl<T, S> Pack for hashbrown::HashSet<T, S>
where
    T: Pack + Eq + Hash,
    S: BuildHasher + Default + 'static,
{
    const SHAPE: Shape = Shape::Sequence;
    const NULL_FORM: NullForm = NullForm::Map;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_count(self.len())?;
        self.iter().try_for_each(|item| item.encode(p))
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let count = p.read_count()?;
        let mut set = Self::with_capacity_and_hasher(preallocate(count, p), S::default());
        decode_each(count, p, |item| {
            set.insert(item);
        })?;
        Ok(set)
    }
}

impl<T: Pack + Ord> Pack for BTreeSet<T> {
    const SHAPE: Shape = Shape::Sequence;
    const NULL_FORM: NullForm = NullForm::Map;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_count(self.len())?;
        self.iter().try_for_each(|item| item.encode(p))
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let count = p.read_count()?;
        let mut set = BTreeSet::new();
        decode_each(count, p, |item| {
            set.insert(item);
        })?;
        Ok(set)
    }
}

// -----------------------------------------------------------------------------
// Tuples

macro_rules! impl_pack_tuple {
    ($($name:ident),+) => {
        impl<$($name: Pack),+> Pack for ($($name,)+) {
            const SHAPE: Shape = Shape::Custom;

            #[allow(non_snake_case)]
            fn encode(&self, p: &mut Packer) -> PackResult<()> {
                let ($($name,)+) = self;
                $($name.encode(p)?;)+
                Ok(())
            }

            fn decode(p: &mut Packer) -> PackResult<Self> {
                Ok(($($name::decode(p)?,)+))
            }
        }
    };
}

impl_pack_tuple!(A);
impl_pack_tuple!(A, B);
impl_pack_tuple!(A, B, C);
impl_pack_tuple!(A, B, C, D);
impl_pack_tuple!(A, B, C, D, E);
impl_pack_tuple!(A, B, C, D, E, F);

#[cfg(test)]
mod tests {
    use alloc::collections::{BTreeSet, VecDeque};
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::{PackError, Packer};

    #[test]
    fn empty_and_non_empty_vectors() {
        let mut packer = Packer::new();
        packer.serialize(&Vec::<String>::new()).unwrap();
        packer.serialize(&vec![String::from("a")]).unwrap();
        assert_eq!(packer.get_buffer(), &[0x80, 0x81, 1, b'a']);

        packer.set_position(0).unwrap();
        assert!(packer.deserialize::<Vec<String>>().unwrap().is_empty());
        assert_eq!(packer.deserialize::<Vec<String>>().unwrap(), ["a"]);
    }

    #[test]
    fn null_header_is_not_a_vector() {
        let mut packer = Packer::from_bytes(vec![0x00]);
        let err = packer.deserialize::<Vec<u32>>().unwrap_err();
        assert!(matches!(err, PackError::InvalidEncoding { .. }));
    }

    #[test]
    fn deque_and_array_and_set() {
        let mut deque = VecDeque::from([2i32, 3]);
        deque.push_front(1);
        let set: BTreeSet<String> = ["x", "y"].into_iter().map(String::from).collect();

        let mut packer = Packer::new();
        packer.serialize(&deque).unwrap();
        packer.serialize(&[7u8, 8, 9]).unwrap();
        packer.serialize(&set).unwrap();
        packer.serialize(&(5u8, String::from("t"))).unwrap();

        packer.set_position(0).unwrap();
        assert_eq!(packer.deserialize::<VecDeque<i32>>().unwrap(), [1, 2, 3]);
        assert_eq!(packer.deserialize::<[u8; 3]>().unwrap(), [7, 8, 9]);
        assert_eq!(packer.deserialize::<BTreeSet<String>>().unwrap(), set);
        let (n, t) = packer.deserialize::<(u8, String)>().unwrap();
        assert_eq!((n, t.as_str()), (5, "t"));
    }

    #[test]
    fn huge_count_fails_without_allocating() {
        // header claims 0x3FFF_FFFF strings
        let mut packer = Packer::from_bytes(vec![0x40, 0xFE, 0xFF, 0xFF, 0xFF, 0x07]);
        assert!(packer.deserialize::<Vec<String>>().unwrap_err().is_end_of_data());
    }
}
