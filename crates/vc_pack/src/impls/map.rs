use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};

use super::sequence::{decode_each, preallocate};
use crate::{NullForm, Pack, PackResult, Packer, Shape};

macro_rules! impl_pack_hash_map {
    ($($map:ident)::+) => {
        impl<K, V, S> Pack for $($map)::+<K, V, S>
        where
            K: Pack + Eq + Hash,
            V: Pack,
            S: BuildHasher + Default + 'static,
        {
            const SHAPE: Shape = Shape::KeyValue;
            const NULL_FORM: NullForm = NullForm::Map;

            fn encode(&self, p: &mut Packer) -> PackResult<()> {
                p.write_count(self.len())?;
                for (key, value) in self {
                    key.encode(p)?;
                    value.encode(p)?;
                }
                Ok(())
            }

            fn decode(p: &mut Packer) -> PackResult<Self> {
                let count = p.read_count()?;
                let mut map = Self::with_capacity_and_hasher(preallocate(count, p), S::default());
                decode_each::<(K, V)>(count, p, |(key, value)| {
                    map.insert(key, value);
                })?;
                Ok(map)
            }
        }
    };
}

impl_pack_hash_map!(std::collections::HashMap);
impl_pack_hash_map!(hashbrown::HashMap);

impl<K: Pack + Ord, V: Pack> Pack for BTreeMap<K, V> {
    const SHAPE: Shape = Shape::KeyValue;
    const NULL_FORM: NullForm = NullForm::Map;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        p.write_count(self.len())?;
        for (key, value) in self {
            key.encode(p)?;
            value.encode(p)?;
        }
        Ok(())
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let count = p.read_count()?;
        let mut map = BTreeMap::new();
        decode_each::<(K, V)>(count, p, |(key, value)| {
            map.insert(key, value);
        })?;
        Ok(map)
    }
}

// -----------------------------------------------------------------------------
// Grouping

/// One key with the values grouped under it.
///
/// Packed as the key followed by the values as a sequence.
///
/// # Examples
///
/// ```
/// use vc_pack::Packer;
/// use vc_pack::impls::Grouping;
///
/// let group = Grouping::new(String::from("odd"), vec![1u32, 3, 5]);
///
/// let mut packer = Packer::new();
/// packer.serialize(&group).unwrap();
///
/// packer.set_position(0).unwrap();
/// assert_eq!(packer.deserialize::<Grouping<String, u32>>().unwrap(), group);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Grouping<K, V> {
    pub key: K,
    pub values: Vec<V>,
}

impl<K, V> Grouping<K, V> {
    #[inline]
    pub const fn new(key: K, values: Vec<V>) -> Self {
        Self { key, values }
    }
}

impl<K: Pack, V: Pack> Pack for Grouping<K, V> {
    const SHAPE: Shape = Shape::Grouping;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        self.key.encode(p)?;
        self.values.encode(p)
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let key = K::decode(p)?;
        let values = Vec::<V>::decode(p)?;
        Ok(Self { key, values })
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::string::String;

    use crate::Packer;
    use crate::hash::FixedHashState;

    #[test]
    fn ordered_map_layout() {
        let map = BTreeMap::from([(1u8, String::from("a")), (2, String::from("bc"))]);
        let mut packer = Packer::new();
        packer.serialize(&map).unwrap();
        assert_eq!(packer.get_buffer(), &[0x82, 1, 1, b'a', 2, 2, b'b', b'c']);

        packer.set_position(0).unwrap();
        assert_eq!(packer.deserialize::<BTreeMap<u8, String>>().unwrap(), map);
    }

    #[test]
    fn hash_maps_round_trip() {
        let mut map = hashbrown::HashMap::with_hasher(FixedHashState);
        map.insert(String::from("k"), -5i64);
        map.insert(String::from("j"), 9);

        let mut packer = Packer::new();
        packer.serialize(&map).unwrap();
        packer.set_position(0).unwrap();
        let back: hashbrown::HashMap<String, i64, FixedHashState> = packer.deserialize().unwrap();
        assert_eq!(back, map);

        let std_map: std::collections::HashMap<u16, bool> = [(3, true)].into_iter().collect();
        packer.serialize(&std_map).unwrap();
        packer.set_position(packer.length() - 3).unwrap();
        assert_eq!(
            packer.deserialize::<std::collections::HashMap<u16, bool>>().unwrap(),
            std_map
        );
    }
}
