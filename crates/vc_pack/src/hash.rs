//! Hash states used by the engine's maps.
//!
//! `FixedHashState` is `foldhash` with a fixed seed, so that iteration
//! order only depends on the inserted keys. `NoOpHashState` passes an
//! already well distributed key (a [`TypeId`]) straight through.

use core::any::TypeId;
use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};
use hashbrown::HashMap;

const FIXED_HASH_STATE: FixedState = FixedState::with_seed(0x6A09_E667_F3BC_C908);

// -----------------------------------------------------------------------------
// FixedHashState

#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FoldHasher<'static>;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_HASH_STATE.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// NoOpHashState

#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct NoOpHasher {
    hash: u64,
}

impl Hasher for NoOpHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes.iter().rev() {
            self.hash = self.hash.rotate_left(8).wrapping_add(*byte as u64);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }
}

#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct NoOpHashState;

impl BuildHasher for NoOpHashState {
    type Hasher = NoOpHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        NoOpHasher::default()
    }
}

/// `HashMap` keyed by [`TypeId`].
pub(crate) type TypeIdMap<V> = HashMap<TypeId, V, NoOpHashState>;

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::TypeIdMap;

    #[test]
    fn type_id_map_keeps_distinct_types() {
        let mut map = TypeIdMap::default();
        map.insert(TypeId::of::<u8>(), 1);
        map.insert(TypeId::of::<u16>(), 2);
        map.insert(TypeId::of::<u8>(), 3);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&TypeId::of::<u8>()), Some(&3));
        assert_eq!(map.get(&TypeId::of::<u16>()), Some(&2));
    }
}
