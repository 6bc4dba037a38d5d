use alloc::sync::Arc;
use core::any::TypeId;
use core::fmt;
use std::sync::{LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::Pack;
use crate::hash::{FixedHashState, TypeIdMap};
use crate::registry::DispatchEntry;

// -----------------------------------------------------------------------------
// TypeRegistry

/// Dispatch entries by [`TypeId`] and by registered name.
///
/// Entries are added on first encounter of a type and never change
/// afterwards. Registering a type twice keeps the first entry.
///
/// # Examples
///
/// ```
/// use core::any::TypeId;
/// use vc_pack::registry::TypeRegistry;
///
/// let mut registry = TypeRegistry::empty();
/// assert!(registry.register::<u32>());
/// assert!(!registry.register::<u32>());
///
/// let entry = registry.get(TypeId::of::<u32>()).unwrap();
/// assert_eq!(registry.get_with_name(entry.name()).unwrap().type_id(), TypeId::of::<u32>());
/// ```
pub struct TypeRegistry {
    entries: TypeIdMap<DispatchEntry>,
    names: HashMap<&'static str, TypeId, FixedHashState>,
}

impl Default for TypeRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names.keys()).finish()
    }
}

impl TypeRegistry {
    /// Creates a registry without any entry.
    pub fn empty() -> Self {
        Self {
            entries: TypeIdMap::default(),
            names: HashMap::default(),
        }
    }

    /// Creates a registry with the primitive types and `String`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<bool>();
        registry.register::<char>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<u128>();
        registry.register::<usize>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<i128>();
        registry.register::<isize>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<alloc::string::String>();
        registry
    }

    /// Registers `T` under [`Pack::type_path`].
    ///
    /// Returns `false` if `T` was already registered.
    pub fn register<T: Pack>(&mut self) -> bool {
        self.insert(DispatchEntry::of::<T>())
    }

    /// Registers `T` under `name`.
    pub fn register_named<T: Pack>(&mut self, name: &'static str) -> bool {
        self.insert(DispatchEntry::named::<T>(name))
    }

    /// Inserts `entry` unless its type is already present.
    ///
    /// A name already used by another type keeps pointing to that type and
    /// a warning is logged.
    pub fn insert(&mut self, entry: DispatchEntry) -> bool {
        match self.entries.entry(entry.type_id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                match self.names.entry(entry.name()) {
                    Entry::Vacant(name) => {
                        name.insert(entry.type_id());
                    }
                    Entry::Occupied(_) => {
                        log::warn!(
                            "name `{}` is already registered, `{}` is only reachable by type",
                            entry.name(),
                            entry.type_path()
                        );
                    }
                }
                log::trace!("registered dispatch entry for `{}`", entry.type_path());
                slot.insert(entry);
                true
            }
        }
    }

    /// Registers every type submitted with `#[pack(auto_register)]`.
    ///
    /// Repeated calls are cheap and do not duplicate entries.
    ///
    /// Returns `false` if the `auto_register` feature is disabled or the
    /// platform does not support static registration.
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            use crate::__macro_exports::auto_register::{AvailableFlag, register_types};

            if self.contains(TypeId::of::<AvailableFlag>()) {
                return true;
            }
            register_types(self);
            self.contains(TypeId::of::<AvailableFlag>())
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.entries.contains_key(&type_id)
    }

    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&DispatchEntry> {
        self.entries.get(&type_id)
    }

    pub fn get_with_name(&self, name: &str) -> Option<&DispatchEntry> {
        self.names.get(name).and_then(|id| self.entries.get(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &DispatchEntry> {
        self.entries.values()
    }
}

// -----------------------------------------------------------------------------
// SharedRegistry

/// A [`TypeRegistry`] behind `Arc<RwLock<..>>`.
///
/// Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct SharedRegistry {
    internal: Arc<RwLock<TypeRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            internal: Arc::new(RwLock::new(registry)),
        }
    }

    /// The process-wide registry.
    ///
    /// Built on first access from the primitive types and every
    /// `#[pack(auto_register)]` type.
    pub fn global() -> &'static SharedRegistry {
        static GLOBAL: LazyLock<SharedRegistry> = LazyLock::new(|| {
            let mut registry = TypeRegistry::new();
            registry.auto_register();
            SharedRegistry::new(registry)
        });
        &GLOBAL
    }

    /// Takes a read lock on the underlying [`TypeRegistry`].
    pub fn read(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.internal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the underlying [`TypeRegistry`].
    pub fn write(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.internal
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `T` on first encounter.
    ///
    /// Only takes the write lock if `T` is missing.
    pub fn ensure<T: Pack>(&self) {
        if self.read().contains(TypeId::of::<T>()) {
            return;
        }
        self.write().register::<T>();
    }
}

impl fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read().fmt(f)
    }
}
