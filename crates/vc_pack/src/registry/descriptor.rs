use alloc::boxed::Box;
use core::any::TypeId;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::hash::TypeIdMap;
use crate::{Pack, Shape};

// -----------------------------------------------------------------------------
// FieldDescriptor

/// One included field of a derived object.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    name: &'static str,
    type_path: &'static str,
    type_id: TypeId,
    shape: Shape,
}

impl FieldDescriptor {
    /// Describes a field named `name` of type `T`.
    ///
    /// Tuple fields are named by their index.
    pub fn of<T: Pack>(name: &'static str) -> Self {
        Self {
            name,
            type_path: T::type_path(),
            type_id: TypeId::of::<T>(),
            shape: T::SHAPE,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// Field layout of a derived type, in wire order.
///
/// Named fields are sorted by name, tuple fields keep their position.
/// Fields marked `#[pack(skip)]` and `PhantomData` fields are left out.
/// Fields of the `#[pack(base)]` type follow in [`base`](Self::base).
///
/// Built on first use and cached for the process lifetime.
///
/// # Examples
///
/// ```
/// use vc_pack::Pack;
///
/// #[derive(Pack, Default)]
/// struct Entity {
///     id: u64,
/// }
///
/// #[derive(Pack)]
/// struct Player {
///     score: u32,
///     name: String,
///     #[pack(skip)]
///     cached: Option<u32>,
///     #[pack(base)]
///     entity: Entity,
/// }
///
/// let desc = Player::descriptor().unwrap();
/// let names: Vec<_> = desc.fields().iter().map(|f| f.name()).collect();
/// assert_eq!(names, ["name", "score"]);
/// assert_eq!(desc.base().unwrap().fields()[0].name(), "id");
/// ```
#[derive(Debug)]
pub struct TypeDescriptor {
    type_path: &'static str,
    type_name: &'static str,
    shape: Shape,
    fields: Box<[FieldDescriptor]>,
    base: Option<&'static TypeDescriptor>,
}

impl TypeDescriptor {
    /// Creates a descriptor of `T` with no fields.
    pub fn new<T: Pack>(type_name: &'static str) -> Self {
        Self {
            type_path: T::type_path(),
            type_name,
            shape: T::SHAPE,
            fields: Box::new([]),
            base: None,
        }
    }

    /// Sets the fields, which must already be in wire order.
    pub fn with_fields(mut self, fields: impl Into<Box<[FieldDescriptor]>>) -> Self {
        self.fields = fields.into();
        self
    }

    pub fn with_base(mut self, base: Option<&'static TypeDescriptor>) -> Self {
        self.base = base;
        self
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    /// The type identifier without module path.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Own fields, excluding the base type's.
    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[inline]
    pub fn base(&self) -> Option<&'static TypeDescriptor> {
        self.base
    }

    /// Own fields followed by the fields of every base, in wire order.
    pub fn walk_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        core::iter::successors(Some(self), |desc| desc.base).flat_map(|desc| desc.fields.iter())
    }

    /// Looks a field up by name, own fields first.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.walk_fields().find(|field| field.name == name)
    }
}

// -----------------------------------------------------------------------------
// Cells

/// Storage of the descriptor of a non-generic type.
///
/// Used as a `static` inside [`Pack::descriptor`].
pub struct NonGenericDescriptorCell(OnceLock<TypeDescriptor>);

impl NonGenericDescriptorCell {
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the descriptor, building it with `f` on first access.
    #[inline]
    pub fn get_or_init(&'static self, f: impl FnOnce() -> TypeDescriptor) -> &'static TypeDescriptor {
        self.0.get_or_init(f)
    }
}

/// Storage of the descriptors of a generic type.
///
/// A `static` inside a generic function is shared by every instantiation,
/// so descriptors are keyed by the concrete `TypeId`. Each descriptor is
/// leaked once and lives for the rest of the process.
pub struct GenericDescriptorCell(RwLock<Option<TypeIdMap<&'static TypeDescriptor>>>);

impl GenericDescriptorCell {
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(None))
    }

    /// Returns the descriptor of `G`, building it with `f` on first access.
    pub fn get_or_insert<G: 'static>(
        &'static self,
        f: impl FnOnce() -> TypeDescriptor,
    ) -> &'static TypeDescriptor {
        let type_id = TypeId::of::<G>();

        match self.get_by_type_id(type_id) {
            Some(desc) => desc,
            None => self.insert_by_type_id(type_id, f()),
        }
    }

    fn get_by_type_id(&self, type_id: TypeId) -> Option<&'static TypeDescriptor> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|map| map.get(&type_id).copied())
    }

    // Keeps the first descriptor if another builder finished meanwhile.
    fn insert_by_type_id(&self, type_id: TypeId, value: TypeDescriptor) -> &'static TypeDescriptor {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        let map = guard.get_or_insert_with(TypeIdMap::default);
        *map.entry(type_id)
            .or_insert_with(|| Box::leak(Box::new(value)))
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::{FieldDescriptor, GenericDescriptorCell, TypeDescriptor};
    use crate::Shape;

    fn describe<T: 'static>(name: &'static str) -> &'static TypeDescriptor {
        static CELL: GenericDescriptorCell = GenericDescriptorCell::new();
        CELL.get_or_insert::<T>(|| {
            TypeDescriptor::new::<u8>(name).with_fields([FieldDescriptor::of::<u32>(name)])
        })
    }

    #[test]
    fn generic_cell_separates_instantiations() {
        let a = describe::<u8>("a");
        let b = describe::<u16>("b");
        let again = describe::<u8>("ignored");

        assert!(core::ptr::eq(a, again));
        assert_eq!(a.type_name(), "a");
        assert_eq!(b.type_name(), "b");
        assert_eq!(b.fields()[0].shape(), Shape::Scalar);
    }

    fn layered<T: 'static>() -> &'static TypeDescriptor {
        static CELL: GenericDescriptorCell = GenericDescriptorCell::new();
        CELL.get_or_insert::<T>(|| {
            let base = (TypeId::of::<T>() != TypeId::of::<u8>()).then(layered::<u8>);
            TypeDescriptor::new::<u8>("layer").with_base(base)
        })
    }

    #[test]
    fn builder_may_use_the_same_cell() {
        let top = layered::<u16>();
        let base = top.base().unwrap();
        assert!(core::ptr::eq(base, layered::<u8>()));
        assert!(base.base().is_none());
    }

    #[test]
    fn walk_includes_base_fields() {
        static BASE: std::sync::OnceLock<TypeDescriptor> = std::sync::OnceLock::new();
        let base = BASE.get_or_init(|| {
            TypeDescriptor::new::<u8>("Base").with_fields([FieldDescriptor::of::<u8>("id")])
        });
        let desc = TypeDescriptor::new::<u16>("Derived")
            .with_fields([FieldDescriptor::of::<u16>("value")])
            .with_base(Some(base));

        let names: alloc::vec::Vec<_> = desc.walk_fields().map(|f| f.name()).collect();
        assert_eq!(names, ["value", "id"]);
        assert!(desc.field("id").is_some());
        assert!(desc.field("missing").is_none());
    }
}
