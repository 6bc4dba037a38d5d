use alloc::boxed::Box;
use core::any::{Any, TypeId, type_name};
use core::fmt;

use crate::packer::Packer;
use crate::registry::TypeDescriptor;
use crate::{Pack, PackError, PackResult, Shape};

/// Type-erased encoder of a [`DispatchEntry`].
pub type EncodeFn = fn(&dyn Any, &mut Packer) -> PackResult<()>;

/// Type-erased decoder of a [`DispatchEntry`].
pub type DecodeFn = fn(&mut Packer) -> PackResult<Box<dyn Any>>;

/// The resolved strategy of one concrete type.
///
/// Built once per type by [`DispatchEntry::of`] and stored in a
/// [`TypeRegistry`](crate::registry::TypeRegistry). Everything inside is
/// `'static` and `Copy`, so entries can be copied out of a locked
/// registry before use.
#[derive(Clone, Copy)]
pub struct DispatchEntry {
    type_id: TypeId,
    type_path: &'static str,
    name: &'static str,
    shape: Shape,
    descriptor: Option<&'static TypeDescriptor>,
    /// Writes a `&dyn Any` holding this type.
    pub encode: EncodeFn,
    /// Reads a boxed value of this type.
    pub decode: DecodeFn,
}

fn encode_erased<T: Pack>(value: &dyn Any, p: &mut Packer) -> PackResult<()> {
    match value.downcast_ref::<T>() {
        Some(value) => value.encode(p),
        None => Err(PackError::TypeMismatch {
            expected: type_name::<T>(),
            found: "a value of another type".into(),
        }),
    }
}

fn decode_erased<T: Pack>(p: &mut Packer) -> PackResult<Box<dyn Any>> {
    T::decode(p).map(|value| Box::new(value) as Box<dyn Any>)
}

impl DispatchEntry {
    /// Resolves the entry of `T`, registered under [`Pack::type_path`].
    pub fn of<T: Pack>() -> Self {
        Self::named::<T>(T::type_path())
    }

    /// Resolves the entry of `T`, registered under `name`.
    pub fn named<T: Pack>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_path: T::type_path(),
            name,
            shape: T::SHAPE,
            descriptor: T::descriptor(),
            encode: encode_erased::<T>,
            decode: decode_erased::<T>,
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    /// The name written on the wire by [`Tagged`](crate::registry::Tagged).
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The field layout, for derived object types.
    #[inline]
    pub fn descriptor(&self) -> Option<&'static TypeDescriptor> {
        self.descriptor
    }
}

impl fmt::Debug for DispatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEntry")
            .field("type_path", &self.type_path)
            .field("name", &self.name)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}
