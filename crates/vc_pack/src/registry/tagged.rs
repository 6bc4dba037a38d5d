use alloc::boxed::Box;
use alloc::string::ToString;
use core::any::{Any, TypeId, type_name};
use core::fmt;

use crate::header;
use crate::packer::Packer;
use crate::registry::{DispatchEntry, SharedRegistry};
use crate::{NullForm, Pack, PackError, PackResult, Shape};

/// A value of a type chosen at runtime, written with its registered name.
///
/// The name is a string header followed by the value as packed by its
/// [`DispatchEntry`]. Decoding looks the name up in the packer's registry,
/// so the concrete type must be registered there, either by a previous
/// root call, by [`TypeRegistry::register`] or by `#[pack(auto_register)]`.
///
/// [`TypeRegistry::register`]: crate::registry::TypeRegistry::register
///
/// # Examples
///
/// ```
/// use vc_pack::Packer;
/// use vc_pack::registry::Tagged;
///
/// let items = vec![Tagged::new(7u32), Tagged::new(String::from("seven"))];
///
/// let mut packer = Packer::new();
/// packer.serialize(&items).unwrap();
///
/// packer.set_position(0).unwrap();
/// let decoded: Vec<Tagged> = packer.deserialize().unwrap();
/// assert_eq!(decoded[0].downcast_ref::<u32>(), Some(&7));
/// assert_eq!(decoded[1].downcast_ref::<String>().unwrap(), "seven");
/// ```
pub struct Tagged {
    value: Box<dyn Any>,
    register: fn(&SharedRegistry),
}

fn already_registered(_: &SharedRegistry) {}

impl Tagged {
    /// Wraps `value`, registering `T` on first encode if needed.
    pub fn new<T: Pack>(value: T) -> Self {
        Self {
            value: Box::new(value),
            register: SharedRegistry::ensure::<T>,
        }
    }

    /// Wraps a boxed value whose type is already registered.
    pub fn from_box(value: Box<dyn Any>) -> Self {
        Self {
            value,
            register: already_registered,
        }
    }

    #[inline]
    pub fn value_type_id(&self) -> TypeId {
        (*self.value).type_id()
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    #[inline]
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut()
    }

    /// Takes the value out, or returns `self` unchanged if it is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self {
                value,
                register: self.register,
            }),
        }
    }

    #[inline]
    pub fn into_inner(self) -> Box<dyn Any> {
        self.value
    }

    fn entry(&self, p: &Packer) -> PackResult<DispatchEntry> {
        (self.register)(p.registry());
        let type_id = self.value_type_id();
        p.registry()
            .read()
            .get(type_id)
            .copied()
            .ok_or_else(|| PackError::UnregisteredType {
                type_name: alloc::format!("{type_id:?}").into(),
            })
    }
}

impl fmt::Debug for Tagged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tagged").field(&self.value_type_id()).finish()
    }
}

impl Pack for Tagged {
    const SHAPE: Shape = Shape::Custom;
    const NULL_FORM: NullForm = NullForm::Str;

    fn encode(&self, p: &mut Packer) -> PackResult<()> {
        let entry = self.entry(p)?;
        // The name keeps its header in raw mode too.
        header::write_str(p.buffer_mut(), entry.name())?;
        (entry.encode)(&*self.value, p)
    }

    fn decode(p: &mut Packer) -> PackResult<Self> {
        let Some(name) = header::read_string(p.buffer_mut())? else {
            return Err(PackError::invalid("null type name in tagged value"));
        };
        let entry = p
            .registry()
            .read()
            .get_with_name(&name)
            .copied()
            .ok_or_else(|| PackError::UnregisteredType {
                type_name: name.to_string().into(),
            })?;
        (entry.decode)(p).map(Self::from_box)
    }

    fn type_path() -> &'static str {
        type_name::<Self>()
    }
}
