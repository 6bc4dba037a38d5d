//! Items used by `#[derive(Pack)]` generated code. Not public API.

use alloc::format;

use crate::PackError;

pub use alloc::boxed::Box;
pub use alloc::vec::Vec;

/// Error of a discriminant no variant of `type_path` carries.
#[cold]
pub fn unknown_variant(type_path: &'static str, discriminant: i64) -> PackError {
    PackError::invalid(format!("unknown discriminant {discriminant} for `{type_path}`"))
}

/// Error of an object whose own-field level is empty but whose marker
/// byte is not `0`.
#[cold]
pub fn bad_empty_marker(type_path: &'static str, found: u8) -> PackError {
    PackError::invalid(format!("expected empty marker for `{type_path}`, found {found:#04x}"))
}

#[cfg(feature = "auto_register")]
pub mod auto_register {
    pub use inventory;

    use crate::packer::Packer;
    use crate::registry::TypeRegistry;
    use crate::{Pack, PackResult, Shape};

    /// A registration function submitted by `#[pack(auto_register)]`.
    pub struct AutoRegistration(pub fn(&mut TypeRegistry));

    inventory::collect!(AutoRegistration);

    /// Registered by this crate itself; its presence after
    /// [`register_types`] proves static registration works here.
    pub struct AvailableFlag;

    impl Pack for AvailableFlag {
        const SHAPE: Shape = Shape::Custom;

        fn encode(&self, _: &mut Packer) -> PackResult<()> {
            Ok(())
        }

        fn decode(_: &mut Packer) -> PackResult<Self> {
            Ok(AvailableFlag)
        }
    }

    fn register_flag(registry: &mut TypeRegistry) {
        registry.register::<AvailableFlag>();
    }

    inventory::submit! {
        AutoRegistration(register_flag)
    }

    pub fn register_types(registry: &mut TypeRegistry) {
        for registration in inventory::iter::<AutoRegistration> {
            (registration.0)(registry);
        }
    }
}
