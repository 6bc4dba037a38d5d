//! Runtime dispatch of packable types.
//!
//! Every concrete type reaching a root call of a [`Packer`](crate::Packer)
//! is resolved once into a [`DispatchEntry`]: its [`Shape`](crate::Shape),
//! type-erased encode/decode functions and, for derived types, a
//! [`TypeDescriptor`] of its fields. Entries are cached in a
//! [`TypeRegistry`] and never change afterwards.
//!
//! The process-wide registry is [`SharedRegistry::global`]. A packer may
//! use a private one through [`PackOptions::with_registry`].
//!
//! Types derived with `#[pack(auto_register)]` are collected with the
//! [`inventory`] crate and registered when the global registry is built,
//! so they can be decoded by name without being touched first.
//!
//! [`PackOptions::with_registry`]: crate::PackOptions::with_registry
//! [`inventory`]: https://docs.rs/inventory

// -----------------------------------------------------------------------------
// Modules

mod descriptor;
mod entry;
mod tagged;
mod type_registry;

// -----------------------------------------------------------------------------
// Exports

pub use descriptor::{FieldDescriptor, GenericDescriptorCell, NonGenericDescriptorCell, TypeDescriptor};
pub use entry::{DecodeFn, DispatchEntry, EncodeFn};
pub use tagged::Tagged;
pub use type_registry::{SharedRegistry, TypeRegistry};
