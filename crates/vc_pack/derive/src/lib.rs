//! `#[derive(Pack)]` for `vc_pack`.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static PACK_ATTRIBUTE_NAME: &str = "pack";

// -----------------------------------------------------------------------------
// Modules

mod derive_data;
mod impls;
mod path;
mod utils;

// -----------------------------------------------------------------------------
// Macros

/// # Pack Derivation
///
/// Implements `Pack` with a layout chosen from the shape of the type.
///
/// ## Objects
///
/// Structs with named fields, tuple structs and unit structs become
/// length-framed objects and also implement `PackObject`.
///
/// - Named fields are written sorted by name, tuple fields by position.
/// - Fields marked `#[pack(skip)]` and `PhantomData` fields are not written;
///   decoding fills them with `Default::default()`.
/// - A struct without written fields writes a single `0` byte.
///
/// ```rust, ignore
/// #[derive(Pack)]
/// struct Player {
///     name: String,
///     score: u32,
///     #[pack(skip)]
///     cached_rank: Option<u32>,
/// }
/// ```
///
/// ### Base objects
///
/// One field can be marked `#[pack(base)]`. Its own fields are walked after
/// the deriving type's fields, inside the same frame, and its descriptor is
/// linked as `TypeDescriptor::base`. The field type must itself derive an
/// object layout.
///
/// ```rust, ignore
/// #[derive(Pack, Default)]
/// struct Entity { id: u64 }
///
/// #[derive(Pack)]
/// struct Monster {
///     hp: u32,
///     #[pack(base)]
///     entity: Entity,
/// }
/// ```
///
/// ## Enums
///
/// Enums whose variants have no fields are written as their discriminant,
/// a zig-zag `i64`. Enums with fields are rejected.
///
/// ## Plain structs
///
/// `#[pack(plain)]` lays the fields out back to back as `Flat` bytes, in
/// declaration order, without any header. Every written field must
/// implement `Flat`. Sequences of plain structs are copied as one run.
///
/// ```rust, ignore
/// #[derive(Pack, Clone, Copy)]
/// #[pack(plain)]
/// struct Vec3 { x: f32, y: f32, z: f32 }
/// ```
///
/// ## Registration
///
/// - `#[pack(name = "...")]` sets the name used by `Tagged` and in error
///   reports. The default is the module path followed by the identifier.
/// - `#[pack(auto_register)]` registers the type in the global registry
///   before first use. No effect on generic types, or when the
///   `auto_register` feature is disabled.
///
/// ## Generics
///
/// Type parameters get a `Pack` bound. Lifetime parameters are rejected.
#[proc_macro_derive(Pack, attributes(pack))]
pub fn derive_pack(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match derive_data::PackDerive::from_input(&ast) {
        Ok(derive) => impls::impl_pack(&derive).into(),
        Err(err) => err.into_compile_error().into(),
    }
}
