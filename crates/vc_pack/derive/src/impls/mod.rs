//! Code generation of `#[derive(Pack)]`.

// -----------------------------------------------------------------------------
// Modules

mod auto_register;
mod enum_kind;
mod object;
mod plain;
mod type_info;

// -----------------------------------------------------------------------------
// Internal API

use auto_register::impl_auto_register;
use enum_kind::impl_enum;
use object::impl_object;
use plain::impl_plain;
use type_info::impl_type_info;

use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::PackDerive;

pub(crate) fn impl_pack(derive: &PackDerive) -> TokenStream {
    let pack_impls = match derive {
        PackDerive::Object(data) => impl_object(data),
        PackDerive::Plain(data) => impl_plain(data),
        PackDerive::Enum(data) => impl_enum(data),
    };
    let auto_register = impl_auto_register(derive.meta());

    quote! {
        #pack_impls
        #auto_register
    }
}
