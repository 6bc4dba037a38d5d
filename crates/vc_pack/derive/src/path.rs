//! Paths of `vc_pack` items named by generated code.
//!
//! Everything goes through the crate path resolved once per invocation,
//! see [`vc_pack`].

use proc_macro2::TokenStream;
use quote::quote;

// -----------------------------------------------------------------------------
// Crate Path

/// Get the access path to the `vc_pack` crate.
///
/// 1. For crates that depend on `vc_pack`, `::vc_pack` is returned.
/// 2. For crates that depend on `vc_binary`, `::vc_binary::pack` is returned.
/// 3. For other situations, `::vc_pack` is returned, but this may be incorrect.
///
/// This reads the caller's manifest, so it is called once per derive and
/// the result is passed around.
pub(crate) fn vc_pack() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("vc_pack"))
}

// -----------------------------------------------------------------------------
// Items

#[inline(always)]
pub(crate) fn pack_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::Pack }
}

#[inline(always)]
pub(crate) fn pack_object_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::PackObject }
}

#[inline(always)]
pub(crate) fn flat_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::Flat }
}

#[inline(always)]
pub(crate) fn packer_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::Packer }
}

#[inline(always)]
pub(crate) fn pack_result_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::PackResult }
}

#[inline(always)]
pub(crate) fn shape_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::Shape }
}

#[inline(always)]
pub(crate) fn null_form_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::NullForm }
}

#[inline(always)]
pub(crate) fn registry_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::registry }
}

#[inline(always)]
pub(crate) fn macro_exports_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::__macro_exports }
}

#[cfg(feature = "auto_register")]
#[inline(always)]
pub(crate) fn auto_register_(vc_pack_path: &syn::Path) -> TokenStream {
    quote! { #vc_pack_path::__macro_exports::auto_register }
}

#[inline(always)]
pub(crate) fn option_() -> TokenStream {
    quote! { ::core::option::Option }
}

#[inline(always)]
pub(crate) fn default_() -> TokenStream {
    quote! { ::core::default::Default }
}
