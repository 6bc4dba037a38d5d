use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::{PackMeta, StructField};

/// `type_path` and `descriptor` items of a `Pack` impl.
///
/// `fields` must be in wire order.
pub(crate) fn impl_type_info(
    meta: &PackMeta,
    fields: &[&StructField],
    base: Option<&StructField>,
) -> TokenStream {
    let vc_pack_path = meta.vc_pack_path();
    let pack_ = crate::path::pack_(vc_pack_path);
    let registry_ = crate::path::registry_(vc_pack_path);
    let option_ = crate::path::option_();

    let type_path = meta.type_path_expr().map(|expr| {
        quote! {
            #[inline]
            fn type_path() -> &'static str {
                #expr
            }
        }
    });

    let type_name = meta.ident().to_string();

    let with_fields = if fields.is_empty() {
        crate::utils::empty()
    } else {
        let descriptors = fields.iter().map(|field| {
            let ty = field.ty;
            let name = field.name();
            quote! { #registry_::FieldDescriptor::of::<#ty>(#name) }
        });
        quote! { .with_fields([ #(#descriptors),* ]) }
    };

    let with_base = base.map(|field| {
        let ty = field.ty;
        quote! { .with_base(<#ty as #pack_>::descriptor()) }
    });

    let build = quote! {
        || #registry_::TypeDescriptor::new::<Self>(#type_name) #with_fields #with_base
    };

    let cell = if meta.is_generic() {
        quote! {
            static CELL: #registry_::GenericDescriptorCell = #registry_::GenericDescriptorCell::new();
            #option_::Some(CELL.get_or_insert::<Self>(#build))
        }
    } else {
        quote! {
            static CELL: #registry_::NonGenericDescriptorCell = #registry_::NonGenericDescriptorCell::new();
            #option_::Some(CELL.get_or_init(#build))
        }
    };

    quote! {
        #type_path

        fn descriptor() -> #option_<&'static #registry_::TypeDescriptor> {
            #cell
        }
    }
}
