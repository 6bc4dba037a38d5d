use proc_macro2::TokenStream;

use crate::derive_data::PackMeta;

/// Submits the type to the static registry.
///
/// Generic types are skipped, their instantiations are unknown here.
#[cfg(feature = "auto_register")]
pub(crate) fn impl_auto_register(meta: &PackMeta) -> TokenStream {
    use quote::quote_spanned;

    let Some(span) = meta.attrs().auto_register else {
        return crate::utils::empty();
    };
    if meta.is_generic() {
        return crate::utils::empty();
    }

    let vc_pack_path = meta.vc_pack_path();
    let auto_register_ = crate::path::auto_register_(vc_pack_path);
    let registry_ = crate::path::registry_(vc_pack_path);
    let ident = meta.ident();

    quote_spanned! { span =>
        const _: () = {
            fn __register(registry: &mut #registry_::TypeRegistry) {
                registry.register::<#ident>();
            }

            #auto_register_::inventory::submit! {
                #auto_register_::AutoRegistration(__register)
            }
        };
    }
}

#[cfg(not(feature = "auto_register"))]
pub(crate) fn impl_auto_register(_: &PackMeta) -> TokenStream {
    crate::utils::empty()
}
