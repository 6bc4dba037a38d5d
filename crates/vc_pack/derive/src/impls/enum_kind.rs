use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::PackEnum;

/// `Pack` of a fieldless enum: the discriminant as a zig-zag `i64`.
pub(crate) fn impl_enum(data: &PackEnum) -> TokenStream {
    let meta = data.meta();
    let vc_pack_path = meta.vc_pack_path();
    let pack_ = crate::path::pack_(vc_pack_path);
    let packer_ = crate::path::packer_(vc_pack_path);
    let pack_result_ = crate::path::pack_result_(vc_pack_path);
    let shape_ = crate::path::shape_(vc_pack_path);
    let macro_exports_ = crate::path::macro_exports_(vc_pack_path);

    let ident = meta.ident();
    let variants = data.variants();
    let (impl_generics, ty_generics, where_clause) =
        meta.split_generics_with(&pack_, None::<TokenStream>);

    let type_info = super::impl_type_info(meta, &[], None);

    quote! {
        impl #impl_generics #pack_ for #ident #ty_generics #where_clause {
            const SHAPE: #shape_ = #shape_::Enum;

            fn encode(&self, p: &mut #packer_) -> #pack_result_<()> {
                let discriminant: i64 = match self {
                    #( Self::#variants => Self::#variants as i64, )*
                };
                p.write_zigzag(discriminant)
            }

            fn decode(p: &mut #packer_) -> #pack_result_<Self> {
                let discriminant = p.read_zigzag()?;
                #(
                    if discriminant == Self::#variants as i64 {
                        return ::core::result::Result::Ok(Self::#variants);
                    }
                )*
                ::core::result::Result::Err(#macro_exports_::unknown_variant(
                    <Self as #pack_>::type_path(),
                    discriminant,
                ))
            }

            #type_info
        }
    }
}
