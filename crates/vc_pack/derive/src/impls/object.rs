use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::PackStruct;

/// `Pack` and `PackObject` of a length-framed struct.
///
/// Own fields come first in wire order, then the fields of the `base`
/// object. A level without own fields writes a single `0` byte.
pub(crate) fn impl_object(data: &PackStruct) -> TokenStream {
    let meta = data.meta();
    let vc_pack_path = meta.vc_pack_path();
    let pack_ = crate::path::pack_(vc_pack_path);
    let pack_object_ = crate::path::pack_object_(vc_pack_path);
    let packer_ = crate::path::packer_(vc_pack_path);
    let pack_result_ = crate::path::pack_result_(vc_pack_path);
    let shape_ = crate::path::shape_(vc_pack_path);
    let null_form_ = crate::path::null_form_(vc_pack_path);
    let macro_exports_ = crate::path::macro_exports_(vc_pack_path);

    let ident = meta.ident();
    let fields = data.wire_fields();
    let base = data.base_field();

    let base_predicate = base.filter(|_| meta.is_generic()).map(|field| {
        let ty = field.ty;
        quote! { #ty: #pack_object_ }
    });
    let (impl_generics, ty_generics, where_clause) =
        meta.split_generics_with(&pack_, base_predicate);

    let (write_marker, read_marker) = if fields.is_empty() {
        (
            quote! { p.write_u8(0)?; },
            quote! {
                let marker = p.read_u8()?;
                if marker != 0 {
                    return ::core::result::Result::Err(#macro_exports_::bad_empty_marker(
                        <Self as #pack_>::type_path(),
                        marker,
                    ));
                }
            },
        )
    } else {
        (crate::utils::empty(), crate::utils::empty())
    };

    let encode_fields = fields.iter().map(|field| {
        let ty = field.ty;
        let member = &field.member;
        quote! { <#ty as #pack_>::encode(&self.#member, p)?; }
    });

    let decode_fields = fields.iter().map(|field| {
        let ty = field.ty;
        let binding = field.binding();
        quote! { let #binding = <#ty as #pack_>::decode(p)?; }
    });

    let (encode_base, decode_base) = match base {
        Some(field) => {
            let ty = field.ty;
            let member = &field.member;
            let binding = field.binding();
            (
                quote! { <#ty as #pack_object_>::encode_fields(&self.#member, p)?; },
                quote! { let #binding = <#ty as #pack_object_>::decode_fields(p)?; },
            )
        }
        None => (crate::utils::empty(), crate::utils::empty()),
    };

    let construct = data.construct();
    let type_info = super::impl_type_info(meta, &fields, base);

    quote! {
        impl #impl_generics #pack_ for #ident #ty_generics #where_clause {
            const SHAPE: #shape_ = #shape_::Object;
            const NULL_FORM: #null_form_ = #null_form_::Map;

            #[inline]
            fn encode(&self, p: &mut #packer_) -> #pack_result_<()> {
                p.encode_object(self)
            }

            #[inline]
            fn decode(p: &mut #packer_) -> #pack_result_<Self> {
                p.decode_object::<Self>()
            }

            #type_info
        }

        impl #impl_generics #pack_object_ for #ident #ty_generics #where_clause {
            fn encode_fields(&self, p: &mut #packer_) -> #pack_result_<()> {
                #write_marker
                #(#encode_fields)*
                #encode_base
                ::core::result::Result::Ok(())
            }

            fn decode_fields(p: &mut #packer_) -> #pack_result_<Self> {
                #read_marker
                #(#decode_fields)*
                #decode_base
                ::core::result::Result::Ok(#construct)
            }
        }
    }
}
