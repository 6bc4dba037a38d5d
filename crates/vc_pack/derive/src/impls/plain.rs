use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::PackStruct;

/// `Flat` and `Pack` of a `#[pack(plain)]` struct.
///
/// Fields are laid out back to back in declaration order, each as its own
/// `Flat` bytes. There is no header, so sequences are one contiguous run.
pub(crate) fn impl_plain(data: &PackStruct) -> TokenStream {
    let meta = data.meta();
    let vc_pack_path = meta.vc_pack_path();
    let pack_ = crate::path::pack_(vc_pack_path);
    let flat_ = crate::path::flat_(vc_pack_path);
    let packer_ = crate::path::packer_(vc_pack_path);
    let pack_result_ = crate::path::pack_result_(vc_pack_path);
    let shape_ = crate::path::shape_(vc_pack_path);
    let option_ = crate::path::option_();
    let macro_exports_ = crate::path::macro_exports_(vc_pack_path);

    let ident = meta.ident();
    let fields: Vec<_> = data.declared_fields().collect();

    let (flat_generics, flat_ty_generics, flat_where) =
        meta.split_generics_with(&flat_, None::<TokenStream>);
    let pack_bound = quote! { #flat_ + #pack_ };
    let (impl_generics, ty_generics, where_clause) =
        meta.split_generics_with(&pack_bound, None::<TokenStream>);

    let widths: Vec<TokenStream> = fields
        .iter()
        .map(|field| {
            let ty = field.ty;
            quote! { <#ty as #flat_>::WIDTH }
        })
        .collect();

    // Offset of field `i` is the sum of the widths before it.
    let ranges: Vec<TokenStream> = (0..fields.len())
        .map(|i| {
            let before = &widths[..i];
            let width = &widths[i];
            quote! { (0usize #(+ #before)*)..(0usize #(+ #before)* + #width) }
        })
        .collect();

    let writes = fields.iter().zip(&ranges).map(|(field, range)| {
        let ty = field.ty;
        let member = &field.member;
        quote! { <#ty as #flat_>::write_flat(&self.#member, &mut out[#range]); }
    });

    let reads = fields.iter().zip(&ranges).map(|(field, range)| {
        let ty = field.ty;
        let binding = field.binding();
        quote! { let #binding = <#ty as #flat_>::read_flat(&bytes[#range])?; }
    });

    let (unused_out, unused_bytes) = if fields.is_empty() {
        (quote! { let _ = out; }, quote! { let _ = bytes; })
    } else {
        (crate::utils::empty(), crate::utils::empty())
    };

    let construct = data.construct();
    let type_info = super::impl_type_info(meta, &fields, None);

    quote! {
        impl #flat_generics #flat_ for #ident #flat_ty_generics #flat_where {
            const WIDTH: usize = 0usize #(+ #widths)*;

            fn write_flat(&self, out: &mut [u8]) {
                #unused_out
                #(#writes)*
            }

            fn read_flat(bytes: &[u8]) -> #pack_result_<Self> {
                #unused_bytes
                #(#reads)*
                ::core::result::Result::Ok(#construct)
            }
        }

        impl #impl_generics #pack_ for #ident #ty_generics #where_clause {
            const SHAPE: #shape_ = #shape_::Plain;

            #[inline]
            fn encode(&self, p: &mut #packer_) -> #pack_result_<()> {
                #vc_pack_path::encode_flat_seq(::core::slice::from_ref(self), p)
            }

            fn decode(p: &mut #packer_) -> #pack_result_<Self> {
                let bytes = p.read_bytes(<Self as #flat_>::WIDTH)?;
                <Self as #flat_>::read_flat(bytes)
            }

            #[inline]
            fn encode_seq(items: &[Self], p: &mut #packer_) -> #pack_result_<()> {
                #vc_pack_path::encode_flat_seq(items, p)
            }

            #[inline]
            fn decode_seq(
                count: #option_<usize>,
                p: &mut #packer_,
            ) -> #pack_result_<#macro_exports_::Vec<Self>> {
                #vc_pack_path::decode_flat_seq(count, p)
            }

            #type_info
        }
    }
}
