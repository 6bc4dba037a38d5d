use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{GenericParam, Generics, Ident, Path};

use super::TypeAttributes;

/// What every kind of derived type shares: the crate path, the type
/// attributes and the type's identity.
pub(crate) struct PackMeta<'a> {
    vc_pack_path: Path,
    attrs: TypeAttributes,
    ident: &'a Ident,
    generics: &'a Generics,
}

impl core::fmt::Debug for PackMeta<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PackMeta")
            .field("vc_pack_path", &self.vc_pack_path.to_token_stream())
            .field("ident", self.ident)
            .field("attrs", &self.attrs)
            .finish()
    }
}

impl<'a> PackMeta<'a> {
    #[inline]
    pub fn new(attrs: TypeAttributes, ident: &'a Ident, generics: &'a Generics) -> Self {
        Self {
            vc_pack_path: crate::path::vc_pack(),
            attrs,
            ident,
            generics,
        }
    }

    #[inline]
    pub fn vc_pack_path(&self) -> &Path {
        &self.vc_pack_path
    }

    #[inline]
    pub fn attrs(&self) -> &TypeAttributes {
        &self.attrs
    }

    #[inline]
    pub fn ident(&self) -> &Ident {
        self.ident
    }

    /// Whether the type has type or const parameters.
    pub fn is_generic(&self) -> bool {
        self.generics
            .params
            .iter()
            .any(|param| !matches!(param, GenericParam::Lifetime(_)))
    }

    /// Splits the generics for an impl block, adding `Param: #bound` for
    /// every type parameter, followed by the `extra` predicates.
    ///
    /// Returns `(impl_generics, type_generics, where_clause)` tokens.
    pub fn split_generics_with(
        &self,
        bound: &TokenStream,
        extra: impl IntoIterator<Item = TokenStream>,
    ) -> (TokenStream, TokenStream, TokenStream) {
        let mut generics = self.generics.clone();
        let params: Vec<Ident> = generics
            .type_params()
            .map(|param| param.ident.clone())
            .collect();

        let where_clause = generics.make_where_clause();
        for param in params {
            where_clause.predicates.push(syn::parse_quote!(#param: #bound));
        }
        for predicate in extra {
            where_clause.predicates.push(syn::parse_quote!(#predicate));
        }

        let (impl_generics, type_generics, where_clause) = generics.split_for_impl();
        (
            impl_generics.to_token_stream(),
            type_generics.to_token_stream(),
            where_clause.to_token_stream(),
        )
    }

    /// The name registered for the type, if it can be known at compile time.
    ///
    /// Generic types fall back to `core::any::type_name`.
    pub fn type_path_expr(&self) -> Option<TokenStream> {
        if let Some(name) = &self.attrs.name {
            return Some(name.to_token_stream());
        }
        if self.is_generic() {
            return None;
        }
        let ident = self.ident.to_string();
        Some(quote! {
            ::core::concat!(::core::module_path!(), "::", #ident)
        })
    }
}
