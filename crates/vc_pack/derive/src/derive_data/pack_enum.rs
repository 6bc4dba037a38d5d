use syn::{Fields, Ident, Variant, punctuated::Punctuated, spanned::Spanned, token::Comma};

use super::PackMeta;

/// A fieldless enum, packed as its discriminant.
#[derive(Debug)]
pub(crate) struct PackEnum<'a> {
    meta: PackMeta<'a>,
    variants: Vec<&'a Ident>,
}

impl<'a> PackEnum<'a> {
    pub fn new(meta: PackMeta<'a>, variants: &'a Punctuated<Variant, Comma>) -> syn::Result<Self> {
        if let Some(span) = meta.attrs().plain {
            return Err(syn::Error::new(span, "`plain` is only supported on structs"));
        }
        if variants.is_empty() {
            return Err(syn::Error::new(
                meta.ident().span(),
                "`Pack` cannot be derived for enums without variants",
            ));
        }

        let variants = variants
            .iter()
            .map(|variant| match variant.fields {
                Fields::Unit => Ok(&variant.ident),
                _ => Err(syn::Error::new(
                    variant.fields.span(),
                    "`Pack` can only be derived for enums whose variants have no fields",
                )),
            })
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(Self { meta, variants })
    }

    #[inline]
    pub fn meta(&self) -> &PackMeta<'a> {
        &self.meta
    }

    #[inline]
    pub fn variants(&self) -> &[&'a Ident] {
        &self.variants
    }
}
