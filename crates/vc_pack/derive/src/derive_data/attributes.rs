//! Parsing of `#[pack(...)]` attributes.

use proc_macro2::Span;
use syn::{Attribute, LitStr};

use crate::PACK_ATTRIBUTE_NAME;

// -----------------------------------------------------------------------------
// TypeAttributes

/// Attributes on the deriving type.
///
/// - `#[pack(auto_register)]`
/// - `#[pack(name = "...")]`
/// - `#[pack(plain)]`
#[derive(Default, Debug)]
pub(crate) struct TypeAttributes {
    /// Submit the type to the static registry. Ignored on generic types.
    pub auto_register: Option<Span>,
    /// Overrides the registered name, which defaults to the module path
    /// followed by the type identifier.
    pub name: Option<LitStr>,
    /// Fixed-width, field-by-field little-endian layout.
    pub plain: Option<Span>,
}

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();

        for attr in attrs {
            if !attr.path().is_ident(PACK_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("auto_register") {
                    this.auto_register = Some(attr_span(&meta));
                    Ok(())
                } else if meta.path.is_ident("plain") {
                    this.plain = Some(attr_span(&meta));
                    Ok(())
                } else if meta.path.is_ident("name") {
                    let name: LitStr = meta.value()?.parse()?;
                    if name.value().is_empty() {
                        return Err(syn::Error::new(name.span(), "`name` cannot be empty"));
                    }
                    this.name = Some(name);
                    Ok(())
                } else {
                    Err(meta.error(
                        "unknown type attribute, expected `auto_register`, `name` or `plain`",
                    ))
                }
            })?;
        }

        Ok(this)
    }
}

// -----------------------------------------------------------------------------
// FieldAttributes

/// Attributes on a field.
///
/// - `#[pack(skip)]`: not packed, rebuilt with `Default`.
/// - `#[pack(base)]`: the field is the base object, walked after own fields.
#[derive(Default, Debug)]
pub(crate) struct FieldAttributes {
    pub skip: Option<Span>,
    pub base: Option<Span>,
}

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();

        for attr in attrs {
            if !attr.path().is_ident(PACK_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    this.skip = Some(attr_span(&meta));
                    Ok(())
                } else if meta.path.is_ident("base") {
                    this.base = Some(attr_span(&meta));
                    Ok(())
                } else {
                    Err(meta.error("unknown field attribute, expected `skip` or `base`"))
                }
            })?;
        }

        if let (Some(_), Some(span)) = (this.skip, this.base) {
            return Err(syn::Error::new(span, "a `base` field cannot be skipped"));
        }

        Ok(this)
    }
}

#[inline]
fn attr_span(meta: &syn::meta::ParseNestedMeta) -> Span {
    syn::spanned::Spanned::span(&meta.path)
}
