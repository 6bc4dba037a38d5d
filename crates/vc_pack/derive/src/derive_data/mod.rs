//! Provide some tools for parsing the derive input.

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod pack_enum;
mod pack_meta;
mod pack_struct;

// -----------------------------------------------------------------------------
// Internal API

pub(crate) use attributes::{FieldAttributes, TypeAttributes};
pub(crate) use pack_enum::PackEnum;
pub(crate) use pack_meta::PackMeta;
pub(crate) use pack_struct::{PackStruct, StructField};

use syn::{Data, DeriveInput, GenericParam, spanned::Spanned};

/// The layout chosen for a derive input.
#[derive(Debug)]
pub(crate) enum PackDerive<'a> {
    /// A length-framed field walk.
    Object(PackStruct<'a>),
    /// `#[pack(plain)]`: fixed-width, copied flat.
    Plain(PackStruct<'a>),
    /// A fieldless enum.
    Enum(PackEnum<'a>),
}

impl<'a> PackDerive<'a> {
    pub fn from_input(input: &'a DeriveInput) -> syn::Result<Self> {
        if let Some(param) = input
            .generics
            .params
            .iter()
            .find(|param| matches!(param, GenericParam::Lifetime(_)))
        {
            return Err(syn::Error::new(
                param.span(),
                "`Pack` cannot be derived for types with lifetime parameters",
            ));
        }

        let attrs = TypeAttributes::parse_attrs(&input.attrs)?;
        let plain = attrs.plain.is_some();
        let meta = PackMeta::new(attrs, &input.ident, &input.generics);

        match &input.data {
            Data::Struct(data) => {
                let data = PackStruct::new(meta, &data.fields)?;
                Ok(if plain {
                    Self::Plain(data)
                } else {
                    Self::Object(data)
                })
            }
            Data::Enum(data) => PackEnum::new(meta, &data.variants).map(Self::Enum),
            Data::Union(data) => Err(syn::Error::new(
                data.union_token.span,
                "`Pack` cannot be derived for unions",
            )),
        }
    }

    pub fn meta(&self) -> &PackMeta<'a> {
        match self {
            Self::Object(data) | Self::Plain(data) => data.meta(),
            Self::Enum(data) => data.meta(),
        }
    }
}
