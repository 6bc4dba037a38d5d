use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Fields, Member, Type};

use super::{FieldAttributes, PackMeta};

// -----------------------------------------------------------------------------
// StructField

/// How a field takes part in the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldRole {
    /// Written in wire order.
    Packed,
    /// `#[pack(skip)]` or `PhantomData`, rebuilt with `Default`.
    Excluded,
    /// `#[pack(base)]`, walked after the own fields.
    Base,
}

#[derive(Debug)]
pub(crate) struct StructField<'a> {
    pub member: Member,
    pub ty: &'a Type,
    pub role: FieldRole,
}

impl StructField<'_> {
    /// Field name for descriptors, the index for tuple fields.
    pub fn name(&self) -> String {
        match &self.member {
            Member::Named(ident) => ident.unraw().to_string(),
            Member::Unnamed(index) => index.index.to_string(),
        }
    }

    /// Local variable holding the field while decoding.
    pub fn binding(&self) -> Ident {
        match &self.member {
            Member::Named(ident) => format_ident!("__field_{}", ident.unraw()),
            Member::Unnamed(index) => format_ident!("__field_{}", index.index),
        }
    }
}

fn is_phantom_data(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "PhantomData"),
        _ => false,
    }
}

// -----------------------------------------------------------------------------
// PackStruct

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StructStyle {
    Named,
    Tuple,
    Unit,
}

#[derive(Debug)]
pub(crate) struct PackStruct<'a> {
    meta: PackMeta<'a>,
    style: StructStyle,
    fields: Vec<StructField<'a>>,
}

impl<'a> PackStruct<'a> {
    pub fn new(meta: PackMeta<'a>, fields: &'a Fields) -> syn::Result<Self> {
        let style = match fields {
            Fields::Named(_) => StructStyle::Named,
            Fields::Unnamed(_) => StructStyle::Tuple,
            Fields::Unit => StructStyle::Unit,
        };

        let mut parsed = Vec::with_capacity(fields.len());
        let mut base_seen = false;

        for (index, field) in fields.iter().enumerate() {
            let attrs = FieldAttributes::parse_attrs(&field.attrs)?;
            let member = match &field.ident {
                Some(ident) => Member::Named(ident.clone()),
                None => Member::Unnamed(index.into()),
            };

            let role = if let Some(span) = attrs.base {
                if base_seen {
                    return Err(syn::Error::new(span, "only one field can be `base`"));
                }
                if meta.attrs().plain.is_some() {
                    return Err(syn::Error::new(span, "`plain` types cannot have a `base` field"));
                }
                base_seen = true;
                FieldRole::Base
            } else if attrs.skip.is_some() || is_phantom_data(&field.ty) {
                FieldRole::Excluded
            } else {
                FieldRole::Packed
            };

            parsed.push(StructField {
                member,
                ty: &field.ty,
                role,
            });
        }

        Ok(Self {
            meta,
            style,
            fields: parsed,
        })
    }

    #[inline]
    pub fn meta(&self) -> &PackMeta<'a> {
        &self.meta
    }

    /// Packed fields in declaration order.
    pub fn declared_fields(&self) -> impl Iterator<Item = &StructField<'a>> {
        self.fields
            .iter()
            .filter(|field| field.role == FieldRole::Packed)
    }

    /// Packed fields in wire order: named fields sorted by name, tuple
    /// fields by position.
    pub fn wire_fields(&self) -> Vec<&StructField<'a>> {
        let mut fields: Vec<_> = self.declared_fields().collect();
        if self.style == StructStyle::Named {
            fields.sort_by_key(|field| field.name());
        }
        fields
    }

    pub fn base_field(&self) -> Option<&StructField<'a>> {
        self.fields
            .iter()
            .find(|field| field.role == FieldRole::Base)
    }

    /// Builds `Self` from the decoding bindings, excluded fields from
    /// `Default`.
    pub fn construct(&self) -> TokenStream {
        let default_ = crate::path::default_();
        let values = self.fields.iter().map(|field| match field.role {
            FieldRole::Excluded => quote! { #default_::default() },
            FieldRole::Packed | FieldRole::Base => {
                let binding = field.binding();
                quote! { #binding }
            }
        });

        match self.style {
            StructStyle::Unit => quote! { Self },
            StructStyle::Tuple => quote! { Self( #(#values),* ) },
            StructStyle::Named => {
                let members = self.fields.iter().map(|field| &field.member);
                quote! { Self { #(#members: #values),* } }
            }
        }
    }
}
