//! Attribute parsing for `#[derive(Model)]`.
//!
//! Struct level: `#[morph(name = "UserDto")]`.
//! Field level: `#[morph(rename = "FullName")]` and `#[morph(skip)]`.

use std::collections::HashSet;

use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Token, Type};

#[derive(Debug)]
pub struct ModelInput {
    pub ident: Ident,
    pub type_name: String,
    pub fields: Vec<ModelField>,
}

#[derive(Debug)]
pub struct ModelField {
    pub ident: Ident,
    pub ty: Type,
    /// Member name in the generated schema.
    pub member: String,
    pub skip: bool,
}

impl ModelInput {
    pub fn mapped_fields(&self) -> impl Iterator<Item = &ModelField> + '_ {
        self.fields.iter().filter(|f| !f.skip)
    }

    pub fn skipped_fields(&self) -> impl Iterator<Item = &ModelField> + '_ {
        self.fields.iter().filter(|f| f.skip)
    }
}

enum MorphArg {
    Name(Ident, LitStr),
    Rename(Ident, LitStr),
    Skip(Ident),
}

impl MorphArg {
    fn key(&self) -> &Ident {
        match self {
            MorphArg::Name(key, _) | MorphArg::Rename(key, _) | MorphArg::Skip(key) => key,
        }
    }
}

impl Parse for MorphArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let key: Ident = input.call(Ident::parse_any)?;
        match key.to_string().as_str() {
            "name" => {
                input.parse::<Token![=]>()?;
                Ok(MorphArg::Name(key, input.parse()?))
            }
            "rename" => {
                input.parse::<Token![=]>()?;
                Ok(MorphArg::Rename(key, input.parse()?))
            }
            "skip" => Ok(MorphArg::Skip(key)),
            other => Err(syn::Error::new(
                key.span(),
                format!(
                    "unknown morph attribute `{}`; expected `name`, `rename` or `skip`",
                    other
                ),
            )),
        }
    }
}

fn morph_args(attrs: &[Attribute]) -> syn::Result<Vec<MorphArg>> {
    let mut args = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("morph")) {
        let parsed =
            attr.parse_args_with(Punctuated::<MorphArg, Token![,]>::parse_terminated)?;
        args.extend(parsed);
    }
    Ok(args)
}

fn validate_name(lit: &LitStr) -> syn::Result<String> {
    let value = lit.value();
    if value.trim().is_empty() {
        return Err(syn::Error::new_spanned(lit, "morph names cannot be empty"));
    }
    Ok(value)
}

pub fn parse_model(input: &DeriveInput) -> syn::Result<ModelInput> {
    if !input.generics.params.is_empty() || input.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Model)] does not support generic structs",
        ));
    }

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "#[derive(Model)] requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "#[derive(Model)] can only be applied to structs",
            ))
        }
    };

    let mut type_name = input.ident.unraw().to_string();
    for arg in morph_args(&input.attrs)? {
        match arg {
            MorphArg::Name(_, lit) => type_name = validate_name(&lit)?,
            other => {
                return Err(syn::Error::new_spanned(
                    other.key(),
                    "only `name` is allowed on the struct",
                ))
            }
        }
    }

    let mut fields = Vec::with_capacity(named.named.len());
    let mut seen = HashSet::new();
    for field in &named.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let mut member = ident.unraw().to_string();
        let mut skip = false;
        for arg in morph_args(&field.attrs)? {
            match arg {
                MorphArg::Rename(_, lit) => member = validate_name(&lit)?,
                MorphArg::Skip(_) => skip = true,
                MorphArg::Name(key, _) => {
                    return Err(syn::Error::new_spanned(
                        key,
                        "use `rename` on fields; `name` belongs on the struct",
                    ))
                }
            }
        }
        if !skip && !seen.insert(member.clone()) {
            return Err(syn::Error::new_spanned(
                &ident,
                format!("duplicate member name `{}`", member),
            ));
        }
        fields.push(ModelField {
            ident,
            ty: field.ty.clone(),
            member,
            skip,
        });
    }

    Ok(ModelInput {
        ident: input.ident.clone(),
        type_name,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_names_and_fields() {
        let input: DeriveInput = parse_quote! {
            #[morph(name = "UserDto")]
            struct User {
                id: i64,
                #[morph(rename = "FullName")]
                full_name: String,
                #[morph(skip)]
                cache: Vec<u8>,
                r#type: String,
            }
        };

        let model = parse_model(&input).unwrap();
        assert_eq!(model.type_name, "UserDto");
        let members: Vec<&str> = model.mapped_fields().map(|f| f.member.as_str()).collect();
        assert_eq!(members, vec!["id", "FullName", "type"]);
        let skipped: Vec<String> = model.skipped_fields().map(|f| f.ident.to_string()).collect();
        assert_eq!(skipped, vec!["cache"]);
    }

    #[test]
    fn test_default_type_name_is_struct_name() {
        let input: DeriveInput = parse_quote! {
            struct Address { city: String }
        };
        assert_eq!(parse_model(&input).unwrap().type_name, "Address");
    }

    #[test]
    fn test_rejects_tuple_structs_and_enums() {
        let tuple: DeriveInput = parse_quote! { struct Pair(i32, i32); };
        assert!(parse_model(&tuple).is_err());

        let enumeration: DeriveInput = parse_quote! { enum Kind { A, B } };
        assert!(parse_model(&enumeration).is_err());
    }

    #[test]
    fn test_rejects_generics() {
        let input: DeriveInput = parse_quote! { struct Wrapper<T> { inner: T } };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("generic"));
    }

    #[test]
    fn test_rejects_unknown_and_misplaced_keys() {
        let unknown: DeriveInput = parse_quote! {
            struct A { #[morph(flatten)] b: i32 }
        };
        assert!(parse_model(&unknown)
            .unwrap_err()
            .to_string()
            .contains("unknown morph attribute"));

        let misplaced: DeriveInput = parse_quote! {
            #[morph(skip)]
            struct A { b: i32 }
        };
        assert!(parse_model(&misplaced).is_err());
    }

    #[test]
    fn test_rejects_duplicate_member_names() {
        let input: DeriveInput = parse_quote! {
            struct A {
                name: String,
                #[morph(rename = "name")]
                other: String,
            }
        };
        assert!(parse_model(&input)
            .unwrap_err()
            .to_string()
            .contains("duplicate member"));
    }
}
