//! Code generation for `#[derive(Model)]`.
//!
//! Emits `ModelValue` and `Model` impls against `::morph::engine`, so the
//! derive works for any crate that depends on `morph`.

use proc_macro2::TokenStream;
use quote::quote;

use crate::parse::ModelInput;

pub fn generate_model(model: &ModelInput) -> TokenStream {
    let ident = &model.ident;
    let type_name = &model.type_name;

    let mapped: Vec<_> = model.mapped_fields().collect();
    let field_idents: Vec<_> = mapped.iter().map(|f| &f.ident).collect();
    let field_types: Vec<_> = mapped.iter().map(|f| &f.ty).collect();
    let members: Vec<_> = mapped.iter().map(|f| f.member.as_str()).collect();
    let skipped: Vec<_> = model.skipped_fields().map(|f| &f.ident).collect();

    quote! {
        impl ::morph::engine::ModelValue for #ident {
            fn member_type() -> ::morph::engine::MemberType {
                ::morph::engine::MemberType::Object(
                    <Self as ::morph::engine::Model>::type_name(),
                )
            }

            fn to_value(&self) -> ::morph::engine::Value {
                ::morph::engine::Value::Object(<Self as ::morph::engine::Model>::to_object(self))
            }

            fn from_value(value: &::morph::engine::Value) -> ::morph::engine::Result<Self> {
                ::morph::engine::model::model_from_value::<Self>(value)
            }

            fn register_types(schemas: &mut ::morph::engine::SchemaSet) {
                if ::morph::engine::model::insert_schema::<Self>(schemas) {
                    #(
                        <#field_types as ::morph::engine::ModelValue>::register_types(schemas);
                    )*
                }
            }
        }

        impl ::morph::engine::Model for #ident {
            fn type_name() -> ::morph::engine::TypeName {
                ::morph::engine::TypeName::new(#type_name)
            }

            fn schema() -> ::morph::engine::TypeSchema {
                ::morph::engine::TypeSchema::builder(<Self as ::morph::engine::Model>::type_name())
                    #(
                        .member(
                            #members,
                            <#field_types as ::morph::engine::ModelValue>::member_type(),
                        )
                    )*
                    .factory(|| {
                        ::std::result::Result::Ok(<Self as ::morph::engine::Model>::to_record(
                            &<Self as ::std::default::Default>::default(),
                        ))
                    })
                    .build()
            }

            #[allow(unused_mut)]
            fn to_record(&self) -> ::morph::engine::Object {
                let mut record =
                    ::morph::engine::Object::new(<Self as ::morph::engine::Model>::type_name());
                #(
                    record.set(
                        #members,
                        ::morph::engine::ModelValue::to_value(&self.#field_idents),
                    );
                )*
                record
            }

            #[allow(unused_variables)]
            fn from_record(
                record: &::morph::engine::Object,
            ) -> ::morph::engine::Result<Self> {
                ::std::result::Result::Ok(Self {
                    #(
                        #field_idents: ::morph::engine::model::read_member(record, #members)?,
                    )*
                    #(
                        #skipped: ::std::default::Default::default(),
                    )*
                })
            }
        }
    }
}
