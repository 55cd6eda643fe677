//! # morph-macros
//!
//! Derive macro that turns plain Rust structs into typed morph models.
//!
//! `#[derive(Model)]` generates the schema, the record conversions and the
//! nested-type registration that the mapping engine needs. The struct must
//! implement `Default`; it is used as the factory for new destinations and
//! for fields marked `skip`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use morph::Model;
//!
//! #[derive(Model, Default)]
//! #[morph(name = "UserDto")]
//! struct UserDto {
//!     id: i64,
//!     #[morph(rename = "FullName")]
//!     full_name: Option<String>,
//!     #[morph(skip)]
//!     cached: bool,
//! }
//! ```
//!
//! ## Supported Attributes
//!
//! - `#[morph(name = "...")]` - Type name used in the registry (struct only)
//! - `#[morph(rename = "...")]` - Member name used in the schema
//! - `#[morph(skip)]` - Field is not part of the schema

mod codegen;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive `ModelValue` and `Model` for a struct with named fields.
#[proc_macro_derive(Model, attributes(morph))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match parse::parse_model(&input) {
        Ok(model) => codegen::generate_model(&model).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
