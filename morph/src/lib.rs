//! # morph
//!
//! Convention-based object-graph mapping between explicitly described types.
//!
//! ## Features
//!
//! - **`engine`** (default) - schemas, registry, compiled plans and executor
//! - **`derive`** (default) - `#[derive(Model)]` for typed models
//!
//! ## Example
//!
//! ```rust,ignore
//! use morph::prelude::*;
//!
//! #[derive(Model, Default)]
//! struct User {
//!     id: i64,
//!     first_name: String,
//!     last_name: String,
//! }
//!
//! #[derive(Model, Default)]
//! struct UserDto {
//!     id: i64,
//!     full_name: String,
//! }
//!
//! let mapper = MapperConfiguration::new()
//!     .add_profile_fn("users", |maps| {
//!         maps.create_model_map::<User, UserDto>()
//!             .for_member("full_name", |m| {
//!                 m.map_from(|u| Value::from(format!("{} {}", u.get("first_name"), u.get("last_name"))))
//!             });
//!     })
//!     .build()?;
//!
//! let dto: UserDto = mapper.map(&user)?;
//! ```

// Re-export the engine
#[cfg(feature = "engine")]
pub use morph_engine as engine;

#[cfg(feature = "engine")]
pub use morph_engine::{Mapper, MapperConfiguration, MapperError, Model, ModelValue, Result};

// The derive macro and the trait share a name in separate namespaces
#[cfg(feature = "derive")]
pub use morph_macros::Model;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "engine")]
    pub use morph_engine::{
        EngineConfig, ExecutionMode, Mapper, MapperConfiguration, MapperError, MemberType, Model,
        ModelValue, Object, ObjectRef, Profile, RegistryBuilder, TypeSchema, Value,
    };

    #[cfg(feature = "derive")]
    pub use morph_macros::Model;
}
