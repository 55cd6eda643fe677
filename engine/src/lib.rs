//! # morph-engine
//!
//! Convention-based object-graph mapping between explicitly described types.
//!
//! The engine is configured once and then used from any number of threads:
//!
//! - **Schemas** - [`TypeSchema`] describes the members of every mapped type
//! - **Registry** - definitions per (source, destination) pair, with member
//!   rules, hooks and options, compiled into member plans at build time
//! - **Executor** - recursive mapping with reference preservation, depth
//!   limits and full or null-skipping updates
//! - **Typed layer** - [`Model`] converts Rust structs to and from the dynamic
//!   object model (usually via `#[derive(Model)]` from the `morph` crate)
//!
//! ## Example
//!
//! ```rust,ignore
//! use morph_engine::{MapperConfiguration, MemberType, Object, ObjectRef, TypeSchema, Value};
//!
//! let mapper = MapperConfiguration::new()
//!     .register_type(
//!         TypeSchema::builder("User")
//!             .member("Id", MemberType::Int)
//!             .member("FirstName", MemberType::String)
//!             .member("LastName", MemberType::String)
//!             .build(),
//!     )
//!     .register_type(
//!         TypeSchema::builder("UserDto")
//!             .member("Id", MemberType::Int)
//!             .member("FullName", MemberType::String)
//!             .build(),
//!     )
//!     .add_profile_fn("users", |maps| {
//!         maps.create_map("User", "UserDto").for_member("FullName", |m| {
//!             m.map_from(|u| Value::from(format!("{} {}", u.get("FirstName"), u.get("LastName"))))
//!         });
//!     })
//!     .build()?;
//!
//! let user = ObjectRef::new(Object::new("User").with("Id", 1).with("FirstName", "A").with("LastName", "B"));
//! let dto = mapper.transform(&user, "UserDto")?;
//! ```

pub mod accessor;
pub mod compiler;
pub mod config;
pub mod convention;
pub mod definition;
pub mod error;
pub mod executor;
pub mod global;
pub mod mapper;
pub mod model;
pub mod profile;
pub mod registry;
pub mod schema;
pub mod telemetry;
pub mod value;

pub use accessor::{Accessor, AccessorCache};
pub use compiler::MapPlan;
pub use config::EngineConfig;
pub use convention::{ConventionMatcher, MemberMatch};
pub use definition::{MapExpression, MappingDefinition, MemberOptions, MemberRule, ValueSource};
pub use error::{ConfigWarning, MapperError, Result};
pub use executor::{ExecutionContext, ExecutionMode};
pub use mapper::{Mapper, MapperConfiguration};
pub use model::{Model, ModelValue};
pub use profile::{profile_fn, FnProfile, Profile};
pub use registry::{Registry, RegistryBuilder};
pub use schema::{
    Access, MemberPath, MemberSchema, MemberType, SchemaSet, TypeName, TypePair, TypeSchema,
    TypeSchemaBuilder,
};
pub use telemetry::{init as init_telemetry, TelemetryConfig};
pub use value::{Object, ObjectRef, Value};
