//! The mapping service and its configuration builder.

use crate::config::EngineConfig;
use crate::definition::MapExpression;
use crate::error::{ConfigWarning, MapperError, Result};
use crate::executor::{ExecutionContext, ExecutionMode};
use crate::model::Model;
use crate::profile::{profile_fn, Profile};
use crate::registry::{Registry, RegistryBuilder};
use crate::schema::{TypeName, TypePair, TypeSchema};
use crate::value::ObjectRef;
use std::sync::Arc;

/// Collects schemas, profiles and definitions, then builds a [`Mapper`].
///
/// ```rust,ignore
/// let mapper = MapperConfiguration::new()
///     .register_type(user_schema())
///     .register_type(user_dto_schema())
///     .add_profile(UserProfile)
///     .build()?;
/// ```
pub struct MapperConfiguration {
    config: EngineConfig,
    maps: RegistryBuilder,
    profiles: Vec<String>,
}

impl Default for MapperConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl MapperConfiguration {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            maps: RegistryBuilder::new(),
            profiles: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register_type(mut self, schema: TypeSchema) -> Self {
        self.maps.register_type(schema);
        self
    }

    pub fn register_model<T: Model>(mut self) -> Self {
        self.maps.register_model::<T>();
        self
    }

    /// Apply a profile. Profiles run immediately, in the order added.
    pub fn add_profile<P: Profile>(mut self, profile: P) -> Self {
        tracing::debug!(profile = profile.name(), "applying profile");
        profile.configure(&mut self.maps);
        self.profiles.push(profile.name().to_string());
        self
    }

    pub fn add_profile_fn<F>(self, name: impl Into<String>, configure: F) -> Self
    where
        F: Fn(&mut RegistryBuilder) + Send + Sync,
    {
        self.add_profile(profile_fn(name, configure))
    }

    /// Direct access to the definition builder.
    pub fn maps(&mut self) -> &mut RegistryBuilder {
        &mut self.maps
    }

    pub fn create_map(
        &mut self,
        source: impl Into<TypeName>,
        destination: impl Into<TypeName>,
    ) -> MapExpression<'_> {
        self.maps.create_map(source, destination)
    }

    pub fn build(self) -> Result<Mapper> {
        let validate = self.config.validate_on_build;
        let registry = self.maps.build(self.config)?;

        if validate {
            let unmapped = registry.unmapped_members();
            if !unmapped.is_empty() {
                let listed: Vec<String> = unmapped
                    .iter()
                    .map(|(pair, members)| format!("{}: {}", pair, members.join(", ")))
                    .collect();
                return Err(MapperError::Configuration(format!(
                    "unmapped destination members: {}",
                    listed.join("; ")
                )));
            }
        }

        tracing::info!(
            pairs = registry.len(),
            types = registry.schemas().len(),
            profiles = self.profiles.len(),
            warnings = registry.warnings().len(),
            "mapper configured"
        );

        Ok(Mapper {
            registry: Arc::new(registry),
        })
    }
}

/// Thread-safe mapping service. Cloning shares the frozen registry.
#[derive(Clone)]
pub struct Mapper {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("pairs", &self.registry.len())
            .field("warnings", &self.registry.warnings().len())
            .finish()
    }
}

impl Mapper {
    pub fn builder() -> MapperConfiguration {
        MapperConfiguration::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn warnings(&self) -> &[ConfigWarning] {
        self.registry.warnings()
    }

    /// Unmapped destination members of every configured pair.
    pub fn validate(&self) -> Vec<(TypePair, Vec<String>)> {
        self.registry.unmapped_members()
    }

    /// Build a new `destination` instance from `source`.
    pub fn transform(
        &self,
        source: &ObjectRef,
        destination: impl Into<TypeName>,
    ) -> Result<ObjectRef> {
        ExecutionContext::new(&self.registry, ExecutionMode::Transform)
            .transform(source, &destination.into())
    }

    /// Transform a sequence in order, sharing one execution context so
    /// objects referenced from several sources map to one destination.
    pub fn transform_all(
        &self,
        sources: &[ObjectRef],
        destination: impl Into<TypeName>,
    ) -> Result<Vec<ObjectRef>> {
        let destination = destination.into();
        let mut context = ExecutionContext::new(&self.registry, ExecutionMode::Transform);
        sources
            .iter()
            .map(|source| context.transform(source, &destination))
            .collect()
    }

    /// Overwrite `destination` from `source`, null values included.
    pub fn merge_into(&self, source: &ObjectRef, destination: &ObjectRef) -> Result<()> {
        ExecutionContext::new(&self.registry, ExecutionMode::Merge).merge(source, destination)
    }

    /// Like [`merge_into`](Self::merge_into), but null values leave the
    /// destination member untouched.
    pub fn patch(&self, source: &ObjectRef, destination: &ObjectRef) -> Result<()> {
        ExecutionContext::new(&self.registry, ExecutionMode::Patch).merge(source, destination)
    }

    pub fn map<S: Model, D: Model>(&self, source: &S) -> Result<D> {
        let produced = self.transform(&source.to_object(), D::type_name())?;
        D::from_object(&produced)
    }

    pub fn map_all<S: Model, D: Model>(&self, sources: &[S]) -> Result<Vec<D>> {
        let objects: Vec<ObjectRef> = sources.iter().map(Model::to_object).collect();
        self.transform_all(&objects, D::type_name())?
            .iter()
            .map(D::from_object)
            .collect()
    }

    /// Merge `source` into `destination`; `destination` is only replaced
    /// when the whole call succeeds.
    pub fn map_into<S: Model, D: Model>(&self, source: &S, destination: &mut D) -> Result<()> {
        self.update_model(source, destination, ExecutionMode::Merge)
    }

    pub fn patch_into<S: Model, D: Model>(&self, source: &S, destination: &mut D) -> Result<()> {
        self.update_model(source, destination, ExecutionMode::Patch)
    }

    fn update_model<S: Model, D: Model>(
        &self,
        source: &S,
        destination: &mut D,
        mode: ExecutionMode,
    ) -> Result<()> {
        let target = destination.to_object();
        ExecutionContext::new(&self.registry, mode).merge(&source.to_object(), &target)?;
        *destination = D::from_object(&target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MemberType;
    use crate::value::{Object, Value};

    fn configuration() -> MapperConfiguration {
        MapperConfiguration::new()
            .register_type(
                TypeSchema::builder("User")
                    .member("Id", MemberType::Int)
                    .member("Name", MemberType::String)
                    .build(),
            )
            .register_type(
                TypeSchema::builder("UserDto")
                    .member("Id", MemberType::Int)
                    .member("Name", MemberType::String)
                    .member("Role", MemberType::String)
                    .build(),
            )
    }

    #[test]
    fn test_transform_and_patch() {
        let mapper = configuration()
            .add_profile_fn("users", |maps| {
                maps.create_map("User", "UserDto");
            })
            .build()
            .unwrap();

        let user = ObjectRef::new(Object::new("User").with("Id", 7).with("Name", "Ada"));
        let dto = mapper.transform(&user, "UserDto").unwrap();
        assert_eq!(dto.get("Id"), Value::Int(7));
        assert_eq!(dto.get("Name"), Value::from("Ada"));

        let partial = ObjectRef::new(Object::new("User").with("Id", 8));
        mapper.patch(&partial, &dto).unwrap();
        assert_eq!(dto.get("Id"), Value::Int(8));
        assert_eq!(dto.get("Name"), Value::from("Ada"));

        mapper.merge_into(&partial, &dto).unwrap();
        assert!(dto.get("Name").is_null());
    }

    #[test]
    fn test_validate_on_build_lists_unmapped_members() {
        let strict = EngineConfig::default().with_validate_on_build(true);

        let mut config = configuration().with_config(strict.clone());
        config.create_map("User", "UserDto");
        let err = config.build().unwrap_err();
        assert!(err.to_string().contains("User -> UserDto: Role"));

        let mut config = configuration().with_config(strict);
        config.create_map("User", "UserDto").ignore("Role");
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_validate_reports_without_failing() {
        let mut config = configuration();
        config.maps().create_map("User", "UserDto");
        let mapper = config.build().unwrap();
        assert_eq!(
            mapper.validate(),
            vec![(TypePair::new("User", "UserDto"), vec!["Role".to_string()])]
        );
    }

    #[test]
    fn test_mapper_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Mapper>();
    }
}
