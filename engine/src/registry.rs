//! Mapping definition registry.
//!
//! [`RegistryBuilder`] collects definitions while profiles run. Building it
//! synthesizes the requested reverse maps, compiles one [`MapPlan`] per pair
//! and freezes everything into a [`Registry`], which is read-only afterwards
//! apart from its cache of convention-only plans for nested pairs.

use crate::accessor::AccessorCache;
use crate::compiler::{MapPlan, PlanCompiler};
use crate::config::EngineConfig;
use crate::definition::{MapExpression, MappingDefinition, MemberRule, ValueSource};
use crate::error::{ConfigWarning, MapperError, Result};
use crate::model::Model;
use crate::schema::{MemberPath, SchemaSet, TypeName, TypePair, TypeSchema};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Registers the schemas a typed model needs.
pub type SchemaRegistration = fn(&mut SchemaSet);

#[derive(Default)]
pub struct RegistryBuilder {
    schemas: SchemaSet,
    definitions: HashMap<TypePair, MappingDefinition>,
    order: Vec<TypePair>,
    pending_reverse: Vec<TypePair>,
    models: Vec<SchemaRegistration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schemas(schemas: SchemaSet) -> Self {
        Self {
            schemas,
            ..Self::default()
        }
    }

    /// Register a schema, replacing any previous one with the same name.
    pub fn register_type(&mut self, schema: TypeSchema) -> &mut Self {
        if let Some(previous) = self.schemas.insert(schema) {
            tracing::debug!(type_name = %previous.name(), "replacing type schema");
        }
        self
    }

    /// Register the schema of a typed model and every model it nests.
    pub fn register_model<T: Model>(&mut self) -> &mut Self {
        self.models.push(T::register_types as SchemaRegistration);
        self
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    /// Start a definition for `source -> destination`. A pair registered
    /// again replaces the earlier definition entirely.
    pub fn create_map(
        &mut self,
        source: impl Into<TypeName>,
        destination: impl Into<TypeName>,
    ) -> MapExpression<'_> {
        let pair = TypePair::new(source, destination);
        if self
            .definitions
            .insert(pair.clone(), MappingDefinition::new(pair.clone()))
            .is_some()
        {
            tracing::debug!(%pair, "replacing mapping definition");
            self.pending_reverse.retain(|p| p != &pair);
        } else {
            self.order.push(pair.clone());
        }
        MapExpression::new(self, pair)
    }

    /// Closure form of [`create_map`](Self::create_map).
    pub fn register<F>(
        &mut self,
        source: impl Into<TypeName>,
        destination: impl Into<TypeName>,
        configure: F,
    ) -> &mut Self
    where
        F: FnOnce(MapExpression<'_>) -> MapExpression<'_>,
    {
        configure(self.create_map(source, destination));
        self
    }

    /// Request the inverse of an already (or later) registered pair.
    pub fn reverse(
        &mut self,
        source: impl Into<TypeName>,
        destination: impl Into<TypeName>,
    ) -> &mut Self {
        self.request_reverse(TypePair::new(source, destination));
        self
    }

    /// Typed variant of [`create_map`](Self::create_map); also registers the
    /// schemas of both models and everything they nest.
    pub fn create_model_map<S: Model, D: Model>(&mut self) -> MapExpression<'_> {
        self.models.push(S::register_types as SchemaRegistration);
        self.models.push(D::register_types as SchemaRegistration);
        self.create_map(S::type_name(), D::type_name())
    }

    pub fn definition(&self, pair: &TypePair) -> Option<&MappingDefinition> {
        self.definitions.get(pair)
    }

    pub fn contains(&self, pair: &TypePair) -> bool {
        self.definitions.contains_key(pair)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub(crate) fn definition_mut(&mut self, pair: &TypePair) -> &mut MappingDefinition {
        if !self.definitions.contains_key(pair) {
            self.order.push(pair.clone());
        }
        self.definitions
            .entry(pair.clone())
            .or_insert_with(|| MappingDefinition::new(pair.clone()))
    }

    pub(crate) fn request_reverse(&mut self, pair: TypePair) {
        if !self.pending_reverse.contains(&pair) {
            self.pending_reverse.push(pair);
        }
    }

    /// Freeze the builder into a [`Registry`].
    pub(crate) fn build(self, config: EngineConfig) -> Result<Registry> {
        let RegistryBuilder {
            mut schemas,
            mut definitions,
            mut order,
            pending_reverse,
            models,
        } = self;

        for register in models {
            register(&mut schemas);
        }

        let mut warnings = Vec::new();
        for pair in pending_reverse {
            let forward = definitions.get(&pair).ok_or_else(|| {
                MapperError::Configuration(format!(
                    "reverse map requested for {} which has no definition",
                    pair
                ))
            })?;
            if forward.is_reverse {
                continue;
            }
            let reversed = pair.reversed();
            if definitions.contains_key(&reversed) {
                tracing::debug!(pair = %reversed, "explicit definition takes precedence over reverse map");
                continue;
            }

            let source_schema = schemas.require(&pair.source)?;
            let destination_schema = schemas.require(&pair.destination)?;
            let definition = invert(forward, source_schema, destination_schema, &mut warnings);
            order.push(reversed.clone());
            definitions.insert(reversed, definition);
        }

        for warning in &warnings {
            tracing::warn!(%warning, "reverse map dropped a rule");
        }
        if config.strict_reverse && !warnings.is_empty() {
            let listed: Vec<String> = warnings.iter().map(ToString::to_string).collect();
            return Err(MapperError::Configuration(listed.join("; ")));
        }

        let schemas = Arc::new(schemas);
        let accessors = AccessorCache::new(schemas.clone());
        let mut plans = HashMap::with_capacity(order.len());
        {
            let compiler = PlanCompiler::new(&schemas, &accessors, config.flattening);
            for pair in &order {
                if let Some(definition) = definitions.remove(pair) {
                    plans.insert(pair.clone(), Arc::new(compiler.compile(definition, false)?));
                }
            }
        }

        Ok(Registry {
            schemas,
            accessors,
            plans,
            order,
            implicit: DashMap::new(),
            warnings,
            config,
        })
    }
}

/// Derive the (destination, source) definition from the forward one and the
/// schemas of its source and destination types.
fn invert(
    forward: &MappingDefinition,
    source: &TypeSchema,
    destination: &TypeSchema,
    warnings: &mut Vec<ConfigWarning>,
) -> MappingDefinition {
    let mut reverse = MappingDefinition::new(forward.pair.reversed());
    reverse.is_reverse = true;
    reverse.max_depth = forward.max_depth;
    reverse.preserve_references = forward.preserve_references;

    let mut drop_rule = |member: &str, reason: &str| {
        warnings.push(ConfigWarning::UninvertibleRule {
            pair: forward.pair.clone(),
            member: member.to_string(),
            reason: reason.to_string(),
        });
    };

    let mut members: Vec<(&String, &MemberRule)> = forward.member_rules.iter().collect();
    members.sort_by(|a, b| a.0.cmp(b.0));

    for (member, rule) in members {
        if rule.ignored {
            if let Some(mirrored) = source.find_member(member) {
                reverse
                    .member_rules
                    .insert(mirrored.name.clone(), MemberRule::ignored());
            }
            continue;
        }

        match &rule.source {
            ValueSource::Convention => {}
            ValueSource::Member(path) if path.is_single() => {
                let target = path
                    .first()
                    .and_then(|name| source.find_member(name))
                    .filter(|m| m.access.writable() && m.computed.is_none());
                let readable = destination
                    .find_member(member)
                    .is_some_and(|m| m.access.readable());
                match target {
                    Some(target) if readable => {
                        reverse.member_rules.insert(
                            target.name.clone(),
                            MemberRule {
                                source: ValueSource::Member(MemberPath::single(member.clone())),
                                ..MemberRule::default()
                            },
                        );
                    }
                    Some(_) => drop_rule(member, "destination member not readable"),
                    None => drop_rule(member, "target not writable"),
                }
            }
            ValueSource::Member(path) => {
                drop_rule(member, &format!("multi-segment member path {}", path))
            }
            ValueSource::Function(_) => drop_rule(member, "computed selector"),
        }
        if rule.condition.is_some() {
            drop_rule(member, "condition");
        }
        if rule.null_substitute.is_some() {
            drop_rule(member, "null substitute");
        }
    }

    reverse
}

/// Frozen registry: compiled plans for every configured pair.
pub struct Registry {
    schemas: Arc<SchemaSet>,
    accessors: AccessorCache,
    plans: HashMap<TypePair, Arc<MapPlan>>,
    order: Vec<TypePair>,
    implicit: DashMap<TypePair, Arc<MapPlan>>,
    warnings: Vec<ConfigWarning>,
    config: EngineConfig,
}

impl Registry {
    /// Plan for a top-level call. Unconfigured pairs fail unless
    /// `implicit_maps` is enabled.
    pub fn resolve(&self, pair: &TypePair) -> Result<Arc<MapPlan>> {
        if let Some(plan) = self.plans.get(pair) {
            return Ok(plan.clone());
        }
        if self.config.implicit_maps {
            return self.resolve_nested(pair);
        }
        Err(MapperError::unmapped(pair))
    }

    /// Plan for a nested member or collection element: configured if
    /// present, otherwise a convention-only plan compiled on first use.
    pub(crate) fn resolve_nested(&self, pair: &TypePair) -> Result<Arc<MapPlan>> {
        if let Some(plan) = self.plans.get(pair) {
            return Ok(plan.clone());
        }
        if let Some(plan) = self.implicit.get(pair) {
            return Ok(plan.clone());
        }
        if !self.schemas.contains(&pair.source) || !self.schemas.contains(&pair.destination) {
            return Err(MapperError::unmapped(pair));
        }

        let plan = PlanCompiler::new(&self.schemas, &self.accessors, self.config.flattening)
            .compile(MappingDefinition::new(pair.clone()), true)?;
        tracing::debug!(%pair, "synthesized convention-only plan");
        Ok(self
            .implicit
            .entry(pair.clone())
            .or_insert_with(|| Arc::new(plan))
            .clone())
    }

    pub fn definition(&self, pair: &TypePair) -> Option<&MappingDefinition> {
        self.plans.get(pair).map(|plan| plan.definition())
    }

    pub fn plan(&self, pair: &TypePair) -> Option<&Arc<MapPlan>> {
        self.plans.get(pair)
    }

    /// Configured pairs in registration order; synthesized reverses last.
    pub fn pairs(&self) -> impl Iterator<Item = &TypePair> + '_ {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    pub fn accessors(&self) -> &AccessorCache {
        &self.accessors
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Configured pairs that leave writable destination members unmapped.
    pub fn unmapped_members(&self) -> Vec<(TypePair, Vec<String>)> {
        self.order
            .iter()
            .filter_map(|pair| self.plans.get(pair))
            .filter(|plan| !plan.unmapped_members().is_empty())
            .map(|plan| {
                (
                    plan.definition().pair().clone(),
                    plan.unmapped_members().to_vec(),
                )
            })
            .collect()
    }
}
