//! Lowers a [`MappingDefinition`] into a [`MapPlan`]: the ordered list of
//! member steps the executor runs, with every accessor and convention match
//! resolved up front.

use crate::accessor::{Accessor, AccessorCache};
use crate::convention::ConventionMatcher;
use crate::definition::{Condition, MappingDefinition, MemberRule, Selector, ValueSource};
use crate::error::{MapperError, Result};
use crate::schema::{MemberPath, MemberType, SchemaSet, TypeSchema};
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) enum PlanSource {
    /// Getter chain; the first getter reads the source, each next one reads
    /// the object produced by the previous step.
    Path(Vec<Accessor>),
    Function(Selector),
    /// Rule without a resolvable source; only its null substitute applies.
    Absent,
}

#[derive(Clone)]
pub(crate) struct MemberPlan {
    pub destination: String,
    pub member_type: MemberType,
    pub setter: Accessor,
    pub source: PlanSource,
    pub condition: Option<Condition>,
    pub null_substitute: Option<Value>,
}

impl fmt::Debug for MemberPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            PlanSource::Path(chain) => chain
                .iter()
                .map(|a| a.member().to_string())
                .collect::<Vec<_>>()
                .join("."),
            PlanSource::Function(_) => "<fn>".to_string(),
            PlanSource::Absent => "<absent>".to_string(),
        };
        f.debug_struct("MemberPlan")
            .field("destination", &self.destination)
            .field("member_type", &self.member_type)
            .field("source", &source)
            .finish()
    }
}

/// Compiled form of one type pair.
pub struct MapPlan {
    pub(crate) definition: MappingDefinition,
    pub(crate) destination_schema: Arc<TypeSchema>,
    pub(crate) members: Vec<MemberPlan>,
    pub(crate) unmapped: Vec<String>,
    pub(crate) implicit: bool,
}

impl fmt::Debug for MapPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapPlan")
            .field("pair", &self.definition.pair)
            .field("members", &self.members)
            .field("unmapped", &self.unmapped)
            .field("implicit", &self.implicit)
            .finish()
    }
}

impl MapPlan {
    pub fn definition(&self) -> &MappingDefinition {
        &self.definition
    }

    /// Destination members this plan writes, in declaration order.
    pub fn mapped_members(&self) -> impl Iterator<Item = &str> + '_ {
        self.members.iter().map(|m| m.destination.as_str())
    }

    /// Writable destination members with neither a rule nor a convention match.
    pub fn unmapped_members(&self) -> &[String] {
        &self.unmapped
    }

    /// True for convention-only plans synthesized on demand.
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }
}

pub(crate) struct PlanCompiler<'a> {
    schemas: &'a SchemaSet,
    accessors: &'a AccessorCache,
    flattening: bool,
}

impl<'a> PlanCompiler<'a> {
    pub fn new(schemas: &'a SchemaSet, accessors: &'a AccessorCache, flattening: bool) -> Self {
        Self {
            schemas,
            accessors,
            flattening,
        }
    }

    pub fn compile(&self, definition: MappingDefinition, implicit: bool) -> Result<MapPlan> {
        let source_schema = self.schemas.require(&definition.pair.source)?.clone();
        let destination_schema = self.schemas.require(&definition.pair.destination)?.clone();

        let rules = self.canonical_rules(&definition, &destination_schema)?;
        let explicit: HashSet<String> = rules.keys().cloned().collect();

        let matcher = ConventionMatcher::new(self.schemas).with_flattening(self.flattening);
        let conventions: HashMap<String, MemberPath> = matcher
            .match_members(&source_schema, &destination_schema, &explicit)
            .into_iter()
            .map(|m| (m.destination, m.source))
            .collect();

        let mut members = Vec::new();
        let mut unmapped = Vec::new();

        for member in destination_schema.members() {
            match rules.get(&member.name) {
                Some(rule) if rule.ignored => {}
                Some(rule) => {
                    let source = match &rule.source {
                        ValueSource::Function(selector) => PlanSource::Function(selector.clone()),
                        ValueSource::Member(path) => {
                            PlanSource::Path(self.resolve_path(&source_schema, path)?)
                        }
                        ValueSource::Convention => {
                            match matcher.match_member(&source_schema, member) {
                                Some(path) => {
                                    PlanSource::Path(self.resolve_path(&source_schema, &path)?)
                                }
                                None => PlanSource::Absent,
                            }
                        }
                    };
                    members.push(self.member_plan(&destination_schema, &member.name, source, rule)?);
                }
                None => match conventions.get(&member.name) {
                    Some(path) => {
                        let source = PlanSource::Path(self.resolve_path(&source_schema, path)?);
                        members.push(self.member_plan(
                            &destination_schema,
                            &member.name,
                            source,
                            &MemberRule::default(),
                        )?);
                    }
                    None if member.access.writable() => unmapped.push(member.name.clone()),
                    None => {}
                },
            }
        }

        tracing::debug!(
            pair = %definition.pair,
            mapped = members.len(),
            unmapped = unmapped.len(),
            implicit,
            "compiled mapping plan"
        );

        Ok(MapPlan {
            definition,
            destination_schema,
            members,
            unmapped,
            implicit,
        })
    }

    /// Re-key rules by declared destination member name.
    fn canonical_rules(
        &self,
        definition: &MappingDefinition,
        destination: &TypeSchema,
    ) -> Result<HashMap<String, MemberRule>> {
        let mut rules = HashMap::new();
        let mut keys: HashMap<&str, &str> = HashMap::new();
        for (name, rule) in &definition.member_rules {
            let member = destination
                .find_member(name)
                .ok_or_else(|| MapperError::member_not_found(destination.name(), name.as_str()))?;
            if let Some(previous) = keys.insert(member.name.as_str(), name.as_str()) {
                let (first, second) = if previous < name.as_str() {
                    (previous, name.as_str())
                } else {
                    (name.as_str(), previous)
                };
                return Err(MapperError::Configuration(format!(
                    "member rules `{}` and `{}` on {} both target `{}`",
                    first,
                    second,
                    destination.name(),
                    member.name
                )));
            }
            rules.insert(member.name.clone(), rule.clone());
        }
        Ok(rules)
    }

    fn resolve_path(&self, source: &TypeSchema, path: &MemberPath) -> Result<Vec<Accessor>> {
        if path.is_empty() {
            return Err(MapperError::Configuration(format!(
                "empty source member path on {}",
                source.name()
            )));
        }

        let mut chain = Vec::with_capacity(path.segments().len());
        let mut current = source.name().clone();

        for (i, segment) in path.segments().iter().enumerate() {
            let schema = self.schemas.require(&current)?;
            let member = schema
                .find_member(segment)
                .ok_or_else(|| MapperError::member_not_found(&current, segment.as_str()))?;
            let accessor = self.accessors.readable(&current, &member.name)?;

            if i + 1 < path.segments().len() {
                current = member
                    .member_type
                    .object_type()
                    .cloned()
                    .ok_or_else(|| {
                        MapperError::member_not_found(&current, segment.as_str()).with_detail(
                            format!("cannot navigate into {} in path {}", member.member_type, path),
                        )
                    })?;
            }
            chain.push(accessor);
        }

        Ok(chain)
    }

    fn member_plan(
        &self,
        destination: &TypeSchema,
        member: &str,
        source: PlanSource,
        rule: &MemberRule,
    ) -> Result<MemberPlan> {
        let setter = self.accessors.writable(destination.name(), member)?;
        Ok(MemberPlan {
            destination: member.to_string(),
            member_type: setter.member_type().clone(),
            setter,
            source,
            condition: rule.condition.clone(),
            null_substitute: rule.null_substitute.clone(),
        })
    }
}
