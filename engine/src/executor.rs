use crate::accessor::Accessor;
use crate::compiler::{MapPlan, MemberPlan, PlanSource};
use crate::error::{MapperError, Result};
use crate::registry::Registry;
use crate::schema::{MemberType, TypeName, TypePair};
use crate::value::{Object, ObjectRef, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// How a call treats its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Build a new destination; every resolved member is written.
    Transform,
    /// Update an existing destination; every resolved member is written, null included.
    Merge,
    /// Update an existing destination; null values leave members untouched.
    Patch,
}

impl ExecutionMode {
    pub fn is_in_place(self) -> bool {
        !matches!(self, ExecutionMode::Transform)
    }

    pub fn skips_nulls(self) -> bool {
        matches!(self, ExecutionMode::Patch)
    }
}

type VisitKey = (usize, TypeName);

/// State of one top-level call. Never shared between calls.
pub struct ExecutionContext<'r> {
    registry: &'r Registry,
    mode: ExecutionMode,
    /// Holds the source handle too so its address stays unique for the call.
    visited: HashMap<VisitKey, (ObjectRef, ObjectRef)>,
    journal: Vec<(ObjectRef, Object)>,
    journaled: HashSet<usize>,
    /// Destinations currently being populated in place, root first.
    in_place_path: HashSet<usize>,
}

impl<'r> ExecutionContext<'r> {
    pub fn new(registry: &'r Registry, mode: ExecutionMode) -> Self {
        Self {
            registry,
            mode,
            visited: HashMap::new(),
            journal: Vec::new(),
            journaled: HashSet::new(),
            in_place_path: HashSet::new(),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Produce a new `destination` instance from `source`.
    pub fn transform(&mut self, source: &ObjectRef, destination: &TypeName) -> Result<ObjectRef> {
        let pair = TypePair::new(source.type_name(), destination);
        let plan = self.registry.resolve(&pair)?;
        let limit = self.registry.config().depth_limit();
        self.map_new(source, &plan, 0, limit)
    }

    /// Populate an existing `destination` from `source`. On failure every
    /// object written during the call is restored.
    pub fn merge(&mut self, source: &ObjectRef, destination: &ObjectRef) -> Result<()> {
        let result = self.merge_root(source, destination);
        if let Err(err) = &result {
            tracing::debug!(
                pair = %TypePair::new(source.type_name(), destination.type_name()),
                restored = self.journal.len(),
                error = %err,
                "rolling back in-place mapping"
            );
            self.rollback();
        }
        result
    }

    fn merge_root(&mut self, source: &ObjectRef, destination: &ObjectRef) -> Result<()> {
        let pair = TypePair::new(source.type_name(), destination.type_name());
        let plan = self.registry.resolve(&pair)?;
        let limit = self.registry.config().depth_limit();
        self.map_existing(source, destination, &plan, 0, limit)
            .map(|_| ())
    }

    fn rollback(&mut self) {
        for (object, record) in self.journal.drain(..).rev() {
            object.restore(record);
        }
        self.journaled.clear();
    }

    fn visited(&self, plan: &MapPlan, source: &ObjectRef) -> Option<ObjectRef> {
        if !plan.definition.preserve_references {
            return None;
        }
        let key = (source.identity(), plan.definition.destination().clone());
        self.visited.get(&key).map(|(_, destination)| {
            tracing::debug!(pair = %plan.definition.pair, "reusing visited destination");
            destination.clone()
        })
    }

    fn record_visit(&mut self, plan: &MapPlan, source: &ObjectRef, destination: &ObjectRef) {
        if plan.definition.preserve_references {
            let key = (source.identity(), plan.definition.destination().clone());
            self.visited
                .insert(key, (source.clone(), destination.clone()));
        }
    }

    fn map_new(
        &mut self,
        source: &ObjectRef,
        plan: &Arc<MapPlan>,
        depth: usize,
        limit: Option<usize>,
    ) -> Result<ObjectRef> {
        if let Some(hit) = self.visited(plan, source) {
            return Ok(hit);
        }
        let destination = self.construct(source, plan)?;
        self.record_visit(plan, source, &destination);
        self.populate(source, &destination, plan, depth, limit)?;
        Ok(destination)
    }

    fn map_existing(
        &mut self,
        source: &ObjectRef,
        destination: &ObjectRef,
        plan: &Arc<MapPlan>,
        depth: usize,
        limit: Option<usize>,
    ) -> Result<ObjectRef> {
        if let Some(hit) = self.visited(plan, source) {
            return Ok(hit);
        }
        self.record_visit(plan, source, destination);
        self.in_place_path.insert(destination.identity());
        let result = self.populate(source, destination, plan, depth, limit);
        self.in_place_path.remove(&destination.identity());
        result.map(|_| destination.clone())
    }

    fn construct(&self, source: &ObjectRef, plan: &MapPlan) -> Result<ObjectRef> {
        let destination = plan.definition.destination();
        let object = match &plan.definition.constructor {
            Some(constructor) => {
                let object =
                    constructor(&source.snapshot()).map_err(|e| MapperError::Construction {
                        type_name: destination.clone(),
                        message: format!("{:#}", e),
                    })?;
                if object.type_name() != destination {
                    return Err(MapperError::Construction {
                        type_name: destination.clone(),
                        message: format!(
                            "constructor produced an instance of {}",
                            object.type_name()
                        ),
                    });
                }
                object
            }
            None => plan.destination_schema.construct()?,
        };
        Ok(ObjectRef::new(object))
    }

    fn populate(
        &mut self,
        source: &ObjectRef,
        destination: &ObjectRef,
        plan: &Arc<MapPlan>,
        depth: usize,
        limit: Option<usize>,
    ) -> Result<()> {
        let definition = &plan.definition;
        let limit = match definition.max_depth {
            0 => limit,
            n => Some(limit.map_or(depth + n, |inherited| inherited.min(depth + n))),
        };

        if self.mode.is_in_place() && self.journaled.insert(destination.identity()) {
            self.journal.push((destination.clone(), destination.snapshot()));
        }

        for hook in &definition.before_hooks {
            hook(source, destination);
        }

        let snapshot = source.snapshot();
        for member in &plan.members {
            self.apply_member(&snapshot, destination, member, depth, limit)?;
        }

        for hook in &definition.after_hooks {
            hook(source, destination);
        }
        Ok(())
    }

    fn apply_member(
        &mut self,
        source: &Object,
        destination: &ObjectRef,
        member: &MemberPlan,
        depth: usize,
        limit: Option<usize>,
    ) -> Result<()> {
        let raw = match &member.source {
            PlanSource::Path(chain) => read_path(source, chain)?,
            PlanSource::Function(selector) => selector(source),
            PlanSource::Absent => Value::Null,
        };

        if let Some(condition) = &member.condition {
            let current = destination.get(&member.destination);
            if !condition(source, &current) {
                tracing::trace!(member = %member.destination, "condition rejected member");
                return Ok(());
            }
        }

        let value = match (raw, &member.null_substitute) {
            (Value::Null, Some(substitute)) => substitute.clone(),
            (raw, _) => raw,
        };
        if value.is_null() && self.mode.skips_nulls() {
            return Ok(());
        }

        let within_limit = limit.map_or(true, |limit| depth < limit);
        let value = match (&member.member_type, value) {
            (MemberType::Object(target), Value::Object(child)) => {
                if !within_limit {
                    tracing::debug!(member = %member.destination, depth, "depth limit reached");
                    return Ok(());
                }
                let current = destination.get(&member.destination);
                Value::Object(self.map_child(&child, &current, target, depth + 1, limit)?)
            }
            (MemberType::List(element), Value::List(items)) if element.needs_recursion() => {
                if !within_limit {
                    tracing::debug!(member = %member.destination, depth, "depth limit reached");
                    return Ok(());
                }
                Value::List(self.map_list(&items, element, depth + 1, limit)?)
            }
            // `Any` members and scalars are stored as read; object handles stay shared.
            (_, value) => value,
        };

        tracing::trace!(member = %member.destination, kind = value.kind(), "write member");
        member.setter.write(destination, value)
    }

    /// Nested object member. In-place modes merge into an existing
    /// destination object of the right type unless that object is already
    /// being populated further up the path; otherwise a new one is built.
    fn map_child(
        &mut self,
        source: &ObjectRef,
        current: &Value,
        target: &TypeName,
        depth: usize,
        limit: Option<usize>,
    ) -> Result<ObjectRef> {
        let plan = self
            .registry
            .resolve_nested(&TypePair::new(source.type_name(), target))?;

        if self.mode.is_in_place() {
            if let Value::Object(existing) = current {
                if existing.type_name() == target
                    && !self.in_place_path.contains(&existing.identity())
                {
                    return self.map_existing(source, existing, &plan, depth, limit);
                }
            }
        }
        self.map_new(source, &plan, depth, limit)
    }

    /// Always a fresh list, in source order. Null elements stay null.
    fn map_list(
        &mut self,
        items: &[Value],
        element: &MemberType,
        depth: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        items
            .iter()
            .map(|item| match (element, item) {
                (MemberType::Object(target), Value::Object(child)) => {
                    let plan = self
                        .registry
                        .resolve_nested(&TypePair::new(child.type_name(), target))?;
                    self.map_new(child, &plan, depth, limit).map(Value::Object)
                }
                (MemberType::List(inner), Value::List(nested)) if inner.needs_recursion() => {
                    self.map_list(nested, inner, depth, limit).map(Value::List)
                }
                (_, other) => Ok(other.clone()),
            })
            .collect()
    }
}

/// Follow a getter chain. A null intermediate yields null.
fn read_path(source: &Object, chain: &[Accessor]) -> Result<Value> {
    let Some((first, rest)) = chain.split_first() else {
        return Ok(Value::Null);
    };
    let mut value = first.read(source)?;
    for accessor in rest {
        value = match value {
            Value::Null => return Ok(Value::Null),
            Value::Object(object) => accessor.read(&object.snapshot())?,
            other => {
                return Err(MapperError::member_access(
                    source.type_name(),
                    accessor.member(),
                    format!("cannot read through a {} value", other.kind()),
                ))
            }
        };
    }
    Ok(value)
}
