//! Mapping definitions and the fluent configuration surface that builds them.

use crate::registry::RegistryBuilder;
use crate::schema::{MemberPath, TypeName, TypePair};
use crate::value::{Object, ObjectRef, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type Selector = Arc<dyn Fn(&Object) -> Value + Send + Sync>;
pub type Condition = Arc<dyn Fn(&Object, &Value) -> bool + Send + Sync>;
pub type Hook = Arc<dyn Fn(&ObjectRef, &ObjectRef) + Send + Sync>;
pub type Constructor = Arc<dyn Fn(&Object) -> anyhow::Result<Object> + Send + Sync>;

/// Where a destination member's raw value comes from.
#[derive(Clone, Default)]
pub enum ValueSource {
    /// Whatever the convention matcher pairs the member with.
    #[default]
    Convention,
    /// A plain member path on the source. Invertible when single-segment.
    Member(MemberPath),
    /// Computed from the whole source.
    Function(Selector),
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Convention => f.write_str("Convention"),
            ValueSource::Member(path) => write!(f, "Member({})", path),
            ValueSource::Function(_) => f.write_str("Function(<fn>)"),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemberRule {
    pub ignored: bool,
    pub source: ValueSource,
    pub condition: Option<Condition>,
    pub null_substitute: Option<Value>,
}

impl fmt::Debug for MemberRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberRule")
            .field("ignored", &self.ignored)
            .field("source", &self.source)
            .field("condition", &self.condition.is_some())
            .field("null_substitute", &self.null_substitute)
            .finish()
    }
}

impl MemberRule {
    pub fn ignored() -> Self {
        MemberRule {
            ignored: true,
            ..Default::default()
        }
    }
}

/// Builder handed to `for_member` configurators.
#[derive(Default)]
pub struct MemberOptions {
    rule: MemberRule,
}

impl MemberOptions {
    pub fn ignore(mut self) -> Self {
        self.rule.ignored = true;
        self
    }

    /// Compute the value from the source object.
    pub fn map_from<F>(mut self, selector: F) -> Self
    where
        F: Fn(&Object) -> Value + Send + Sync + 'static,
    {
        self.rule.source = ValueSource::Function(Arc::new(selector));
        self
    }

    /// Read the value from a source member path such as `"Address.City"`.
    pub fn map_from_member(mut self, path: &str) -> Self {
        self.rule.source = ValueSource::Member(MemberPath::parse(path));
        self
    }

    /// Skip the member unless `(source, current destination value)` passes.
    pub fn condition<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Object, &Value) -> bool + Send + Sync + 'static,
    {
        self.rule.condition = Some(Arc::new(predicate));
        self
    }

    pub fn null_substitute(mut self, value: impl Into<Value>) -> Self {
        self.rule.null_substitute = Some(value.into());
        self
    }

    pub(crate) fn into_rule(self) -> MemberRule {
        self.rule
    }
}

#[derive(Clone)]
pub struct MappingDefinition {
    pub(crate) pair: TypePair,
    pub(crate) member_rules: HashMap<String, MemberRule>,
    pub(crate) before_hooks: Vec<Hook>,
    pub(crate) after_hooks: Vec<Hook>,
    pub(crate) constructor: Option<Constructor>,
    pub(crate) max_depth: usize,
    pub(crate) preserve_references: bool,
    pub(crate) is_reverse: bool,
}

impl fmt::Debug for MappingDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingDefinition")
            .field("pair", &self.pair)
            .field("member_rules", &self.member_rules)
            .field("before_hooks", &self.before_hooks.len())
            .field("after_hooks", &self.after_hooks.len())
            .field("constructor", &self.constructor.is_some())
            .field("max_depth", &self.max_depth)
            .field("preserve_references", &self.preserve_references)
            .field("is_reverse", &self.is_reverse)
            .finish()
    }
}

impl MappingDefinition {
    pub fn new(pair: TypePair) -> Self {
        MappingDefinition {
            pair,
            member_rules: HashMap::new(),
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
            constructor: None,
            max_depth: 0,
            preserve_references: false,
            is_reverse: false,
        }
    }

    pub fn pair(&self) -> &TypePair {
        &self.pair
    }

    pub fn source(&self) -> &TypeName {
        &self.pair.source
    }

    pub fn destination(&self) -> &TypeName {
        &self.pair.destination
    }

    pub fn rule(&self, member: &str) -> Option<&MemberRule> {
        self.member_rules.get(member)
    }

    pub fn member_rules(&self) -> impl Iterator<Item = (&str, &MemberRule)> + '_ {
        self.member_rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn preserve_references(&self) -> bool {
        self.preserve_references
    }

    pub fn is_reverse(&self) -> bool {
        self.is_reverse
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }
}

/// Fluent handle returned by `create_map`. Every call edits the definition
/// stored in the builder, so dropping the handle loses nothing.
pub struct MapExpression<'a> {
    builder: &'a mut RegistryBuilder,
    pair: TypePair,
}

impl<'a> MapExpression<'a> {
    pub(crate) fn new(builder: &'a mut RegistryBuilder, pair: TypePair) -> Self {
        Self { builder, pair }
    }

    fn definition(&mut self) -> &mut MappingDefinition {
        self.builder.definition_mut(&self.pair)
    }

    pub fn pair(&self) -> &TypePair {
        &self.pair
    }

    /// Configure one destination member. Names resolve case-insensitively
    /// when the registry is built; two keys landing on the same member fail
    /// the build.
    pub fn for_member<F>(mut self, member: &str, configure: F) -> Self
    where
        F: FnOnce(MemberOptions) -> MemberOptions,
    {
        let rule = configure(MemberOptions::default()).into_rule();
        self.definition()
            .member_rules
            .insert(member.to_string(), rule);
        self
    }

    pub fn ignore(mut self, member: &str) -> Self {
        self.definition()
            .member_rules
            .insert(member.to_string(), MemberRule::ignored());
        self
    }

    pub fn before_map<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ObjectRef, &ObjectRef) + Send + Sync + 'static,
    {
        self.definition().before_hooks.push(Arc::new(hook));
        self
    }

    pub fn after_map<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ObjectRef, &ObjectRef) + Send + Sync + 'static,
    {
        self.definition().after_hooks.push(Arc::new(hook));
        self
    }

    pub fn construct_using<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Object) -> anyhow::Result<Object> + Send + Sync + 'static,
    {
        self.definition().constructor = Some(Arc::new(factory));
        self
    }

    /// `0` means unlimited.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.definition().max_depth = depth;
        self
    }

    pub fn preserve_references(mut self) -> Self {
        self.definition().preserve_references = true;
        self
    }

    /// Also derive the (destination, source) definition when the registry is
    /// built.
    pub fn reverse_map(self) -> Self {
        let pair = self.pair.clone();
        self.builder.request_reverse(pair);
        self
    }
}
