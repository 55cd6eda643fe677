//! Explicit type schemas.
//!
//! Every type that takes part in a mapping is described up front by a
//! [`TypeSchema`]: its members, their [`MemberType`], whether they can be read
//! and written, and how a default instance is produced. Schemas are collected
//! in a [`SchemaSet`] during configuration and never change afterwards.

use crate::error::{MapperError, Result};
use crate::value::{Object, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Cheap-to-clone type identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Arc<str>);

impl TypeName {
    pub fn new(name: impl AsRef<str>) -> Self {
        TypeName(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        TypeName::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        TypeName(Arc::from(name))
    }
}

impl From<&TypeName> for TypeName {
    fn from(name: &TypeName) -> Self {
        name.clone()
    }
}

/// Ordered (source, destination) combination identifying one mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypePair {
    pub source: TypeName,
    pub destination: TypeName,
}

impl TypePair {
    pub fn new(source: impl Into<TypeName>, destination: impl Into<TypeName>) -> Self {
        TypePair {
            source: source.into(),
            destination: destination.into(),
        }
    }

    pub fn reversed(&self) -> Self {
        TypePair {
            source: self.destination.clone(),
            destination: self.source.clone(),
        }
    }
}

impl fmt::Display for TypePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// Shape of a member. Every member is nullable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberType {
    Bool,
    Int,
    Float,
    String,
    DateTime,
    /// Accepts any value, assigned as-is. Objects are not mapped: the
    /// destination receives the source's handle and shares it.
    Any,
    /// A mappable complex type.
    Object(TypeName),
    /// A homogeneous ordered sequence.
    List(Box<MemberType>),
}

impl MemberType {
    pub fn object(type_name: impl Into<TypeName>) -> Self {
        MemberType::Object(type_name.into())
    }

    pub fn list(element: MemberType) -> Self {
        MemberType::List(Box::new(element))
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, MemberType::Object(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, MemberType::List(_))
    }

    /// True if mapping a value of this type recurses into another definition.
    pub fn needs_recursion(&self) -> bool {
        match self {
            MemberType::Object(_) => true,
            MemberType::List(element) => element.needs_recursion(),
            _ => false,
        }
    }

    pub fn object_type(&self) -> Option<&TypeName> {
        match self {
            MemberType::Object(name) => Some(name),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&MemberType> {
        match self {
            MemberType::List(element) => Some(element),
            _ => None,
        }
    }

    /// Convention compatibility: can a member of `source` type feed a member of
    /// this type without an explicit rule?
    pub fn is_assignable_from(&self, source: &MemberType) -> bool {
        match (self, source) {
            (MemberType::Any, _) => true,
            (MemberType::Object(_), MemberType::Object(_)) => true,
            (MemberType::List(dest), MemberType::List(src)) => dest.is_assignable_from(src),
            (dest, src) => dest == src,
        }
    }

    /// Runtime check used by setters before a value is stored.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (MemberType::Any, _) => true,
            (MemberType::Bool, Value::Bool(_)) => true,
            (MemberType::Int, Value::Int(_)) => true,
            (MemberType::Float, Value::Float(_) | Value::Int(_)) => true,
            (MemberType::String, Value::String(_)) => true,
            (MemberType::DateTime, Value::DateTime(_)) => true,
            (MemberType::Object(expected), Value::Object(object)) => {
                object.type_name() == expected
            }
            (MemberType::List(element), Value::List(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            _ => false,
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberType::Bool => f.write_str("bool"),
            MemberType::Int => f.write_str("int"),
            MemberType::Float => f.write_str("float"),
            MemberType::String => f.write_str("string"),
            MemberType::DateTime => f.write_str("datetime"),
            MemberType::Any => f.write_str("any"),
            MemberType::Object(name) => write!(f, "{}", name),
            MemberType::List(element) => write!(f, "[{}]", element),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

impl Access {
    pub fn readable(self) -> bool {
        !matches!(self, Access::WriteOnly)
    }

    pub fn writable(self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

pub type ComputedGetter = Arc<dyn Fn(&Object) -> Value + Send + Sync>;
pub type Factory = Arc<dyn Fn() -> anyhow::Result<Object> + Send + Sync>;

#[derive(Clone)]
pub struct MemberSchema {
    pub name: String,
    pub member_type: MemberType,
    pub access: Access,
    /// Read-only members derived from the rest of the object.
    pub computed: Option<ComputedGetter>,
}

impl fmt::Debug for MemberSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberSchema")
            .field("name", &self.name)
            .field("member_type", &self.member_type)
            .field("access", &self.access)
            .field("computed", &self.computed.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct TypeSchema {
    name: TypeName,
    members: Vec<MemberSchema>,
    factory: Option<Factory>,
    constructible: bool,
}

impl fmt::Debug for TypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSchema")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("factory", &self.factory.is_some())
            .field("constructible", &self.constructible)
            .finish()
    }
}

impl TypeSchema {
    pub fn builder(name: impl Into<TypeName>) -> TypeSchemaBuilder {
        TypeSchemaBuilder {
            schema: TypeSchema {
                name: name.into(),
                members: Vec::new(),
                factory: None,
                constructible: true,
            },
        }
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn members(&self) -> &[MemberSchema] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&MemberSchema> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Case-insensitive lookup, exact match preferred.
    pub fn find_member(&self, name: &str) -> Option<&MemberSchema> {
        self.member(name).or_else(|| {
            self.members
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn readable_members(&self) -> impl Iterator<Item = &MemberSchema> + '_ {
        self.members.iter().filter(|m| m.access.readable())
    }

    pub fn writable_members(&self) -> impl Iterator<Item = &MemberSchema> + '_ {
        self.members.iter().filter(|m| m.access.writable())
    }

    /// Default construction: the factory if one is registered, otherwise an
    /// object with every stored member set to null.
    pub fn construct(&self) -> Result<Object> {
        if let Some(factory) = &self.factory {
            let object = factory().map_err(|e| MapperError::Construction {
                type_name: self.name.clone(),
                message: format!("{:#}", e),
            })?;
            if object.type_name() != &self.name {
                return Err(MapperError::Construction {
                    type_name: self.name.clone(),
                    message: format!("factory produced an instance of {}", object.type_name()),
                });
            }
            return Ok(object);
        }

        if !self.constructible {
            return Err(MapperError::Construction {
                type_name: self.name.clone(),
                message: "type has no default constructor".to_string(),
            });
        }

        let mut object = Object::new(self.name.clone());
        for member in self.members.iter().filter(|m| m.computed.is_none()) {
            object.set(member.name.clone(), Value::Null);
        }
        Ok(object)
    }
}

pub struct TypeSchemaBuilder {
    schema: TypeSchema,
}

impl TypeSchemaBuilder {
    fn push(mut self, member: MemberSchema) -> Self {
        self.schema.members.retain(|m| m.name != member.name);
        self.schema.members.push(member);
        self
    }

    pub fn member(self, name: impl Into<String>, member_type: MemberType) -> Self {
        self.push(MemberSchema {
            name: name.into(),
            member_type,
            access: Access::ReadWrite,
            computed: None,
        })
    }

    pub fn read_only(self, name: impl Into<String>, member_type: MemberType) -> Self {
        self.push(MemberSchema {
            name: name.into(),
            member_type,
            access: Access::ReadOnly,
            computed: None,
        })
    }

    pub fn write_only(self, name: impl Into<String>, member_type: MemberType) -> Self {
        self.push(MemberSchema {
            name: name.into(),
            member_type,
            access: Access::WriteOnly,
            computed: None,
        })
    }

    /// A read-only member whose value is derived from the object.
    pub fn computed<F>(self, name: impl Into<String>, member_type: MemberType, getter: F) -> Self
    where
        F: Fn(&Object) -> Value + Send + Sync + 'static,
    {
        self.push(MemberSchema {
            name: name.into(),
            member_type,
            access: Access::ReadOnly,
            computed: Some(Arc::new(getter)),
        })
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Object> + Send + Sync + 'static,
    {
        self.schema.factory = Some(Arc::new(factory));
        self
    }

    /// Types without a default constructor must be built by a mapping's
    /// `construct_using`.
    pub fn not_constructible(mut self) -> Self {
        self.schema.constructible = false;
        self
    }

    pub fn build(self) -> TypeSchema {
        self.schema
    }
}

/// Catalog of registered schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    types: HashMap<TypeName, Arc<TypeSchema>>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any previous one with the same name.
    pub fn insert(&mut self, schema: TypeSchema) -> Option<Arc<TypeSchema>> {
        self.types.insert(schema.name.clone(), Arc::new(schema))
    }

    pub fn get(&self, name: &TypeName) -> Option<&Arc<TypeSchema>> {
        self.types.get(name)
    }

    pub fn require(&self, name: &TypeName) -> Result<&Arc<TypeSchema>> {
        self.types
            .get(name)
            .ok_or_else(|| MapperError::UnknownType(name.clone()))
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &TypeName> + '_ {
        self.types.keys()
    }
}

/// Dotted member path such as `Address.City`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberPath {
    segments: Vec<String>,
}

impl MemberPath {
    pub fn new(segments: &[&str]) -> Self {
        MemberPath {
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn single(member: impl Into<String>) -> Self {
        MemberPath {
            segments: vec![member.into()],
        }
    }

    pub fn parse(path: &str) -> Self {
        MemberPath {
            segments: path
                .split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        MemberPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_single(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> TypeSchema {
        TypeSchema::builder("Person")
            .member("Id", MemberType::Int)
            .member("Name", MemberType::String)
            .member("Friends", MemberType::list(MemberType::object("Person")))
            .computed("Display", MemberType::String, |o| {
                Value::from(format!("#{}", o.get("Id")))
            })
            .build()
    }

    #[test]
    fn test_find_member_is_case_insensitive() {
        let schema = person();
        assert_eq!(schema.find_member("name").map(|m| m.name.as_str()), Some("Name"));
        assert!(schema.find_member("nickname").is_none());
    }

    #[test]
    fn test_default_construction_skips_computed_members() {
        let object = person().construct().expect("constructible");
        assert_eq!(object.type_name().as_str(), "Person");
        assert!(object.contains("Id"));
        assert!(object.get("Id").is_null());
        assert!(!object.contains("Display"));
    }

    #[test]
    fn test_not_constructible_without_factory() {
        let schema = TypeSchema::builder("Shape").not_constructible().build();
        assert!(matches!(
            schema.construct(),
            Err(MapperError::Construction { .. })
        ));
    }

    #[test]
    fn test_factory_must_produce_declared_type() {
        let schema = TypeSchema::builder("Shape")
            .factory(|| Ok(Object::new("Circle")))
            .build();
        let err = schema.construct().unwrap_err();
        assert!(err.to_string().contains("Circle"));
    }

    #[test]
    fn test_assignability() {
        let people = MemberType::list(MemberType::object("Person"));
        let dtos = MemberType::list(MemberType::object("PersonDto"));
        assert!(dtos.is_assignable_from(&people));
        assert!(MemberType::Any.is_assignable_from(&MemberType::Int));
        assert!(!MemberType::Int.is_assignable_from(&MemberType::String));
        assert!(!MemberType::list(MemberType::Int).is_assignable_from(&people));
        assert!(people.needs_recursion());
        assert!(!MemberType::list(MemberType::Int).needs_recursion());
    }

    #[test]
    fn test_accepts_checks_object_type() {
        let member = MemberType::object("Person");
        let person = crate::value::ObjectRef::new(Object::new("Person"));
        let other = crate::value::ObjectRef::new(Object::new("Robot"));
        assert!(member.accepts(&Value::Object(person)));
        assert!(!member.accepts(&Value::Object(other)));
        assert!(member.accepts(&Value::Null));
        assert!(MemberType::Float.accepts(&Value::Int(3)));
        assert!(!MemberType::Int.accepts(&Value::Float(3.0)));
    }

    #[test]
    fn test_member_path_parse() {
        let path = MemberPath::parse("Address.City");
        assert_eq!(path.segments(), &["Address".to_string(), "City".to_string()]);
        assert!(!path.is_single());
        assert_eq!(path.to_string(), "Address.City");
        assert_eq!(MemberPath::new(&["Id"]), MemberPath::single("Id"));
    }
}
