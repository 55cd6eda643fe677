//! Member accessor cache.
//!
//! Resolving a member against its schema happens once per (type, member);
//! later lookups are served from a concurrent map.

use crate::error::{MapperError, Result};
use crate::schema::{MemberType, SchemaSet, TypeName};
use crate::value::{Object, ObjectRef, Value};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

pub type Getter = Arc<dyn Fn(&Object) -> Value + Send + Sync>;
pub type Setter = Arc<dyn Fn(&mut Object, Value) + Send + Sync>;

#[derive(Clone)]
pub struct Accessor {
    type_name: TypeName,
    member: String,
    member_type: MemberType,
    getter: Option<Getter>,
    setter: Option<Setter>,
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("type_name", &self.type_name)
            .field("member", &self.member)
            .field("member_type", &self.member_type)
            .field("readable", &self.getter.is_some())
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

impl Accessor {
    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn member_type(&self) -> &MemberType {
        &self.member_type
    }

    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn read(&self, object: &Object) -> Result<Value> {
        let getter = self.getter.as_ref().ok_or_else(|| {
            MapperError::member_access(&self.type_name, &self.member, "member has no getter")
        })?;
        Ok(getter(object))
    }

    /// Type-check `value` against the member, then store it. No lock is held
    /// while checking, so a value may point back at `target`.
    pub fn write(&self, target: &ObjectRef, value: Value) -> Result<()> {
        let setter = self.setter.as_ref().ok_or_else(|| {
            MapperError::member_access(&self.type_name, &self.member, "member has no setter")
        })?;
        if !self.member_type.accepts(&value) {
            return Err(MapperError::member_access(
                &self.type_name,
                &self.member,
                format!(
                    "cannot assign {} to member of type {}",
                    describe(&value),
                    self.member_type
                ),
            ));
        }
        let value = match (&self.member_type, value) {
            (MemberType::Float, Value::Int(i)) => Value::Float(i as f64),
            (_, value) => value,
        };
        let mut state = target.write();
        setter(&mut state, value);
        Ok(())
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(object) => object.type_name().to_string(),
        Value::List(_) => "a list with incompatible elements".to_string(),
        other => other.kind().to_string(),
    }
}

pub struct AccessorCache {
    schemas: Arc<SchemaSet>,
    entries: DashMap<(TypeName, String), Accessor>,
}

impl AccessorCache {
    pub fn new(schemas: Arc<SchemaSet>) -> Self {
        Self {
            schemas,
            entries: DashMap::new(),
        }
    }

    /// Accessor pair for an exactly named member.
    pub fn get_accessor(&self, type_name: &TypeName, member: &str) -> Result<Accessor> {
        let key = (type_name.clone(), member.to_string());
        if let Some(found) = self.entries.get(&key) {
            return Ok(found.clone());
        }

        let accessor = self.introspect(type_name, member)?;
        self.entries.insert(key, accessor.clone());
        Ok(accessor)
    }

    /// Accessor whose getter is guaranteed to exist.
    pub fn readable(&self, type_name: &TypeName, member: &str) -> Result<Accessor> {
        let accessor = self.get_accessor(type_name, member)?;
        if !accessor.is_readable() {
            return Err(MapperError::member_not_found(type_name, member)
                .with_detail("member is write-only"));
        }
        Ok(accessor)
    }

    /// Accessor whose setter is guaranteed to exist.
    pub fn writable(&self, type_name: &TypeName, member: &str) -> Result<Accessor> {
        let accessor = self.get_accessor(type_name, member)?;
        if !accessor.is_writable() {
            return Err(MapperError::member_not_found(type_name, member)
                .with_detail("member is read-only"));
        }
        Ok(accessor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn introspect(&self, type_name: &TypeName, member: &str) -> Result<Accessor> {
        let schema = self.schemas.require(type_name)?;
        let member_schema = schema
            .member(member)
            .ok_or_else(|| MapperError::member_not_found(type_name, member))?;

        let getter: Option<Getter> = if !member_schema.access.readable() {
            None
        } else if let Some(computed) = &member_schema.computed {
            Some(computed.clone())
        } else {
            let name = member_schema.name.clone();
            Some(Arc::new(move |object: &Object| object.get(&name).clone()))
        };

        let setter: Option<Setter> = if member_schema.access.writable() {
            let name = member_schema.name.clone();
            Some(Arc::new(move |object: &mut Object, value: Value| {
                object.set(name.clone(), value);
            }))
        } else {
            None
        };

        tracing::trace!(%type_name, member, "resolved member accessor");

        Ok(Accessor {
            type_name: type_name.clone(),
            member: member_schema.name.clone(),
            member_type: member_schema.member_type.clone(),
            getter,
            setter,
        })
    }
}
