//! Dynamic object model the engine maps between.
//!
//! [`Value`] is a nullable, cloneable value. Complex values are held through
//! [`ObjectRef`], a shared handle with identity, so graphs may share nodes and
//! contain cycles. An [`Object`] is the detached record behind a handle.

use crate::schema::TypeName;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

static NULL: Value = Value::Null;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    List(Vec<Value>),
    Object(ObjectRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::DateTime(dt) => write!(f, "DateTime({})", dt.to_rfc3339()),
            Value::List(items) => f.debug_list().entries(items).finish(),
            // Objects print by identity; a graph may be cyclic.
            Value::Object(object) => write!(f, "{:?}", object),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(object) => write!(f, "{:?}", object),
        }
    }
}

/// Structural equality. Objects compare member-wise; a pair of objects
/// already under comparison is assumed equal, which makes cyclic graphs
/// terminate.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        structural_eq(self, other, &mut HashSet::new())
    }
}

fn structural_eq(a: &Value, b: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::DateTime(x), Value::DateTime(y)) => x == y,
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| structural_eq(x, y, seen))
        }
        (Value::Object(x), Value::Object(y)) => {
            if x.ptr_eq(y) || !seen.insert((x.identity(), y.identity())) {
                return true;
            }
            if x.type_name() != y.type_name() {
                return false;
            }
            let left = x.snapshot();
            let right = y.snapshot();
            left.members.len() == right.members.len()
                && left.members.iter().all(|(name, value)| {
                    right
                        .members
                        .get(name)
                        .is_some_and(|other| structural_eq(value, other, seen))
                })
        }
        _ => false,
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(ObjectRef::new(object))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Detached record: a type name and its stored members.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    type_name: TypeName,
    members: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Object {
            type_name: type_name.into(),
            members: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Returns `Null` for members that were never set.
    pub fn get(&self, member: &str) -> &Value {
        self.members.get(member).unwrap_or(&NULL)
    }

    pub fn set(&mut self, member: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.members.insert(member.into(), value.into())
    }

    pub fn with(mut self, member: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(member, value);
        self
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.contains_key(member)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_ref(self) -> ObjectRef {
        ObjectRef::new(self)
    }
}

struct ObjectCell {
    type_name: TypeName,
    state: RwLock<Object>,
}

/// Shared handle to an object. Cloning the handle shares the object; the
/// type is fixed when the handle is created.
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectCell>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        ObjectRef(Arc::new(ObjectCell {
            type_name: object.type_name.clone(),
            state: RwLock::new(object),
        }))
    }

    pub fn type_name(&self) -> &TypeName {
        &self.0.type_name
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.0.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, member: &str) -> Value {
        self.read().get(member).clone()
    }

    pub fn set(&self, member: impl Into<String>, value: impl Into<Value>) {
        self.write().set(member, value);
    }

    /// Copy of the current record. Values inside are shared handles, so this
    /// is shallow for nested objects.
    pub fn snapshot(&self) -> Object {
        self.read().clone()
    }

    /// Replace the record wholesale, keeping the handle's type.
    pub(crate) fn restore(&self, object: Object) {
        *self.write() = object;
    }

    /// Address-based identity, stable for the lifetime of the handle.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.0.type_name, self.identity())
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Value::Object(self.clone()) == Value::Object(other.clone())
    }
}
