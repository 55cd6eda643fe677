//! Typed layer over the dynamic object model.
//!
//! [`ModelValue`] converts a Rust value to and from [`Value`]; [`Model`] adds
//! the schema and record conversion of a struct. Both are normally produced
//! by `#[derive(Model)]`. Conversions assume tree-shaped data: a cyclic
//! object graph cannot be rebuilt as owned Rust values.

use crate::error::{MapperError, Result};
use crate::schema::{MemberType, SchemaSet, TypeName, TypeSchema};
use crate::value::{Object, ObjectRef, Value};
use chrono::{DateTime, Utc};

pub trait ModelValue: Sized {
    fn member_type() -> MemberType;

    fn to_value(&self) -> Value;

    /// `Null` converts to the type's default.
    fn from_value(value: &Value) -> Result<Self>;

    /// Register the schemas of every model reachable from this type.
    fn register_types(_schemas: &mut SchemaSet) {}
}

pub trait Model: ModelValue + Default {
    fn type_name() -> TypeName;

    fn schema() -> TypeSchema;

    fn to_record(&self) -> Object;

    fn from_record(record: &Object) -> Result<Self>;

    fn to_object(&self) -> ObjectRef {
        ObjectRef::new(self.to_record())
    }

    fn from_object(object: &ObjectRef) -> Result<Self> {
        let expected = Self::type_name();
        if object.type_name() != &expected {
            return Err(MapperError::Conversion {
                target: expected.to_string(),
                found: object.type_name().to_string(),
            });
        }
        Self::from_record(&object.snapshot())
    }
}

fn conversion_error(target: &str, found: &Value) -> MapperError {
    MapperError::Conversion {
        target: target.to_string(),
        found: match found {
            Value::Object(object) => object.type_name().to_string(),
            other => other.kind().to_string(),
        },
    }
}

/// `ModelValue::from_value` body shared by derived models.
pub fn model_from_value<T: Model>(value: &Value) -> Result<T> {
    match value {
        Value::Null => Ok(T::default()),
        Value::Object(object) => T::from_object(object),
        other => Err(conversion_error(T::type_name().as_str(), other)),
    }
}

/// Insert the schema of `T` unless it is already present. Returns `true` if
/// it was inserted, in which case nested types still need registering.
pub fn insert_schema<T: Model>(schemas: &mut SchemaSet) -> bool {
    if schemas.contains(&T::type_name()) {
        return false;
    }
    schemas.insert(T::schema());
    true
}

/// Read and convert one member of a record, naming the member on failure.
pub fn read_member<T: ModelValue>(record: &Object, member: &str) -> Result<T> {
    T::from_value(record.get(member)).map_err(|err| match err {
        MapperError::Conversion { target, found } => MapperError::Conversion {
            target: format!("{}.{} ({})", record.type_name(), member, target),
            found,
        },
        other => other,
    })
}

impl ModelValue for bool {
    fn member_type() -> MemberType {
        MemberType::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            other => Err(conversion_error("bool", other)),
        }
    }
}

macro_rules! impl_model_value_int {
    ($($ty:ty),*) => {
        $(
            impl ModelValue for $ty {
                fn member_type() -> MemberType {
                    MemberType::Int
                }

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: &Value) -> Result<Self> {
                    match value {
                        Value::Null => Ok(0),
                        Value::Int(i) => <$ty>::try_from(*i).map_err(|_| MapperError::Conversion {
                            target: stringify!($ty).to_string(),
                            found: format!("int {}", i),
                        }),
                        other => Err(conversion_error(stringify!($ty), other)),
                    }
                }
            }
        )*
    };
}

impl_model_value_int!(i8, i16, i32, i64, u8, u16, u32);

impl ModelValue for f64 {
    fn member_type() -> MemberType {
        MemberType::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(0.0),
            other => other.as_f64().ok_or_else(|| conversion_error("f64", other)),
        }
    }
}

impl ModelValue for f32 {
    fn member_type() -> MemberType {
        MemberType::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(0.0),
            other => other
                .as_f64()
                .map(|x| x as f32)
                .ok_or_else(|| conversion_error("f32", other)),
        }
    }
}

impl ModelValue for String {
    fn member_type() -> MemberType {
        MemberType::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s.clone()),
            other => Err(conversion_error("String", other)),
        }
    }
}

impl ModelValue for DateTime<Utc> {
    fn member_type() -> MemberType {
        MemberType::DateTime
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(DateTime::<Utc>::default()),
            Value::DateTime(dt) => Ok(*dt),
            other => Err(conversion_error("DateTime<Utc>", other)),
        }
    }
}

impl ModelValue for Value {
    fn member_type() -> MemberType {
        MemberType::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: ModelValue> ModelValue for Option<T> {
    fn member_type() -> MemberType {
        T::member_type()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn register_types(schemas: &mut SchemaSet) {
        T::register_types(schemas);
    }
}

impl<T: ModelValue> ModelValue for Vec<T> {
    fn member_type() -> MemberType {
        MemberType::list(T::member_type())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ModelValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(conversion_error("Vec", other)),
        }
    }

    fn register_types(schemas: &mut SchemaSet) {
        T::register_types(schemas);
    }
}

impl<T: ModelValue> ModelValue for Box<T> {
    fn member_type() -> MemberType {
        T::member_type()
    }

    fn to_value(&self) -> Value {
        self.as_ref().to_value()
    }

    fn from_value(value: &Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }

    fn register_types(schemas: &mut SchemaSet) {
        T::register_types(schemas);
    }
}
