//! Process-wide mapper for code that cannot carry a [`Mapper`] around.
//!
//! Install once at startup; every call afterwards goes through the same
//! frozen registry.

use crate::error::{MapperError, Result};
use crate::mapper::Mapper;
use crate::model::Model;
use crate::schema::TypeName;
use crate::value::ObjectRef;
use once_cell::sync::OnceCell;

static MAPPER: OnceCell<Mapper> = OnceCell::new();

/// Install the process-wide mapper. Fails if one is already installed.
pub fn install(mapper: Mapper) -> Result<()> {
    MAPPER.set(mapper).map_err(|_| {
        MapperError::Configuration("a global mapper is already installed".to_string())
    })?;
    tracing::debug!("global mapper installed");
    Ok(())
}

pub fn is_installed() -> bool {
    MAPPER.get().is_some()
}

pub fn mapper() -> Result<&'static Mapper> {
    MAPPER
        .get()
        .ok_or_else(|| MapperError::Configuration("no global mapper installed".to_string()))
}

pub fn transform(source: &ObjectRef, destination: impl Into<TypeName>) -> Result<ObjectRef> {
    mapper()?.transform(source, destination)
}

pub fn merge_into(source: &ObjectRef, destination: &ObjectRef) -> Result<()> {
    mapper()?.merge_into(source, destination)
}

pub fn patch(source: &ObjectRef, destination: &ObjectRef) -> Result<()> {
    mapper()?.patch(source, destination)
}

pub fn map<S: Model, D: Model>(source: &S) -> Result<D> {
    mapper()?.map(source)
}
