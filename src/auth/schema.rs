//! Payload shape descriptions used when decoding credentials.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// The decoded payload does not match the expected shape.
#[derive(Debug, Error)]
#[error("payload does not match schema: {0}")]
pub struct SchemaError(pub String);

/// Validates and converts a raw payload into a typed value.
pub trait PayloadSchema {
    type Output;

    fn decode(&self, value: Value) -> Result<Self::Output, SchemaError>;
}

/// Schema backed by a serde type.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> PayloadSchema for Typed<T> {
    type Output = T;

    fn decode(&self, value: Value) -> Result<T, SchemaError> {
        serde_json::from_value(value).map_err(|e| SchemaError(e.to_string()))
    }
}

/// Accepts any JSON object as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawObject;

impl PayloadSchema for RawObject {
    type Output = Map<String, Value>;

    fn decode(&self, value: Value) -> Result<Self::Output, SchemaError> {
        match value {
            Value::Object(map) => Ok(map),
            other => Err(SchemaError(format!("expected object, found {other}"))),
        }
    }
}
