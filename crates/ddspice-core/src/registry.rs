//! Component registry
//!
//! Maps configuration type names to constructors so models can be assembled
//! from a [`ComponentSpec`](crate::config::ComponentSpec) instead of code.
//! Registries are generic over the constructed type and over a construction
//! context (a tensor device, for instance).

use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Create a `ComponentParams` map with key-value pairs.
///
/// # Example
/// ```
/// use ddspice_core::params;
///
/// let params = params! {
///     "hidden" => 256,
///     "dropout" => 0.1,
/// };
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::ComponentParams::new();
        $(
            map.insert($key.to_string(), $value.into());
        )*
        map
    }};
}

/// Component parameters (simple key-value map)
pub type ComponentParams = BTreeMap<String, ParamValue>;

/// Parameter value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|f| f as f32)
    }

    /// Integers only; floats are not truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|i| usize::try_from(i).ok())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for ParamValue {
    fn from(f: f32) -> Self {
        Self::Float(f as f64)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<usize> for ParamValue {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// Get a required parameter.
pub fn get_param<T>(
    params: &ComponentParams,
    name: &str,
    convert: impl FnOnce(&ParamValue) -> Option<T>,
) -> Result<T> {
    params
        .get(name)
        .ok_or_else(|| Error::MissingArgument(name.to_string()))
        .and_then(|v| {
            convert(v).ok_or_else(|| Error::InvalidParameter(name.to_string(), format!("{:?}", v)))
        })
}

/// Get an optional parameter. A present value of the wrong type is still an error.
pub fn get_param_or<T>(
    params: &ComponentParams,
    name: &str,
    default: T,
    convert: impl FnOnce(&ParamValue) -> Option<T>,
) -> Result<T> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => convert(v)
            .ok_or_else(|| Error::InvalidParameter(name.to_string(), format!("{:?}", v))),
    }
}

/// Function that constructs a component from parameters and a context.
pub type Constructor<T, Ctx> = Arc<dyn Fn(&ComponentParams, &Ctx) -> Result<T> + Send + Sync>;

/// Named constructors for one kind of component.
pub struct Registry<T, Ctx = ()> {
    kind: &'static str,
    constructors: Arc<RwLock<BTreeMap<String, Constructor<T, Ctx>>>>,
}

impl<T, Ctx> Registry<T, Ctx> {
    /// Create an empty registry. `kind` names the component family in errors.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register a constructor, replacing any previous one under `name`.
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&ComponentParams, &Ctx) -> Result<T> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!("Registered {} type '{}'", self.kind, name);
        self.constructors.write().insert(name, Arc::new(constructor));
    }

    pub fn create(&self, name: &str, params: &ComponentParams, ctx: &Ctx) -> Result<T> {
        let constructor = self
            .constructors
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownComponent {
                kind: self.kind.to_string(),
                name: name.to_string(),
            })?;

        constructor(params, ctx)
    }

    /// Registered type names, sorted.
    pub fn list_types(&self) -> Vec<String> {
        self.constructors.read().keys().cloned().collect()
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.constructors.read().contains_key(name)
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.constructors.write().remove(name).is_some()
    }
}

impl<T, Ctx> Clone for Registry<T, Ctx> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            constructors: Arc::clone(&self.constructors),
        }
    }
}
