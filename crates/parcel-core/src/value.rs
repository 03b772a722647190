//! Loosely typed values
//!
//! Input maps, stored property values and serialized output all use
//! [`Value`]. Plain data is made of the scalar variants, [`Value::List`]
//! (sequential) and [`Value::Map`] (associative). Rich values are nested
//! instances ([`Value::Dto`]) and opaque objects ([`Value::Object`]).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::dto::Dto;
use crate::error::{DtoError, DtoResult};

/// Insertion ordered string-keyed map
pub type Map = IndexMap<String, Value>;

/// An opaque rich type: wrapper objects, typed collections, resource handles
///
/// Objects are matched against class tokens with [`RichObject::is_instance_of`].
/// An object without a native data form can only be serialized through a
/// cast that recognises it.
pub trait RichObject: fmt::Debug + Send + Sync {
    /// Fully-qualified type name, used for type checks and error messages
    fn type_name(&self) -> &str;

    /// Check if this object satisfies the class token `class`
    fn is_instance_of(&self, class: &str) -> bool {
        self.type_name() == class
    }

    /// Native plain-data form, if any
    fn to_data(&self) -> Option<DtoResult<Value>> {
        None
    }

    /// Access to the concrete type for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Runtime kind of a value, as reported in validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `null`
    Null,
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `string`
    String,
    /// lists and maps
    Array,
    /// nested instances and opaque objects
    Object,
}

impl ValueKind {
    /// Kind name
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A loosely typed value
#[derive(Debug, Clone)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    String(String),
    /// Sequential collection
    List(Vec<Value>),
    /// Associative collection
    Map(Map),
    /// Nested instance
    Dto(Arc<Dto>),
    /// Opaque rich object
    Object(Arc<dyn RichObject>),
}

impl Value {
    /// Runtime kind
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::List(_) | Value::Map(_) => ValueKind::Array,
            Value::Dto(_) | Value::Object(_) => ValueKind::Object,
        }
    }

    /// Type name: the class for rich values, the kind otherwise
    pub fn type_name(&self) -> &str {
        match self {
            Value::Dto(dto) => dto.class_name(),
            Value::Object(object) => object.type_name(),
            other => other.kind().name(),
        }
    }

    /// Short description used in error messages
    ///
    /// Objects are summarised by type name, lists and maps as `array`.
    pub fn summary(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => "array".to_string(),
            Value::Dto(_) | Value::Object(_) => self.type_name().to_string(),
        }
    }

    /// Check if this is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a bool, number or string
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// Check if this is a sequential list
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Check if this is an associative map
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Get the boolean if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer if this is an Int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the number if this is a Float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the string if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the elements if this is a List
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the entries if this is a Map
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Take the entries if this is a Map
    pub fn into_map(self) -> Option<Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get the nested instance if this is a Dto
    pub fn as_dto(&self) -> Option<&Arc<Dto>> {
        match self {
            Value::Dto(dto) => Some(dto),
            _ => None,
        }
    }

    /// Downcast an opaque object to its concrete type
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => object.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Expand rich values into plain data using their native forms
    ///
    /// Nested instances serialize through [`Dto::to_array`] (or
    /// [`Dto::to_array_with_defaults`]); opaque objects through
    /// [`RichObject::to_data`]. Objects without a data form fail with
    /// [`DtoError::SerializationUnsupported`].
    pub fn to_plain(&self, with_defaults: bool) -> DtoResult<Value> {
        match self {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    item.to_plain(with_defaults)
                        .map_err(|e| e.prefixed(&index.to_string()))
                })
                .collect::<DtoResult<Vec<_>>>()
                .map(Value::List),
            Value::Map(map) => map
                .iter()
                .map(|(key, item)| -> DtoResult<(String, Value)> {
                    let plain = item.to_plain(with_defaults).map_err(|e| e.prefixed(key))?;
                    Ok((key.clone(), plain))
                })
                .collect::<DtoResult<Map>>()
                .map(Value::Map),
            Value::Dto(dto) => {
                let map = if with_defaults {
                    dto.to_array_with_defaults()?
                } else {
                    dto.to_array()?
                };
                Ok(Value::Map(map))
            }
            Value::Object(object) => match object.to_data() {
                Some(data) => data,
                None => Err(DtoError::SerializationUnsupported {
                    property: String::new(),
                    type_name: object.type_name().to_string(),
                }),
            },
            scalar => Ok(scalar.clone()),
        }
    }

    /// Convert to a JSON value, expanding rich values natively
    pub fn to_json(&self) -> DtoResult<serde_json::Value> {
        match self.to_plain(false)? {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(serde_json::Value::Bool(b)),
            Value::Int(i) => Ok(serde_json::Value::from(i)),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| DtoError::SerializationUnsupported {
                    property: String::new(),
                    type_name: format!("float {}", f),
                }),
            Value::String(s) => Ok(serde_json::Value::String(s)),
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| item.to_json().map_err(|e| e.prefixed(&index.to_string())))
                .collect::<DtoResult<Vec<_>>>()
                .map(serde_json::Value::Array),
            Value::Map(map) => map
                .iter()
                .map(|(key, item)| -> DtoResult<(String, serde_json::Value)> {
                    Ok((key.clone(), item.to_json().map_err(|e| e.prefixed(key))?))
                })
                .collect::<DtoResult<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object),
            rich => Err(DtoError::SerializationUnsupported {
                property: String::new(),
                type_name: rich.type_name().to_string(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Dto(a), Value::Dto(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
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

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Dto> for Value {
    fn from(dto: Dto) -> Self {
        Value::Dto(Arc::new(dto))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, Value::from(item)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Handle;

    impl RichObject for Handle {
        fn type_name(&self) -> &str {
            "resource"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_kind_and_summary() {
        assert_eq!(Value::Null.summary(), "null");
        assert_eq!(Value::from(vec![1, 2]).summary(), "array");
        assert_eq!(Value::from("blam").summary(), "blam");
        assert_eq!(Value::Int(4).kind(), ValueKind::Int);
        assert_eq!(Value::Map(Map::new()).kind().name(), "array");

        let handle = Value::Object(Arc::new(Handle));
        assert_eq!(handle.summary(), "resource");
        assert_eq!(handle.kind(), ValueKind::Object);
    }

    #[test]
    fn test_from_json() {
        let value = Value::from(json!({
            "name": "Ada",
            "age": 36,
            "score": 1.5,
            "tags": ["a", null],
        }));

        let map = value.as_map().unwrap();
        assert_eq!(map["name"], Value::from("Ada"));
        assert_eq!(map["age"], Value::Int(36));
        assert_eq!(map["score"], Value::Float(1.5));
        assert_eq!(map["tags"], Value::List(vec![Value::from("a"), Value::Null]));
    }

    #[test]
    fn test_to_json_plain() {
        let value = Value::from(json!({"a": [1, true, "x"], "b": null}));
        assert_eq!(value.to_json().unwrap(), json!({"a": [1, true, "x"], "b": null}));
    }

    #[test]
    fn test_opaque_object_has_no_plain_form() {
        let mut map = Map::new();
        map.insert("handle".to_string(), Value::Object(Arc::new(Handle)));

        let err = Value::Map(map).to_plain(false).unwrap_err();
        match err {
            DtoError::SerializationUnsupported {
                property,
                type_name,
            } => {
                assert_eq!(property, "handle");
                assert_eq!(type_name, "resource");
            }
            other => panic!("Expected SerializationUnsupported, got {:?}", other),
        }
    }

    #[test]
    fn test_downcast() {
        let value = Value::Object(Arc::new(Handle));
        assert!(value.downcast_ref::<Handle>().is_some());
        assert!(Value::Null.downcast_ref::<Handle>().is_none());
    }
}
