//! Host-side value universe

use crate::error::{Error, Result};
use crate::object::HostObject;
use std::any::Any;

/// Arrays of unboxed primitives
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveArray {
    /// Integer array
    Int(Vec<i64>),
    /// Floating point array
    Float(Vec<f64>),
    /// Boolean array
    Bool(Vec<bool>),
    /// Byte array
    Byte(Vec<u8>),
}

impl PrimitiveArray {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Byte(v) => v.len(),
        }
    }

    /// Whether the array is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Box every element into a [`HostValue`]
    pub fn to_values(&self) -> Vec<HostValue> {
        match self {
            Self::Int(v) => v.iter().copied().map(HostValue::Int).collect(),
            Self::Float(v) => v.iter().copied().map(HostValue::Float).collect(),
            Self::Bool(v) => v.iter().copied().map(HostValue::Bool).collect(),
            Self::Byte(v) => v.iter().map(|b| HostValue::Int(i64::from(*b))).collect(),
        }
    }
}

/// A value on the host side of the bridge
#[derive(Debug, Clone, Default)]
pub enum HostValue {
    /// No value
    #[default]
    Unit,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    Str(String),
    /// Live host instance
    Object(HostObject),
    /// Array of boxed values
    Array(Vec<HostValue>),
    /// Array of unboxed primitives
    PrimitiveArray(PrimitiveArray),
}

impl HostValue {
    /// Type name used in error messages
    pub fn type_name(&self) -> String {
        match self {
            Self::Unit => "unit".to_string(),
            Self::Bool(_) => "bool".to_string(),
            Self::Int(_) => "int".to_string(),
            Self::Float(_) => "float".to_string(),
            Self::Str(_) => "string".to_string(),
            Self::Object(o) => o.class().name().to_string(),
            Self::Array(_) => "array".to_string(),
            Self::PrimitiveArray(_) => "primitive array".to_string(),
        }
    }

    /// Whether this is [`HostValue::Unit`]
    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Read as a boolean
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(Error::type_mismatch("bool", other.type_name())),
        }
    }

    /// Read as an integer
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(i) => Ok(*i),
            other => Err(Error::type_mismatch("int", other.type_name())),
        }
    }

    /// Read as a float, widening integers
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Self::Float(f) => Ok(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Ok(*i as f64),
            other => Err(Error::type_mismatch("float", other.type_name())),
        }
    }

    /// Read as a string slice
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(Error::type_mismatch("string", other.type_name())),
        }
    }

    /// Read as a host instance
    pub fn as_object(&self) -> Result<&HostObject> {
        match self {
            Self::Object(o) => Ok(o),
            other => Err(Error::type_mismatch("object", other.type_name())),
        }
    }

    /// Borrow the wrapped instance as `T`
    pub fn downcast_ref<T: Any>(&self) -> Result<&T> {
        self.as_object()?.expect_ref::<T>()
    }
}

/// Objects compare by identity, everything else by value.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::PrimitiveArray(a), Self::PrimitiveArray(b)) => a == b,
            _ => false,
        }
    }
}

impl From<()> for HostValue {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<HostObject> for HostValue {
    fn from(value: HostObject) -> Self {
        Self::Object(value)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(value: Vec<HostValue>) -> Self {
        Self::Array(value)
    }
}

impl From<PrimitiveArray> for HostValue {
    fn from(value: PrimitiveArray) -> Self {
        Self::PrimitiveArray(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(HostValue::from(3).as_int().unwrap(), 3);
        assert_eq!(HostValue::from(3).as_float().unwrap(), 3.0);
        assert_eq!(HostValue::from("hi").as_str().unwrap(), "hi");
        assert!(HostValue::from(true).as_bool().unwrap());
        assert!(HostValue::from("hi").as_int().is_err());
    }

    #[test]
    fn test_equality_by_value() {
        let a = HostValue::from(vec![HostValue::from(1), HostValue::from("x")]);
        let b = HostValue::from(vec![HostValue::from(1), HostValue::from("x")]);
        assert_eq!(a, b);
        assert_ne!(HostValue::from(1), HostValue::from(1.0));
    }

    #[test]
    fn test_primitive_array_boxing() {
        let bytes = PrimitiveArray::Byte(vec![1, 2]);
        assert_eq!(bytes.len(), 2);
        assert_eq!(bytes.to_values(), vec![HostValue::Int(1), HostValue::Int(2)]);
        assert!(PrimitiveArray::Bool(Vec::new()).is_empty());
    }
}
