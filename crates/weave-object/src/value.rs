//! Dynamically typed value representation

use std::fmt;
use std::rc::Rc;

use crate::function::Function;
use crate::object::Object;

/// A dynamically typed value.
///
/// Primitives compare by value; objects and functions compare by
/// identity (same heap allocation), which is the comparison the advice
/// engine relies on to tell an own method slot from an inherited one.
#[derive(Clone)]
pub enum Value {
    /// Absent value; also what a slot read yields for a missing entry
    Undefined,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable shared string
    Str(Rc<str>),
    /// Object reference
    Object(Object),
    /// Callable function value
    Function(Function),
}

impl Value {
    /// Create an integer value.
    pub fn int(v: i64) -> Self {
        Value::Int(v)
    }

    /// Create a string value.
    pub fn str(v: impl Into<Rc<str>>) -> Self {
        Value::Str(v.into())
    }

    /// True if this is `Undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// The object reference, if this is an `Object`.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The function reference, if this is a `Function`.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Short name of the value's runtime type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Object(o) => write!(f, "Object(#{})", o.id()),
            Value::Function(func) => fmt::Debug::fmt(func, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Object(o) => write!(f, "[object #{}]", o.id()),
            Value::Function(_) => write!(f, "[function]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallResult;

    #[test]
    fn test_primitive_equality() {
        assert_eq!(Value::Int(3), Value::Int(3));
        assert_ne!(Value::Int(3), Value::Int(4));
        assert_ne!(Value::Int(3), Value::Float(3.0));
        assert_eq!(Value::str("a"), Value::str("a"));
        assert_eq!(Value::Undefined, Value::Undefined);
    }

    #[test]
    fn test_reference_equality_is_identity() {
        let a = Object::new();
        let b = Object::new();
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a), Value::Object(b));

        let f = Function::native(|_, _| -> CallResult { Ok(Value::Undefined) });
        let g = Function::native(|_, _| -> CallResult { Ok(Value::Undefined) });
        assert_eq!(Value::Function(f.clone()), Value::Function(f.clone()));
        assert_ne!(Value::Function(f), Value::Function(g));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::str("hi").as_str(), Some("hi"));
        assert_eq!(Value::Undefined.as_int(), None);
        assert!(Value::Undefined.is_undefined());
        assert_eq!(Value::Int(0).type_name(), "int");
    }
}
