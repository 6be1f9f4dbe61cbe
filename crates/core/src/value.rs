//! The run-time value domain.

use std::fmt;

use crate::errors::MachineError;
use crate::pointer::ObjectPointer;

/// A run-time value. Disjoint tagged union -- there is no implicit conversion between
/// variants beyond [`Value::to_boolean`] and [`Value::to_int`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    Null,
    Void,
    Object { class_name: String, ptr: ObjectPointer },
}

impl Value {
    pub fn object(class_name: impl Into<String>, ptr: ObjectPointer) -> Self {
        Value::Object {
            class_name: class_name.into(),
            ptr,
        }
    }

    /// Every value is truthy except the `false` singleton -- including `null`, `void`
    /// and `0`. Anything that isn't literally `false` takes the branch in an `if`.
    pub fn to_boolean(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn to_int(&self) -> Result<i32, MachineError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(MachineError::TypeMismatch {
                expected: "Int",
                found: other.type_name().to_string(),
            }),
        }
    }

    pub fn as_object(&self) -> Result<(&str, ObjectPointer), MachineError> {
        match self {
            Value::Object { class_name, ptr } => Ok((class_name.as_str(), *ptr)),
            other => Err(MachineError::TypeMismatch {
                expected: "Object",
                found: other.type_name().to_string(),
            }),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::Null => "Null",
            Value::Void => "Void",
            Value::Object { .. } => "Object",
        }
    }

    /// The printable form used by the `print` statement: `true`, `false`, `null`,
    /// `void`, a decimal integer, or a stable-but-unspecified object marker.
    pub fn to_print(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
            Value::Null => "null".to_string(),
            Value::Void => "void".to_string(),
            Value::Object { class_name, ptr } => format!("<{class_name} {ptr:?}>"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_print())
    }
}
