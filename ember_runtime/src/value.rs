//! Runtime values.
//!
//! Immediates (`None`, bools, ints, floats, interned strings) are stored
//! inline; everything else is a reference-counted handle. Identity of a
//! handle is pointer identity.

use crate::object::descriptor::Descriptor;
use crate::object::instance::{AttrDict, InstanceObject};
use crate::object::registry::global_registry;
use crate::object::type_obj::TypeObject;
use crate::types::function::{BoundMethod, NativeFunction};
use crate::types::iter::PyIterator;
use crate::types::slice::SliceObject;
use crate::types::tuple::{TupleObject, tuple_value};
use ember_core::{InternedString, intern};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A keyword argument.
pub type KwArg = (InternedString, Value);

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    None,
    NotImplemented,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(InternedString),
    Type(Arc<TypeObject>),
    Object(Arc<InstanceObject>),
    Function(Arc<NativeFunction>),
    BoundMethod(Arc<BoundMethod>),
    Descriptor(Descriptor),
    Slice(Arc<SliceObject>),
    Iterator(Arc<dyn PyIterator>),
}

impl Value {
    /// Interned string value.
    #[inline]
    pub fn str(s: &str) -> Self {
        Self::Str(intern(s))
    }

    /// New exact tuple.
    #[inline]
    pub fn tuple(items: Vec<Value>) -> Self {
        tuple_value(items)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Integer payload (bools excluded).
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer usable as an index (bools included).
    #[inline]
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_type(&self) -> Option<&Arc<TypeObject>> {
        match self {
            Self::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Sequence payload of a tuple or tuple-subtype instance.
    #[inline]
    pub fn as_tuple(&self) -> Option<&TupleObject> {
        match self {
            Self::Object(inst) => inst.as_tuple(),
            _ => None,
        }
    }

    /// Check if this is a `tuple` and not a subtype instance.
    pub fn is_exact_tuple(&self) -> bool {
        match self {
            Self::Object(inst) if inst.as_tuple().is_some() => inst
                .ob_type()
                .is_some_and(|ty| ty.id() == global_registry().builtins().tuple.id()),
            _ => false,
        }
    }

    /// Instance attribute store, if the value has one.
    #[inline]
    pub fn instance_dict(&self) -> Option<&Arc<AttrDict>> {
        match self {
            Self::Object(inst) => inst.dict(),
            _ => None,
        }
    }

    /// The value's type.
    pub fn type_object(&self) -> Arc<TypeObject> {
        let builtins = global_registry().builtins();
        let ty = match self {
            Self::None => &builtins.none,
            Self::NotImplemented => &builtins.not_implemented,
            Self::Bool(_) => &builtins.bool_,
            Self::Int(_) => &builtins.int,
            Self::Float(_) => &builtins.float,
            Self::Str(_) => &builtins.str_,
            Self::Type(_) => &builtins.type_,
            Self::Object(inst) => {
                return inst.ob_type().unwrap_or_else(|| {
                    warn!("instance outlived the registry that owned its type");
                    builtins.object.clone()
                });
            }
            Self::Function(_) => &builtins.function,
            Self::BoundMethod(_) => &builtins.method,
            Self::Descriptor(Descriptor::Data(_)) => &builtins.property,
            Self::Descriptor(Descriptor::NonData(_)) => &builtins.method_descriptor,
            Self::Slice(_) => &builtins.slice,
            Self::Iterator(it) => builtins.iterator_type(it.kind()),
        };
        ty.clone()
    }

    /// Name of the value's type.
    pub fn type_name(&self) -> InternedString {
        self.type_object().name().clone()
    }

    /// Identity comparison (`is`).
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::NotImplemented, Self::NotImplemented) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            (Self::BoundMethod(a), Self::BoundMethod(b)) => Arc::ptr_eq(a, b),
            (Self::Descriptor(a), Self::Descriptor(b)) => a.ptr_eq(b),
            (Self::Slice(a), Self::Slice(b)) => Arc::ptr_eq(a, b),
            (Self::Iterator(a), Self::Iterator(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }

    /// Address of a handle value, for identity hashing. `None` for
    /// immediates.
    pub fn addr(&self) -> Option<usize> {
        let addr = match self {
            Self::Type(t) => Arc::as_ptr(t) as *const () as usize,
            Self::Object(o) => Arc::as_ptr(o) as *const () as usize,
            Self::Function(f) => Arc::as_ptr(f) as *const () as usize,
            Self::BoundMethod(m) => Arc::as_ptr(m) as *const () as usize,
            Self::Descriptor(d) => d.addr(),
            Self::Slice(s) => Arc::as_ptr(s) as *const () as usize,
            Self::Iterator(i) => Arc::as_ptr(i) as *const () as usize,
            _ => return None,
        };
        Some(addr)
    }
}

impl From<Arc<TypeObject>> for Value {
    fn from(ty: Arc<TypeObject>) -> Self {
        Self::Type(ty)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::ops::repr(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::None.type_name().as_str(), "NoneType");
        assert_eq!(Value::Bool(true).type_name().as_str(), "bool");
        assert_eq!(Value::Int(1).type_name().as_str(), "int");
        assert_eq!(Value::Float(1.5).type_name().as_str(), "float");
        assert_eq!(Value::str("a").type_name().as_str(), "str");
        assert_eq!(Value::tuple(vec![]).type_name().as_str(), "tuple");
        assert_eq!(Value::NotImplemented.type_name().as_str(), "NotImplementedType");

        let object: Value = global_registry().builtins().object.clone().into();
        assert_eq!(object.type_name().as_str(), "type");
    }

    #[test]
    fn test_identity() {
        let a = Value::tuple(vec![Value::Int(1)]);
        let b = Value::tuple(vec![Value::Int(1)]);
        assert!(a.is(&a.clone()));
        assert!(!a.is(&b));
        assert!(Value::str("x").is(&Value::str("x")));
        assert!(Value::Float(f64::NAN).is(&Value::Float(f64::NAN)));
        assert!(!Value::Int(1).is(&Value::Bool(true)));
    }

    #[test]
    fn test_index_conversion() {
        assert_eq!(Value::Int(3).as_index(), Some(3));
        assert_eq!(Value::Bool(true).as_index(), Some(1));
        assert_eq!(Value::Bool(true).as_int(), None);
        assert_eq!(Value::Float(1.0).as_index(), None);
    }

    #[test]
    fn test_exact_tuple() {
        assert!(Value::tuple(vec![]).is_exact_tuple());
        assert!(!Value::Int(1).is_exact_tuple());
    }

    #[test]
    fn test_addr_only_for_handles() {
        assert!(Value::Int(1).addr().is_none());
        assert!(Value::tuple(vec![]).addr().is_some());
    }
}
