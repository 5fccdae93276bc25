//! Instances of runtime types.
//!
//! An instance holds a non-owning back-reference to its type (the registry
//! owns every type), an optional attribute store, and the payload of its
//! nearest built-in ancestor.

use crate::object::type_obj::TypeObject;
use crate::types::iter::{CheckedArrayIter, IterKind, LiveSize};
use crate::types::tuple::TupleObject;
use crate::value::Value;
use ember_core::InternedString;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, Weak};

// =============================================================================
// Attribute Store
// =============================================================================

/// Per-instance attribute dictionary.
#[derive(Default)]
pub struct AttrDict {
    entries: RwLock<FxHashMap<InternedString, Value>>,
}

impl AttrDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct lookup, no protocol.
    #[inline]
    pub fn quick_lookup(&self, name: &InternedString) -> Option<Value> {
        self.entries.read().get(name).cloned()
    }

    /// Insert or replace, returning the previous value.
    pub fn insert(&self, name: InternedString, value: Value) -> Option<Value> {
        self.entries.write().insert(name, value)
    }

    /// Remove, returning the previous value.
    pub fn remove(&self, name: &InternedString) -> Option<Value> {
        self.entries.write().remove(name)
    }

    #[inline]
    pub fn contains(&self, name: &InternedString) -> bool {
        self.entries.read().contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the keys as string values.
    pub fn keys(&self) -> Vec<Value> {
        self.entries
            .read()
            .keys()
            .cloned()
            .map(Value::Str)
            .collect()
    }

    /// Iterator over a snapshot of the keys that fails if the store grows
    /// or shrinks while it is being walked.
    pub fn keys_iter(dict: &Arc<AttrDict>) -> CheckedArrayIter {
        let origin: Weak<dyn LiveSize> = Arc::downgrade(dict) as Weak<dyn LiveSize>;
        CheckedArrayIter::new(IterKind::DictKeyIterator, dict.keys().into(), origin)
    }
}

impl LiveSize for AttrDict {
    fn live_size(&self) -> usize {
        self.len()
    }

    fn container_name(&self) -> &'static str {
        "dict"
    }
}

impl fmt::Debug for AttrDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_map()
            .entries(entries.iter().map(|(k, v)| (k.as_str(), v)))
            .finish()
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Built-in state an instance inherits from its native ancestor.
#[derive(Debug)]
pub enum Payload {
    Empty,
    Tuple(TupleObject),
}

// =============================================================================
// Instance Object
// =============================================================================

/// An object whose type is a runtime type object.
pub struct InstanceObject {
    ob_type: Weak<TypeObject>,
    dict: Option<Arc<AttrDict>>,
    payload: Payload,
}

impl InstanceObject {
    /// Allocate an instance of `ty`, with an attribute store if the type
    /// asks for one.
    pub fn new(ty: &Arc<TypeObject>, payload: Payload) -> Self {
        Self {
            ob_type: Arc::downgrade(ty),
            dict: ty.has_instance_dict().then(|| Arc::new(AttrDict::new())),
            payload,
        }
    }

    /// The instance's type. Always `Some` for types created through a live
    /// [`TypeRegistry`](crate::object::registry::TypeRegistry).
    #[inline]
    pub fn ob_type(&self) -> Option<Arc<TypeObject>> {
        self.ob_type.upgrade()
    }

    #[inline]
    pub fn dict(&self) -> Option<&Arc<AttrDict>> {
        self.dict.as_ref()
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The sequence payload, for tuples and tuple subtypes.
    #[inline]
    pub fn as_tuple(&self) -> Option<&TupleObject> {
        match &self.payload {
            Payload::Tuple(t) => Some(t),
            Payload::Empty => None,
        }
    }

    /// Wrap as a runtime value.
    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

impl fmt::Debug for InstanceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceObject")
            .field("type", &self.ob_type().map(|t| t.name().clone()))
            .field("dict", &self.dict)
            .field("payload", &self.payload)
            .finish()
    }
}
