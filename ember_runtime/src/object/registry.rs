//! Type registry.
//!
//! Owns every type object. Built-in types are created together when the
//! registry is first touched; runtime types enter only through
//! [`TypeRegistry::new_subtype`].

use crate::object::descriptor::Property;
use crate::object::instantiate::new_method_def;
use crate::object::suspend::Completion;
use crate::object::type_obj::{NativeCtor, TypeFlags, TypeId, TypeObject};
use crate::types::iter::{IterKind, install_iterator_methods};
use crate::types::tuple::{install_tuple_methods, tuple_value};
use crate::value::Value;
use ember_core::{RuntimeError, RuntimeResult, intern};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

// =============================================================================
// Built-in Types
// =============================================================================

/// Handles to every built-in type.
#[derive(Debug)]
pub struct BuiltinTypes {
    pub object: Arc<TypeObject>,
    pub type_: Arc<TypeObject>,
    pub none: Arc<TypeObject>,
    pub not_implemented: Arc<TypeObject>,
    pub int: Arc<TypeObject>,
    pub bool_: Arc<TypeObject>,
    pub float: Arc<TypeObject>,
    pub str_: Arc<TypeObject>,
    pub tuple: Arc<TypeObject>,
    pub slice: Arc<TypeObject>,
    pub function: Arc<TypeObject>,
    pub method: Arc<TypeObject>,
    pub property: Arc<TypeObject>,
    pub method_descriptor: Arc<TypeObject>,
    pub tuple_iterator: Arc<TypeObject>,
    pub tuple_reverse_iterator: Arc<TypeObject>,
    pub dict_key_iterator: Arc<TypeObject>,
    pub str_iterator: Arc<TypeObject>,
}

impl BuiltinTypes {
    fn create() -> Self {
        let object = Arc::new(TypeObject::new(
            TypeId::OBJECT,
            intern("object"),
            None,
            TypeFlags::BASETYPE | TypeFlags::IMMUTABLE,
            Some(NativeCtor::Object),
        ));
        let sealed = |id: TypeId, name: &str, base: &Arc<TypeObject>| {
            Arc::new(TypeObject::new(
                id,
                intern(name),
                Some(base.clone()),
                TypeFlags::IMMUTABLE,
                Some(NativeCtor::Unconstructible),
            ))
        };

        let int = sealed(TypeId::INT, "int", &object);
        let iterator_type = |kind: IterKind, id: TypeId| {
            let ty = sealed(id, kind.type_name(), &object);
            install_iterator_methods(&ty);
            ty
        };

        let builtins = Self {
            type_: sealed(TypeId::TYPE, "type", &object),
            none: sealed(TypeId::NONE, "NoneType", &object),
            not_implemented: sealed(TypeId::NOT_IMPLEMENTED, "NotImplementedType", &object),
            bool_: sealed(TypeId::BOOL, "bool", &int),
            float: sealed(TypeId::FLOAT, "float", &object),
            str_: sealed(TypeId::STR, "str", &object),
            tuple: Arc::new(TypeObject::new(
                TypeId::TUPLE,
                intern("tuple"),
                Some(object.clone()),
                TypeFlags::BASETYPE | TypeFlags::IMMUTABLE,
                Some(NativeCtor::Tuple),
            )),
            slice: sealed(TypeId::SLICE, "slice", &object),
            function: sealed(TypeId::FUNCTION, "builtin_function_or_method", &object),
            method: sealed(TypeId::METHOD, "method", &object),
            property: sealed(TypeId::PROPERTY, "property", &object),
            method_descriptor: sealed(TypeId::METHOD_DESCRIPTOR, "method_descriptor", &object),
            tuple_iterator: iterator_type(IterKind::TupleIterator, TypeId::TUPLE_ITERATOR),
            tuple_reverse_iterator: iterator_type(
                IterKind::TupleReverseIterator,
                TypeId::TUPLE_REVERSE_ITERATOR,
            ),
            dict_key_iterator: iterator_type(IterKind::DictKeyIterator, TypeId::DICT_KEY_ITERATOR),
            str_iterator: iterator_type(IterKind::StrIterator, TypeId::STR_ITERATOR),
            int,
            object,
        };

        for ty in builtins.all() {
            ty.set_own(intern("__new__"), new_method_def(ty));
        }
        install_object_members(&builtins.object);
        install_type_members(&builtins.type_);
        install_tuple_methods(&builtins.tuple);
        builtins
    }

    /// Every built-in type, `object` first.
    pub fn all(&self) -> [&Arc<TypeObject>; 18] {
        [
            &self.object,
            &self.type_,
            &self.none,
            &self.not_implemented,
            &self.int,
            &self.bool_,
            &self.float,
            &self.str_,
            &self.tuple,
            &self.slice,
            &self.function,
            &self.method,
            &self.property,
            &self.method_descriptor,
            &self.tuple_iterator,
            &self.tuple_reverse_iterator,
            &self.dict_key_iterator,
            &self.str_iterator,
        ]
    }

    /// The type an iterator of `kind` reports.
    pub fn iterator_type(&self, kind: IterKind) -> &Arc<TypeObject> {
        match kind {
            IterKind::TupleIterator => &self.tuple_iterator,
            IterKind::TupleReverseIterator => &self.tuple_reverse_iterator,
            IterKind::DictKeyIterator => &self.dict_key_iterator,
            IterKind::StrIterator => &self.str_iterator,
        }
    }
}

fn install_object_members(object: &TypeObject) {
    object.set_own(
        intern("__class__"),
        Property::readonly("__class__", |this| {
            Ok(Completion::Ready(Value::Type(this.type_object())))
        })
        .into_value(),
    );
}

fn receiver_type(this: &Value) -> RuntimeResult<&Arc<TypeObject>> {
    this.as_type().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "descriptor requires a 'type' object but received '{}'",
            this.type_name()
        ))
    })
}

fn install_type_members(type_: &TypeObject) {
    type_.set_own(
        intern("__name__"),
        Property::readonly("__name__", |this| {
            let ty = receiver_type(this)?;
            Ok(Completion::Ready(Value::Str(ty.name().clone())))
        })
        .into_value(),
    );
    type_.set_own(
        intern("__base__"),
        Property::readonly("__base__", |this| {
            let ty = receiver_type(this)?;
            Ok(Completion::Ready(
                ty.base().map_or(Value::None, |b| Value::Type(b.clone())),
            ))
        })
        .into_value(),
    );
    type_.set_own(
        intern("__mro__"),
        Property::readonly("__mro__", |this| {
            let ty = receiver_type(this)?;
            let chain = std::iter::once(ty.clone())
                .chain(ty.ancestors().iter().cloned())
                .map(Value::Type)
                .collect();
            Ok(Completion::Ready(tuple_value(chain)))
        })
        .into_value(),
    );
}

// =============================================================================
// Registry
// =============================================================================

/// Instance layout requested for a new subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrStorage {
    /// Instances get an attribute store.
    Dict,
    /// No attribute store, unless a base already has one.
    Slots,
}

/// Registry of all type objects.
///
/// The registry owns every type it hands out, built-in or heap, for as long
/// as it lives. Heap types are never unregistered, so the non-owning type
/// reference held by each instance always resolves.
pub struct TypeRegistry {
    builtins: BuiltinTypes,
    types: RwLock<FxHashMap<TypeId, Arc<TypeObject>>>,
    next_id: AtomicU32,
}

impl TypeRegistry {
    /// Create a registry holding a fresh set of built-in types.
    pub fn new() -> Self {
        let builtins = BuiltinTypes::create();
        let types = builtins
            .all()
            .into_iter()
            .map(|ty| (ty.id(), ty.clone()))
            .collect::<FxHashMap<_, _>>();
        debug!(count = types.len(), "registered built-in types");
        Self {
            builtins,
            types: RwLock::new(types),
            next_id: AtomicU32::new(TypeId::FIRST_USER_TYPE),
        }
    }

    #[inline]
    pub fn builtins(&self) -> &BuiltinTypes {
        &self.builtins
    }

    /// Allocate an id for a runtime-created type.
    pub fn allocate_type_id(&self) -> TypeId {
        TypeId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create and register a subtype of `base`.
    ///
    /// The new type lives as long as the registry. Fails if `base` does not
    /// allow subclassing.
    pub fn new_subtype(
        &self,
        name: &str,
        base: &Arc<TypeObject>,
        storage: AttrStorage,
    ) -> RuntimeResult<Arc<TypeObject>> {
        if !base.is_basetype() {
            return Err(RuntimeError::type_error(format!(
                "type '{}' is not an acceptable base type",
                base.name()
            )));
        }

        let mut flags = TypeFlags::HEAPTYPE | TypeFlags::BASETYPE;
        if storage == AttrStorage::Dict || base.has_instance_dict() {
            flags |= TypeFlags::HAS_DICT;
        }
        let id = self.allocate_type_id();
        let ty = Arc::new(TypeObject::new(
            id,
            intern(name),
            Some(base.clone()),
            flags,
            None,
        ));
        self.types.write().insert(id, ty.clone());

        debug!(
            type_name = name,
            base = %base.name(),
            id = id.raw(),
            has_dict = ty.has_instance_dict(),
            "registered subtype"
        );
        Ok(ty)
    }

    /// Look up a type by id.
    #[inline]
    pub fn get(&self, id: TypeId) -> Option<Arc<TypeObject>> {
        self.types.read().get(&id).cloned()
    }

    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        self.types.read().contains_key(&id)
    }

    /// Look up a built-in type by name.
    pub fn builtin_by_name(&self, name: &str) -> Option<&Arc<TypeObject>> {
        self.builtins
            .all()
            .into_iter()
            .find(|ty| ty.name().as_str() == name)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Global Registry Access
// =============================================================================

static GLOBAL_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// Get the process-wide registry, creating the built-in types on first use.
pub fn global_registry() -> &'static TypeRegistry {
    GLOBAL_REGISTRY.get_or_init(TypeRegistry::new)
}
