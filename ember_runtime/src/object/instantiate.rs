//! Instantiation protocol.
//!
//! Calling a type resolves its `__new__` (a runtime-defined one, or the
//! native constructor of the nearest built-in ancestor), then runs
//! `__init__` on the result. Every built-in type exposes its native
//! constructor as a static `__new__` guarded by the subtype-safety check,
//! so `object.__new__(SomeTupleSubclass)` cannot build an object whose
//! payload does not match its type.

use crate::config::runtime_config;
use crate::object::call::{call, prepend};
use crate::object::descriptor::descriptor_get;
use crate::object::instance::{InstanceObject, Payload};
use crate::object::type_obj::{NativeCtor, TypeObject};
use crate::types::function::NativeFunction;
use crate::types::tuple::{TupleObject, tuple_new};
use crate::value::{KwArg, Value};
use ember_core::{RuntimeError, RuntimeResult, intern};
use std::sync::Arc;
use tracing::{debug, trace};

// =============================================================================
// Native Constructors
// =============================================================================

impl NativeCtor {
    /// Payload produced by the zero-argument form of the constructor.
    pub fn zero_payload(self) -> Payload {
        match self {
            Self::Tuple => Payload::Tuple(TupleObject::empty()),
            Self::Object | Self::Unconstructible => Payload::Empty,
        }
    }

    /// Build an instance of `ty` (the owning type or a subtype of it).
    pub fn construct(
        self,
        ty: &Arc<TypeObject>,
        args: &[Value],
        kwargs: &[KwArg],
    ) -> RuntimeResult<Value> {
        match self {
            Self::Object => object_new(ty, args, kwargs),
            Self::Tuple => tuple_new(ty, args, kwargs),
            Self::Unconstructible => Err(RuntimeError::type_error(format!(
                "cannot create '{}' instances",
                ty.name()
            ))),
        }
    }
}

/// `object.__new__`: arguments are accepted and ignored.
fn object_new(ty: &Arc<TypeObject>, args: &[Value], kwargs: &[KwArg]) -> RuntimeResult<Value> {
    // The chain always ends at `object`.
    let object = ty.ancestors().last().unwrap_or(ty);
    generic_new(object, ty, args, kwargs)
}

/// Allocate an instance of `ty` carrying `builtin`'s zero payload.
///
/// For `ty == builtin` this is a plain new instance; for a subtype the
/// instance is shaped by the subtype (attribute store included when it
/// declares one).
pub fn generic_new(
    builtin: &Arc<TypeObject>,
    ty: &Arc<TypeObject>,
    _args: &[Value],
    _kwargs: &[KwArg],
) -> RuntimeResult<Value> {
    let ctor = match builtin.resolved_native_new() {
        Some(NativeCtor::Unconstructible) | None => {
            return Err(RuntimeError::type_error(format!(
                "cannot create '{}' instances",
                builtin.name()
            )));
        }
        Some(ctor) => ctor,
    };
    if !Arc::ptr_eq(builtin, ty) {
        if !ty.is_subtype(builtin) {
            return Err(RuntimeError::type_error(format!(
                "{}.__new__({}): {} is not a subtype of {}",
                builtin.name(),
                ty.name(),
                ty.name(),
                builtin.name()
            )));
        }
        trace!(builtin = %builtin.name(), subtype = %ty.name(), "blending native payload into subtype");
    }
    Ok(InstanceObject::new(ty, ctor.zero_payload()).into_value())
}

// =============================================================================
// Subtype Safety
// =============================================================================

/// `<declaring>.__new__(subtype, *args, **kwargs)`.
pub fn construct_with_subtype_safety(
    declaring: &Arc<TypeObject>,
    args: &[Value],
    kwargs: &[KwArg],
) -> RuntimeResult<Value> {
    let this = declaring.name();
    let Some((first, rest)) = args.split_first() else {
        return Err(RuntimeError::construction(format!(
            "{this}.__new__(): not enough arguments"
        )));
    };
    let Value::Type(subtype) = first else {
        return Err(RuntimeError::construction(format!(
            "{this}.__new__(X): X is not a type object ({})",
            first.type_name()
        )));
    };
    let sub = subtype.name();
    if !subtype.is_subtype(declaring) {
        return Err(RuntimeError::construction(format!(
            "{this}.__new__({sub}): {sub} is not a subtype of {this}"
        )));
    }

    let owner = subtype
        .native_owner()
        .ok_or_else(|| RuntimeError::internal(format!("type '{sub}' has no native constructor")))?;
    let expected = declaring.resolved_native_new();
    if owner.native_new() != expected {
        debug!(
            declaring = %this,
            subtype = %sub,
            suitable = %owner.name(),
            "rejected unsafe __new__"
        );
        return Err(RuntimeError::construction(format!(
            "{this}.__new__({sub}) is not safe, use {}.__new__()",
            owner.name()
        )));
    }

    match expected {
        Some(ctor) => ctor.construct(subtype, rest, kwargs),
        None => Err(RuntimeError::internal(format!(
            "type '{this}' has no native constructor"
        ))),
    }
}

/// The static `__new__` entry installed on a built-in type.
///
/// Holds the declaring type weakly; the registry owns it.
pub fn new_method_def(declaring: &Arc<TypeObject>) -> Value {
    let weak = Arc::downgrade(declaring);
    NativeFunction::static_method(declaring.name(), "__new__", move |args, kwargs| {
        let declaring = weak
            .upgrade()
            .ok_or_else(|| RuntimeError::internal("__new__ of an unregistered type"))?;
        construct_with_subtype_safety(&declaring, args, kwargs)
    })
    .with_doc("Create and return a new object.  See help(type) for accurate signature.")
    .into_value()
}

// =============================================================================
// Type Call
// =============================================================================

/// How a type produces new instances.
#[derive(Debug)]
pub enum NewSlot {
    /// `__new__` written into a runtime-created type.
    User(Value),
    /// Native constructor of the nearest built-in ancestor.
    Native(NativeCtor),
}

/// Find the constructor `ty(...)` runs.
pub fn resolve_new(ty: &TypeObject) -> RuntimeResult<NewSlot> {
    let dunder_new = intern("__new__");
    for t in ty.mro() {
        if t.has_user_new(&dunder_new) {
            if let Some(found) = t.get_own(&dunder_new) {
                return Ok(NewSlot::User(found));
            }
        }
        if let Some(ctor) = t.native_new() {
            return Ok(NewSlot::Native(ctor));
        }
    }
    Err(RuntimeError::internal(format!(
        "type '{}' has no constructor",
        ty.name()
    )))
}

/// `ty(*args, **kwargs)`.
pub fn type_call(ty: &Arc<TypeObject>, args: &[Value], kwargs: &[KwArg]) -> RuntimeResult<Value> {
    let obj = match resolve_new(ty)? {
        NewSlot::User(new_fn) => call(&new_fn, &prepend(Value::Type(ty.clone()), args), kwargs)?,
        NewSlot::Native(ctor) => ctor.construct(ty, args, kwargs)?,
    };

    // `__new__` may legitimately return something else; then no `__init__`.
    let obj_type = obj.type_object();
    if !obj_type.is_subtype(ty) {
        return Ok(obj);
    }
    if let Some(init) = obj_type.lookup(&intern("__init__")) {
        let bound = descriptor_get(&init, Some(&obj), &obj_type, false)?
            .finish(runtime_config().max_suspension_resumes)?;
        let ret = call(&bound, args, kwargs)?;
        if !ret.is_none() {
            return Err(RuntimeError::type_error(format!(
                "__init__() should return None, not '{}'",
                ret.type_name()
            )));
        }
    }
    Ok(obj)
}
