//! Attribute resolution.
//!
//! Reading `obj.name`:
//!
//! 1. Look `name` up along the type's resolution chain.
//! 2. A data descriptor found there wins.
//! 3. Otherwise the instance attribute store, if any.
//! 4. Otherwise a non-data descriptor's get, or a plain class value.
//! 5. Otherwise not found.
//!
//! Assignment and deletion go to a data descriptor if the type has one,
//! then to the instance store. Type objects follow the same order with the
//! metatype playing the type's role and the type's own chain playing the
//! instance store's.

use crate::config::runtime_config;
use crate::object::descriptor::{DescriptorKind, descriptor_get, descriptor_set};
use crate::object::registry::global_registry;
use crate::object::suspend::Completion;
use crate::object::type_obj::TypeObject;
use crate::value::Value;
use ember_core::{InternedString, RuntimeError, RuntimeResult, intern};
use std::sync::Arc;

// =============================================================================
// Generic Protocol
// =============================================================================

/// Read `name` from `obj`. Returns `None` when the attribute does not
/// exist; errors only come from descriptors.
pub fn generic_getattr(
    obj: &Value,
    name: &InternedString,
    allow_suspend: bool,
) -> RuntimeResult<Completion<Option<Value>>> {
    let ty = obj.type_object();
    let found = ty.lookup(name);
    let kind = found.as_ref().map(DescriptorKind::classify);

    if let (Some(descr), Some(DescriptorKind::Data)) = (&found, kind) {
        return Ok(descriptor_get(descr, Some(obj), &ty, allow_suspend)?.map(Some));
    }

    if let Some(value) = obj.instance_dict().and_then(|dict| dict.quick_lookup(name)) {
        return Ok(Completion::Ready(Some(value)));
    }

    match (found, kind) {
        (Some(descr), Some(DescriptorKind::NonData)) => {
            Ok(descriptor_get(&descr, Some(obj), &ty, allow_suspend)?.map(Some))
        }
        (found, _) => Ok(Completion::Ready(found)),
    }
}

/// Assign (`Some`) or delete (`None`) `name` on `obj`.
pub fn generic_setattr(
    obj: &Value,
    name: &InternedString,
    value: Option<Value>,
    allow_suspend: bool,
) -> RuntimeResult<Completion<()>> {
    let ty = obj.type_object();
    if let Some(descr) = ty.lookup(name) {
        if DescriptorKind::classify(&descr).is_data() {
            return descriptor_set(&descr, obj, value, allow_suspend);
        }
    }

    let Some(dict) = obj.instance_dict() else {
        return Err(RuntimeError::attribute_error(ty.name().as_str(), name.as_str()));
    };
    match value {
        Some(value) => {
            dict.insert(name.clone(), value);
        }
        None => {
            if dict.remove(name).is_none() {
                return Err(RuntimeError::attribute_error(ty.name().as_str(), name.as_str()));
            }
        }
    }
    Ok(Completion::Ready(()))
}

// =============================================================================
// Type Objects
// =============================================================================

/// Read `name` from the type object `ty`.
pub fn type_getattr(
    ty: &Arc<TypeObject>,
    name: &InternedString,
    allow_suspend: bool,
) -> RuntimeResult<Completion<Option<Value>>> {
    let meta = global_registry().builtins().type_.clone();
    let receiver = Value::Type(ty.clone());
    let meta_attr = meta.lookup(name);
    let meta_kind = meta_attr.as_ref().map(DescriptorKind::classify);

    if let (Some(descr), Some(DescriptorKind::Data)) = (&meta_attr, meta_kind) {
        return Ok(descriptor_get(descr, Some(&receiver), &meta, allow_suspend)?.map(Some));
    }

    if let Some(attr) = ty.lookup(name) {
        return Ok(descriptor_get(&attr, None, ty, allow_suspend)?.map(Some));
    }

    match (meta_attr, meta_kind) {
        (Some(descr), Some(DescriptorKind::NonData)) => {
            Ok(descriptor_get(&descr, Some(&receiver), &meta, allow_suspend)?.map(Some))
        }
        (found, _) => Ok(Completion::Ready(found)),
    }
}

/// Assign (`Some`) or delete (`None`) `name` on the type object `ty`.
pub fn type_setattr(
    ty: &Arc<TypeObject>,
    name: &InternedString,
    value: Option<Value>,
    allow_suspend: bool,
) -> RuntimeResult<Completion<()>> {
    if ty.is_immutable() {
        return Err(RuntimeError::type_error(format!(
            "cannot set '{}' attribute of immutable type '{}'",
            name,
            ty.name()
        )));
    }

    let meta = &global_registry().builtins().type_;
    if let Some(descr) = meta.lookup(name) {
        if DescriptorKind::classify(&descr).is_data() {
            return descriptor_set(&descr, &Value::Type(ty.clone()), value, allow_suspend);
        }
    }

    match value {
        Some(value) => {
            ty.set_own(name.clone(), value);
        }
        None => {
            if ty.remove_own(name).is_none() {
                return Err(RuntimeError::type_attribute_error(
                    ty.name().as_str(),
                    name.as_str(),
                ));
            }
        }
    }
    Ok(Completion::Ready(()))
}

// =============================================================================
// Entry Points
// =============================================================================

/// Read an attribute from any value.
pub fn get_attribute(
    obj: &Value,
    name: &InternedString,
    allow_suspend: bool,
) -> RuntimeResult<Completion<Option<Value>>> {
    match obj {
        Value::Type(ty) => type_getattr(ty, name, allow_suspend),
        _ => generic_getattr(obj, name, allow_suspend),
    }
}

/// Assign or delete an attribute on any value.
pub fn set_attribute(
    obj: &Value,
    name: &InternedString,
    value: Option<Value>,
    allow_suspend: bool,
) -> RuntimeResult<Completion<()>> {
    match obj {
        Value::Type(ty) => type_setattr(ty, name, value, allow_suspend),
        _ => generic_setattr(obj, name, value, allow_suspend),
    }
}

/// `getattr(obj, name, None)` without suspension.
pub fn lookup_attr(obj: &Value, name: &str) -> RuntimeResult<Option<Value>> {
    get_attribute(obj, &intern(name), false)?.finish(runtime_config().max_suspension_resumes)
}

/// `getattr(obj, name)` without suspension; a missing attribute raises.
pub fn get_attr(obj: &Value, name: &str) -> RuntimeResult<Value> {
    lookup_attr(obj, name)?.ok_or_else(|| missing_attribute(obj, name))
}

/// `setattr(obj, name, value)` without suspension.
pub fn set_attr(obj: &Value, name: &str, value: Value) -> RuntimeResult<()> {
    set_attribute(obj, &intern(name), Some(value), false)?
        .finish(runtime_config().max_suspension_resumes)
}

/// `delattr(obj, name)` without suspension.
pub fn del_attr(obj: &Value, name: &str) -> RuntimeResult<()> {
    set_attribute(obj, &intern(name), None, false)?
        .finish(runtime_config().max_suspension_resumes)
}

/// Attribute-missing error for `obj.name`.
pub fn missing_attribute(obj: &Value, name: &str) -> RuntimeError {
    match obj {
        Value::Type(ty) => RuntimeError::type_attribute_error(ty.name().as_str(), name),
        _ => RuntimeError::attribute_error(obj.type_name().as_str(), name),
    }
}
