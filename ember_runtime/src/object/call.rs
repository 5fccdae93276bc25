//! Call protocol.
//!
//! Handles calling native functions, bound methods, types (through the
//! instantiation protocol) and instances whose type defines `__call__`.
//! Also hosts the argument-count checks every native method shares.

use crate::config::runtime_config;
use crate::object::descriptor::descriptor_get;
use crate::object::instantiate::type_call;
use crate::value::{KwArg, Value};
use ember_core::{InternedString, RuntimeError, RuntimeResult, intern};
use smallvec::SmallVec;

// =============================================================================
// Argument Checks
// =============================================================================

/// Check that `args.len()` lies in `min..=max`.
pub fn check_args_len(name: &str, args: &[Value], min: usize, max: usize) -> RuntimeResult<()> {
    let got = args.len();
    if (min..=max).contains(&got) {
        return Ok(());
    }
    let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
    let message = if min == max {
        format!("{name}() takes exactly {min} {} ({got} given)", plural(min))
    } else if got < min {
        format!("{name}() takes at least {min} {} ({got} given)", plural(min))
    } else {
        format!("{name}() takes at most {max} {} ({got} given)", plural(max))
    };
    Err(RuntimeError::type_error(message))
}

/// Check that no keyword arguments were passed.
pub fn check_no_kwargs(name: &str, kwargs: &[KwArg]) -> RuntimeResult<()> {
    if kwargs.is_empty() {
        Ok(())
    } else {
        Err(RuntimeError::type_error(format!(
            "{name}() takes no keyword arguments"
        )))
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Call `callable(*args, **kwargs)`.
pub fn call(callable: &Value, args: &[Value], kwargs: &[KwArg]) -> RuntimeResult<Value> {
    match callable {
        Value::Function(f) => f.call(args, kwargs),
        Value::BoundMethod(m) => m.call(args, kwargs),
        Value::Type(ty) => type_call(ty, args, kwargs),
        other => match lookup_special(other, &intern("__call__"))? {
            Some(method) if !matches!(method, Value::None) => call(&method, args, kwargs),
            _ => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        },
    }
}

/// Call the method `name` of `receiver`, found through the full attribute
/// protocol.
pub fn call_method(
    receiver: &Value,
    name: &str,
    args: &[Value],
    kwargs: &[KwArg],
) -> RuntimeResult<Value> {
    let method = crate::object::attribute::get_attr(receiver, name)?;
    call(&method, args, kwargs)
}

/// Look up a special method on the receiver's type only, binding it to
/// the receiver. The instance store is never consulted.
pub fn lookup_special(receiver: &Value, name: &InternedString) -> RuntimeResult<Option<Value>> {
    let ty = receiver.type_object();
    let Some(found) = ty.lookup(name) else {
        return Ok(None);
    };
    descriptor_get(&found, Some(receiver), &ty, false)?
        .finish(runtime_config().max_suspension_resumes)
        .map(Some)
}

/// Call a special method if the receiver's type defines one.
pub fn call_special(
    receiver: &Value,
    name: &str,
    args: &[Value],
) -> RuntimeResult<Option<Value>> {
    match lookup_special(receiver, &intern(name))? {
        Some(Value::None) | None => Ok(None),
        Some(method) => call(&method, args, &[]).map(Some),
    }
}

/// Prepend `first` to `rest`.
pub(crate) fn prepend(first: Value, rest: &[Value]) -> SmallVec<[Value; 4]> {
    let mut full = SmallVec::with_capacity(rest.len() + 1);
    full.push(first);
    full.extend(rest.iter().cloned());
    full
}
