//! Abstract object operations.
//!
//! Hashing, comparison, repr and the sequence/iteration protocols for
//! arbitrary values. Immediates are handled inline; instances dispatch
//! through the special methods found on their type, with the tuple payload
//! as the native fallback.

use crate::config::runtime_config;
use crate::object::call::{call, call_special};
use crate::object::descriptor::{Descriptor, descriptor_get};
use crate::object::instance::InstanceObject;
use crate::types::iter::{ArrayIter, IterKind, self_iter};
use crate::value::Value;
use ember_core::{RuntimeError, RuntimeResult, intern};
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

// =============================================================================
// Comparison Operators
// =============================================================================

/// A rich comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CompareOp {
    /// The operator with its operands exchanged (`a < b` is `b > a`).
    pub const fn swapped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Special method implementing the operator.
    pub const fn dunder(self) -> &'static str {
        match self {
            Self::Lt => "__lt__",
            Self::Le => "__le__",
            Self::Eq => "__eq__",
            Self::Ne => "__ne__",
            Self::Gt => "__gt__",
            Self::Ge => "__ge__",
        }
    }

    /// Check if `ordering` satisfies the operator.
    #[inline]
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

// =============================================================================
// Truthiness
// =============================================================================

/// `bool(value)`.
pub fn truthy(value: &Value) -> RuntimeResult<bool> {
    Ok(match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Object(_) => match call_special(value, "__bool__", &[])? {
            Some(result) => truthy(&result)?,
            None => match call_special(value, "__len__", &[])? {
                Some(n) => n.as_index().is_some_and(|n| n != 0),
                None => true,
            },
        },
        _ => true,
    })
}

// =============================================================================
// Hashing
// =============================================================================

const NONE_HASH: i64 = 0x4e6f_6e65;
const NOT_IMPLEMENTED_HASH: i64 = 0x4e6f_7449;
const INF_HASH: i64 = 314_159;

/// `-1` is reserved as an error marker by hash consumers.
#[inline]
fn fold(h: i64) -> i64 {
    if h == -1 { -2 } else { h }
}

#[inline]
fn identity_hash(addr: usize) -> i64 {
    fold((addr >> 4) as i64)
}

fn float_hash(f: f64) -> i64 {
    if f.is_nan() {
        0
    } else if f.is_infinite() {
        if f > 0.0 { INF_HASH } else { -INF_HASH }
    } else if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        // Integral floats hash like the equal int.
        fold(f as i64)
    } else {
        fold(f.to_bits() as i64)
    }
}

fn unhashable(value: &Value) -> RuntimeError {
    RuntimeError::type_error(format!("unhashable type: '{}'", value.type_name()))
}

/// `hash(value)`.
pub fn hash(value: &Value) -> RuntimeResult<i64> {
    match value {
        Value::None => Ok(NONE_HASH),
        Value::NotImplemented => Ok(NOT_IMPLEMENTED_HASH),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Int(i) => Ok(fold(*i)),
        Value::Float(f) => Ok(float_hash(*f)),
        Value::Str(s) => {
            let mut hasher = FxHasher::default();
            s.as_str().hash(&mut hasher);
            Ok(fold(hasher.finish() as i64))
        }
        Value::Slice(_) => Err(unhashable(value)),
        Value::Object(inst) => instance_hash(value, inst),
        _ => Ok(identity_hash(value.addr().unwrap_or_default())),
    }
}

fn instance_hash(value: &Value, inst: &InstanceObject) -> RuntimeResult<i64> {
    let ty = value.type_object();
    match ty.lookup_with_owner(&intern("__hash__")) {
        Some((Value::None, _)) => Err(unhashable(value)),
        Some((method, owner)) if owner.is_heap_type() => {
            let bound = descriptor_get(&method, Some(value), &ty, false)?
                .finish(runtime_config().max_suspension_resumes)?;
            let result = call(&bound, &[], &[])?;
            result.as_index().map(fold).ok_or_else(|| {
                RuntimeError::type_error("__hash__ method should return an integer")
            })
        }
        _ => match inst.as_tuple() {
            Some(t) => t.hash(),
            None => Ok(identity_hash(value.addr().unwrap_or_default())),
        },
    }
}

// =============================================================================
// Rich Comparison
// =============================================================================

enum Number {
    Int(i64),
    Float(f64),
}

fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::Bool(b) => Some(Number::Int(i64::from(*b))),
        Value::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

/// Exact ordering of an int against a float; `None` for NaN.
fn int_float_cmp(i: i64, f: f64) -> Option<Ordering> {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return None;
    }
    if f >= TWO_POW_63 {
        return Some(Ordering::Less);
    }
    if f < -TWO_POW_63 {
        return Some(Ordering::Greater);
    }
    // In range, so the truncation is exact.
    let whole = f.trunc();
    Some(i.cmp(&(whole as i64)).then_with(|| {
        if f > whole {
            Ordering::Less
        } else if f < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }))
}

fn primitive_compare(a: &Value, b: &Value, op: CompareOp) -> Option<bool> {
    let ordering = match (a, b) {
        (Value::Str(x), Value::Str(y)) => Some(x.as_str().cmp(y.as_str())),
        (Value::Slice(x), Value::Slice(y)) => {
            return match op {
                CompareOp::Eq => Some(x == y),
                CompareOp::Ne => Some(x != y),
                _ => None,
            };
        }
        _ => match (as_number(a)?, as_number(b)?) {
            (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
            (Number::Int(x), Number::Float(y)) => int_float_cmp(x, y),
            (Number::Float(x), Number::Int(y)) => int_float_cmp(y, x).map(Ordering::reverse),
            (Number::Float(x), Number::Float(y)) => x.partial_cmp(&y),
        },
    };
    // Unordered (NaN) compares unequal to everything.
    Some(ordering.map_or(op == CompareOp::Ne, |o| op.matches(o)))
}

/// One side's comparison slot; `None` means not implemented for the pair.
fn slot_compare(a: &Value, b: &Value, op: CompareOp) -> RuntimeResult<Option<bool>> {
    let Value::Object(inst) = a else {
        return Ok(primitive_compare(a, b, op));
    };
    if let Some(result) = call_special(a, op.dunder(), std::slice::from_ref(b))? {
        return match result {
            Value::NotImplemented => Ok(None),
            other => truthy(&other).map(Some),
        };
    }
    match inst.as_tuple() {
        Some(t) => t.rich_compare(b, op),
        None => Ok(None),
    }
}

/// `a <op> b` without the identity shortcut.
pub fn rich_compare(a: &Value, b: &Value, op: CompareOp) -> RuntimeResult<bool> {
    if let Some(result) = slot_compare(a, b, op)? {
        return Ok(result);
    }
    if let Some(result) = slot_compare(b, a, op.swapped())? {
        return Ok(result);
    }
    match op {
        CompareOp::Eq => Ok(a.is(b)),
        CompareOp::Ne => Ok(!a.is(b)),
        _ => Err(RuntimeError::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// `a <op> b` as used by containers: identical objects are equal.
pub fn rich_compare_bool(a: &Value, b: &Value, op: CompareOp) -> RuntimeResult<bool> {
    if a.is(b) {
        match op {
            CompareOp::Eq => return Ok(true),
            CompareOp::Ne => return Ok(false),
            _ => {}
        }
    }
    rich_compare(a, b, op)
}

/// `a == b` with the identity shortcut.
#[inline]
pub fn equal(a: &Value, b: &Value) -> RuntimeResult<bool> {
    rich_compare_bool(a, b, CompareOp::Eq)
}

// =============================================================================
// Repr
// =============================================================================

fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn float_repr(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        (if f > 0.0 { "inf" } else { "-inf" }).to_string()
    } else {
        format!("{f:?}")
    }
}

/// `repr(value)`. A failing `__repr__` falls back to the default form.
pub fn repr(value: &Value) -> String {
    match value {
        Value::None => "None".to_string(),
        Value::NotImplemented => "NotImplemented".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_repr(*f),
        Value::Str(s) => str_repr(s),
        Value::Type(t) => format!("<class '{}'>", t.name()),
        Value::Object(inst) => {
            if let Some(t) = inst.as_tuple() {
                if value.is_exact_tuple() {
                    return t.repr();
                }
            }
            match call_special(value, "__repr__", &[]) {
                Ok(Some(Value::Str(s))) => s.to_string(),
                _ => default_repr(value),
            }
        }
        Value::Function(f) => format!("<method '{}' of '{}' objects>", f.name(), f.owner()),
        Value::BoundMethod(m) => format!(
            "<built-in method {} of {} object>",
            m.func().name(),
            m.receiver().type_name()
        ),
        Value::Descriptor(Descriptor::Data(d)) => format!("<property '{}'>", d.name()),
        Value::Descriptor(Descriptor::NonData(d)) => format!("<descriptor '{}'>", d.name()),
        Value::Slice(s) => s.to_string(),
        Value::Iterator(_) => default_repr(value),
    }
}

fn default_repr(value: &Value) -> String {
    format!(
        "<{} object at {:#x}>",
        value.type_name(),
        value.addr().unwrap_or_default()
    )
}

// =============================================================================
// Sequence Protocol
// =============================================================================

fn usize_result(value: Value, method: &str) -> RuntimeResult<usize> {
    value
        .as_index()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            RuntimeError::type_error(format!("{method}() should return a non-negative integer"))
        })
}

/// `len(value)`.
pub fn len(value: &Value) -> RuntimeResult<usize> {
    match value {
        Value::Str(s) => Ok(s.chars().count()),
        Value::Object(_) => match call_special(value, "__len__", &[])? {
            Some(n) => usize_result(n, "__len__"),
            None => Err(no_len(value)),
        },
        _ => Err(no_len(value)),
    }
}

fn no_len(value: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "object of type '{}' has no len()",
        value.type_name()
    ))
}

/// `container[key]`.
pub fn getitem(container: &Value, key: &Value) -> RuntimeResult<Value> {
    if let Value::Object(_) = container {
        if let Some(result) = call_special(container, "__getitem__", std::slice::from_ref(key))? {
            return Ok(result);
        }
    }
    Err(RuntimeError::type_error(format!(
        "'{}' object is not subscriptable",
        container.type_name()
    )))
}

/// `item in container`.
pub fn contains(container: &Value, item: &Value) -> RuntimeResult<bool> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(RuntimeError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Object(_) => {
            if let Some(result) =
                call_special(container, "__contains__", std::slice::from_ref(item))?
            {
                return truthy(&result);
            }
            let it = iter(container)?;
            while let Some(element) = next(&it)? {
                if equal(&element, item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Iterator(_) => {
            while let Some(element) = next(container)? {
                if equal(&element, item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(RuntimeError::type_error(format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ))),
    }
}

fn unsupported(symbol: &str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        symbol,
        a.type_name(),
        b.type_name()
    ))
}

/// `a + b` for sequences.
pub fn concat(a: &Value, b: &Value) -> RuntimeResult<Value> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Value::str(&format!("{x}{y}"))),
        _ => match a.as_tuple() {
            Some(t) => t.concat(b),
            None => Err(unsupported("+", a, b)),
        },
    }
}

/// `seq * count` for sequences.
pub fn repeat(seq: &Value, count: &Value) -> RuntimeResult<Value> {
    match seq.as_tuple() {
        Some(t) => t.repeat(count),
        None => Err(unsupported("*", seq, count)),
    }
}

// =============================================================================
// Iteration Protocol
// =============================================================================

/// `iter(value)`.
pub fn iter(value: &Value) -> RuntimeResult<Value> {
    match value {
        Value::Iterator(_) => Ok(self_iter(value)),
        Value::Str(s) => {
            let chars: Vec<Value> = s
                .chars()
                .map(|c| Value::str(c.encode_utf8(&mut [0u8; 4])))
                .collect();
            Ok(ArrayIter::new(IterKind::StrIterator, chars.into()).into_value())
        }
        Value::Object(_) => match call_special(value, "__iter__", &[])? {
            Some(it) => Ok(it),
            None => Err(not_iterable(value)),
        },
        _ => Err(not_iterable(value)),
    }
}

fn not_iterable(value: &Value) -> RuntimeError {
    RuntimeError::type_error(format!("'{}' object is not iterable", value.type_name()))
}

/// `next(iterator)`, with exhaustion as `None`.
pub fn next(iterator: &Value) -> RuntimeResult<Option<Value>> {
    match iterator {
        Value::Iterator(it) => it.next_value(),
        _ => match call_special(iterator, "__next__", &[]) {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => Err(RuntimeError::type_error(format!(
                "'{}' object is not an iterator",
                iterator.type_name()
            ))),
            Err(err) if err.is_stop_iteration() => Ok(None),
            Err(err) => Err(err),
        },
    }
}

/// Drain an iterable into a vector.
pub fn collect(iterable: &Value) -> RuntimeResult<Vec<Value>> {
    if let Some(t) = iterable.as_tuple() {
        if iterable.is_exact_tuple() {
            return Ok(t.as_slice().to_vec());
        }
    }
    let it = iter(iterable)?;
    let mut items = match &it {
        Value::Iterator(i) => Vec::with_capacity(i.length_hint()),
        _ => Vec::new(),
    };
    while let Some(value) = next(&it)? {
        items.push(value);
    }
    Ok(items)
}

/// `reversed(value)`.
pub fn reversed(value: &Value) -> RuntimeResult<Value> {
    match call_special(value, "__reversed__", &[])? {
        Some(it) => Ok(it),
        None => Err(RuntimeError::type_error(format!(
            "'{}' object is not reversible",
            value.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::slice::SliceObject;

    #[test]
    fn test_compare_op_tables() {
        assert_eq!(CompareOp::Lt.swapped(), CompareOp::Gt);
        assert_eq!(CompareOp::Eq.swapped(), CompareOp::Eq);
        assert!(CompareOp::Le.matches(Ordering::Equal));
        assert!(!CompareOp::Gt.matches(Ordering::Equal));
        assert_eq!(CompareOp::Ge.symbol(), ">=");
        assert_eq!(CompareOp::Ne.dunder(), "__ne__");
    }

    #[test]
    fn test_int_hash_folds_minus_one() {
        assert_eq!(hash(&Value::Int(-1)).unwrap(), -2);
        assert_eq!(hash(&Value::Int(7)).unwrap(), 7);
        assert_eq!(hash(&Value::Bool(true)).unwrap(), 1);
    }

    #[test]
    fn test_equal_numbers_hash_equal() {
        assert_eq!(hash(&Value::Float(3.0)).unwrap(), hash(&Value::Int(3)).unwrap());
        assert!(equal(&Value::Float(3.0), &Value::Int(3)).unwrap());
        assert!(equal(&Value::Bool(true), &Value::Int(1)).unwrap());
    }

    #[test]
    fn test_large_int_float_compare_exactly() {
        let big = Value::Int((1 << 53) + 1);
        let near = Value::Float(9_007_199_254_740_992.0);
        assert!(!equal(&big, &near).unwrap());
        assert!(rich_compare(&big, &near, CompareOp::Gt).unwrap());
        assert!(rich_compare(&near, &big, CompareOp::Lt).unwrap());

        let a = Value::tuple(vec![big]);
        let b = Value::tuple(vec![near]);
        assert!(!equal(&a, &b).unwrap());

        let exact = Value::Int(1 << 53);
        assert!(equal(&exact, &Value::Float(9_007_199_254_740_992.0)).unwrap());
        assert_eq!(
            hash(&exact).unwrap(),
            hash(&Value::Float(9_007_199_254_740_992.0)).unwrap()
        );
    }

    #[test]
    fn test_int_float_edges() {
        assert!(rich_compare(&Value::Int(i64::MAX), &Value::Float(9.3e18), CompareOp::Lt).unwrap());
        assert!(rich_compare(&Value::Int(i64::MIN), &Value::Float(-9.223372036854775808e18), CompareOp::Eq).unwrap());
        assert!(rich_compare(&Value::Int(2), &Value::Float(2.5), CompareOp::Lt).unwrap());
        assert!(rich_compare(&Value::Int(-2), &Value::Float(-2.5), CompareOp::Gt).unwrap());
        assert!(rich_compare(&Value::Float(f64::INFINITY), &Value::Int(i64::MAX), CompareOp::Gt).unwrap());
        assert!(!equal(&Value::Int(0), &Value::Float(f64::NAN)).unwrap());
    }

    #[test]
    fn test_string_hash_is_stable() {
        assert_eq!(
            hash(&Value::str("abc")).unwrap(),
            hash(&Value::str("abc")).unwrap()
        );
    }

    #[test]
    fn test_slice_unhashable() {
        let slice = SliceObject::new(None, None, None).unwrap().into_value();
        let err = hash(&slice).unwrap_err();
        assert_eq!(err.to_string(), "unhashable type: 'slice'");
    }

    #[test]
    fn test_nan_compares_unequal() {
        let nan = Value::Float(f64::NAN);
        assert!(!rich_compare(&nan, &nan, CompareOp::Eq).unwrap());
        assert!(rich_compare(&nan, &nan, CompareOp::Ne).unwrap());
        // Containers treat the same object as equal to itself.
        assert!(rich_compare_bool(&nan, &nan, CompareOp::Eq).unwrap());
    }

    #[test]
    fn test_mixed_ordering_is_type_error() {
        let err = rich_compare(&Value::Int(1), &Value::str("a"), CompareOp::Lt).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'<' not supported between instances of 'int' and 'str'"
        );
        assert!(!rich_compare(&Value::Int(1), &Value::str("a"), CompareOp::Eq).unwrap());
    }

    #[test]
    fn test_repr_immediates() {
        assert_eq!(repr(&Value::None), "None");
        assert_eq!(repr(&Value::Bool(true)), "True");
        assert_eq!(repr(&Value::Float(1.0)), "1.0");
        assert_eq!(repr(&Value::str("it's")), "\"it's\"");
        assert_eq!(repr(&Value::str("a")), "'a'");
    }

    #[test]
    fn test_truthy() {
        assert!(!truthy(&Value::None).unwrap());
        assert!(!truthy(&Value::Int(0)).unwrap());
        assert!(truthy(&Value::str("x")).unwrap());
        assert!(!truthy(&Value::tuple(vec![])).unwrap());
        assert!(truthy(&Value::tuple(vec![Value::None])).unwrap());
    }

    #[test]
    fn test_collect_string() {
        let chars = collect(&Value::str("ab")).unwrap();
        assert_eq!(chars.len(), 2);
        assert_eq!(chars[1].as_str(), Some("b"));
    }

    #[test]
    fn test_next_on_non_iterator() {
        let err = next(&Value::tuple(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "'tuple' object is not an iterator");
    }

    #[test]
    fn test_len_and_contains() {
        let t = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(len(&t).unwrap(), 2);
        assert!(contains(&t, &Value::Int(2)).unwrap());
        assert!(!contains(&t, &Value::Int(3)).unwrap());
        assert!(len(&Value::Int(1)).is_err());
    }
}
