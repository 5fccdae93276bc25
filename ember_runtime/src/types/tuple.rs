//! Tuple object implementation.
//!
//! Immutable, fixed-length sequence of values. The element array is shared
//! (`Arc<[Value]>`) so iterators, slices of the whole and subtype instances
//! can hold it without copying.

use crate::config::runtime_config;
use crate::object::call::{check_args_len, check_no_kwargs};
use crate::object::instance::{InstanceObject, Payload};
use crate::object::registry::global_registry;
use crate::object::type_obj::TypeObject;
use crate::ops::{self, CompareOp};
use crate::types::function::NativeFunction;
use crate::types::iter::{ArrayIter, IterKind, ReverseArrayIter};
use crate::value::{KwArg, Value};
use ember_core::{RuntimeError, RuntimeResult, intern};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Docstring installed as `tuple.__doc__`.
pub const TUPLE_DOC: &str = "Built-in immutable sequence.\n\n\
If no argument is given, the constructor returns an empty tuple.\n\
If iterable is specified the tuple is initialized from iterable's items.\n\n\
If the argument is a tuple, the return value is the same object.";

const HASH_SEED: i64 = 0x345678;
const HASH_MULT: i64 = 1_000_003;
const HASH_MULT_STEP: i64 = 82_520;
const HASH_TAIL: i64 = 97_531;

// =============================================================================
// TupleObject
// =============================================================================

/// Payload of `tuple` and tuple-subtype instances.
pub struct TupleObject {
    items: Arc<[Value]>,
    hash: OnceLock<i64>,
}

impl TupleObject {
    pub fn new(items: Vec<Value>) -> Self {
        Self::from_shared(items.into())
    }

    /// Share an existing element array.
    pub fn from_shared(items: Arc<[Value]>) -> Self {
        Self {
            items,
            hash: OnceLock::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    /// The shared element array.
    #[inline]
    pub fn shared(&self) -> &Arc<[Value]> {
        &self.items
    }

    /// Element at `index`, counting from the end when negative.
    pub fn get(&self, index: i64) -> Option<&Value> {
        let len = self.items.len() as i64;
        let index = if index < 0 { index + len } else { index };
        if (0..len).contains(&index) {
            self.items.get(index as usize)
        } else {
            None
        }
    }

    // =========================================================================
    // Sequence Protocol
    // =========================================================================

    /// `self[key]` for an integer or slice key.
    pub fn getitem(&self, key: &Value) -> RuntimeResult<Value> {
        if let Some(index) = key.as_index() {
            return self
                .get(index)
                .cloned()
                .ok_or_else(|| RuntimeError::index_error("tuple index out of range"));
        }
        if let Value::Slice(slice) = key {
            let items = slice
                .resolve(self.len())
                .positions()
                .map(|i| self.items[i].clone())
                .collect();
            return Ok(tuple_value(items));
        }
        Err(RuntimeError::type_error(format!(
            "tuple indices must be integers or slices, not {}",
            key.type_name()
        )))
    }

    /// `self + other`; `other` must be an exact tuple.
    pub fn concat(&self, other: &Value) -> RuntimeResult<Value> {
        let rhs = match other.as_tuple() {
            Some(rhs) if other.is_exact_tuple() => rhs,
            _ => {
                return Err(RuntimeError::type_error(format!(
                    "can only concatenate tuple (not \"{}\") to tuple",
                    other.type_name()
                )));
            }
        };
        let total = self
            .len()
            .checked_add(rhs.len())
            .filter(|&n| n <= runtime_config().max_sequence_length)
            .ok_or_else(|| RuntimeError::overflow("concatenated tuple is too long"))?;

        let mut items = Vec::with_capacity(total);
        items.extend_from_slice(&self.items);
        items.extend_from_slice(&rhs.items);
        Ok(tuple_value(items))
    }

    /// `self * count`.
    pub fn repeat(&self, count: &Value) -> RuntimeResult<Value> {
        let n = count.as_index().ok_or_else(|| {
            RuntimeError::type_error(format!(
                "can't multiply sequence by non-int of type '{}'",
                count.type_name()
            ))
        })?;
        if n <= 0 || self.is_empty() {
            return Ok(tuple_value(Vec::new()));
        }
        let n = usize::try_from(n).map_err(|_| {
            RuntimeError::overflow("cannot fit 'int' into an index-sized integer")
        })?;
        let total = self
            .len()
            .checked_mul(n)
            .filter(|&total| total <= runtime_config().max_sequence_length)
            .ok_or_else(|| RuntimeError::overflow("repeated tuple is too long"))?;

        let mut items = Vec::with_capacity(total);
        for _ in 0..n {
            items.extend_from_slice(&self.items);
        }
        Ok(tuple_value(items))
    }

    /// `item in self`.
    pub fn contains(&self, item: &Value) -> RuntimeResult<bool> {
        for element in self.items.iter() {
            if ops::rich_compare_bool(element, item, CompareOp::Eq)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Position of the first element equal to `item` within
    /// `[start, stop)`.
    pub fn index_of(
        &self,
        item: &Value,
        start: Option<&Value>,
        stop: Option<&Value>,
    ) -> RuntimeResult<usize> {
        let len = self.len();
        let start = clamp_bound(start, len, 0)?;
        let stop = clamp_bound(stop, len, len)?;

        for i in start..stop.max(start) {
            if ops::rich_compare_bool(&self.items[i], item, CompareOp::Eq)? {
                return Ok(i);
            }
        }
        Err(RuntimeError::value_error("tuple.index(x): x not in tuple"))
    }

    /// Number of elements equal to `item`.
    pub fn count(&self, item: &Value) -> RuntimeResult<usize> {
        let mut n = 0;
        for element in self.items.iter() {
            if ops::rich_compare_bool(element, item, CompareOp::Eq)? {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Forward iterator over the elements.
    pub fn iter(&self) -> ArrayIter {
        ArrayIter::new(IterKind::TupleIterator, self.items.clone())
    }

    /// Backward iterator over the elements.
    pub fn reversed(&self) -> ReverseArrayIter {
        ReverseArrayIter::new(IterKind::TupleReverseIterator, self.items.clone())
    }

    // =========================================================================
    // Hashing and Comparison
    // =========================================================================

    /// Content hash, computed once.
    ///
    /// A failure (unhashable element) is not cached.
    pub fn hash(&self) -> RuntimeResult<i64> {
        if let Some(&h) = self.hash.get() {
            return Ok(h);
        }
        let h = self.compute_hash()?;
        Ok(*self.hash.get_or_init(|| h))
    }

    fn compute_hash(&self) -> RuntimeResult<i64> {
        let len = self.len() as i64;
        let mut x = HASH_SEED;
        let mut mult = HASH_MULT;
        for item in self.items.iter() {
            let y = ops::hash(item)?;
            x = (x ^ y).wrapping_mul(mult);
            mult = mult.wrapping_add(HASH_MULT_STEP.wrapping_add(len).wrapping_add(len));
        }
        x = x.wrapping_add(HASH_TAIL);
        Ok(if x == -1 { -2 } else { x })
    }

    /// Compare with `other`; `None` means the comparison is not supported
    /// for this pair.
    pub fn rich_compare(&self, other: &Value, op: CompareOp) -> RuntimeResult<Option<bool>> {
        let Some(rhs) = other.as_tuple() else {
            return Ok(match op {
                CompareOp::Eq => Some(false),
                CompareOp::Ne => Some(true),
                _ => None,
            });
        };
        let (v, w) = (self.as_slice(), rhs.as_slice());

        let mut i = 0;
        while i < v.len() && i < w.len() {
            if !ops::rich_compare_bool(&v[i], &w[i], CompareOp::Eq)? {
                break;
            }
            i += 1;
        }

        if i >= v.len() || i >= w.len() {
            return Ok(Some(op.matches(v.len().cmp(&w.len()))));
        }
        match op {
            CompareOp::Eq => Ok(Some(false)),
            CompareOp::Ne => Ok(Some(true)),
            _ => ops::rich_compare_bool(&v[i], &w[i], op).map(Some),
        }
    }

    /// `__getnewargs__`: a one-element tuple holding a plain copy.
    pub fn getnewargs(&self) -> Value {
        tuple_value(vec![tuple_value(self.items.to_vec())])
    }

    /// `()`, `(1,)`, `(1, 2)`.
    pub fn repr(&self) -> String {
        let parts: Vec<String> = self.items.iter().map(ops::repr).collect();
        match parts.as_slice() {
            [single] => format!("({single},)"),
            _ => format!("({})", parts.join(", ")),
        }
    }
}

impl fmt::Debug for TupleObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

fn clamp_bound(bound: Option<&Value>, len: usize, default: usize) -> RuntimeResult<usize> {
    let Some(bound) = bound else {
        return Ok(default);
    };
    let i = bound.as_index().ok_or_else(|| {
        RuntimeError::type_error("slice indices must be integers or have an __index__ method")
    })?;
    let len = len as i64;
    let i = if i < 0 { (i + len).max(0) } else { i.min(len) };
    Ok(i as usize)
}

// =============================================================================
// Construction
// =============================================================================

/// A new exact tuple.
pub fn tuple_value(items: Vec<Value>) -> Value {
    let tuple_type = &global_registry().builtins().tuple;
    InstanceObject::new(tuple_type, Payload::Tuple(TupleObject::new(items))).into_value()
}

/// Native `tuple.__new__`: `tuple()`, `tuple(iterable)`, or the same for a
/// subtype.
pub fn tuple_new(ty: &Arc<TypeObject>, args: &[Value], kwargs: &[KwArg]) -> RuntimeResult<Value> {
    let tuple_type = &global_registry().builtins().tuple;
    if !Arc::ptr_eq(ty, tuple_type) {
        // Keywords belong to the subtype's `__init__`.
        return tuple_subtype_new(ty, tuple_type, args);
    }
    check_no_kwargs("tuple", kwargs)?;
    check_args_len("tuple", args, 0, 1)?;

    match args.first() {
        None => Ok(tuple_value(Vec::new())),
        Some(arg) if arg.is_exact_tuple() => Ok(arg.clone()),
        Some(arg) => Ok(tuple_value(ops::collect(arg)?)),
    }
}

fn tuple_subtype_new(
    ty: &Arc<TypeObject>,
    tuple_type: &Arc<TypeObject>,
    args: &[Value],
) -> RuntimeResult<Value> {
    if !ty.is_subtype(tuple_type) {
        return Err(RuntimeError::internal(format!(
            "tuple constructor called for non-tuple type '{}'",
            ty.name()
        )));
    }
    let base = tuple_new(tuple_type, args, &[])?;
    let items = base
        .as_tuple()
        .map(|t| t.shared().clone())
        .ok_or_else(|| RuntimeError::internal("tuple constructor produced a non-tuple"))?;
    Ok(InstanceObject::new(ty, Payload::Tuple(TupleObject::from_shared(items))).into_value())
}

// =============================================================================
// Type Methods
// =============================================================================

fn receiver<'a>(args: &'a [Value], method: &str) -> RuntimeResult<(&'a TupleObject, &'a [Value])> {
    match args.split_first() {
        Some((this, rest)) => this.as_tuple().map(|t| (t, rest)).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "descriptor '{}' requires a 'tuple' object but received '{}'",
                method,
                this.type_name()
            ))
        }),
        None => Err(RuntimeError::type_error(format!(
            "descriptor '{method}' of 'tuple' object needs an argument"
        ))),
    }
}

fn usize_value(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn install(ty: &TypeObject, func: NativeFunction) {
    ty.set_own(func.name().clone(), func.into_value());
}

/// Install the methods of `tuple` on its type object.
pub(crate) fn install_tuple_methods(ty: &TypeObject) {
    ty.set_own(intern("__doc__"), Value::str(TUPLE_DOC));

    install(
        ty,
        NativeFunction::method("tuple", "index", |args, kwargs| {
            let (this, rest) = receiver(args, "index")?;
            check_no_kwargs("index", kwargs)?;
            check_args_len("index", rest, 1, 3)?;
            this.index_of(&rest[0], rest.get(1), rest.get(2))
                .map(usize_value)
        })
        .with_doc("Return first index of value.\n\nRaises ValueError if the value is not present."),
    );

    install(
        ty,
        NativeFunction::method("tuple", "count", |args, kwargs| {
            let (this, rest) = receiver(args, "count")?;
            check_no_kwargs("count", kwargs)?;
            check_args_len("count", rest, 1, 1)?;
            this.count(&rest[0]).map(usize_value)
        })
        .with_doc("Return number of occurrences of value."),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__getnewargs__", |args, kwargs| {
            let (this, rest) = receiver(args, "__getnewargs__")?;
            check_no_kwargs("__getnewargs__", kwargs)?;
            check_args_len("__getnewargs__", rest, 0, 0)?;
            Ok(this.getnewargs())
        }),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__len__", |args, _| {
            let (this, rest) = receiver(args, "__len__")?;
            check_args_len("__len__", rest, 0, 0)?;
            Ok(usize_value(this.len()))
        }),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__getitem__", |args, _| {
            let (this, rest) = receiver(args, "__getitem__")?;
            check_args_len("__getitem__", rest, 1, 1)?;
            this.getitem(&rest[0])
        }),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__contains__", |args, _| {
            let (this, rest) = receiver(args, "__contains__")?;
            check_args_len("__contains__", rest, 1, 1)?;
            this.contains(&rest[0]).map(Value::Bool)
        }),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__iter__", |args, _| {
            let (this, _) = receiver(args, "__iter__")?;
            Ok(this.iter().into_value())
        }),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__reversed__", |args, _| {
            let (this, _) = receiver(args, "__reversed__")?;
            Ok(this.reversed().into_value())
        }),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__hash__", |args, _| {
            let (this, _) = receiver(args, "__hash__")?;
            this.hash().map(Value::Int)
        }),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__repr__", |args, _| {
            let (this, _) = receiver(args, "__repr__")?;
            Ok(Value::str(&this.repr()))
        }),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__add__", |args, _| {
            let (this, rest) = receiver(args, "__add__")?;
            check_args_len("__add__", rest, 1, 1)?;
            this.concat(&rest[0])
        }),
    );

    install(
        ty,
        NativeFunction::method("tuple", "__mul__", |args, _| {
            let (this, rest) = receiver(args, "__mul__")?;
            check_args_len("__mul__", rest, 1, 1)?;
            this.repeat(&rest[0])
        }),
    );
}
