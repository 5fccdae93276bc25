//! Iterator helpers.
//!
//! Built-in containers expose their elements through three reusable
//! iterator shapes:
//!
//! - [`ArrayIter`] walks a snapshot front to back and drops the snapshot
//!   once exhausted.
//! - [`CheckedArrayIter`] walks a snapshot but fails when the live
//!   container it was taken from changes size.
//! - [`ReverseArrayIter`] walks a snapshot back to front.
//!
//! All of them are their own iterator: `iter(it) is it`.

use crate::object::type_obj::TypeObject;
use crate::types::function::NativeFunction;
use crate::value::Value;
use ember_core::{RuntimeError, RuntimeResult, intern};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

// =============================================================================
// Protocol
// =============================================================================

/// Which built-in iterator type an iterator reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterKind {
    TupleIterator,
    TupleReverseIterator,
    DictKeyIterator,
    StrIterator,
}

impl IterKind {
    /// Name of the built-in type.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::TupleIterator => "tuple_iterator",
            Self::TupleReverseIterator => "reversed",
            Self::DictKeyIterator => "dict_keyiterator",
            Self::StrIterator => "str_iterator",
        }
    }
}

/// An object that produces values one at a time.
pub trait PyIterator: Send + Sync {
    fn kind(&self) -> IterKind;

    /// Next value, or `None` once exhausted.
    fn next_value(&self) -> RuntimeResult<Option<Value>>;

    /// Estimate of how many values remain.
    fn length_hint(&self) -> usize;
}

/// A live container whose current size a checked iterator compares
/// against.
pub trait LiveSize: Send + Sync {
    fn live_size(&self) -> usize;

    /// Container kind, as used in the size-change error.
    fn container_name(&self) -> &'static str;
}

/// `__iter__` of an iterator: the iterator itself.
#[inline]
pub fn self_iter(value: &Value) -> Value {
    value.clone()
}

/// Remaining count for a forward walk over `len` items at `index`.
#[inline]
pub fn forward_length_hint(len: usize, index: usize) -> usize {
    len.saturating_sub(index)
}

/// Remaining count for a backward walk positioned at `index`.
#[inline]
pub fn reverse_length_hint(index: usize) -> usize {
    index
}

// =============================================================================
// Array Iterator
// =============================================================================

enum ArrayIterState {
    Active { seq: Arc<[Value]>, index: usize },
    Exhausted,
}

/// Forward iterator over a sequence snapshot.
///
/// Once the end is reached the snapshot is released and the iterator stays
/// exhausted.
pub struct ArrayIter {
    kind: IterKind,
    state: Mutex<ArrayIterState>,
}

impl ArrayIter {
    pub fn new(kind: IterKind, seq: Arc<[Value]>) -> Self {
        Self {
            kind,
            state: Mutex::new(ArrayIterState::Active { seq, index: 0 }),
        }
    }

    /// Check if the end has been reached.
    pub fn is_exhausted(&self) -> bool {
        matches!(*self.state.lock(), ArrayIterState::Exhausted)
    }

    pub fn into_value(self) -> Value {
        Value::Iterator(Arc::new(self))
    }
}

impl PyIterator for ArrayIter {
    fn kind(&self) -> IterKind {
        self.kind
    }

    fn next_value(&self) -> RuntimeResult<Option<Value>> {
        let mut state = self.state.lock();
        let ArrayIterState::Active { seq, index } = &mut *state else {
            return Ok(None);
        };
        if let Some(value) = seq.get(*index) {
            let value = value.clone();
            *index += 1;
            return Ok(Some(value));
        }
        trace!(kind = self.kind.type_name(), "iterator exhausted");
        *state = ArrayIterState::Exhausted;
        Ok(None)
    }

    fn length_hint(&self) -> usize {
        match &*self.state.lock() {
            ArrayIterState::Active { seq, index } => forward_length_hint(seq.len(), *index),
            ArrayIterState::Exhausted => 0,
        }
    }
}

impl fmt::Debug for ArrayIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayIter")
            .field("kind", &self.kind)
            .field("remaining", &self.length_hint())
            .finish()
    }
}

// =============================================================================
// Checked Array Iterator
// =============================================================================

/// Forward iterator over a snapshot of a mutable container.
///
/// Every step compares the snapshot length with the container's live size
/// and fails on a mismatch. Exhaustion is re-derived from the position on
/// each call, so the check also runs after the end has been reached.
pub struct CheckedArrayIter {
    kind: IterKind,
    seq: Arc<[Value]>,
    origin: Weak<dyn LiveSize>,
    container: &'static str,
    index: Mutex<usize>,
}

impl CheckedArrayIter {
    pub fn new(kind: IterKind, seq: Arc<[Value]>, origin: Weak<dyn LiveSize>) -> Self {
        let container = origin
            .upgrade()
            .map_or("container", |c| c.container_name());
        Self {
            kind,
            seq,
            origin,
            container,
            index: Mutex::new(0),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Iterator(Arc::new(self))
    }
}

impl PyIterator for CheckedArrayIter {
    fn kind(&self) -> IterKind {
        self.kind
    }

    fn next_value(&self) -> RuntimeResult<Option<Value>> {
        // A dropped container can no longer change.
        if let Some(origin) = self.origin.upgrade() {
            let live = origin.live_size();
            if live != self.seq.len() {
                debug!(
                    container = self.container,
                    snapshot = self.seq.len(),
                    live,
                    "container changed size during iteration"
                );
                return Err(RuntimeError::changed_size(self.container));
            }
        }

        let mut index = self.index.lock();
        match self.seq.get(*index) {
            Some(value) => {
                *index += 1;
                Ok(Some(value.clone()))
            }
            None => Ok(None),
        }
    }

    fn length_hint(&self) -> usize {
        forward_length_hint(self.seq.len(), *self.index.lock())
    }
}

impl fmt::Debug for CheckedArrayIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckedArrayIter")
            .field("kind", &self.kind)
            .field("container", &self.container)
            .field("remaining", &self.length_hint())
            .finish()
    }
}

// =============================================================================
// Reverse Array Iterator
// =============================================================================

enum ReverseState {
    Active { seq: Arc<[Value]>, index: usize },
    Exhausted,
}

/// Backward iterator over a sequence snapshot.
pub struct ReverseArrayIter {
    kind: IterKind,
    state: Mutex<ReverseState>,
}

impl ReverseArrayIter {
    pub fn new(kind: IterKind, seq: Arc<[Value]>) -> Self {
        let index = seq.len();
        Self {
            kind,
            state: Mutex::new(ReverseState::Active { seq, index }),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Iterator(Arc::new(self))
    }
}

impl PyIterator for ReverseArrayIter {
    fn kind(&self) -> IterKind {
        self.kind
    }

    fn next_value(&self) -> RuntimeResult<Option<Value>> {
        let mut state = self.state.lock();
        let ReverseState::Active { seq, index } = &mut *state else {
            return Ok(None);
        };
        if *index == 0 {
            *state = ReverseState::Exhausted;
            return Ok(None);
        }
        *index -= 1;
        Ok(Some(seq[*index].clone()))
    }

    fn length_hint(&self) -> usize {
        match &*self.state.lock() {
            ReverseState::Active { index, .. } => reverse_length_hint(*index),
            ReverseState::Exhausted => 0,
        }
    }
}

impl fmt::Debug for ReverseArrayIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseArrayIter")
            .field("kind", &self.kind)
            .field("remaining", &self.length_hint())
            .finish()
    }
}

// =============================================================================
// Iterator Type Methods
// =============================================================================

fn receiver<'a>(args: &'a [Value], method: &str) -> RuntimeResult<&'a Arc<dyn PyIterator>> {
    match args.first() {
        Some(Value::Iterator(it)) => Ok(it),
        Some(other) => Err(RuntimeError::type_error(format!(
            "descriptor '{}' requires an iterator object but received '{}'",
            method,
            other.type_name()
        ))),
        None => Err(RuntimeError::type_error(format!(
            "descriptor '{method}' needs an argument"
        ))),
    }
}

/// Install `__iter__`, `__next__` and `__length_hint__` on an iterator
/// type.
pub(crate) fn install_iterator_methods(ty: &TypeObject) {
    let owner = ty.name().as_str();

    ty.set_own(
        intern("__iter__"),
        NativeFunction::method(owner, "__iter__", |args, _| {
            receiver(args, "__iter__").map(|_| self_iter(&args[0]))
        })
        .into_value(),
    );

    ty.set_own(
        intern("__next__"),
        NativeFunction::method(owner, "__next__", |args, _| {
            receiver(args, "__next__")?
                .next_value()?
                .ok_or(RuntimeError::StopIteration)
        })
        .into_value(),
    );

    ty.set_own(
        intern("__length_hint__"),
        NativeFunction::method(owner, "__length_hint__", |args, _| {
            let hint = receiver(args, "__length_hint__")?.length_hint();
            Ok(Value::Int(i64::try_from(hint).unwrap_or(i64::MAX)))
        })
        .with_doc("Private method returning an estimate of len(list(it)).")
        .into_value(),
    );
}
