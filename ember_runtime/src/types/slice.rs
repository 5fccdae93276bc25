//! Slice objects.
//!
//! A slice carries optional `start`, `stop` and `step` bounds and resolves
//! them against a sequence length with the usual clamping rules. Slices are
//! unhashable.

use crate::value::Value;
use ember_core::{RuntimeError, RuntimeResult};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Resolved Bounds
// =============================================================================

/// Slice bounds resolved against a concrete length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceBounds {
    /// First position (meaningful only when `length > 0`).
    pub start: i64,
    /// Never zero.
    pub step: i64,
    /// Number of selected positions.
    pub length: usize,
}

impl SliceBounds {
    /// Selected positions in order.
    pub fn positions(self) -> impl ExactSizeIterator<Item = usize> {
        (0..self.length).map(move |i| (self.start + i as i64 * self.step) as usize)
    }
}

// =============================================================================
// Slice Object
// =============================================================================

/// `slice(start, stop, step)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceObject {
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
}

impl SliceObject {
    /// Create a slice; a zero step is rejected.
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> RuntimeResult<Self> {
        if step == Some(0) {
            return Err(RuntimeError::value_error("slice step cannot be zero"));
        }
        Ok(Self { start, stop, step })
    }

    /// Create from runtime values, each `None` or an integer.
    pub fn from_values(start: &Value, stop: &Value, step: &Value) -> RuntimeResult<Self> {
        Self::new(bound(start)?, bound(stop)?, bound(step)?)
    }

    #[inline]
    pub fn start(&self) -> Option<i64> {
        self.start
    }

    #[inline]
    pub fn stop(&self) -> Option<i64> {
        self.stop
    }

    #[inline]
    pub fn step(&self) -> Option<i64> {
        self.step
    }

    /// Resolve against a sequence of `len` items.
    pub fn resolve(&self, len: usize) -> SliceBounds {
        let len = len as i64;
        // `i64::MIN` has no positive counterpart.
        let step = self.step.unwrap_or(1).max(-i64::MAX);
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let clamp = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(b) if b < 0 => (b + len).max(lower),
            Some(b) => b.min(upper),
        };
        let start = clamp(self.start, if step < 0 { upper } else { lower });
        let stop = clamp(self.stop, if step < 0 { lower } else { upper });

        let length = if step > 0 && stop > start {
            ((stop - start - 1) / step + 1) as usize
        } else if step < 0 && start > stop {
            ((start - stop - 1) / -step + 1) as usize
        } else {
            0
        };

        SliceBounds {
            start,
            step,
            length,
        }
    }

    /// Wrap as a runtime value.
    pub fn into_value(self) -> Value {
        Value::Slice(Arc::new(self))
    }
}

fn bound(value: &Value) -> RuntimeResult<Option<i64>> {
    match value {
        Value::None => Ok(None),
        other => other.as_index().map(Some).ok_or_else(|| {
            RuntimeError::type_error(
                "slice indices must be integers or None or have an __index__ method",
            )
        }),
    }
}

impl fmt::Display for SliceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |b: Option<i64>| b.map_or_else(|| "None".to_string(), |v| v.to_string());
        write!(
            f,
            "slice({}, {}, {})",
            show(self.start),
            show(self.stop),
            show(self.step)
        )
    }
}
