//! Suspendable completions.
//!
//! Attribute access may run user-level getters and setters, and those may
//! need to pause (waiting on I/O, yielding to a scheduler). A suspendable
//! operation returns [`Completion::Suspended`] holding the rest of the
//! work; the caller either hands it further up or drives it to completion
//! with [`Completion::finish`].
//!
//! Suspensions are only produced at the tail of an operation, so resuming
//! one never repeats work that already happened before it.

use crate::config::runtime_config;
use ember_core::{RuntimeError, RuntimeResult};
use std::fmt;
use tracing::trace;

type ResumeFn<T> = Box<dyn FnOnce() -> RuntimeResult<Completion<T>> + Send>;

// =============================================================================
// Suspension
// =============================================================================

/// Whether a suspension may be resumed right away by a caller that cannot
/// suspend itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionKind {
    /// A scheduling hint; resuming immediately is always correct.
    Optional,
    /// Waiting on something external; cannot be resumed synchronously.
    Blocking,
}

/// A paused computation producing `T` once resumed.
pub struct Suspension<T> {
    label: &'static str,
    kind: SuspensionKind,
    resume: ResumeFn<T>,
}

impl<T: Send + 'static> Suspension<T> {
    /// An optional suspension: a caller that cannot suspend resumes it in
    /// place.
    pub fn optional(
        label: &'static str,
        resume: impl FnOnce() -> RuntimeResult<Completion<T>> + Send + 'static,
    ) -> Self {
        Self {
            label,
            kind: SuspensionKind::Optional,
            resume: Box::new(resume),
        }
    }

    /// A blocking suspension: only a caller that allows suspension can
    /// carry it.
    pub fn blocking(
        label: &'static str,
        resume: impl FnOnce() -> RuntimeResult<Completion<T>> + Send + 'static,
    ) -> Self {
        Self {
            label,
            kind: SuspensionKind::Blocking,
            resume: Box::new(resume),
        }
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[inline]
    pub fn kind(&self) -> SuspensionKind {
        self.kind
    }

    /// Run the remaining work.
    pub fn resume(self) -> RuntimeResult<Completion<T>> {
        (self.resume)()
    }

    /// Transform the eventual result.
    pub fn map<U: Send + 'static>(self, f: impl FnOnce(T) -> U + Send + 'static) -> Suspension<U> {
        let Suspension { label, kind, resume } = self;
        Suspension {
            label,
            kind,
            resume: Box::new(move || Ok(resume()?.map(f))),
        }
    }
}

impl<T> fmt::Debug for Suspension<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Completion
// =============================================================================

/// Either a finished result or a suspension that produces one.
#[derive(Debug)]
pub enum Completion<T> {
    Ready(T),
    Suspended(Suspension<T>),
}

impl<T: Send + 'static> Completion<T> {
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The result if already finished.
    pub fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Suspended(_) => None,
        }
    }

    /// Transform the eventual result.
    pub fn map<U: Send + 'static>(self, f: impl FnOnce(T) -> U + Send + 'static) -> Completion<U> {
        match self {
            Self::Ready(value) => Completion::Ready(f(value)),
            Self::Suspended(suspension) => Completion::Suspended(suspension.map(f)),
        }
    }

    /// Pass the completion through when the caller can suspend, otherwise
    /// drive it to a result in place.
    pub fn settle(self, allow_suspend: bool) -> RuntimeResult<Self> {
        if allow_suspend || self.is_ready() {
            return Ok(self);
        }
        self.finish(runtime_config().max_suspension_resumes)
            .map(Self::Ready)
    }

    /// Resume synchronously until a result is available.
    ///
    /// Fails on a blocking suspension, or once `limit` optional
    /// suspensions have been resumed without reaching a result.
    pub fn finish(self, limit: usize) -> RuntimeResult<T> {
        let mut current = self;
        let mut resumes = 0usize;
        loop {
            match current {
                Self::Ready(value) => return Ok(value),
                Self::Suspended(suspension) => {
                    if suspension.kind == SuspensionKind::Blocking {
                        return Err(RuntimeError::internal(format!(
                            "blocking suspension '{}' raised where suspension is not allowed",
                            suspension.label
                        )));
                    }
                    if resumes >= limit {
                        return Err(RuntimeError::internal(format!(
                            "suspension '{}' did not complete after {} resumes",
                            suspension.label, limit
                        )));
                    }
                    resumes += 1;
                    trace!(label = suspension.label, resumes, "resuming suspension in place");
                    current = suspension.resume()?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chain(depth: usize, value: i64) -> Completion<i64> {
        if depth == 0 {
            return Completion::Ready(value);
        }
        Completion::Suspended(Suspension::optional("chain", move || {
            Ok(chain(depth - 1, value))
        }))
    }

    #[test]
    fn test_ready_finishes_immediately() {
        assert_eq!(Completion::Ready(3).finish(0).unwrap(), 3);
    }

    #[test]
    fn test_finish_drains_optional_chain() {
        assert_eq!(chain(5, 9).finish(10).unwrap(), 9);
    }

    #[test]
    fn test_finish_respects_limit() {
        let err = chain(5, 9).finish(2).unwrap_err();
        assert_eq!(err.exception_name(), "SystemError");
    }

    #[test]
    fn test_blocking_cannot_finish() {
        let completion: Completion<i64> =
            Completion::Suspended(Suspension::blocking("io", || Ok(Completion::Ready(1))));
        let err = completion.finish(10).unwrap_err();
        assert!(err.to_string().contains("'io'"));
    }

    #[test]
    fn test_map_applies_after_resume() {
        let mapped = chain(2, 20).map(|v| v + 1);
        assert!(!mapped.is_ready());
        assert_eq!(mapped.finish(10).unwrap(), 21);
    }

    #[test]
    fn test_settle_passes_through_when_allowed() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let completion = Completion::Suspended(Suspension::optional("once", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Completion::Ready(5))
        }));

        let settled = completion.settle(true).unwrap();
        assert!(!settled.is_ready());
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let Completion::Suspended(suspension) = settled else {
            panic!("expected a suspension");
        };
        assert_eq!(suspension.label(), "once");
        assert_eq!(suspension.resume().unwrap().into_ready(), Some(5));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_settle_drains_when_disallowed() {
        let settled = chain(3, 4).settle(false).unwrap();
        assert_eq!(settled.into_ready(), Some(4));
    }
}
