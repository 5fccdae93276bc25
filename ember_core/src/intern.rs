//! String interning for attribute names and string values.
//!
//! Every attribute name flowing through the object model is interned once,
//! so name comparison and hashing in type dicts and instance stores reduce
//! to a pointer comparison.

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

// =============================================================================
// Interned String
// =============================================================================

/// A string that has been interned in the global [`StringInterner`].
///
/// Two `InternedString`s are equal iff they point at the same allocation,
/// which the interner guarantees is equivalent to having the same contents.
#[derive(Clone)]
pub struct InternedString(Arc<str>);

impl InternedString {
    /// Get the string contents.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address of the shared allocation, used for identity hashing.
    #[inline]
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const u8 as usize
    }
}

impl PartialEq for InternedString {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for InternedString {}

impl Hash for InternedString {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl Deref for InternedString {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InternedString {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Interner
// =============================================================================

/// Deduplicating string table.
#[derive(Default)]
pub struct StringInterner {
    strings: RwLock<FxHashSet<Arc<str>>>,
}

impl StringInterner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning the canonical handle for its contents.
    pub fn intern(&self, s: &str) -> InternedString {
        if let Some(existing) = self.strings.read().get(s) {
            return InternedString(existing.clone());
        }

        let mut strings = self.strings.write();
        // Another caller may have inserted it between the two locks.
        if let Some(existing) = strings.get(s) {
            return InternedString(existing.clone());
        }
        let arc: Arc<str> = Arc::from(s);
        strings.insert(arc.clone());
        InternedString(arc)
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.strings.read().len()
    }

    /// Check if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL_INTERNER: OnceLock<StringInterner> = OnceLock::new();

/// Get the process-wide interner.
pub fn global_interner() -> &'static StringInterner {
    GLOBAL_INTERNER.get_or_init(StringInterner::new)
}

/// Intern a string in the process-wide interner.
#[inline]
pub fn intern(s: &str) -> InternedString {
    global_interner().intern(s)
}
