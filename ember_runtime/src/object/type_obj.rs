//! Type objects.
//!
//! A [`TypeObject`] carries its name, its single base, an attribute dict,
//! capability flags and the native constructor of the nearest built-in
//! ancestor. Attribute lookup walks the resolution chain: the type itself,
//! then each base in order up to `object`.

use crate::value::Value;
use ember_core::InternedString;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Type ID
// =============================================================================

/// Stable numeric identity of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub const OBJECT: Self = Self(0);
    pub const TYPE: Self = Self(1);
    pub const NONE: Self = Self(2);
    pub const NOT_IMPLEMENTED: Self = Self(3);
    pub const BOOL: Self = Self(4);
    pub const INT: Self = Self(5);
    pub const FLOAT: Self = Self(6);
    pub const STR: Self = Self(7);
    pub const TUPLE: Self = Self(8);
    pub const SLICE: Self = Self(9);
    pub const FUNCTION: Self = Self(10);
    pub const METHOD: Self = Self(11);
    pub const PROPERTY: Self = Self(12);
    pub const METHOD_DESCRIPTOR: Self = Self(13);
    pub const TUPLE_ITERATOR: Self = Self(14);
    pub const TUPLE_REVERSE_ITERATOR: Self = Self(15);
    pub const DICT_KEY_ITERATOR: Self = Self(16);
    pub const STR_ITERATOR: Self = Self(17);

    /// First id handed out to runtime-created types.
    pub const FIRST_USER_TYPE: u32 = 256;

    /// Create from a raw id.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw id.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this id belongs to a built-in type.
    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_USER_TYPE
    }
}

// =============================================================================
// Type Flags
// =============================================================================

bitflags::bitflags! {
    /// Capabilities of a type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeFlags: u32 {
        /// May be used as a base for new types.
        const BASETYPE = 1 << 0;
        /// Attribute assignment on the type object is refused.
        const IMMUTABLE = 1 << 1;
        /// Instances carry an attribute store.
        const HAS_DICT = 1 << 2;
        /// Created at runtime through the registry.
        const HEAPTYPE = 1 << 3;
    }
}

impl Default for TypeFlags {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// Native Constructors
// =============================================================================

/// Built-in allocation routine a type inherits from its nearest native
/// ancestor. Determines the payload every instance of the type carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCtor {
    /// Plain object with no payload.
    Object,
    /// Immutable sequence payload.
    Tuple,
    /// Instances only come from the runtime itself (`int`, iterators, ...).
    Unconstructible,
}

// =============================================================================
// Type Object
// =============================================================================

/// A runtime type.
pub struct TypeObject {
    id: TypeId,
    name: InternedString,
    /// Direct base. `None` only for `object`.
    base: Option<Arc<TypeObject>>,
    /// Bases in resolution order, excluding the type itself.
    ancestors: SmallVec<[Arc<TypeObject>; 4]>,
    dict: RwLock<FxHashMap<InternedString, Value>>,
    flags: TypeFlags,
    native_new: Option<NativeCtor>,
}

impl TypeObject {
    pub(crate) fn new(
        id: TypeId,
        name: InternedString,
        base: Option<Arc<TypeObject>>,
        flags: TypeFlags,
        native_new: Option<NativeCtor>,
    ) -> Self {
        let mut ancestors = SmallVec::new();
        if let Some(base) = &base {
            ancestors.push(base.clone());
            ancestors.extend(base.ancestors.iter().cloned());
        }
        Self {
            id,
            name,
            base,
            ancestors,
            dict: RwLock::new(FxHashMap::default()),
            flags,
            native_new,
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &InternedString {
        &self.name
    }

    #[inline]
    pub fn base(&self) -> Option<&Arc<TypeObject>> {
        self.base.as_ref()
    }

    #[inline]
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    /// Native constructor declared by this exact type, if any.
    #[inline]
    pub fn native_new(&self) -> Option<NativeCtor> {
        self.native_new
    }

    #[inline]
    pub fn is_basetype(&self) -> bool {
        self.flags.contains(TypeFlags::BASETYPE)
    }

    #[inline]
    pub fn is_immutable(&self) -> bool {
        self.flags.contains(TypeFlags::IMMUTABLE)
    }

    #[inline]
    pub fn is_heap_type(&self) -> bool {
        self.flags.contains(TypeFlags::HEAPTYPE)
    }

    /// Check if instances of this type get an attribute store.
    #[inline]
    pub fn has_instance_dict(&self) -> bool {
        self.flags.contains(TypeFlags::HAS_DICT)
    }

    // =========================================================================
    // Resolution Chain
    // =========================================================================

    /// The type followed by its bases, most derived first.
    pub fn mro(&self) -> impl Iterator<Item = &TypeObject> + '_ {
        std::iter::once(self).chain(self.ancestors.iter().map(|t| &**t))
    }

    /// Length of the resolution chain including the type itself.
    #[inline]
    pub fn mro_len(&self) -> usize {
        self.ancestors.len() + 1
    }

    /// Bases in resolution order, excluding the type itself.
    #[inline]
    pub fn ancestors(&self) -> &[Arc<TypeObject>] {
        &self.ancestors
    }

    /// Reflexive subtype test.
    pub fn is_subtype(&self, other: &TypeObject) -> bool {
        self.mro().any(|t| std::ptr::eq(t, other))
    }

    /// Find `name` along the resolution chain.
    ///
    /// The value is cloned out before the lock is released, so callers may
    /// dispatch on it freely.
    pub fn lookup(&self, name: &InternedString) -> Option<Value> {
        self.lookup_with_owner(name).map(|(value, _)| value)
    }

    /// Like [`lookup`](Self::lookup), also returning the type whose dict
    /// held the entry.
    pub fn lookup_with_owner(&self, name: &InternedString) -> Option<(Value, &TypeObject)> {
        self.mro()
            .find_map(|t| t.get_own(name).map(|value| (value, t)))
    }

    /// The nearest type in the chain (including this one) that declares a
    /// native constructor.
    pub fn native_owner(&self) -> Option<&TypeObject> {
        self.mro().find(|t| t.native_new.is_some())
    }

    /// Native constructor inherited from the nearest native ancestor.
    #[inline]
    pub fn resolved_native_new(&self) -> Option<NativeCtor> {
        self.native_owner().and_then(|t| t.native_new)
    }

    /// Check if this type's own dict carries a `__new__` written at
    /// runtime, as opposed to one of the built-in constructor entries.
    pub fn has_user_new(&self, dunder_new: &InternedString) -> bool {
        self.is_heap_type() && self.dict.read().contains_key(dunder_new)
    }

    // =========================================================================
    // Own Dict
    // =========================================================================

    /// Entry in this type's own dict, ignoring bases.
    pub fn get_own(&self, name: &InternedString) -> Option<Value> {
        self.dict.read().get(name).cloned()
    }

    /// Write an entry into this type's own dict.
    ///
    /// Does not consult the immutability flag; that check belongs to the
    /// attribute protocol.
    pub fn set_own(&self, name: InternedString, value: Value) -> Option<Value> {
        self.dict.write().insert(name, value)
    }

    /// Remove an entry from this type's own dict.
    pub fn remove_own(&self, name: &InternedString) -> Option<Value> {
        self.dict.write().remove(name)
    }

    /// Names defined directly on this type, in no particular order.
    pub fn own_names(&self) -> Vec<InternedString> {
        self.dict.read().keys().cloned().collect()
    }
}

impl fmt::Debug for TypeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|b| b.name.clone()))
            .field("flags", &self.flags)
            .finish()
    }
}
