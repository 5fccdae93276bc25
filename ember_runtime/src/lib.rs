//! Object model for the Ember runtime.
//!
//! This crate provides:
//! - Type registry with builtin types and heap subtypes
//! - Descriptor protocol (data / non-data descriptors, properties)
//! - Generic attribute resolution with optional suspension
//! - Instantiation with `__new__` subtype-safety checks
//! - Core types (tuple, slice, iterators, native functions)
//! - Abstract operations (hash, compare, repr, sequence and iteration)

#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod object;
pub mod ops;
pub mod types;
pub mod value;

// Re-export commonly used items
pub use config::{RuntimeConfig, runtime_config};
pub use object::attribute::{del_attr, get_attr, lookup_attr, set_attr};
pub use object::call::{call, call_method};
pub use object::descriptor::{Descriptor, DescriptorGet, DescriptorKind, DescriptorSet, Property};
pub use object::instance::{AttrDict, InstanceObject, Payload};
pub use object::registry::{AttrStorage, BuiltinTypes, TypeRegistry, global_registry};
pub use object::suspend::{Completion, Suspension, SuspensionKind};
pub use object::type_obj::{NativeCtor, TypeFlags, TypeId, TypeObject};
pub use types::tuple::TupleObject;
pub use value::{KwArg, Value};

pub use ember_core::{InternedString, RuntimeError, RuntimeResult, intern};

/// Install `config` and build the builtin types.
///
/// Returns `false` if a configuration was already in place, in which case
/// `config` is discarded and the existing one stays active.
pub fn init_runtime(config: RuntimeConfig) -> bool {
    let installed = config::install(config);
    if !installed {
        tracing::warn!("runtime configuration already installed; keeping existing");
    }
    let registry = global_registry();
    tracing::debug!(
        types = registry.len(),
        max_sequence_length = runtime_config().max_sequence_length,
        "runtime initialized"
    );
    installed
}
