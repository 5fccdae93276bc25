//! # Ember Core
//!
//! Shared primitives for the Ember object model:
//!
//! - **Interning**: process-wide string table so attribute names compare by
//!   pointer
//! - **Error Handling**: the runtime error taxonomy and result alias

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod intern;

pub use error::{RuntimeError, RuntimeResult};
pub use intern::{InternedString, StringInterner, intern};

/// Ember runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
