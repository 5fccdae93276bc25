//! Builtin types.

pub mod function;
pub mod iter;
pub mod slice;
pub mod tuple;
