//! Type objects, instances and the protocols that connect them.
//!
//! Attribute lookup lives in [`attribute`], descriptors in [`descriptor`],
//! construction in [`instantiate`].

pub mod attribute;
pub mod call;
pub mod descriptor;
pub mod instance;
pub mod instantiate;
pub mod registry;
pub mod suspend;
pub mod type_obj;
