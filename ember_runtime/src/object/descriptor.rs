//! Descriptor protocol.
//!
//! Values found on a type during attribute resolution fall into three
//! categories:
//!
//! - **Data descriptors** can both produce and accept a value. They take
//!   precedence over the instance's own attribute store.
//! - **Non-data descriptors** only produce a value (method-kind functions
//!   bind to the instance). The instance store wins over them.
//! - **Plain values** are returned as they are.
//!
//! Capabilities are fixed when a descriptor is created, so classification
//! is a match on the value and never a dynamic attribute lookup.

use crate::object::suspend::Completion;
use crate::object::type_obj::TypeObject;
use crate::types::function::{BoundMethod, FunctionKind};
use crate::value::Value;
use ember_core::{InternedString, RuntimeError, RuntimeResult, intern};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Capabilities
// =============================================================================

/// A value that computes what an attribute read returns.
pub trait DescriptorGet: Send + Sync {
    /// Attribute name the descriptor was installed under.
    fn name(&self) -> &InternedString;

    /// Produce the attribute value.
    ///
    /// `instance` is `None` when the attribute is read from the type
    /// itself.
    fn descr_get(
        &self,
        instance: Option<&Value>,
        owner: &Arc<TypeObject>,
        allow_suspend: bool,
    ) -> RuntimeResult<Completion<Value>>;
}

/// A descriptor that also intercepts assignment and deletion.
pub trait DescriptorSet: DescriptorGet {
    /// Store `value` through the descriptor; `None` deletes.
    fn descr_set(
        &self,
        instance: &Value,
        value: Option<Value>,
        allow_suspend: bool,
    ) -> RuntimeResult<Completion<()>>;
}

/// A descriptor value, tagged with its capabilities.
#[derive(Clone)]
pub enum Descriptor {
    NonData(Arc<dyn DescriptorGet>),
    Data(Arc<dyn DescriptorSet>),
}

impl Descriptor {
    /// Data descriptor from a concrete implementation.
    pub fn data(d: impl DescriptorSet + 'static) -> Self {
        Self::Data(Arc::new(d))
    }

    /// Non-data descriptor from a concrete implementation.
    pub fn non_data(d: impl DescriptorGet + 'static) -> Self {
        Self::NonData(Arc::new(d))
    }

    pub fn name(&self) -> &InternedString {
        match self {
            Self::NonData(d) => d.name(),
            Self::Data(d) => d.name(),
        }
    }

    /// Address of the shared descriptor, used for identity.
    pub fn addr(&self) -> usize {
        match self {
            Self::NonData(d) => Arc::as_ptr(d) as *const () as usize,
            Self::Data(d) => Arc::as_ptr(d) as *const () as usize,
        }
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    /// Wrap as a runtime value.
    pub fn into_value(self) -> Value {
        Value::Descriptor(self)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::NonData(_) => "NonData",
            Self::Data(_) => "Data",
        };
        write!(f, "Descriptor::{}({})", kind, self.name())
    }
}

/// Descriptor category of a value found on a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Plain,
    NonData,
    Data,
}

impl DescriptorKind {
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::Descriptor(Descriptor::Data(_)) => Self::Data,
            Value::Descriptor(Descriptor::NonData(_)) => Self::NonData,
            Value::Function(f) if f.kind() == FunctionKind::Method => Self::NonData,
            _ => Self::Plain,
        }
    }

    #[inline]
    pub fn is_data(self) -> bool {
        self == Self::Data
    }

    /// Check if the category has a getter (data or non-data).
    #[inline]
    pub fn has_get(self) -> bool {
        self != Self::Plain
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Run the getter of `descr`, or return it unchanged if it has none.
///
/// Reading a data descriptor from the type itself yields the descriptor.
pub fn descriptor_get(
    descr: &Value,
    instance: Option<&Value>,
    owner: &Arc<TypeObject>,
    allow_suspend: bool,
) -> RuntimeResult<Completion<Value>> {
    match (descr, instance) {
        (Value::Function(f), Some(instance)) if f.kind() == FunctionKind::Method => Ok(
            Completion::Ready(Value::BoundMethod(Arc::new(BoundMethod::new(
                f.clone(),
                instance.clone(),
            )))),
        ),
        (Value::Descriptor(Descriptor::Data(_)), None) => Ok(Completion::Ready(descr.clone())),
        (Value::Descriptor(Descriptor::Data(d)), Some(_)) => {
            d.descr_get(instance, owner, allow_suspend)?.settle(allow_suspend)
        }
        (Value::Descriptor(Descriptor::NonData(d)), _) => {
            d.descr_get(instance, owner, allow_suspend)?.settle(allow_suspend)
        }
        _ => Ok(Completion::Ready(descr.clone())),
    }
}

/// Run the setter of `descr`; `value == None` deletes.
///
/// Only data descriptors accept assignment.
pub fn descriptor_set(
    descr: &Value,
    instance: &Value,
    value: Option<Value>,
    allow_suspend: bool,
) -> RuntimeResult<Completion<()>> {
    match descr {
        Value::Descriptor(Descriptor::Data(d)) => {
            d.descr_set(instance, value, allow_suspend)?.settle(allow_suspend)
        }
        other => Err(RuntimeError::internal(format!(
            "'{}' object is not a data descriptor",
            other.type_name()
        ))),
    }
}

// =============================================================================
// Property
// =============================================================================

/// Getter body of a [`Property`].
pub type PropertyGetter = dyn Fn(&Value) -> RuntimeResult<Completion<Value>> + Send + Sync;

/// Setter body of a [`Property`]; `None` deletes.
pub type PropertySetter =
    dyn Fn(&Value, Option<Value>) -> RuntimeResult<Completion<()>> + Send + Sync;

/// Data descriptor with a native getter and an optional setter.
pub struct Property {
    name: InternedString,
    getter: Box<PropertyGetter>,
    setter: Option<Box<PropertySetter>>,
}

impl Property {
    /// Read-only property.
    pub fn readonly(
        name: &str,
        getter: impl Fn(&Value) -> RuntimeResult<Completion<Value>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: intern(name),
            getter: Box::new(getter),
            setter: None,
        }
    }

    /// Add a setter.
    pub fn with_setter(
        mut self,
        setter: impl Fn(&Value, Option<Value>) -> RuntimeResult<Completion<()>> + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Box::new(setter));
        self
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn into_value(self) -> Value {
        Descriptor::data(self).into_value()
    }
}

impl DescriptorGet for Property {
    fn name(&self) -> &InternedString {
        &self.name
    }

    fn descr_get(
        &self,
        instance: Option<&Value>,
        owner: &Arc<TypeObject>,
        _allow_suspend: bool,
    ) -> RuntimeResult<Completion<Value>> {
        match instance {
            Some(instance) => (self.getter)(instance),
            None => Err(RuntimeError::internal(format!(
                "property '{}' of '{}' read without an instance",
                self.name,
                owner.name()
            ))),
        }
    }
}

impl DescriptorSet for Property {
    fn descr_set(
        &self,
        instance: &Value,
        value: Option<Value>,
        _allow_suspend: bool,
    ) -> RuntimeResult<Completion<()>> {
        match &self.setter {
            Some(setter) => setter(instance, value),
            None => {
                let verb = if value.is_some() { "setter" } else { "deleter" };
                Err(RuntimeError::attribute(format!(
                    "property '{}' of '{}' object has no {}",
                    self.name,
                    instance.type_name(),
                    verb
                )))
            }
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("writable", &self.is_writable())
            .finish()
    }
}
