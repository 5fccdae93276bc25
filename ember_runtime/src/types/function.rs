//! Native function and bound method objects.
//!
//! Every callable the object model installs on a type is a
//! [`NativeFunction`]. Method-kind functions bind to the instance they are
//! fetched through; static-kind functions (the `__new__` entries) never do.

use crate::object::call::prepend;
use crate::value::{KwArg, Value};
use ember_core::{InternedString, RuntimeResult, intern};
use std::fmt;
use std::sync::Arc;

/// Signature of a native callable body.
pub type NativeFn = dyn Fn(&[Value], &[KwArg]) -> RuntimeResult<Value> + Send + Sync;

// =============================================================================
// Native Function
// =============================================================================

/// How a function behaves when found on a type and fetched through an
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Binds the instance as the first argument.
    Method,
    /// Returned unchanged.
    Static,
}

/// A callable implemented in Rust.
pub struct NativeFunction {
    name: InternedString,
    /// Name of the type the function was installed on.
    owner: InternedString,
    kind: FunctionKind,
    doc: Option<&'static str>,
    body: Box<NativeFn>,
}

impl NativeFunction {
    /// Function that binds its receiver.
    pub fn method(
        owner: &str,
        name: &str,
        body: impl Fn(&[Value], &[KwArg]) -> RuntimeResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: intern(name),
            owner: intern(owner),
            kind: FunctionKind::Method,
            doc: None,
            body: Box::new(body),
        }
    }

    /// Function that never binds.
    pub fn static_method(
        owner: &str,
        name: &str,
        body: impl Fn(&[Value], &[KwArg]) -> RuntimeResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: FunctionKind::Static,
            ..Self::method(owner, name, body)
        }
    }

    /// Attach a docstring.
    pub fn with_doc(mut self, doc: &'static str) -> Self {
        self.doc = Some(doc);
        self
    }

    #[inline]
    pub fn name(&self) -> &InternedString {
        &self.name
    }

    #[inline]
    pub fn owner(&self) -> &InternedString {
        &self.owner
    }

    /// `owner.name`, as used in reprs.
    pub fn qualname(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    #[inline]
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    #[inline]
    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }

    /// Invoke with positional and keyword arguments.
    #[inline]
    pub fn call(&self, args: &[Value], kwargs: &[KwArg]) -> RuntimeResult<Value> {
        (self.body)(args, kwargs)
    }

    /// Wrap as a runtime value.
    pub fn into_value(self) -> Value {
        Value::Function(Arc::new(self))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("qualname", &self.qualname())
            .field("kind", &self.kind)
            .finish()
    }
}

// =============================================================================
// Bound Method
// =============================================================================

/// A method-kind function paired with its receiver.
pub struct BoundMethod {
    func: Arc<NativeFunction>,
    receiver: Value,
}

impl BoundMethod {
    pub fn new(func: Arc<NativeFunction>, receiver: Value) -> Self {
        Self { func, receiver }
    }

    #[inline]
    pub fn func(&self) -> &Arc<NativeFunction> {
        &self.func
    }

    #[inline]
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    /// Invoke with the receiver prepended to `args`.
    pub fn call(&self, args: &[Value], kwargs: &[KwArg]) -> RuntimeResult<Value> {
        let full = prepend(self.receiver.clone(), args);
        self.func.call(&full, kwargs)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("func", &self.func.qualname())
            .field("receiver", &self.receiver.type_name())
            .finish()
    }
}
