//! Callable function values
//!
//! A `Function` is a shared handle to a `Callable` plus an identity-tag
//! cell. The tag correlates a function object with a live dispatcher in
//! the advice engine's registry; it is assigned at most once and stays
//! stable for the lifetime of the function object.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::CallResult;
use crate::value::Value;

/// Opaque process-unique tag correlating a function object with its
/// live dispatcher.
///
/// Tags are small monotonically increasing integers starting at 1,
/// allocated by the advice engine. Only one allocation strategy exists;
/// random-token tags are not used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityTag(u64);

impl IdentityTag {
    /// Build a tag from a raw counter value.
    pub fn from_raw(raw: u64) -> Self {
        IdentityTag(raw)
    }

    /// The raw counter value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Trait seam for anything invokable as a dynamic function.
///
/// `as_any` supports downcasting so callers can recognize specific
/// callable implementations behind a slot (the advice engine uses this
/// to detect its own dispatchers, the way a type id distinguishes a
/// proxy from a plain object).
pub trait Callable: 'static {
    /// Invoke with `this` bound to the receiver.
    fn call(&self, this: &Value, args: &[Value]) -> CallResult;

    /// Downcasting support.
    fn as_any(&self) -> &dyn Any;
}

/// Plain native closure callable.
struct NativeFn(Box<dyn Fn(&Value, &[Value]) -> CallResult>);

impl Callable for NativeFn {
    fn call(&self, this: &Value, args: &[Value]) -> CallResult {
        (self.0)(this, args)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FunctionData {
    tag: Cell<Option<IdentityTag>>,
    callable: Box<dyn Callable>,
}

/// A callable value.
///
/// Clones share the same underlying callable and tag cell; `ptr_eq`
/// compares that shared allocation.
#[derive(Clone)]
pub struct Function(Rc<FunctionData>);

impl Function {
    /// Wrap a native closure.
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> CallResult + 'static,
    {
        Self::from_callable(NativeFn(Box::new(f)))
    }

    /// Wrap an arbitrary callable implementation.
    pub fn from_callable<C: Callable>(callable: C) -> Self {
        Function(Rc::new(FunctionData {
            tag: Cell::new(None),
            callable: Box::new(callable),
        }))
    }

    /// Invoke the function with `this` bound to `receiver`.
    pub fn call(&self, this: &Value, args: &[Value]) -> CallResult {
        self.0.callable.call(this, args)
    }

    /// The function's identity tag, if one has been assigned.
    pub fn tag(&self) -> Option<IdentityTag> {
        self.0.tag.get()
    }

    /// Assign an identity tag. Overwrites any previous tag; callers
    /// that need assign-once semantics use `tag_or_insert_with`.
    pub fn set_tag(&self, tag: IdentityTag) {
        self.0.tag.set(Some(tag));
    }

    /// The existing tag, or the result of `make` assigned and returned.
    pub fn tag_or_insert_with(&self, make: impl FnOnce() -> IdentityTag) -> IdentityTag {
        match self.0.tag.get() {
            Some(tag) => tag,
            None => {
                let tag = make();
                self.0.tag.set(Some(tag));
                tag
            }
        }
    }

    /// True if both handles share the same underlying function object.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Downcast the underlying callable to a concrete type.
    pub fn downcast_ref<C: Callable>(&self) -> Option<&C> {
        self.0.callable.as_any().downcast_ref::<C>()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("tag", &self.0.tag.get())
            .finish_non_exhaustive()
    }
}
