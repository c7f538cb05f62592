//! Object model: identity, named slots, prototype chain
//!
//! An `Object` is a shared handle to a slot map plus an optional
//! prototype link. Slot lookup walks the chain; writes always land on
//! the object itself, shadowing anything inherited. Method dispatch is
//! slot lookup followed by a call with `this` bound to the object the
//! lookup started from.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

use crate::error::{CallError, CallResult};
use crate::function::Function;
use crate::value::Value;

/// Global counter for generating unique object IDs
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique object ID
fn generate_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

struct ObjectData {
    /// Unique object ID (assigned on creation, used for identity display)
    object_id: u64,
    /// Prototype link; slot lookups fall through to it
    proto: Option<Object>,
    /// Named slots (data and methods alike)
    slots: FxHashMap<String, Value>,
}

/// Shared, identity-comparable dynamic object.
///
/// Clones are handles to the same object; `ptr_eq` compares the
/// allocation, not the contents.
#[derive(Clone)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl Object {
    /// Create an empty object with no prototype.
    pub fn new() -> Self {
        Object(Rc::new(RefCell::new(ObjectData {
            object_id: generate_object_id(),
            proto: None,
            slots: FxHashMap::default(),
        })))
    }

    /// Create an empty object whose slot lookups fall through to `proto`.
    pub fn with_proto(proto: &Object) -> Self {
        let obj = Object::new();
        obj.0.borrow_mut().proto = Some(proto.clone());
        obj
    }

    /// The object's unique ID.
    pub fn id(&self) -> u64 {
        self.0.borrow().object_id
    }

    /// The prototype link, if any.
    pub fn proto(&self) -> Option<Object> {
        self.0.borrow().proto.clone()
    }

    /// Read a slot, walking the prototype chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let next = {
                let data = current.0.borrow();
                if let Some(value) = data.slots.get(name) {
                    return Some(value.clone());
                }
                data.proto.clone()
            };
            current = next?;
        }
    }

    /// Read a slot on this object only, ignoring the prototype chain.
    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.0.borrow().slots.get(name).cloned()
    }

    /// Write an own slot, shadowing any inherited slot of the same name.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().slots.insert(name.into(), value);
    }

    /// Remove an own slot, returning its previous value.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.0.borrow_mut().slots.remove(name)
    }

    /// Install a native closure as a method slot.
    pub fn define_method<F>(&self, name: &str, f: F)
    where
        F: Fn(&Value, &[Value]) -> CallResult + 'static,
    {
        self.set(name, Value::Function(Function::native(f)));
    }

    /// Call the named method with `this` bound to this object.
    ///
    /// The lookup walks the prototype chain, but the receiver is always
    /// the object the call started from. A missing slot or a slot that
    /// does not hold a function yields `CallError::NotCallable`.
    pub fn invoke(&self, name: &str, args: &[Value]) -> CallResult {
        match self.get(name) {
            Some(Value::Function(f)) => f.call(&Value::Object(self.clone()), args),
            _ => Err(CallError::NotCallable(name.to_string())),
        }
    }

    /// True if both handles point at the same object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Create a weak, identity-comparing reference to this object.
    pub fn downgrade(&self) -> WeakObject {
        WeakObject(Rc::downgrade(&self.0))
    }

    /// Number of own slots.
    pub fn slot_count(&self) -> usize {
        self.0.borrow().slots.len()
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Object")
            .field("id", &data.object_id)
            .field("slots", &data.slots.len())
            .field("has_proto", &data.proto.is_some())
            .finish()
    }
}

/// Weak, identity-comparing reference to an object.
///
/// Used where a back-reference must not keep the object alive (a
/// dispatcher's owner link lives inside the object's own method slot,
/// so a strong reference would cycle).
#[derive(Clone, Default)]
pub struct WeakObject(Weak<RefCell<ObjectData>>);

impl WeakObject {
    /// Upgrade to a strong handle, if the object is still alive.
    pub fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(Object)
    }

    /// True if this reference points at `other`.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(obj) => write!(f, "WeakObject(#{})", obj.id()),
            None => write!(f, "WeakObject(dead)"),
        }
    }
}
