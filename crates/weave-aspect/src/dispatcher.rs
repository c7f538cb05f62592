//! Dispatcher: the callable installed in an advised method slot
//!
//! One dispatcher mediates all advice for one (object, method) pair.
//! It owns the before chain, the around stack, and the after chain, and
//! evaluates them on every invocation. The dispatcher is an ordinary
//! `Function` value from the object's point of view; the installer
//! recognizes it by downcasting the slot's callable.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use weave_object::{CallResult, Callable, IdentityTag, Object, Value, WeakObject};

use crate::advisor::{AdviceFn, AroundLayer, Chain};
use crate::registry::Counters;

/// Shared state of one dispatcher.
pub(crate) struct DispatcherState {
    method: String,
    /// The object whose slot this dispatcher is installed in. Identity
    /// comparison only; weak because the slot itself owns the
    /// dispatcher and a strong back-reference would cycle.
    owner: WeakObject,
    tag: IdentityTag,
    pub(crate) before: RefCell<Chain>,
    pub(crate) after: RefCell<Chain>,
    pub(crate) around: RefCell<Option<Rc<AroundLayer>>>,
    counters: Rc<Counters>,
}

impl DispatcherState {
    pub(crate) fn new(
        method: &str,
        owner: &Object,
        tag: IdentityTag,
        counters: Rc<Counters>,
    ) -> Rc<Self> {
        Rc::new(DispatcherState {
            method: method.to_string(),
            owner: owner.downgrade(),
            tag,
            before: RefCell::new(Chain::default()),
            after: RefCell::new(Chain::default()),
            around: RefCell::new(None),
            counters,
        })
    }

    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn tag(&self) -> IdentityTag {
        self.tag
    }

    /// True if this dispatcher is installed directly on `target` (as
    /// opposed to being reached through `target`'s prototype chain).
    pub(crate) fn owns(&self, target: &Object) -> bool {
        self.owner.ptr_eq(target)
    }

    /// Linked before/after advisors plus live user around layers.
    pub(crate) fn active_advisors(&self) -> usize {
        self.before.borrow().len()
            + self.after.borrow().len()
            + AroundLayer::live_user_layers(&self.around.borrow())
    }

    /// Run the full advice pipeline for one invocation.
    pub(crate) fn invoke(&self, this: &Value, args: &[Value]) -> CallResult {
        // Snapshot the sequence counter at call entry. An after-advisor
        // registered during this call (by a before or around advisor)
        // carries a sequence id >= this snapshot and must wait for the
        // next call.
        let entry_seq = self.counters.entry_seq();

        // Before phase: head first, so the most recently attached
        // advisor runs first. An advisor may replace the argument list.
        let mut args: Vec<Value> = args.to_vec();
        let mut cur = self.before.borrow().head();
        while let Some(node) = cur {
            if let AdviceFn::Before(advice) = &node.advice {
                if let Some(replacement) = advice(this, &args)? {
                    args = replacement;
                }
            }
            cur = node.next();
        }

        // Around phase: outermost live layer wins; cancelled layers are
        // bypassed. No layer at all means the slot never had a callable
        // to fall back to.
        let top = self.around.borrow().clone();
        let mut result = AroundLayer::dispatch(&top, &self.method, this, &args)?;

        // After phase: registration order, fenced by the entry
        // snapshot. Sequence ids ascend along the chain, so the first
        // advisor at or past the fence ends the walk.
        let mut cur = self.after.borrow().head();
        while let Some(node) = cur {
            if node.seq >= entry_seq {
                break;
            }
            match &node.advice {
                AdviceFn::After(advice) => result = advice(this, result, &args)?,
                AdviceFn::AfterRaw(advice) => {
                    if let Some(overriding) = advice(this, &args)? {
                        result = overriding;
                    }
                }
                // Before advisors are never linked into the after chain.
                AdviceFn::Before(_) => {}
            }
            cur = node.next();
        }
        Ok(result)
    }
}

/// The callable installed in the target's method slot.
pub(crate) struct Dispatcher {
    pub(crate) state: Rc<DispatcherState>,
}

impl Callable for Dispatcher {
    fn call(&self, this: &Value, args: &[Value]) -> CallResult {
        self.state.invoke(this, args)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The dispatcher state behind a slot value, if the slot holds one.
pub(crate) fn dispatcher_of(value: &Value) -> Option<Rc<DispatcherState>> {
    match value {
        Value::Function(f) => f.downcast_ref::<Dispatcher>().map(|d| d.state.clone()),
        _ => None,
    }
}
