//! Aspect installer and the public advice surface
//!
//! `Aspect` is the entry point: it finds-or-creates the dispatcher for
//! a (target, method) pair, links advisors into it, and hands back
//! removal handles. All state (counters, registry) is per-instance so
//! aspects can be created in isolation.

use std::cell::RefCell;
use std::rc::Rc;

use weave_object::{CallResult, Function, Object, Value};

use crate::advisor::{AdviceFn, Advisor, AroundLayer};
use crate::dispatcher::{dispatcher_of, Dispatcher, DispatcherState};
use crate::registry::{Counters, DispatcherInfo, Registry};

/// Delegate handed to an around factory. Invoking it runs the next
/// inner layer: the previously attached around advice, or the original
/// method if this is the first around.
pub type Proceed = Rc<dyn Fn(&Value, &[Value]) -> CallResult>;

/// Entry point for attaching advice to object methods.
///
/// Owns the identity-tag registry and the monotonic counters; every
/// dispatcher it installs shares them. Clones are shallow: they share
/// the same registry and counters. Dropping the aspect does not
/// uninstall dispatchers — they live in the advised objects' slots.
#[derive(Clone)]
pub struct Aspect {
    pub(crate) counters: Rc<Counters>,
    pub(crate) registry: Rc<Registry>,
}

impl Aspect {
    /// Create an aspect with an empty registry.
    pub fn new() -> Self {
        Aspect {
            counters: Rc::new(Counters::new()),
            registry: Rc::new(Registry::new()),
        }
    }

    /// Attach before advice.
    ///
    /// The advice runs prior to the method with the current argument
    /// list and may return a replacement list; `None` leaves the
    /// arguments unchanged. Advisors attached later run earlier.
    pub fn before<F>(&self, target: &Object, method: &str, advice: F) -> Handle
    where
        F: Fn(&Value, &[Value]) -> CallResult<Option<Vec<Value>>> + 'static,
    {
        let state = self.dispatcher_for(target, method);
        let node = Advisor::new(self.counters.take_seq(), AdviceFn::Before(Box::new(advice)));
        state.before.borrow_mut().push_front(node.clone());
        self.handle(state, HandleKind::Before(node))
    }

    /// Attach after advice.
    ///
    /// The advice runs once the around phase has produced a result,
    /// receiving `(result, args)`; its return value becomes the new
    /// result. Advisors attached earlier run earlier, and an advisor
    /// attached during a call first runs on the next call.
    pub fn after<F>(&self, target: &Object, method: &str, advice: F) -> Handle
    where
        F: Fn(&Value, Value, &[Value]) -> CallResult + 'static,
    {
        let state = self.dispatcher_for(target, method);
        let node = Advisor::new(self.counters.take_seq(), AdviceFn::After(Box::new(advice)));
        state.after.borrow_mut().push_back(node.clone());
        self.handle(state, HandleKind::After(node))
    }

    /// Attach after advice that receives the call arguments instead of
    /// the result.
    ///
    /// Returning `Some(value)` overrides the current result; `None`
    /// keeps it. Ordering rules match `after`.
    pub fn after_raw<F>(&self, target: &Object, method: &str, advice: F) -> Handle
    where
        F: Fn(&Value, &[Value]) -> CallResult<Option<Value>> + 'static,
    {
        let state = self.dispatcher_for(target, method);
        let node = Advisor::new(self.counters.take_seq(), AdviceFn::AfterRaw(Box::new(advice)));
        state.after.borrow_mut().push_back(node.clone());
        self.handle(state, HandleKind::After(node))
    }

    /// Attach around advice.
    ///
    /// `factory` receives a `Proceed` delegate for the layer it is
    /// shadowing and returns the replacement body. Removing the handle
    /// cancels the layer in place: later calls skip straight to its
    /// inner delegate.
    pub fn around<F, G>(&self, target: &Object, method: &str, factory: F) -> Handle
    where
        F: FnOnce(Proceed) -> G,
        G: Fn(&Value, &[Value]) -> CallResult + 'static,
    {
        let state = self.dispatcher_for(target, method);
        let inner = state.around.borrow().clone();

        let proceed: Proceed = {
            let inner = inner.clone();
            let method = method.to_string();
            Rc::new(move |this, args| AroundLayer::dispatch(&inner, &method, this, args))
        };
        let advised = factory(proceed);

        let layer = AroundLayer::user(Box::new(advised), inner);
        *state.around.borrow_mut() = Some(layer.clone());
        self.handle(state, HandleKind::Around(layer))
    }

    /// Number of live registry entries (diagnostic only).
    pub fn dispatcher_count(&self) -> usize {
        self.registry.len()
    }

    /// Read-only snapshot of the registry, ordered by tag.
    ///
    /// Diagnostics and tests only; correct operation never depends on
    /// this view.
    pub fn dispatchers(&self) -> Vec<DispatcherInfo> {
        self.registry.snapshot()
    }

    /// Find the dispatcher owned by `target` for `method`, or install a
    /// new one.
    ///
    /// A slot that is absent, inherited, or holds a plain function gets
    /// a fresh dispatcher installed directly on `target`; a plain
    /// function becomes the innermost around layer so original behavior
    /// is preserved. A vacant slot yields a dispatcher with no fallback
    /// layer, which fails with "not a function" when called before any
    /// around advice arrives — attaching is never rejected.
    fn dispatcher_for(&self, target: &Object, method: &str) -> Rc<DispatcherState> {
        let existing = target.get(method);

        if let Some(slot) = &existing {
            if let Some(state) = dispatcher_of(slot) {
                if state.owns(target) {
                    // All advice kinds share one dispatcher per
                    // (target, method) pair. Refresh the registry entry
                    // in case a full teardown removed it earlier.
                    self.registry.insert(state.tag(), state.clone());
                    return state;
                }
            }
        }

        // The fallback delegate is whatever function the slot held —
        // including an inherited method or another object's dispatcher.
        let fallback = match &existing {
            Some(Value::Function(f)) => Some(f.clone()),
            _ => None,
        };

        // Share the original function's tag so references bound to it
        // resolve to this dispatcher; tag the original on first use.
        let tag = match &fallback {
            Some(f) => f.tag_or_insert_with(|| self.counters.fresh_tag()),
            None => self.counters.fresh_tag(),
        };

        let state = DispatcherState::new(method, target, tag, self.counters.clone());
        if let Some(f) = fallback {
            let original = f.clone();
            *state.around.borrow_mut() = Some(AroundLayer::original(Box::new(
                move |this, args| original.call(this, args),
            )));
        }

        let func = Function::from_callable(Dispatcher {
            state: state.clone(),
        });
        func.set_tag(tag);
        target.set(method, Value::Function(func));

        self.registry.insert(tag, state.clone());
        state
    }

    fn handle(&self, state: Rc<DispatcherState>, kind: HandleKind) -> Handle {
        Handle {
            inner: RefCell::new(Some(HandleInner {
                state,
                registry: self.registry.clone(),
                kind,
            })),
        }
    }
}

impl Default for Aspect {
    fn default() -> Self {
        Self::new()
    }
}

enum HandleKind {
    Before(Rc<Advisor>),
    After(Rc<Advisor>),
    Around(Rc<AroundLayer>),
}

struct HandleInner {
    state: Rc<DispatcherState>,
    registry: Rc<Registry>,
    kind: HandleKind,
}

/// Removal handle for one attached piece of advice.
///
/// `remove` detaches exactly the advice this handle was returned for;
/// calling it again is a no-op. The dispatcher itself stays installed
/// in the method slot even when its last advisor detaches — only its
/// registry entry is torn down.
pub struct Handle {
    inner: RefCell<Option<HandleInner>>,
}

impl Handle {
    /// Detach the advice.
    pub fn remove(&self) {
        let Some(inner) = self.inner.borrow_mut().take() else {
            return;
        };
        match inner.kind {
            HandleKind::Before(node) => inner.state.before.borrow_mut().unlink(&node),
            HandleKind::After(node) => inner.state.after.borrow_mut().unlink(&node),
            HandleKind::Around(layer) => layer.cancelled.set(true),
        }
        if inner.state.active_advisors() == 0 {
            inner.registry.remove(inner.state.tag());
        }
    }
}
