//! Advisor nodes: before/after chain linkage and the around stack
//!
//! Before and after advisors live in doubly linked chains owned by a
//! dispatcher. Around advisors are not linked at all; each attach
//! pushes a layer that closes over the previous one, and removal only
//! flips a `cancelled` flag so dispatch skips inward past the layer.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use weave_object::{CallError, CallResult, Value};

/// Before advice: runs prior to the call with the current argument
/// list; `Some` replaces the arguments for the rest of the pipeline.
pub(crate) type BeforeFn = Box<dyn Fn(&Value, &[Value]) -> CallResult<Option<Vec<Value>>>>;

/// After advice: runs with `(result, args)`; its return value becomes
/// the new result unconditionally.
pub(crate) type AfterFn = Box<dyn Fn(&Value, Value, &[Value]) -> CallResult>;

/// Raw-argument after advice: runs with the call arguments only;
/// `Some` overrides the current result, `None` keeps it.
pub(crate) type AfterRawFn = Box<dyn Fn(&Value, &[Value]) -> CallResult<Option<Value>>>;

/// Around advice body: receives the receiver and final argument list.
pub(crate) type AroundFn = Box<dyn Fn(&Value, &[Value]) -> CallResult>;

/// User advice held by a linked advisor.
pub(crate) enum AdviceFn {
    /// Before-phase advice
    Before(BeforeFn),
    /// After-phase advice receiving `(result, args)`
    After(AfterFn),
    /// After-phase advice receiving the raw arguments
    AfterRaw(AfterRawFn),
}

/// One registered unit of before/after advice plus its chain linkage.
pub(crate) struct Advisor {
    /// Registration-time sequence id. The after phase admits only
    /// advisors registered before the call entered the dispatcher.
    pub(crate) seq: u64,
    pub(crate) advice: AdviceFn,
    prev: RefCell<Weak<Advisor>>,
    next: RefCell<Option<Rc<Advisor>>>,
    removed: Cell<bool>,
}

impl Advisor {
    pub(crate) fn new(seq: u64, advice: AdviceFn) -> Rc<Advisor> {
        Rc::new(Advisor {
            seq,
            advice,
            prev: RefCell::new(Weak::new()),
            next: RefCell::new(None),
            removed: Cell::new(false),
        })
    }

    /// The successor link, as currently wired.
    pub(crate) fn next(&self) -> Option<Rc<Advisor>> {
        self.next.borrow().clone()
    }
}

/// Doubly linked advisor chain.
///
/// Before chains push at the head (most recent advisor runs first);
/// after chains push at the tail (earliest advisor runs first).
#[derive(Default)]
pub(crate) struct Chain {
    head: Option<Rc<Advisor>>,
    tail: Weak<Advisor>,
}

impl Chain {
    pub(crate) fn head(&self) -> Option<Rc<Advisor>> {
        self.head.clone()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of linked advisors.
    pub(crate) fn len(&self) -> usize {
        let mut n = 0;
        let mut cur = self.head();
        while let Some(node) = cur {
            n += 1;
            cur = node.next();
        }
        n
    }

    /// Insert at the head (before-chain discipline: LIFO execution).
    pub(crate) fn push_front(&mut self, node: Rc<Advisor>) {
        match self.head.take() {
            Some(old_head) => {
                *old_head.prev.borrow_mut() = Rc::downgrade(&node);
                *node.next.borrow_mut() = Some(old_head);
            }
            None => self.tail = Rc::downgrade(&node),
        }
        self.head = Some(node);
    }

    /// Insert at the tail (after-chain discipline: FIFO execution).
    pub(crate) fn push_back(&mut self, node: Rc<Advisor>) {
        match self.tail.upgrade() {
            Some(old_tail) => {
                *node.prev.borrow_mut() = Rc::downgrade(&old_tail);
                *old_tail.next.borrow_mut() = Some(node.clone());
            }
            None => self.head = Some(node.clone()),
        }
        self.tail = Rc::downgrade(&node);
    }

    /// Unlink a node. Idempotent: a second unlink of the same node is a
    /// no-op. The removed node keeps its own links so a walk currently
    /// parked on it continues into the rest of the chain.
    pub(crate) fn unlink(&mut self, node: &Rc<Advisor>) {
        if node.removed.replace(true) {
            return;
        }
        let prev = node.prev.borrow().upgrade();
        let next = node.next.borrow().clone();

        match &prev {
            Some(p) => *p.next.borrow_mut() = next.clone(),
            None => self.head = next.clone(),
        }
        let prev_link = match &prev {
            Some(p) => Rc::downgrade(p),
            None => Weak::new(),
        };
        match &next {
            Some(n) => *n.prev.borrow_mut() = prev_link,
            None => self.tail = prev_link,
        }
    }
}

/// One layer of the around stack.
///
/// Layers are never unlinked; attaching shadows the previous layer and
/// removal cancels in place. The innermost layer may wrap the method
/// that existed before any advice (`original == true`); that layer is
/// not user advice and cannot be cancelled.
pub(crate) struct AroundLayer {
    pub(crate) advice: AroundFn,
    pub(crate) inner: Option<Rc<AroundLayer>>,
    pub(crate) original: bool,
    pub(crate) cancelled: Cell<bool>,
}

impl AroundLayer {
    /// The innermost layer preserving the pre-advice method.
    pub(crate) fn original(advice: AroundFn) -> Rc<Self> {
        Rc::new(AroundLayer {
            advice,
            inner: None,
            original: true,
            cancelled: Cell::new(false),
        })
    }

    /// A user layer shadowing `inner`.
    pub(crate) fn user(advice: AroundFn, inner: Option<Rc<AroundLayer>>) -> Rc<Self> {
        Rc::new(AroundLayer {
            advice,
            inner,
            original: false,
            cancelled: Cell::new(false),
        })
    }

    /// Invoke the outermost live layer at or below `top`, skipping
    /// cancelled layers. An exhausted walk means no delegate exists and
    /// surfaces as the call-time "not a function" failure.
    pub(crate) fn dispatch(
        top: &Option<Rc<AroundLayer>>,
        method: &str,
        this: &Value,
        args: &[Value],
    ) -> CallResult {
        let mut cur = top.clone();
        while let Some(layer) = cur {
            if layer.cancelled.get() {
                cur = layer.inner.clone();
            } else {
                return (layer.advice)(this, args);
            }
        }
        Err(CallError::NotCallable(method.to_string()))
    }

    /// Number of live (non-cancelled) user layers at or below `top`.
    pub(crate) fn live_user_layers(top: &Option<Rc<AroundLayer>>) -> usize {
        let mut n = 0;
        let mut cur = top.clone();
        while let Some(layer) = cur {
            if !layer.original && !layer.cancelled.get() {
                n += 1;
            }
            cur = layer.inner.clone();
        }
        n
    }
}
