//! Per-aspect counters and the identity-tag registry
//!
//! Both are instance state on an `Aspect`, never process globals, so a
//! test can build an isolated aspect and observe exactly the entries it
//! created.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use weave_object::IdentityTag;

use crate::dispatcher::DispatcherState;

/// Monotonic counters backing advisor sequence ids and identity tags.
///
/// Shared (via `Rc`) between the aspect instance and every dispatcher
/// it creates; the dispatcher snapshots the sequence counter at call
/// entry to fence off after-advisors registered mid-call.
pub(crate) struct Counters {
    seq: Cell<u64>,
    tag: Cell<u64>,
}

impl Counters {
    pub(crate) fn new() -> Self {
        Counters {
            seq: Cell::new(0),
            // Tags are small integers starting at 1; 0 is never issued.
            tag: Cell::new(1),
        }
    }

    /// Current sequence value, without consuming one. This is the
    /// call-entry snapshot.
    pub(crate) fn entry_seq(&self) -> u64 {
        self.seq.get()
    }

    /// Allocate the next advisor sequence id.
    pub(crate) fn take_seq(&self) -> u64 {
        let v = self.seq.get();
        self.seq.set(v + 1);
        v
    }

    /// Allocate a fresh identity tag.
    pub(crate) fn fresh_tag(&self) -> IdentityTag {
        let v = self.tag.get();
        self.tag.set(v + 1);
        IdentityTag::from_raw(v)
    }
}

/// Read-only diagnostic view of one live dispatcher.
///
/// Exposed only for diagnostics and tests; correct operation never
/// requires it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherInfo {
    /// Identity tag the dispatcher is registered under
    pub tag: IdentityTag,
    /// Method name the dispatcher mediates
    pub method: String,
    /// Active advisors: linked before/after advisors plus live
    /// (non-cancelled) user around layers
    pub advisors: usize,
}

/// Mapping from identity tag to the currently live dispatcher.
///
/// Entries are inserted when advice attaches and removed when a
/// dispatcher's last active advisor detaches. The map holds the only
/// long-lived strong reference besides the target's own method slot;
/// removal is explicit, never relied on for liveness.
pub(crate) struct Registry {
    map: RefCell<FxHashMap<IdentityTag, Rc<DispatcherState>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            map: RefCell::new(FxHashMap::default()),
        }
    }

    /// Insert or refresh the entry for `tag`. At most one dispatcher is
    /// live per tag; a newer dispatcher sharing the tag replaces the
    /// older one.
    pub(crate) fn insert(&self, tag: IdentityTag, state: Rc<DispatcherState>) {
        self.map.borrow_mut().insert(tag, state);
    }

    pub(crate) fn remove(&self, tag: IdentityTag) {
        self.map.borrow_mut().remove(&tag);
    }

    pub(crate) fn lookup(&self, tag: IdentityTag) -> Option<Rc<DispatcherState>> {
        self.map.borrow().get(&tag).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.map.borrow().len()
    }

    /// Snapshot for the introspection surface.
    pub(crate) fn snapshot(&self) -> Vec<DispatcherInfo> {
        let mut entries: Vec<DispatcherInfo> = self
            .map
            .borrow()
            .iter()
            .map(|(tag, state)| DispatcherInfo {
                tag: *tag,
                method: state.method().to_string(),
                advisors: state.active_advisors(),
            })
            .collect();
        entries.sort_by_key(|info| info.tag.raw());
        entries
    }
}
