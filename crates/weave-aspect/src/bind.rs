//! Bind interception: keeping bound references pointed at live advice
//!
//! A bound reference captures a method slot's current value. Attaching
//! advice later replaces that slot with a dispatcher, so the bound
//! reference would keep calling the stale function forever. Wrapping
//! the bind utility fixes this: every function bound through it is
//! swapped for a proxy that re-resolves through the identity-tag
//! registry on each call.

use weave_object::{CallError, CallResult, Function, Object, Value};

use crate::aspect::{Aspect, Handle};

impl Aspect {
    /// Intercept the `bind` method of a bind-like utility object.
    ///
    /// Implemented with this aspect's own before advice on
    /// `lib["bind"]`. On each bind call the function being bound is
    /// tagged (if it is not already) and replaced by a resolving proxy:
    /// at call time the proxy invokes the registry's live dispatcher
    /// for that tag, or the original function when no dispatcher is
    /// registered. Non-function first arguments pass through untouched.
    ///
    /// Multiple utilities can be wrapped independently; the returned
    /// handle's `remove` unwraps this one.
    pub fn wrap_bind(&self, lib: &Object) -> Handle {
        let counters = self.counters.clone();
        let registry = self.registry.clone();
        self.before(lib, "bind", move |_this, args| {
            let func = match args.first() {
                Some(Value::Function(f)) => f.clone(),
                _ => return Ok(None),
            };
            let tag = func.tag_or_insert_with(|| counters.fresh_tag());

            let proxy = {
                let registry = registry.clone();
                let original = func.clone();
                Function::native(move |this, call_args| match registry.lookup(tag) {
                    Some(dispatcher) => dispatcher.invoke(this, call_args),
                    None => original.call(this, call_args),
                })
            };
            // The proxy carries the original's tag so binding it again
            // (or advising a slot it was stored into) keeps resolving.
            proxy.set_tag(tag);

            let mut replaced = args.to_vec();
            replaced[0] = Value::Function(proxy);
            Ok(Some(replaced))
        })
    }
}

/// Build a minimal bind-like utility object.
///
/// Its `bind(func, receiver, partials...)` method returns a function
/// permanently attached to `receiver`, with any partial arguments
/// prepended to the call arguments.
pub fn bind_utility() -> Object {
    let lib = Object::new();
    lib.define_method("bind", |_this, args| {
        let func = args
            .first()
            .and_then(Value::as_function)
            .cloned()
            .ok_or_else(|| CallError::TypeError("bind: first argument must be a function".into()))?;
        let receiver = args.get(1).cloned().unwrap_or(Value::Undefined);
        let partials: Vec<Value> = args.get(2..).map(<[Value]>::to_vec).unwrap_or_default();

        Ok(Value::Function(Function::native(move |_this, call_args| {
            if partials.is_empty() {
                func.call(&receiver, call_args)
            } else {
                let mut full = partials.clone();
                full.extend_from_slice(call_args);
                func.call(&receiver, &full)
            }
        })))
    });
    lib
}

/// Rebind the named methods of `target` onto itself through `lib`'s
/// bind method, storing the bound functions as own slots.
///
/// This is the classic `bindAll` pattern; run it through a wrapped
/// utility and the rebound methods keep tracking advice.
pub fn bind_all(lib: &Object, target: &Object, names: &[&str]) -> CallResult<()> {
    for name in names {
        let method = target
            .get(name)
            .ok_or_else(|| CallError::NotCallable((*name).to_string()))?;
        let bound = lib.invoke("bind", &[method, Value::Object(target.clone())])?;
        target.set(*name, bound);
    }
    Ok(())
}
