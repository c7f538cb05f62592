//! Weave advice engine
//!
//! Attach additional behavior to an existing method of an object — run
//! code before it, after it, or wrap it entirely — without modifying
//! the method's definition, and detach it later restoring prior
//! behavior exactly:
//! - **Advisors and chains**: linked units of advice (`advisor` module)
//! - **Dispatcher**: the callable installed in an advised method slot
//!   (`dispatcher` module)
//! - **Aspect**: installer and public surface (`aspect` module)
//! - **Registry**: identity-tag to live-dispatcher mapping
//!   (`registry` module)
//! - **Bind interception**: bound references that track advice
//!   (`bind` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use weave_aspect::{Aspect, Object, Value};
//!
//! let aspect = Aspect::new();
//! let obj = Object::new();
//! obj.set("id", Value::Int(99));
//! obj.define_method("get_id", |this, _| {
//!     Ok(this.as_object().and_then(|o| o.get("id")).unwrap_or(Value::Int(0)))
//! });
//!
//! let handle = aspect.around(&obj, "get_id", |proceed| {
//!     move |this, args| {
//!         let inner = proceed(this, args)?.as_int().unwrap_or(0);
//!         Ok(Value::Int(inner + 42))
//!     }
//! });
//! assert_eq!(obj.invoke("get_id", &[]).unwrap(), Value::Int(141));
//!
//! handle.remove();
//! assert_eq!(obj.invoke("get_id", &[]).unwrap(), Value::Int(99));
//! ```
//!
//! Everything runs on the caller's stack: no threads, no locks, no
//! deferred work. Errors from advice propagate unmodified to the
//! caller.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod advisor;
mod aspect;
mod bind;
mod dispatcher;
mod registry;

pub use aspect::{Aspect, Handle, Proceed};
pub use bind::{bind_all, bind_utility};
pub use registry::DispatcherInfo;

// Re-export the object model so consumers need only one crate.
pub use weave_object::{CallError, CallResult, Callable, Function, IdentityTag, Object, Value};
