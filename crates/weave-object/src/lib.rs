//! Weave dynamic object model
//!
//! This crate provides the value and object representation the weave
//! advice engine operates on:
//! - **Value**: dynamically typed value (`value` module)
//! - **Object**: identity-comparable object with named slots and an
//!   optional prototype chain (`object` module)
//! - **Function**: callable value with an identity-tag cell and a
//!   downcastable `Callable` seam (`function` module)
//!
//! Method slots are plain entries in an object's slot map, so any slot
//! can be read, replaced, or shadowed at runtime. That property is what
//! lets the advice engine swap a method for a dispatcher without the
//! object noticing.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod function;
pub mod object;
pub mod value;

pub use error::{CallError, CallResult};
pub use function::{Callable, Function, IdentityTag};
pub use object::{Object, WeakObject};
pub use value::Value;
