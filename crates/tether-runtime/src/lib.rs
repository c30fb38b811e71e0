//! tether-runtime - embedding surface of a reference-counted object runtime
//!
//! This crate is the small slice of a dynamically typed, reference-counted
//! object runtime that native extensions program against: object handles,
//! builtin containers, modules, heap types assembled from native slot tables,
//! exceptions and the interpreter lifecycle. It has no evaluator; everything
//! is driven through the attribute and call protocol on [`Object`].
//!
//! # Native entry points
//!
//! Extensions expose behavior through plain function pointers
//! ([`CFunction`], [`Getter`], [`Setter`], [`InitFunc`], [`AllocFunc`],
//! [`DeallocFunc`]). They carry no captured state; per-callable data is found
//! through `self` (type context, module state or a capsule) or through the
//! integer closure of a [`GetSetDef`].
//!
//! # Threading
//!
//! Objects are `!Send` and live on the thread that called
//! [`Interpreter::initialize`]. References leave that thread as
//! [`DetachedObject`]s whose release is queued and drained by the owner.

#![warn(missing_docs)]

mod decref;
mod dict;
mod error;
mod function;
mod interp;
mod module;
mod object;
mod protocol;
mod types;

pub use decref::{DetachedObject, DEFAULT_DECREF_BATCH};
pub use error::{Exception, ExceptionKind, InitError, RtResult};
pub use interp::{Interpreter, InterpreterConfig};
pub use object::Object;
pub use types::{
    generic_alloc, AllocFunc, CFunction, DeallocFunc, GetSetDef, Getter, InitFunc, MethodDef,
    Setter, TypeSpec,
};

pub use num_complex::{Complex32, Complex64};
