//! tether - export Rust functions and structs into an embedded object runtime
//!
//! Host code describes its types through [`Reflect`] (usually derived), then
//! publishes them through a [`Bridge`]:
//!
//! - structs become constructible runtime types whose fields are attributes
//!   and whose `#[methods]` are bound methods;
//! - functions become runtime callables;
//! - values cross the boundary through the value codec in both directions.
//!
//! # Architecture
//!
//! ```text
//! Bridge ──▶ synth (type synthesis) ──▶ dispatch (slot table, trampolines)
//!                                           │
//!                    instance (holders) ◀───┴──▶ codec (to/from dynamic)
//!                                                   │
//!                                               reflect (TypeDesc, Kind)
//! ```
//!
//! A runtime call enters through a trampoline, which resolves the slot
//! registered for its owner, converts the arguments, calls the host function
//! and converts the result back.
//!
//! # Example
//!
//! ```ignore
//! use tether::{methods, Bridge, Reflect};
//! use tether_runtime::{Interpreter, InterpreterConfig, Object};
//!
//! #[derive(Reflect, Default, Clone)]
//! #[reflect(methods)]
//! pub struct Point {
//!     pub x: i64,
//!     pub y: i64,
//! }
//!
//! #[methods]
//! impl Point {
//!     pub fn area(&self) -> i64 {
//!         self.x * self.y
//!     }
//! }
//!
//! let interp = Interpreter::initialize(InterpreterConfig::default())?;
//! let bridge = Bridge::new(&interp);
//! let main = bridge.main_module();
//! let ty = bridge.register_type_with_init::<Point, _>(
//!     &main,
//!     "Point",
//!     |p: &mut Point, x: i64, y: i64| {
//!         p.x = x;
//!         p.y = y;
//!     },
//!     "",
//! );
//! let p = ty.call(&[Object::int(3), Object::int(4)])?;
//! assert_eq!(p.call_method("area", &[])?, Object::int(12));
//! ```

#![warn(missing_docs)]

extern crate self as tether;

mod bridge;
mod codec;
mod context;
mod dispatch;
pub mod env;
mod error;
mod func;
mod instance;
mod kwargs;
mod name;
pub mod reflect;
mod synth;

pub use bridge::Bridge;
pub use dispatch::MAX_SLOTS;
pub use error::{BridgeError, ConversionError};
pub use func::{FuncDesc, HostFn};
pub use kwargs::KwArgs;
pub use name::to_snake_case;
pub use reflect::{
    describe, no_methods, FieldDesc, Kind, MethodDesc, Methods, OwnedValue, Receiver, Reflect,
    StructDesc, TypeDesc,
};
pub use synth::{
    Constructor, ConstructorDesc, ConstructorStyle, FactoryInit, ReceiverInit,
};
pub use tether_macros::{methods, Reflect};

#[doc(hidden)]
pub mod __private {
    pub use memoffset;
}
