// tether-macros: derive and attribute macros for exporting host types
//
// Provides:
// - #[derive(Reflect)] - Describes a struct's exported fields to the bridge
// - #[methods] - Exports the public methods of an inherent impl block
//
// Example:
// ```
// use tether::{methods, Reflect};
//
// #[derive(Reflect, Default, Clone)]
// #[reflect(methods)]
// pub struct Point {
//     pub x: i64,
//     pub y: i64,
// }
//
// #[methods]
// impl Point {
//     pub fn area(&self) -> i64 {
//         self.x * self.y
//     }
// }
// ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, ItemImpl};

mod derive;
mod methods;

/// Derives `tether::Reflect` for a struct.
///
/// Only `pub` named fields are exported. Attributes:
/// - `#[reflect(methods)]` - the struct also has a `#[methods]` impl block
/// - `#[reflect(opaque)]` - describe the type without exporting its layout;
///   such values cannot cross into the runtime
///
/// # Example
///
/// ```ignore
/// #[derive(Reflect, Default, Clone)]
/// pub struct Size {
///     pub width: u32,
///     pub height: u32,
///     cache: Vec<u8>, // not exported
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    derive::expand_reflect(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Exports the `pub` methods of an inherent impl block.
///
/// Every `pub fn` taking `&self`, `&mut self` or `self` becomes a runtime
/// method; associated functions without a receiver are left alone, and
/// `#[tether(skip)]` hides a method. Methods taking `self` run on a clone.
///
/// # Example
///
/// ```ignore
/// #[methods]
/// impl Point {
///     /// Moves the point
///     pub fn move_by(&mut self, dx: i64, dy: i64) {
///         self.x += dx;
///         self.y += dy;
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn methods(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemImpl);
    methods::expand_methods(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
