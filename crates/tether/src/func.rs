//! Host functions as type-erased call descriptors

use std::any::type_name;

use crate::reflect::{OwnedValue, Reflect, TypeRef};

/// A host function with its signature
pub struct FuncDesc {
    /// Compiler name of the function item
    pub(crate) name: &'static str,
    pub(crate) params: Vec<TypeRef>,
    pub(crate) ret: TypeRef,
    pub(crate) call: Box<dyn Fn(&mut [OwnedValue]) -> OwnedValue>,
}

impl FuncDesc {
    /// Declared (qualified) name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Host callables the bridge can export.
///
/// Implemented for every `Fn(A0, .., An) -> R` with up to eight [`Reflect`]
/// parameters and a [`Reflect`] result. `Marker` only disambiguates the
/// arities.
pub trait HostFn<Marker>: 'static {
    /// Erase the signature
    fn into_desc(self) -> FuncDesc;
}

macro_rules! impl_host_fn {
    ($($arg:ident $idx:tt),*) => {
        impl<F, R, $($arg,)*> HostFn<fn($($arg,)*) -> R> for F
        where
            F: Fn($($arg),*) -> R + 'static,
            R: Reflect,
            $($arg: Reflect,)*
        {
            fn into_desc(self) -> FuncDesc {
                FuncDesc {
                    name: type_name::<F>(),
                    params: vec![$(<$arg as Reflect>::type_desc),*],
                    ret: <R as Reflect>::type_desc,
                    call: Box::new(move |args: &mut [OwnedValue]| {
                        let _ = &args;
                        OwnedValue::new((self)($(args[$idx].take::<$arg>()),*))
                    }),
                }
            }
        }
    };
}

impl_host_fn!();
impl_host_fn!(A0 0);
impl_host_fn!(A0 0, A1 1);
impl_host_fn!(A0 0, A1 1, A2 2);
impl_host_fn!(A0 0, A1 1, A2 2, A3 3);
impl_host_fn!(A0 0, A1 1, A2 2, A3 3, A4 4);
impl_host_fn!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5);
impl_host_fn!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6);
impl_host_fn!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6, A7 7);
