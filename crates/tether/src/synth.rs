//! Type synthesis
//!
//! Builds a runtime type from a reflected host struct: one get/set slot per
//! exported field, one callable slot per exported method and an optional
//! `__init__` slot from a classified constructor.
//!
//! Slot ids are assigned in a fixed order (init, then fields, then methods)
//! and never change for the lifetime of the type.

use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;
use std::rc::Rc;

use tether_runtime::{GetSetDef, InitFunc, MethodDef, Object, TypeSpec};

use crate::context::{BridgeContext, BridgedType};
use crate::dispatch::{
    field_getter, field_setter, init_trampoline, trampoline, SlotKind, SlotMeta, MAX_SLOTS,
};
use crate::instance::{bridge_alloc, bridge_dealloc};
use crate::name::to_snake_case;
use crate::reflect::{Kind, OwnedValue, Reflect, TypeDesc, TypeRef};

// ============================================================================
// Constructors
// ============================================================================

/// How a constructor produces the instance value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorStyle {
    /// `Fn(&mut T, ..)` mutating the zero value in place
    Receiver,
    /// `Fn(..) -> T` or `Fn(..) -> Box<T>` replacing the zero value
    Factory,
}

/// A classified constructor
pub struct ConstructorDesc {
    pub(crate) style: ConstructorStyle,
    pub(crate) name: &'static str,
    pub(crate) params: Vec<TypeRef>,
    pub(crate) call: Box<dyn Fn(*mut u8, &mut [OwnedValue])>,
}

impl ConstructorDesc {
    /// Constructor style
    pub fn style(&self) -> ConstructorStyle {
        self.style
    }

    /// Number of parameters, receiver excluded
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Constructors accepted for a bridged `T`.
///
/// Implemented for receiver-style `Fn(&mut T, A0, ..)` and factory-style
/// `Fn(A0, ..) -> R` closures and functions with up to eight parameters.
/// A factory whose `R` is neither `T` nor `Box<T>` is rejected with a panic.
pub trait Constructor<T, Marker>: 'static {
    /// Classify and erase
    fn into_constructor(self) -> ConstructorDesc;
}

/// Marker of receiver-style constructors
pub struct ReceiverInit<Args>(PhantomData<Args>);

/// Marker of factory-style constructors
pub struct FactoryInit<Args, R>(PhantomData<(Args, R)>);

unsafe fn store_factory_result<T: 'static>(dest: *mut u8, produced: Box<dyn Any>) {
    let dest = dest as *mut T;
    match produced.downcast::<T>() {
        Ok(value) => *dest = *value,
        Err(produced) => {
            if let Ok(boxed) = produced.downcast::<Box<T>>() {
                *dest = **boxed;
            }
        }
    }
}

macro_rules! impl_constructor {
    ($($arg:ident $idx:tt),*) => {
        impl<T, F, $($arg,)*> Constructor<T, ReceiverInit<($($arg,)*)>> for F
        where
            T: Reflect,
            F: Fn(&mut T, $($arg),*) + 'static,
            $($arg: Reflect,)*
        {
            fn into_constructor(self) -> ConstructorDesc {
                ConstructorDesc {
                    style: ConstructorStyle::Receiver,
                    name: type_name::<F>(),
                    params: vec![$(<$arg as Reflect>::type_desc),*],
                    call: Box::new(move |this: *mut u8, args: &mut [OwnedValue]| {
                        let _ = &args;
                        // SAFETY: the dispatcher passes the instance's live `T`.
                        let this = unsafe { &mut *(this as *mut T) };
                        (self)(this, $(args[$idx].take::<$arg>()),*);
                    }),
                }
            }
        }

        impl<T, F, R, $($arg,)*> Constructor<T, FactoryInit<($($arg,)*), R>> for F
        where
            T: Reflect,
            R: Reflect,
            F: Fn($($arg),*) -> R + 'static,
            $($arg: Reflect,)*
        {
            fn into_constructor(self) -> ConstructorDesc {
                let ret = TypeId::of::<R>();
                assert!(
                    ret == TypeId::of::<T>() || ret == TypeId::of::<Box<T>>(),
                    "constructor {} for {} must return it or a Box of it, not {}",
                    type_name::<F>(),
                    type_name::<T>(),
                    type_name::<R>(),
                );
                ConstructorDesc {
                    style: ConstructorStyle::Factory,
                    name: type_name::<F>(),
                    params: vec![$(<$arg as Reflect>::type_desc),*],
                    call: Box::new(move |this: *mut u8, args: &mut [OwnedValue]| {
                        let _ = &args;
                        let produced: Box<dyn Any> = Box::new((self)($(args[$idx].take::<$arg>()),*));
                        // SAFETY: the dispatcher passes the instance's live `T`.
                        unsafe { store_factory_result::<T>(this, produced) };
                    }),
                }
            }
        }
    };
}

impl_constructor!();
impl_constructor!(A0 0);
impl_constructor!(A0 0, A1 1);
impl_constructor!(A0 0, A1 1, A2 2);
impl_constructor!(A0 0, A1 1, A2 2, A3 3);
impl_constructor!(A0 0, A1 1, A2 2, A3 3, A4 4);
impl_constructor!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5);
impl_constructor!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6);
impl_constructor!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6, A7 7);

// ============================================================================
// Registration
// ============================================================================

/// Strip one level of `Box`
fn unboxed(desc: &'static TypeDesc) -> &'static TypeDesc {
    match &desc.kind {
        Kind::Boxed(b) => (b.elem)(),
        _ => desc,
    }
}

/// Struct held by a field directly or behind a (nullable) box
fn nested_struct(desc: &'static TypeDesc) -> Option<&'static TypeDesc> {
    match &desc.kind {
        Kind::Struct(_) => Some(desc),
        Kind::Boxed(b) => nested_struct((b.elem)()),
        Kind::Optional(o) => nested_struct((o.elem)()),
        _ => None,
    }
}

fn push_slot(slots: &mut Vec<Rc<SlotMeta>>, name: &str, doc: &str, kind: SlotKind) -> usize {
    let id = slots.len();
    slots.push(Rc::new(SlotMeta {
        id,
        name: name.to_string(),
        exposed: to_snake_case(name),
        doc: doc.to_string(),
        kind,
    }));
    id
}

impl BridgeContext {
    /// Register `desc` and publish its runtime type as `module.name`.
    ///
    /// Returns the cached handle when `desc` is already registered.
    ///
    /// # Panics
    /// When `desc` is not a struct, when the slot table overflows and when
    /// `name` is already taken in `module`.
    pub(crate) fn register(
        &self,
        desc: &'static TypeDesc,
        module: &Object,
        name: &str,
        doc: &str,
        init: Option<ConstructorDesc>,
    ) -> Object {
        let desc = unboxed(desc);
        if let Some(ty) = self.type_handle(desc) {
            return ty;
        }
        let Some(shape) = desc.as_struct() else {
            panic!("cannot bridge {}: only structs can be registered as types", desc.name);
        };

        let mut slots = Vec::new();
        let init = init.map(|ctor| {
            let ctor = Rc::new(ctor);
            let name = ctor.name;
            let id = push_slot(&mut slots, "__init__", "", SlotKind::Init(ctor));
            log::trace!("{}: constructor {} at slot {}", shape.name, name, id);
            id
        });
        let mut getsets = Vec::with_capacity(shape.fields.len());
        for field in &shape.fields {
            let get = push_slot(&mut slots, field.name, "", SlotKind::Get(field));
            let set = push_slot(&mut slots, field.name, "", SlotKind::Set(field));
            getsets.push(GetSetDef {
                name: to_snake_case(field.name),
                get: field_getter,
                set: Some(field_setter),
                doc: String::new(),
                get_closure: get,
                set_closure: set,
            });
        }
        let method_start = slots.len();
        for method in (shape.methods)() {
            let (name, doc) = (method.name, method.doc);
            push_slot(&mut slots, name, doc, SlotKind::Method(method));
        }
        assert!(
            slots.len() <= MAX_SLOTS,
            "{} needs {} slots, at most {} are available",
            desc.name,
            slots.len(),
            MAX_SLOTS
        );

        let methods = slots[method_start..]
            .iter()
            .map(|meta| MethodDef {
                name: meta.exposed.clone(),
                meth: trampoline(meta.id),
                doc: meta.doc.clone(),
                text_signature: Some(meta.text_signature()),
            })
            .collect();

        let bridged = Rc::new(BridgedType {
            ctx: self.weak(),
            desc,
            name: name.to_string(),
            slots,
            init,
        });

        let mut spec = TypeSpec::new(name);
        spec.doc = doc.to_string();
        spec.methods = methods;
        spec.getsets = getsets;
        spec.init = init.map(|_| init_trampoline as InitFunc);
        spec.alloc = Some(bridge_alloc);
        spec.dealloc = Some(bridge_dealloc);
        spec.context = Some(bridged.clone() as Rc<dyn Any>);
        let ty = Object::new_type(spec);

        self.types.borrow_mut().insert(ty.as_ptr() as usize, bridged);
        self.by_host.borrow_mut().insert(desc.type_id, ty.clone());
        if let Err(err) = module.add_object(name, ty.clone()) {
            panic!("cannot publish type '{name}': {err}");
        }
        log::debug!(
            "registered {} as {}.{}",
            desc.name,
            module.module_name().unwrap_or("?"),
            name
        );

        for field in &shape.fields {
            let Some(nested) = nested_struct((field.ty)()) else {
                continue;
            };
            if self.type_handle(nested).is_some() {
                continue;
            }
            let nested_name = nested.as_struct().map(|s| s.name).unwrap_or(nested.name);
            log::debug!("registering {} for field {}.{}", nested_name, shape.name, field.name);
            self.register(nested, module, nested_name, "", None);
        }
        ty
    }
}
