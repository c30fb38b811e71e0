//! Host-facing bridge API

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tether_runtime::{Exception, Interpreter, MethodDef, Object, RtResult};

use crate::codec;
use crate::context::BridgeContext;
use crate::dispatch::{context_trampoline, trampoline, AdHocFunction, ModuleSlots, SlotKind, SlotMeta, MAX_SLOTS};
use crate::error::{BridgeError, ConversionError};
use crate::func::HostFn;
use crate::instance::wrapper_value;
use crate::name::derive_exposed;
use crate::reflect::{OwnedValue, Reflect};
use crate::synth::Constructor;

/// Exports host functions and struct types into an interpreter.
///
/// Every `Bridge` created for the same interpreter shares one registry; it
/// is torn down when the interpreter finalizes.
///
/// ```ignore
/// #[derive(Reflect, Default, Clone)]
/// #[reflect(methods)]
/// pub struct Point { pub x: i64, pub y: i64 }
///
/// let bridge = Bridge::new(&interp);
/// let geometry = bridge.create_module("geometry", "")?;
/// bridge.register_type_with_init::<Point, _>(&geometry, "Point", Point::init, "A point");
/// ```
pub struct Bridge {
    interp: Interpreter,
    ctx: Rc<BridgeContext>,
}

impl Bridge {
    /// Attach to `interp`, creating its registry on first use
    pub fn new(interp: &Interpreter) -> Bridge {
        let ctx = match interp.extension::<BridgeContext>() {
            Some(ctx) => ctx,
            None => {
                let ctx = BridgeContext::new();
                interp.set_extension(ctx.clone());
                let weak = Rc::downgrade(&ctx);
                interp.on_finalize(move || {
                    if let Some(ctx) = weak.upgrade() {
                        ctx.clear();
                    }
                });
                log::debug!("bridge context installed");
                ctx
            }
        };
        Bridge {
            interp: interp.clone(),
            ctx,
        }
    }

    /// The interpreter this bridge exports into
    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    /// The `__main__` module
    pub fn main_module(&self) -> Object {
        self.interp.main_module()
    }

    /// Create and register a module
    pub fn create_module(&self, name: &str, doc: &str) -> RtResult<Object> {
        let module = Object::new_module(name, doc);
        self.interp.add_module(&module)?;
        self.module_slots(&module)?;
        log::debug!("created module '{name}'");
        Ok(module)
    }

    /// Export `T` as `module.name`, constructed from its zero value.
    ///
    /// Idempotent: registering the same type again returns the first handle.
    ///
    /// # Panics
    /// When `T` is not a struct or `name` is taken in `module`.
    pub fn register_type<T: Reflect>(&self, module: &Object, name: &str, doc: &str) -> Object {
        self.ctx.register(T::type_desc(), module, name, doc, None)
    }

    /// Export `T` as `module.name` with a constructor.
    ///
    /// # Panics
    /// As [`Bridge::register_type`], and when `init` is a factory that does
    /// not return `T` or `Box<T>`.
    pub fn register_type_with_init<T: Reflect, M>(
        &self,
        module: &Object,
        name: &str,
        init: impl Constructor<T, M>,
        doc: &str,
    ) -> Object {
        if let Some(ty) = self.ctx.type_handle(T::type_desc()) {
            return ty;
        }
        self.ctx
            .register(T::type_desc(), module, name, doc, Some(init.into_constructor()))
    }

    /// Export `f` as `module.name`. An empty name derives one from the
    /// function's declared name.
    ///
    /// # Panics
    /// When the name is taken or the module's slot table is full.
    pub fn register_function<M>(
        &self,
        module: &Object,
        name: &str,
        f: impl HostFn<M>,
        doc: &str,
    ) -> Object {
        let table = self
            .module_slots(module)
            .unwrap_or_else(|err| panic!("cannot export into {}: {err}", module.repr()));
        let desc = f.into_desc();
        let declared = if name.is_empty() { desc.name } else { name };
        let exposed = derive_exposed(name, desc.name, |n| module.module_get(n).is_some());
        let ret = (desc.ret)().name;
        let id = table.slots.borrow().len();
        assert!(id < MAX_SLOTS, "{} has no free function slot", module.repr());
        let meta = Rc::new(SlotMeta {
            id,
            name: declared.to_string(),
            exposed,
            doc: doc.to_string(),
            kind: SlotKind::Function(Rc::new(desc)),
        });

        let def = MethodDef {
            name: meta.exposed.clone(),
            meth: trampoline(id),
            doc: meta.doc.clone(),
            text_signature: Some(meta.text_signature()),
        };
        let func = module
            .add_function(def)
            .unwrap_or_else(|err| panic!("cannot publish function '{}': {err}", meta.exposed));
        table.slots.borrow_mut().push(meta.clone());
        log::debug!(
            "registered function {}.{} -> {} at slot {}",
            module.module_name().unwrap_or("?"),
            meta.exposed,
            ret,
            id
        );
        func
    }

    /// Export `f` as an ad hoc callable published into `__main__`. Its slot
    /// travels with the function instead of living in a module table.
    ///
    /// # Panics
    /// When the name is already taken in `__main__`.
    pub fn create_function<M>(&self, name: &str, f: impl HostFn<M>, doc: &str) -> Object {
        let desc = f.into_desc();
        let declared = if name.is_empty() { desc.name } else { name };
        let main = self.main_module();
        let exposed = derive_exposed(name, desc.name, |n| main.module_get(n).is_some());
        let meta = Rc::new(SlotMeta {
            id: 0,
            name: declared.to_string(),
            exposed,
            doc: doc.to_string(),
            kind: SlotKind::Function(Rc::new(desc)),
        });
        let def = MethodDef {
            name: meta.exposed.clone(),
            meth: context_trampoline,
            doc: meta.doc.clone(),
            text_signature: Some(meta.text_signature()),
        };
        let exposed = meta.exposed.clone();
        let context = Object::capsule(
            exposed.clone(),
            Rc::new(AdHocFunction {
                ctx: self.ctx.weak(),
                meta,
            }),
        );
        let func = Object::new_function(def, &context);
        if let Err(err) = main.add_object(&exposed, func.clone()) {
            panic!("cannot publish function '{exposed}': {err}");
        }
        log::debug!("created function {exposed}");
        func
    }

    /// Runtime type registered for `T`
    pub fn type_of<T: Reflect>(&self) -> Option<Object> {
        self.ctx.type_handle(T::type_desc())
    }

    /// Whether `ty` is a type registered through this bridge's registry
    pub fn is_bridged(&self, ty: &Object) -> bool {
        self.ctx.bridged(ty).is_some()
    }

    /// Convert a host value to a runtime object
    pub fn to_dynamic<T: Reflect>(&self, value: &T) -> RtResult<Object> {
        // SAFETY: `value` is a live `T`.
        unsafe { codec::to_dynamic(&self.ctx, value as *const T as *const u8, T::type_desc()) }
    }

    /// Convert a runtime object to a host value
    pub fn from_dynamic<T: Reflect>(&self, obj: &Object) -> Result<T, ConversionError> {
        let desc = T::type_desc();
        let out = OwnedValue::zero(desc);
        // SAFETY: `out` holds a live zero value of `desc`.
        unsafe { codec::from_dynamic(&self.ctx, obj, out.as_ptr(), desc)? };
        Ok(out.into_inner())
    }

    /// Call a runtime callable and convert its result
    pub fn call<R: Reflect>(&self, callable: &Object, args: &[Object]) -> Result<R, BridgeError> {
        let out = callable.call(args)?;
        Ok(self.from_dynamic(&out)?)
    }

    /// Run `f` on the host value behind a wrapper of `T`, in place
    pub fn with_value<T: Reflect, R>(&self, obj: &Object, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let (ptr, bridged) = wrapper_value(obj)?;
        if !self.ctx.owns(&bridged) || !bridged.desc.is::<T>() {
            return None;
        }
        // SAFETY: the wrapper holds a live `T` and nothing else borrows it here.
        Some(f(unsafe { &mut *(ptr as *mut T) }))
    }

    /// Number of wrappers currently keeping a host value alive
    pub fn live_instances(&self) -> usize {
        self.ctx.live_instances()
    }

    fn module_slots(&self, module: &Object) -> RtResult<Rc<ModuleSlots>> {
        if let Some(state) = module.module_state() {
            return state.downcast::<ModuleSlots>().map_err(|_| {
                Exception::runtime_error("module state belongs to another extension")
            });
        }
        let table = Rc::new(ModuleSlots {
            ctx: self.ctx.weak(),
            slots: RefCell::new(Vec::new()),
        });
        module.set_module_state(table.clone() as Rc<dyn Any>)?;
        Ok(table)
    }
}
