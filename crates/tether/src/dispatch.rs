//! Dispatch table and trampolines
//!
//! The runtime only accepts plain function pointers as entry points, while
//! the bridge exports an open-ended set of host callables. A fixed table of
//! [`MAX_SLOTS`] monomorphic trampolines bridges the two: trampoline `i`
//! forwards to slot `i` of whatever owns the call (the bridged type of the
//! bound instance, or the slot table of the module).
//!
//! Fields are exported as get/set pairs; their slot id travels in the
//! get/set closure instead of a trampoline.

use std::rc::{Rc, Weak};

use tether_runtime::{CFunction, Exception, ExceptionKind, Object, RtResult};

use crate::codec::{field_ptr, from_dynamic, to_dynamic};
use crate::context::{BridgeContext, BridgedType};
use crate::func::FuncDesc;
use crate::instance::{wrap_alias, wrapper_value};
use crate::kwargs::KwArgs;
use crate::reflect::{FieldDesc, Kind, MethodDesc, OwnedValue, TypeRef};
use crate::synth::ConstructorDesc;

/// Number of trampolines, and so the slot capacity of one type or module
pub const MAX_SLOTS: usize = 256;

// ============================================================================
// Slot metadata
// ============================================================================

pub(crate) enum SlotKind {
    Init(Rc<ConstructorDesc>),
    Get(&'static FieldDesc),
    Set(&'static FieldDesc),
    Method(MethodDesc),
    Function(Rc<FuncDesc>),
}

/// One exported field accessor, method, function or constructor
pub(crate) struct SlotMeta {
    pub(crate) id: usize,
    /// Declared name
    pub(crate) name: String,
    pub(crate) exposed: String,
    pub(crate) doc: String,
    pub(crate) kind: SlotKind,
}

impl SlotMeta {
    /// Positional parameter types, and whether a trailing `KwArgs` collects
    /// keyword arguments
    pub(crate) fn params(&self) -> (&[TypeRef], bool) {
        let all: &[TypeRef] = match &self.kind {
            SlotKind::Init(ctor) => &ctor.params,
            SlotKind::Method(method) => &method.params,
            SlotKind::Function(func) => &func.params,
            SlotKind::Get(_) => &[],
            SlotKind::Set(field) => std::slice::from_ref(&field.ty),
        };
        match all.split_last() {
            Some((last, rest)) if matches!(last().kind, Kind::KwArgs) => (rest, true),
            _ => (all, false),
        }
    }

    /// Value of `__text_signature__`
    pub(crate) fn text_signature(&self) -> String {
        let (params, kwargs) = self.params();
        let mut parts: Vec<String> = (0..params.len()).map(|i| format!("arg{i}")).collect();
        if !parts.is_empty() {
            parts.push("/".to_string());
        }
        if kwargs {
            parts.push("**kwargs".to_string());
        }
        format!("({})", parts.join(", "))
    }
}

/// Slot table of a module, kept in its module state
pub(crate) struct ModuleSlots {
    pub(crate) ctx: Weak<BridgeContext>,
    pub(crate) slots: std::cell::RefCell<Vec<Rc<SlotMeta>>>,
}

/// Context of a function created outside any module slot table
pub(crate) struct AdHocFunction {
    pub(crate) ctx: Weak<BridgeContext>,
    pub(crate) meta: Rc<SlotMeta>,
}

fn released() -> Exception {
    Exception::runtime_error("bridge context has been released")
}

// ============================================================================
// Trampolines
// ============================================================================

fn method_trampoline<const ID: usize>(
    slf: &Object,
    args: &[Object],
    kwargs: Option<&Object>,
) -> RtResult<Object> {
    dispatch(slf, ID, args, kwargs)
}

macro_rules! row {
    ($hi:literal) => {
        [
            method_trampoline::<{ $hi * 16 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 1 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 2 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 3 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 4 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 5 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 6 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 7 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 8 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 9 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 10 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 11 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 12 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 13 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 14 }> as CFunction,
            method_trampoline::<{ $hi * 16 + 15 }> as CFunction,
        ]
    };
}

static TRAMPOLINES: [[CFunction; 16]; 16] = [
    row!(0),
    row!(1),
    row!(2),
    row!(3),
    row!(4),
    row!(5),
    row!(6),
    row!(7),
    row!(8),
    row!(9),
    row!(10),
    row!(11),
    row!(12),
    row!(13),
    row!(14),
    row!(15),
];

/// Entry point forwarding to slot `id`
pub(crate) fn trampoline(id: usize) -> CFunction {
    assert!(id < MAX_SLOTS, "slot {id} is out of range");
    TRAMPOLINES[id / 16][id % 16]
}

/// Entry point of ad hoc functions; the slot comes from the bound capsule
pub(crate) fn context_trampoline(
    slf: &Object,
    args: &[Object],
    kwargs: Option<&Object>,
) -> RtResult<Object> {
    let adhoc = slf
        .capsule_value()
        .and_then(|value| value.downcast::<AdHocFunction>().ok())
        .ok_or_else(|| Exception::runtime_error("function context is missing"))?;
    let ctx = adhoc.ctx.upgrade().ok_or_else(released)?;
    invoke(&ctx, &adhoc.meta, None, args, kwargs)
}

/// Owner of a call: the bridged instance or the module
fn resolve(slf: &Object, id: usize) -> RtResult<(Rc<BridgeContext>, Rc<SlotMeta>, Option<*mut u8>)> {
    if let Some((ptr, bridged)) = wrapper_value(slf) {
        return Ok((bridged.context()?, bridged.slot(id)?, Some(ptr)));
    }
    if let Some(state) = slf.module_state() {
        let table = state
            .downcast::<ModuleSlots>()
            .map_err(|_| Exception::runtime_error("module has no bridge slot table"))?;
        let ctx = table.ctx.upgrade().ok_or_else(released)?;
        let meta = table.slots.borrow().get(id).cloned().ok_or_else(|| {
            Exception::runtime_error(format!("module has no slot {id}"))
        })?;
        return Ok((ctx, meta, None));
    }
    Err(Exception::new(
        ExceptionKind::SystemError,
        format!("'{}' object is not a bridge owner", slf.type_name()),
    ))
}

fn dispatch(slf: &Object, id: usize, args: &[Object], kwargs: Option<&Object>) -> RtResult<Object> {
    let (ctx, meta, receiver) = resolve(slf, id)?;
    log::trace!("dispatch slot {} ({})", id, meta.exposed);
    invoke(&ctx, &meta, receiver, args, kwargs)
}

// ============================================================================
// Invocation
// ============================================================================

/// Check arity and convert the positional (and keyword) arguments of a call
fn convert_args(
    ctx: &BridgeContext,
    meta: &SlotMeta,
    args: &[Object],
    kwargs: Option<&Object>,
) -> RtResult<Vec<OwnedValue>> {
    let (params, takes_kwargs) = meta.params();
    if args.len() != params.len() {
        return Err(Exception::type_error(format!(
            "{} expects {} arguments, got {}",
            meta.exposed,
            params.len(),
            args.len()
        )));
    }
    let kwargs = kwargs.filter(|kw| kw.dict_len() > 0);
    if kwargs.is_some() && !takes_kwargs {
        return Err(Exception::type_error(format!(
            "{} takes no keyword arguments",
            meta.exposed
        )));
    }

    let mut values = Vec::with_capacity(params.len() + usize::from(takes_kwargs));
    for (arg, param) in args.iter().zip(params) {
        let desc = param();
        let value = OwnedValue::zero(desc);
        // SAFETY: `value` holds a live zero value of `desc`.
        unsafe { from_dynamic(ctx, arg, value.as_ptr(), desc) }.map_err(|err| {
            Exception::type_error(format!(
                "failed to convert argument {} to {}: {}",
                arg.repr(),
                desc.name,
                err
            ))
        })?;
        values.push(value);
    }
    if takes_kwargs {
        let dict = kwargs.cloned().unwrap_or_else(Object::dict);
        values.push(OwnedValue::new(KwArgs::new(dict)));
    }
    Ok(values)
}

pub(crate) fn invoke(
    ctx: &BridgeContext,
    meta: &SlotMeta,
    receiver: Option<*mut u8>,
    args: &[Object],
    kwargs: Option<&Object>,
) -> RtResult<Object> {
    let mut values = convert_args(ctx, meta, args, kwargs)?;
    let result = match &meta.kind {
        SlotKind::Method(method) => {
            let this = receiver.ok_or_else(|| {
                Exception::type_error(format!("{} needs a receiver", meta.exposed))
            })?;
            // SAFETY: `this` is the live value of the calling wrapper.
            unsafe { (method.call)(this, &mut values) }
        }
        SlotKind::Function(func) => (func.call)(&mut values),
        _ => {
            return Err(Exception::runtime_error(format!(
                "slot {} ({}) is not callable",
                meta.id, meta.name
            )))
        }
    };
    // SAFETY: `result` holds a live value of its own descriptor.
    unsafe { to_dynamic(ctx, result.as_ptr(), result.desc()) }
}

/// `__init__` of bridged types
pub(crate) fn init_trampoline(slf: &Object, args: &[Object], kwargs: Option<&Object>) -> RtResult<()> {
    let (ptr, bridged) = wrapper_value(slf)
        .ok_or_else(|| Exception::runtime_error("instance is not a bridged wrapper"))?;
    let ctx = bridged.context()?;
    let id = bridged
        .init
        .ok_or_else(|| Exception::type_error(format!("{}() takes no arguments", bridged.name)))?;
    let meta = bridged.slot(id)?;
    let SlotKind::Init(ctor) = &meta.kind else {
        return Err(Exception::runtime_error(format!("slot {id} is not a constructor")));
    };
    let mut values = convert_args(&ctx, &meta, args, kwargs)?;
    (ctor.call)(ptr, &mut values);
    Ok(())
}

// ============================================================================
// Field accessors
// ============================================================================

fn field_slot(slf: &Object, id: usize) -> RtResult<(Rc<BridgeContext>, Rc<BridgedType>, Rc<SlotMeta>, *mut u8)> {
    let (ptr, bridged) = wrapper_value(slf)
        .ok_or_else(|| Exception::runtime_error("instance is not a bridged wrapper"))?;
    let ctx = bridged.context()?;
    let meta = bridged.slot(id)?;
    Ok((ctx, bridged, meta, ptr))
}

/// Read a field. Registered struct fields come back as wrappers aliasing the
/// parent value; everything else is converted by copy.
pub(crate) fn field_getter(slf: &Object, id: usize) -> RtResult<Object> {
    let (ctx, _, meta, base) = field_slot(slf, id)?;
    let SlotKind::Get(field) = &meta.kind else {
        return Err(Exception::runtime_error(format!("slot {id} is not a getter")));
    };
    let desc = (field.ty)();
    // SAFETY: `base` is the live struct value of the wrapper.
    let ptr = unsafe { field_ptr(base, field.offset) };
    if let Kind::Struct(_) = desc.kind {
        if let Some(ty) = ctx.type_handle(desc) {
            return wrap_alias(&ctx, &ty, ptr, slf);
        }
    }
    // SAFETY: the field holds a live value of `desc`.
    unsafe { to_dynamic(&ctx, ptr.as_ptr(), desc) }
}

/// Write a field. The field is left untouched when conversion fails.
pub(crate) fn field_setter(slf: &Object, value: &Object, id: usize) -> RtResult<()> {
    let (ctx, bridged, meta, base) = field_slot(slf, id)?;
    let SlotKind::Set(field) = &meta.kind else {
        return Err(Exception::runtime_error(format!("slot {id} is not a setter")));
    };
    let desc = (field.ty)();
    // SAFETY: `base` is the live struct value of the wrapper.
    let ptr = unsafe { field_ptr(base, field.offset) };
    // SAFETY: the field holds a live value of `desc`.
    unsafe { from_dynamic(&ctx, value, ptr.as_ptr(), desc) }.map_err(|err| {
        Exception::type_error(format!(
            "failed to convert value to {} for {}.{}: {}",
            desc.name, bridged.name, meta.exposed, err
        ))
    })
}
