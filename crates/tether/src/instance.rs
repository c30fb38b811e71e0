//! Instance bridge
//!
//! A bridged instance is a runtime object whose state points at an
//! [`InstanceHolder`]. Holders sit on an intrusive doubly linked list owned by
//! the [`BridgeContext`]; a holder is linked exactly while its wrapper is
//! alive, which is what keeps the host value reachable from the runtime side.
//!
//! ```text
//!   head ──▶ [holder c] ◀──▶ [holder b] ◀──▶ [holder a] ──▶ null
//!                ▲               ▲               ▲
//!            wrapper c       wrapper b       wrapper a
//! ```
//!
//! Allocation pushes to the front; deallocation unlinks in O(1). Everything
//! runs on the interpreter thread, so the list is not synchronized.

use std::any::Any;
use std::ptr::{self, NonNull};
use std::rc::{Rc, Weak};

use tether_runtime::{generic_alloc, Exception, Object, RtResult};

use crate::context::{bridged_type, BridgeContext, BridgedType};
use crate::reflect::{OwnedValue, TypeDesc};

/// Storage of the host value behind a wrapper
pub(crate) enum HeldValue {
    /// The wrapper owns its value
    Owned(OwnedValue),
    /// The value lives inside another wrapper's value. The anchor is only
    /// held so that wrapper outlives this one.
    Borrowed { ptr: NonNull<u8>, _anchor: Object },
}

impl HeldValue {
    fn as_ptr(&self) -> *mut u8 {
        match self {
            HeldValue::Owned(value) => value.as_ptr(),
            HeldValue::Borrowed { ptr, .. } => ptr.as_ptr(),
        }
    }
}

pub(crate) struct InstanceHolder {
    value: HeldValue,
    prev: *mut InstanceHolder,
    next: *mut InstanceHolder,
    linked: bool,
}

impl InstanceHolder {
    pub(crate) fn value_ptr(&self) -> *mut u8 {
        self.value.as_ptr()
    }
}

// ============================================================================
// Holder list
// ============================================================================

pub(crate) struct HolderList {
    head: *mut InstanceHolder,
    len: usize,
}

impl HolderList {
    pub(crate) fn new() -> Self {
        Self {
            head: ptr::null_mut(),
            len: 0,
        }
    }

    pub(crate) fn push_front(&mut self, holder: NonNull<InstanceHolder>) {
        let h = holder.as_ptr();
        // SAFETY: `holder` is a live allocation not on any list; `head` is
        // null or a live linked holder.
        unsafe {
            (*h).prev = ptr::null_mut();
            (*h).next = self.head;
            if !self.head.is_null() {
                (*self.head).prev = h;
            }
            (*h).linked = true;
        }
        self.head = h;
        self.len += 1;
    }

    /// Remove `holder` from the list. Detached holders are left alone.
    ///
    /// # Safety
    /// `holder` must be live and either on this list or detached.
    pub(crate) unsafe fn unlink(&mut self, holder: NonNull<InstanceHolder>) {
        let h = holder.as_ptr();
        if !(*h).linked {
            return;
        }
        let (prev, next) = ((*h).prev, (*h).next);
        if prev.is_null() {
            self.head = next;
        } else {
            (*prev).next = next;
        }
        if !next.is_null() {
            (*next).prev = prev;
        }
        (*h).prev = ptr::null_mut();
        (*h).next = ptr::null_mut();
        (*h).linked = false;
        self.len -= 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> HolderIter<'_> {
        HolderIter {
            cur: self.head,
            _list: self,
        }
    }

    /// Forget every holder without freeing it. Wrappers still free their own
    /// holder when they are released.
    pub(crate) fn detach_all(&mut self) {
        let mut cur = self.head;
        while !cur.is_null() {
            // SAFETY: linked holders are live.
            unsafe {
                let next = (*cur).next;
                (*cur).prev = ptr::null_mut();
                (*cur).next = ptr::null_mut();
                (*cur).linked = false;
                cur = next;
            }
        }
        self.head = ptr::null_mut();
        self.len = 0;
    }
}

impl Drop for HolderList {
    fn drop(&mut self) {
        self.detach_all();
    }
}

pub(crate) struct HolderIter<'a> {
    cur: *mut InstanceHolder,
    _list: &'a HolderList,
}

impl<'a> Iterator for HolderIter<'a> {
    type Item = &'a InstanceHolder;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur.is_null() {
            return None;
        }
        // SAFETY: linked holders stay live while the list is borrowed.
        let holder = unsafe { &*self.cur };
        self.cur = holder.next;
        Some(holder)
    }
}

// ============================================================================
// Wrappers
// ============================================================================

/// Instance state of a wrapper: the back-reference to its holder
pub(crate) struct WrapperState {
    holder: NonNull<InstanceHolder>,
    ctx: Weak<BridgeContext>,
}

fn attach(obj: &Object, ctx: &BridgeContext, value: HeldValue) -> RtResult<()> {
    let holder = NonNull::from(Box::leak(Box::new(InstanceHolder {
        value,
        prev: ptr::null_mut(),
        next: ptr::null_mut(),
        linked: false,
    })));
    ctx.holders.borrow_mut().push_front(holder);
    let state = WrapperState {
        holder,
        ctx: ctx.weak(),
    };
    if let Err(err) = obj.set_instance_state(Box::new(state)) {
        // SAFETY: pushed above and never shared.
        let holder = unsafe {
            ctx.holders.borrow_mut().unlink(holder);
            Box::from_raw(holder.as_ptr())
        };
        drop(holder);
        return Err(err);
    }
    log::trace!("allocated '{}' instance", obj.type_name());
    Ok(())
}

/// Allocation hook of bridged types: a wrapper around the zero value
pub(crate) fn bridge_alloc(ty: &Object) -> RtResult<Object> {
    let bridged = bridged_type(ty)
        .ok_or_else(|| Exception::runtime_error("type is not a bridged type"))?;
    let ctx = bridged.context()?;
    let obj = generic_alloc(ty)?;
    attach(&obj, &ctx, HeldValue::Owned(OwnedValue::zero(bridged.desc)))?;
    Ok(obj)
}

/// Deallocation hook of bridged types: unlink and release the holder
pub(crate) fn bridge_dealloc(ty: &Object, state: Option<Box<dyn Any>>) {
    let Some(state) = state else {
        return;
    };
    let Ok(state) = state.downcast::<WrapperState>() else {
        log::warn!("'{}' instance carries foreign state", ty.repr());
        return;
    };
    if let Some(ctx) = state.ctx.upgrade() {
        // SAFETY: the holder belongs to this wrapper and is still allocated.
        unsafe { ctx.holders.borrow_mut().unlink(state.holder) };
    }
    // SAFETY: allocated by `attach`; only this wrapper frees it.
    let holder = unsafe { Box::from_raw(state.holder.as_ptr()) };
    log::trace!("released instance of {}", ty.repr());
    // Dropping the value may release other wrappers; the list is not borrowed here.
    drop(holder);
}

/// New wrapper of type `ty` holding a copy of the value behind `src`
///
/// # Safety
/// `src` must point to a live value described by `desc`.
pub(crate) unsafe fn wrap_copy(
    ctx: &BridgeContext,
    ty: &Object,
    desc: &'static TypeDesc,
    src: *const u8,
) -> RtResult<Object> {
    let obj = generic_alloc(ty)?;
    attach(&obj, ctx, HeldValue::Owned(OwnedValue::clone_from(desc, src)))?;
    Ok(obj)
}

/// New wrapper of type `ty` aliasing the value at `ptr`, which lives inside
/// the value of `anchor`
pub(crate) fn wrap_alias(
    ctx: &BridgeContext,
    ty: &Object,
    ptr: NonNull<u8>,
    anchor: &Object,
) -> RtResult<Object> {
    let obj = generic_alloc(ty)?;
    attach(
        &obj,
        ctx,
        HeldValue::Borrowed {
            ptr,
            _anchor: anchor.clone(),
        },
    )?;
    Ok(obj)
}

/// Host value behind a wrapper, with its bridged type
pub(crate) fn wrapper_value(obj: &Object) -> Option<(*mut u8, Rc<BridgedType>)> {
    let state = obj.instance_state()?.downcast_ref::<WrapperState>()?;
    let bridged = bridged_type(&obj.get_type()?)?;
    // SAFETY: a wrapper's holder lives as long as the wrapper.
    let ptr = unsafe { state.holder.as_ref().value_ptr() };
    Some((ptr, bridged))
}
