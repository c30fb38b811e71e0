//! Bridge context: the registry of bridged types and live instances
//!
//! One context exists per interpreter. It is created on first use, installed
//! as an interpreter extension and cleared wholesale when the interpreter
//! finalizes.

use std::any::TypeId;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tether_runtime::{Exception, Object, RtResult};

use crate::dispatch::SlotMeta;
use crate::instance::HolderList;
use crate::reflect::TypeDesc;

/// Registration record connecting a host struct to its runtime type
pub(crate) struct BridgedType {
    pub(crate) ctx: Weak<BridgeContext>,
    pub(crate) desc: &'static TypeDesc,
    pub(crate) name: String,
    /// Indexed by slot id
    pub(crate) slots: Vec<Rc<SlotMeta>>,
    pub(crate) init: Option<usize>,
}

impl BridgedType {
    pub(crate) fn context(&self) -> RtResult<Rc<BridgeContext>> {
        self.ctx
            .upgrade()
            .ok_or_else(|| Exception::runtime_error("bridge context has been released"))
    }

    pub(crate) fn slot(&self, id: usize) -> RtResult<Rc<SlotMeta>> {
        self.slots.get(id).cloned().ok_or_else(|| {
            Exception::runtime_error(format!("'{}' has no slot {}", self.name, id))
        })
    }
}

/// Bridged type behind a runtime type object
pub(crate) fn bridged_type(ty: &Object) -> Option<Rc<BridgedType>> {
    ty.type_context()?.downcast::<BridgedType>().ok()
}

pub(crate) struct BridgeContext {
    me: Weak<BridgeContext>,
    /// Runtime type address to bridged type
    pub(crate) types: RefCell<FxHashMap<usize, Rc<BridgedType>>>,
    /// Host type to runtime type handle
    pub(crate) by_host: RefCell<FxHashMap<TypeId, Object>>,
    pub(crate) holders: RefCell<HolderList>,
}

impl BridgeContext {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new_cyclic(|me| BridgeContext {
            me: me.clone(),
            types: RefCell::new(FxHashMap::default()),
            by_host: RefCell::new(FxHashMap::default()),
            holders: RefCell::new(HolderList::new()),
        })
    }

    pub(crate) fn weak(&self) -> Weak<BridgeContext> {
        self.me.clone()
    }

    /// Runtime type registered for `desc`
    pub(crate) fn type_handle(&self, desc: &TypeDesc) -> Option<Object> {
        self.by_host.borrow().get(&desc.type_id).cloned()
    }

    /// Whether `bridged` was registered through this context
    pub(crate) fn owns(&self, bridged: &BridgedType) -> bool {
        Weak::ptr_eq(&bridged.ctx, &self.me)
    }

    pub(crate) fn bridged(&self, ty: &Object) -> Option<Rc<BridgedType>> {
        self.types.borrow().get(&(ty.as_ptr() as usize)).cloned()
    }

    pub(crate) fn live_instances(&self) -> usize {
        let holders = self.holders.borrow();
        debug_assert_eq!(holders.iter().count(), holders.len());
        holders.len()
    }

    /// Drop every registration and forget the live holders
    pub(crate) fn clear(&self) {
        let types = std::mem::take(&mut *self.types.borrow_mut());
        let handles = std::mem::take(&mut *self.by_host.borrow_mut());
        self.holders.borrow_mut().detach_all();
        log::debug!("bridge context cleared ({} types)", types.len());
        drop(handles);
        drop(types);
    }
}
