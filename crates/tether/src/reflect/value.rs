//! Type-erased owned host values

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::{self, NonNull};

use super::{Reflect, TypeDesc};

/// A heap slot holding one live value of the type described by `desc`.
///
/// Arguments are materialized as zero values of the parameter type, filled by
/// the codec and then moved out by the callee. Results travel back the same
/// way.
pub struct OwnedValue {
    desc: &'static TypeDesc,
    ptr: NonNull<u8>,
}

impl OwnedValue {
    fn allocate(desc: &'static TypeDesc) -> NonNull<u8> {
        let layout = desc.layout;
        if layout.size() == 0 {
            return dangling(layout);
        }
        // SAFETY: size is non-zero.
        let raw = unsafe { alloc::alloc(layout) };
        match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        }
    }

    /// The zero value of `desc`
    pub fn zero(desc: &'static TypeDesc) -> Self {
        let ptr = Self::allocate(desc);
        // SAFETY: fresh allocation with the layout of `desc`.
        unsafe { (desc.vtable.write_default)(ptr.as_ptr()) };
        Self { desc, ptr }
    }

    /// Move `value` into a fresh slot
    pub fn new<T: Reflect>(value: T) -> Self {
        let desc = T::type_desc();
        let ptr = Self::allocate(desc);
        // SAFETY: fresh allocation with the layout of `T`.
        unsafe { ptr::write(ptr.as_ptr() as *mut T, value) };
        Self { desc, ptr }
    }

    /// Clone the value behind `src` into a fresh slot
    ///
    /// # Safety
    /// `src` must point to a live value of the type described by `desc`.
    pub unsafe fn clone_from(desc: &'static TypeDesc, src: *const u8) -> Self {
        let ptr = Self::allocate(desc);
        (desc.vtable.clone_to)(src, ptr.as_ptr());
        Self { desc, ptr }
    }

    /// Descriptor of the held value
    pub fn desc(&self) -> &'static TypeDesc {
        self.desc
    }

    /// Pointer to the held value
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Move the value out, leaving its zero value behind
    ///
    /// Panics if `T` is not the held type.
    pub fn take<T: Reflect>(&mut self) -> T {
        assert!(
            self.desc.is::<T>(),
            "value of type {} taken as {}",
            self.desc.name,
            std::any::type_name::<T>()
        );
        // SAFETY: the slot holds a live `T`.
        unsafe { std::mem::take(&mut *(self.ptr.as_ptr() as *mut T)) }
    }

    /// Consume the slot, returning the value
    pub fn into_inner<T: Reflect>(mut self) -> T {
        self.take::<T>()
    }

    /// Swap the held value into `dest`; the previous contents of `dest` are
    /// dropped with `self`.
    ///
    /// # Safety
    /// `dest` must point to a live value of the held type.
    pub unsafe fn replace(self, dest: *mut u8) {
        ptr::swap_nonoverlapping(self.ptr.as_ptr(), dest, self.desc.layout.size());
    }
}

impl Drop for OwnedValue {
    fn drop(&mut self) {
        // SAFETY: the slot always holds a live value of `desc`.
        unsafe {
            (self.desc.vtable.drop_in_place)(self.ptr.as_ptr());
            if self.desc.layout.size() != 0 {
                alloc::dealloc(self.ptr.as_ptr(), self.desc.layout);
            }
        }
    }
}

impl fmt::Debug for OwnedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedValue").field("type", &self.desc.name).finish()
    }
}

fn dangling(layout: Layout) -> NonNull<u8> {
    let raw = ptr::without_provenance_mut::<u8>(layout.align());
    // SAFETY: alignment is never zero.
    unsafe { NonNull::new_unchecked(raw) }
}
