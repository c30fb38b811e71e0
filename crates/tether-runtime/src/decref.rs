//! Deferred reference releases from foreign threads
//!
//! Reference counts may only be touched on the interpreter thread. Other
//! threads hand their references back through a [`DetachedObject`]; dropping
//! one queues the release, and the interpreter thread drains the queue in
//! batches. Once the interpreter has finalized, queued releases are dropped.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::error::{Exception, RtResult};
use crate::object::{Body, Object};

/// Default number of queued releases that triggers a drain
pub const DEFAULT_DECREF_BATCH: usize = 128;

struct PendingRef(*const Body);

// SAFETY: the pointer is only turned back into a reference on the owner thread.
unsafe impl Send for PendingRef {}

pub(crate) struct DecRefQueue {
    pending: Mutex<Vec<PendingRef>>,
    finished: AtomicBool,
    owner: ThreadId,
    batch: usize,
}

impl DecRefQueue {
    pub(crate) fn new(batch: usize) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            finished: AtomicBool::new(false),
            owner: thread::current().id(),
            batch: batch.max(1),
        }
    }

    fn push(&self, obj: PendingRef) -> bool {
        let mut pending = self.pending.lock();
        if self.is_finished() {
            return false;
        }
        pending.push(obj);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub(crate) fn needs_flush(&self) -> bool {
        self.len() >= self.batch
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub(crate) fn mark_finished(&self) {
        let _pending = self.pending.lock();
        self.finished.store(true, Ordering::Release);
    }

    /// Stop accepting releases, then apply the ones already queued.
    pub(crate) fn finish(&self) -> usize {
        self.mark_finished();
        self.flush()
    }

    fn on_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Release everything queued so far. Owner thread only.
    pub(crate) fn flush(&self) -> usize {
        if !self.on_owner_thread() {
            return 0;
        }
        let batch = std::mem::replace(&mut *self.pending.lock(), Vec::with_capacity(self.batch * 2));
        let count = batch.len();
        for obj in batch {
            // SAFETY: produced by `Rc::into_raw` in `DecRefQueue::detach`.
            drop(Object(unsafe { Rc::from_raw(obj.0) }));
        }
        if count > 0 {
            log::trace!("released {count} deferred references");
        }
        count
    }

    pub(crate) fn detach(self: &Arc<Self>, obj: Object) -> DetachedObject {
        DetachedObject {
            raw: Some(PendingRef(Rc::into_raw(obj.0))),
            queue: Arc::clone(self),
        }
    }
}

/// A reference that may cross threads.
///
/// It can only be turned back into an [`Object`] on the interpreter thread.
pub struct DetachedObject {
    raw: Option<PendingRef>,
    queue: Arc<DecRefQueue>,
}

impl DetachedObject {
    /// Reclaim the reference on the interpreter thread
    pub fn attach(mut self) -> RtResult<Object> {
        if !self.queue.on_owner_thread() {
            return Err(Exception::runtime_error(
                "detached object attached outside the interpreter thread",
            ));
        }
        if self.queue.is_finished() {
            return Err(Exception::runtime_error("interpreter has been finalized"));
        }
        match self.raw.take() {
            // SAFETY: produced by `Rc::into_raw` in `DecRefQueue::detach`.
            Some(raw) => Ok(Object(unsafe { Rc::from_raw(raw.0) })),
            None => Err(Exception::runtime_error("detached object already released")),
        }
    }
}

impl Drop for DetachedObject {
    fn drop(&mut self) {
        let Some(raw) = self.raw.take() else {
            return;
        };
        if self.queue.on_owner_thread() && !self.queue.is_finished() {
            // SAFETY: produced by `Rc::into_raw` in `DecRefQueue::detach`.
            drop(Object(unsafe { Rc::from_raw(raw.0) }));
        } else if !self.queue.push(raw) {
            log::warn!("dropping deferred release requested after finalize");
        }
    }
}
