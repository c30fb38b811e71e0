//! Interpreter lifecycle
//!
//! An [`Interpreter`] is bound to the thread that initialized it. It owns the
//! `__main__` module, the module registry, typed extension slots for native
//! bridges and the deferred release queue.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::decref::{DecRefQueue, DetachedObject, DEFAULT_DECREF_BATCH};
use crate::error::{Exception, InitError, RtResult};
use crate::object::Object;

/// Interpreter configuration
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Name reported by `__main__.__doc__`
    pub program_name: String,
    /// Variables that must be present in the process environment
    pub required_env: Vec<String>,
    /// Queued releases that trigger a drain on the next call
    pub decref_batch: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            program_name: "tether".to_string(),
            required_env: Vec::new(),
            decref_batch: DEFAULT_DECREF_BATCH,
        }
    }
}

type FinalizeHook = Box<dyn FnOnce()>;

pub(crate) struct InterpreterState {
    main: Object,
    modules: RefCell<FxHashMap<String, Object>>,
    extensions: RefCell<FxHashMap<TypeId, Rc<dyn Any>>>,
    finalizers: RefCell<Vec<FinalizeHook>>,
    queue: Arc<DecRefQueue>,
    finalized: Cell<bool>,
}

thread_local! {
    static CURRENT: RefCell<Weak<InterpreterState>> = RefCell::new(Weak::new());
}

/// Drain the deferred release queue of the current thread's interpreter once
/// it has reached its batch size
pub(crate) fn release_pending_if_needed() {
    let state = CURRENT.try_with(|c| c.borrow().upgrade()).ok().flatten();
    if let Some(state) = state {
        if state.queue.needs_flush() {
            state.queue.flush();
        }
    }
}

/// Handle to the interpreter bound to the current thread
#[derive(Clone)]
pub struct Interpreter {
    state: Rc<InterpreterState>,
}

impl Interpreter {
    /// Bind a new interpreter to the calling thread
    pub fn initialize(config: InterpreterConfig) -> Result<Interpreter, InitError> {
        if CURRENT.with(|c| c.borrow().upgrade().is_some()) {
            return Err(InitError::AlreadyInitialized);
        }
        if let Some(missing) = config
            .required_env
            .iter()
            .find(|key| std::env::var_os(key.as_str()).is_none())
        {
            return Err(InitError::MissingEnv(missing.clone()));
        }

        let main = Object::new_module("__main__", config.program_name.clone());
        let mut modules = FxHashMap::default();
        modules.insert("__main__".to_string(), main.clone());

        let state = Rc::new(InterpreterState {
            main,
            modules: RefCell::new(modules),
            extensions: RefCell::new(FxHashMap::default()),
            finalizers: RefCell::new(Vec::new()),
            queue: Arc::new(DecRefQueue::new(config.decref_batch)),
            finalized: Cell::new(false),
        });
        CURRENT.with(|c| *c.borrow_mut() = Rc::downgrade(&state));
        log::debug!("interpreter '{}' initialized", config.program_name);
        Ok(Interpreter { state })
    }

    /// The interpreter bound to the current thread, if any
    pub fn current() -> Option<Interpreter> {
        CURRENT
            .with(|c| c.borrow().upgrade())
            .map(|state| Interpreter { state })
    }

    /// The `__main__` module
    pub fn main_module(&self) -> Object {
        self.state.main.clone()
    }

    /// Register a module under its own name
    pub fn add_module(&self, module: &Object) -> RtResult<()> {
        let name = module
            .module_name()
            .ok_or_else(|| Exception::type_error("expected module"))?
            .to_string();
        let mut modules = self.state.modules.borrow_mut();
        if modules.contains_key(&name) {
            return Err(Exception::value_error(format!(
                "module '{name}' is already registered"
            )));
        }
        modules.insert(name, module.clone());
        Ok(())
    }

    /// Look a registered module up
    pub fn import(&self, name: &str) -> RtResult<Object> {
        self.state
            .modules
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| {
                Exception::new(
                    crate::ExceptionKind::ImportError,
                    format!("no module named '{name}'"),
                )
            })
    }

    /// Install extension data keyed by its type
    pub fn set_extension<T: Any>(&self, value: Rc<T>) {
        self.state
            .extensions
            .borrow_mut()
            .insert(TypeId::of::<T>(), value);
    }

    /// Extension data previously installed with [`Interpreter::set_extension`]
    pub fn extension<T: Any>(&self) -> Option<Rc<T>> {
        let value = self
            .state
            .extensions
            .borrow()
            .get(&TypeId::of::<T>())
            .cloned()?;
        value.downcast::<T>().ok()
    }

    /// Run `hook` during finalization, after modules are cleared
    pub fn on_finalize(&self, hook: impl FnOnce() + 'static) {
        self.state.finalizers.borrow_mut().push(Box::new(hook));
    }

    /// Hand a reference to another thread
    pub fn detach(&self, obj: Object) -> DetachedObject {
        self.state.queue.detach(obj)
    }

    /// Release every queued reference now
    pub fn flush_decrefs(&self) -> usize {
        self.state.queue.flush()
    }

    /// Number of queued releases
    pub fn pending_decrefs(&self) -> usize {
        self.state.queue.len()
    }

    /// Whether [`Interpreter::finalize`] has run
    pub fn is_finalized(&self) -> bool {
        self.state.finalized.get()
    }

    /// Tear the interpreter down. Later calls are no-ops.
    pub fn finalize(&self) {
        self.state.finalize();
    }
}

impl InterpreterState {
    fn finalize(&self) {
        if self.finalized.replace(true) {
            return;
        }
        self.queue.finish();

        let modules: Vec<Object> = self.modules.borrow_mut().drain().map(|(_, m)| m).collect();
        for module in &modules {
            module.clear_module();
        }
        self.main.clear_module();
        drop(modules);

        let hooks = std::mem::take(&mut *self.finalizers.borrow_mut());
        for hook in hooks {
            hook();
        }
        let extensions = std::mem::take(&mut *self.extensions.borrow_mut());
        drop(extensions);

        let _ = CURRENT.try_with(|c| *c.borrow_mut() = Weak::new());
        log::debug!("interpreter finalized");
    }
}

impl Drop for InterpreterState {
    fn drop(&mut self) {
        self.finalize();
    }
}
