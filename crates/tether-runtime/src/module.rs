//! Module objects

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::dict::Dict;
use crate::error::{Exception, RtResult};
use crate::object::{Body, Object};
use crate::types::MethodDef;

pub(crate) struct Module {
    pub(crate) name: String,
    pub(crate) doc: String,
    pub(crate) dict: RefCell<Dict>,
    pub(crate) state: OnceCell<Rc<dyn Any>>,
}

impl Object {
    /// Create an empty module
    pub fn new_module(name: impl Into<String>, doc: impl Into<String>) -> Object {
        Object::from_body(Body::Module(Module {
            name: name.into(),
            doc: doc.into(),
            dict: RefCell::new(Dict::default()),
            state: OnceCell::new(),
        }))
    }

    fn module(&self) -> RtResult<&Module> {
        match self.body() {
            Body::Module(m) => Ok(m),
            _ => Err(Exception::type_error(format!(
                "expected module, got '{}'",
                self.type_name()
            ))),
        }
    }

    /// Name of a module
    pub fn module_name(&self) -> Option<&str> {
        match self.body() {
            Body::Module(m) => Some(m.name.as_str()),
            _ => None,
        }
    }

    /// Publish `value` under `name`. Fails if the name is already taken.
    pub fn add_object(&self, name: &str, value: Object) -> RtResult<()> {
        let module = self.module()?;
        let mut dict = module.dict.borrow_mut();
        if dict.contains_str(name) {
            return Err(Exception::value_error(format!(
                "module '{}' already defines '{}'",
                module.name, name
            )));
        }
        dict.set(Object::str(name), value)?;
        Ok(())
    }

    /// Publish a native function and return it
    pub fn add_function(&self, def: MethodDef) -> RtResult<Object> {
        self.module()?;
        let name = def.name.clone();
        let func = Object::new_module_function(def, self);
        self.add_object(&name, func.clone())?;
        Ok(func)
    }

    /// Look a global up
    pub fn module_get(&self, name: &str) -> Option<Object> {
        match self.body() {
            Body::Module(m) => m.dict.borrow().get_str(name),
            _ => None,
        }
    }

    /// Names defined by a module, in definition order
    pub fn module_names(&self) -> Vec<String> {
        match self.body() {
            Body::Module(m) => m
                .dict
                .borrow()
                .keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Per-module extension state
    pub fn module_state(&self) -> Option<Rc<dyn Any>> {
        match self.body() {
            Body::Module(m) => m.state.get().cloned(),
            _ => None,
        }
    }

    /// Attach extension state. State is write-once.
    pub fn set_module_state(&self, state: Rc<dyn Any>) -> RtResult<()> {
        self.module()?
            .state
            .set(state)
            .map_err(|_| Exception::runtime_error("module state is already set"))
    }

    /// Drop every global of a module
    pub(crate) fn clear_module(&self) {
        if let Body::Module(m) = self.body() {
            let entries = m.dict.borrow_mut().take_all();
            drop(entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping(_slf: &Object, _args: &[Object], _kwargs: Option<&Object>) -> RtResult<Object> {
        Ok(Object::str("pong"))
    }

    #[test]
    fn test_add_object_rejects_collision() {
        let m = Object::new_module("demo", "");
        m.add_object("answer", Object::int(42)).unwrap();
        let err = m.add_object("answer", Object::int(43)).unwrap_err();
        assert!(err.is(crate::ExceptionKind::ValueError));
        assert_eq!(m.getattr("answer").unwrap(), Object::int(42));
    }

    #[test]
    fn test_module_function_does_not_own_module() {
        let m = Object::new_module("demo", "");
        let f = m.add_function(MethodDef::new("ping", ping, "")).unwrap();
        assert_eq!(m.refcount(), 1);
        assert_eq!(f.call(&[]).unwrap(), Object::str("pong"));

        drop(m);
        let err = f.call(&[]).unwrap_err();
        assert!(err.is(crate::ExceptionKind::RuntimeError));
    }

    #[test]
    fn test_module_state_is_write_once() {
        let m = Object::new_module("demo", "");
        m.set_module_state(Rc::new(1u8)).unwrap();
        assert!(m.set_module_state(Rc::new(2u8)).is_err());
        let state = m.module_state().unwrap();
        assert_eq!(state.downcast_ref::<u8>(), Some(&1));
    }
}
