//! Native function objects and capsules

use std::any::Any;
use std::rc::{Rc, Weak};

use crate::error::{Exception, RtResult};
use crate::object::{Body, Object};
use crate::types::MethodDef;

/// What a function passes as `self` to its entry point
pub(crate) enum Owner {
    Bound(Object),
    /// Module functions keep a weak link so the module dict does not own itself
    Module(Weak<Body>),
}

pub(crate) struct Function {
    pub(crate) def: MethodDef,
    pub(crate) owner: Owner,
}

impl Function {
    pub(crate) fn owner(&self) -> RtResult<Object> {
        match &self.owner {
            Owner::Bound(obj) => Ok(obj.clone()),
            Owner::Module(weak) => weak
                .upgrade()
                .map(Object)
                .ok_or_else(|| Exception::runtime_error("owning module has been released")),
        }
    }

    pub(crate) fn invoke(&self, args: &[Object], kwargs: Option<&Object>) -> RtResult<Object> {
        let slf = self.owner()?;
        (self.def.meth)(&slf, args, kwargs)
    }
}

pub(crate) struct Capsule {
    pub(crate) name: String,
    pub(crate) value: Rc<dyn Any>,
}

impl Object {
    /// Function object whose entry point receives `slf` as `self`
    pub fn new_function(def: MethodDef, slf: &Object) -> Object {
        Object::from_body(Body::Function(Function {
            def,
            owner: Owner::Bound(slf.clone()),
        }))
    }

    pub(crate) fn new_module_function(def: MethodDef, module: &Object) -> Object {
        Object::from_body(Body::Function(Function {
            def,
            owner: Owner::Module(Rc::downgrade(&module.0)),
        }))
    }

    /// Opaque host data wrapped as an object
    pub fn capsule(name: impl Into<String>, value: Rc<dyn Any>) -> Object {
        Object::from_body(Body::Capsule(Capsule {
            name: name.into(),
            value,
        }))
    }

    /// Data held by a capsule
    pub fn capsule_value(&self) -> Option<Rc<dyn Any>> {
        match self.body() {
            Body::Capsule(c) => Some(c.value.clone()),
            _ => None,
        }
    }

    /// The `self` object a function hands to its entry point
    pub fn function_self(&self) -> Option<Object> {
        match self.body() {
            Body::Function(f) => f.owner().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_self(slf: &Object, args: &[Object], _kwargs: Option<&Object>) -> RtResult<Object> {
        let mut items = vec![slf.clone()];
        items.extend_from_slice(args);
        Ok(Object::tuple(items))
    }

    #[test]
    fn test_bound_function_passes_self() {
        let slf = Object::str("me");
        let f = Object::new_function(MethodDef::new("echo", echo_self, ""), &slf);
        let out = f.call(&[Object::int(1)]).unwrap();
        assert_eq!(out, Object::tuple(vec![Object::str("me"), Object::int(1)]));
        assert_eq!(f.getattr("__name__").unwrap(), Object::str("echo"));
    }

    #[test]
    fn test_capsule_roundtrip() {
        let cap = Object::capsule("ctx", Rc::new(5i32));
        let value = cap.capsule_value().unwrap();
        assert_eq!(value.downcast_ref::<i32>(), Some(&5));
        assert!(Object::none().capsule_value().is_none());
    }
}
