//! Attribute and call protocol

use crate::error::{Exception, RtResult};
use crate::function::{Function, Owner};
use crate::interp;
use crate::object::{Body, Object};

impl Object {
    /// `getattr(self, name)`
    pub fn getattr(&self, name: &str) -> RtResult<Object> {
        match self.body() {
            Body::Instance(inst) => {
                let Some(ty) = inst.type_object() else {
                    return Err(Exception::new(
                        crate::ExceptionKind::SystemError,
                        "instance type is not a type object",
                    ));
                };
                if let Some(gs) = ty.find_getset(name) {
                    return (gs.get)(self, gs.get_closure);
                }
                if let Some(def) = ty.find_method(name) {
                    return Ok(Object::from_body(Body::Function(Function {
                        def: def.clone(),
                        owner: Owner::Bound(self.clone()),
                    })));
                }
                if name == "__class__" {
                    return Ok(inst.ty.clone());
                }
            }
            Body::Module(m) => {
                if let Some(value) = m.dict.borrow().get_str(name) {
                    return Ok(value);
                }
                match name {
                    "__name__" => return Ok(Object::str(m.name.clone())),
                    "__doc__" => return Ok(Object::str(m.doc.clone())),
                    _ => {
                        return Err(Exception::attribute_error(format!(
                            "module '{}' has no attribute '{}'",
                            m.name, name
                        )))
                    }
                }
            }
            Body::Type(t) => match name {
                "__name__" => return Ok(Object::str(t.name.clone())),
                "__doc__" => return Ok(Object::str(t.doc.clone())),
                _ => {}
            },
            Body::Function(f) => match name {
                "__name__" => return Ok(Object::str(f.def.name.clone())),
                "__doc__" => return Ok(Object::str(f.def.doc.clone())),
                "__text_signature__" => {
                    return Ok(f
                        .def
                        .text_signature
                        .clone()
                        .map(Object::str)
                        .unwrap_or_else(Object::none))
                }
                "__self__" => return f.owner(),
                _ => {}
            },
            _ => {}
        }
        Err(Exception::attribute_error(format!(
            "'{}' object has no attribute '{}'",
            self.type_name(),
            name
        )))
    }

    /// `hasattr(self, name)`
    pub fn hasattr(&self, name: &str) -> bool {
        self.getattr(name).is_ok()
    }

    /// `setattr(self, name, value)`
    pub fn setattr(&self, name: &str, value: &Object) -> RtResult<()> {
        match self.body() {
            Body::Instance(inst) => {
                if let Some(gs) = inst.type_object().and_then(|t| t.find_getset(name)) {
                    return match gs.set {
                        Some(set) => set(self, value, gs.set_closure),
                        None => Err(Exception::attribute_error(format!(
                            "attribute '{}' of '{}' objects is not writable",
                            name,
                            self.type_name()
                        ))),
                    };
                }
                Err(Exception::attribute_error(format!(
                    "'{}' object has no attribute '{}'",
                    self.type_name(),
                    name
                )))
            }
            Body::Module(m) => {
                let old = m.dict.borrow_mut().set(Object::str(name), value.clone())?;
                drop(old);
                Ok(())
            }
            _ => Err(Exception::attribute_error(format!(
                "'{}' object attribute '{}' is read-only",
                self.type_name(),
                name
            ))),
        }
    }

    /// Call with positional arguments
    pub fn call(&self, args: &[Object]) -> RtResult<Object> {
        self.call_kw(args, None)
    }

    /// Call with positional arguments and an optional keyword dict
    pub fn call_kw(&self, args: &[Object], kwargs: Option<&Object>) -> RtResult<Object> {
        if let Some(kw) = kwargs {
            if !kw.is_dict() {
                return Err(Exception::type_error(format!(
                    "keyword arguments must be a dict, not '{}'",
                    kw.type_name()
                )));
            }
        }
        interp::release_pending_if_needed();
        match self.body() {
            Body::Function(f) => f.invoke(args, kwargs),
            Body::Type(t) => t.construct(self, args, kwargs),
            _ => Err(Exception::type_error(format!(
                "'{}' object is not callable",
                self.type_name()
            ))),
        }
    }

    /// `self.name(*args)`
    pub fn call_method(&self, name: &str, args: &[Object]) -> RtResult<Object> {
        self.getattr(name)?.call(args)
    }
}
