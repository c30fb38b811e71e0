//! Heap type objects and native entry point tables
//!
//! Every native callable the runtime can invoke is a plain function pointer.
//! Extensions that need per-callable state reach it through the `self`
//! object (its type context, its module state or an attached capsule) or
//! through the integer closure carried by a [`GetSetDef`].

use std::any::Any;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::error::{Exception, RtResult};
use crate::object::{Body, Object};

// ============================================================================
// Native entry points
// ============================================================================

/// Native callable: `(self, positional args, keyword dict) -> result`
pub type CFunction = fn(&Object, &[Object], Option<&Object>) -> RtResult<Object>;

/// Attribute getter: `(self, closure) -> value`
pub type Getter = fn(&Object, usize) -> RtResult<Object>;

/// Attribute setter: `(self, value, closure)`
pub type Setter = fn(&Object, &Object, usize) -> RtResult<()>;

/// Instance initializer, run after allocation when a type is called
pub type InitFunc = fn(&Object, &[Object], Option<&Object>) -> RtResult<()>;

/// Instance allocator: `(type) -> fresh instance`
pub type AllocFunc = fn(&Object) -> RtResult<Object>;

/// Instance finalizer, handed the instance state right before release
pub type DeallocFunc = fn(&Object, Option<Box<dyn Any>>);

/// A named native callable
#[derive(Clone)]
pub struct MethodDef {
    /// Attribute name
    pub name: String,
    /// Entry point
    pub meth: CFunction,
    /// Docstring
    pub doc: String,
    /// Value of `__text_signature__`
    pub text_signature: Option<String>,
}

impl MethodDef {
    /// Create a method definition without a text signature
    pub fn new(name: impl Into<String>, meth: CFunction, doc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meth,
            doc: doc.into(),
            text_signature: None,
        }
    }
}

/// A computed attribute
#[derive(Clone)]
pub struct GetSetDef {
    /// Attribute name
    pub name: String,
    /// Read entry point
    pub get: Getter,
    /// Write entry point; `None` makes the attribute read-only
    pub set: Option<Setter>,
    /// Docstring
    pub doc: String,
    /// Closure passed to `get`
    pub get_closure: usize,
    /// Closure passed to `set`
    pub set_closure: usize,
}

// ============================================================================
// Type objects
// ============================================================================

/// Description of a heap type, consumed by [`Object::new_type`]
pub struct TypeSpec {
    /// Type name
    pub name: String,
    /// Docstring
    pub doc: String,
    /// Methods bound on attribute access
    pub methods: Vec<MethodDef>,
    /// Computed attributes
    pub getsets: Vec<GetSetDef>,
    /// Initializer slot
    pub init: Option<InitFunc>,
    /// Allocation slot; defaults to [`generic_alloc`]
    pub alloc: Option<AllocFunc>,
    /// Deallocation slot
    pub dealloc: Option<DeallocFunc>,
    /// Opaque extension data reachable from every instance
    pub context: Option<Rc<dyn Any>>,
}

impl TypeSpec {
    /// Empty spec for a type called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            methods: Vec::new(),
            getsets: Vec::new(),
            init: None,
            alloc: None,
            dealloc: None,
            context: None,
        }
    }
}

pub(crate) struct TypeObject {
    pub(crate) name: String,
    pub(crate) doc: String,
    pub(crate) methods: Vec<MethodDef>,
    pub(crate) getsets: Vec<GetSetDef>,
    pub(crate) init: Option<InitFunc>,
    pub(crate) alloc: Option<AllocFunc>,
    pub(crate) dealloc: Option<DeallocFunc>,
    pub(crate) context: Option<Rc<dyn Any>>,
}

impl TypeObject {
    pub(crate) fn construct(
        &self,
        ty: &Object,
        args: &[Object],
        kwargs: Option<&Object>,
    ) -> RtResult<Object> {
        let alloc = self.alloc.unwrap_or(generic_alloc);
        let obj = alloc(ty)?;
        match self.init {
            Some(init) => init(&obj, args, kwargs)?,
            None => {
                let has_kwargs = kwargs.map(|k| k.dict_len() > 0).unwrap_or(false);
                if !args.is_empty() || has_kwargs {
                    return Err(Exception::type_error(format!(
                        "{}() takes no arguments",
                        self.name
                    )));
                }
            }
        }
        Ok(obj)
    }

    pub(crate) fn find_getset(&self, name: &str) -> Option<&GetSetDef> {
        self.getsets.iter().find(|g| g.name == name)
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Allocate a bare instance of `ty` with no state attached
pub fn generic_alloc(ty: &Object) -> RtResult<Object> {
    match ty.body() {
        Body::Type(_) => Ok(Object::from_body(Body::Instance(Instance {
            ty: ty.clone(),
            state: OnceCell::new(),
        }))),
        _ => Err(Exception::type_error(format!(
            "cannot allocate an instance of '{}'",
            ty.type_name()
        ))),
    }
}

// ============================================================================
// Instances
// ============================================================================

pub(crate) struct Instance {
    pub(crate) ty: Object,
    pub(crate) state: OnceCell<Box<dyn Any>>,
}

impl Instance {
    pub(crate) fn type_object(&self) -> Option<&TypeObject> {
        match self.ty.body() {
            Body::Type(t) => Some(t),
            _ => None,
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        let state = self.state.take();
        if let Some(dealloc) = self.type_object().and_then(|t| t.dealloc) {
            dealloc(&self.ty, state);
        }
    }
}

impl Object {
    /// Create a heap type from `spec`
    pub fn new_type(spec: TypeSpec) -> Object {
        log::debug!("new type '{}'", spec.name);
        Object::from_body(Body::Type(TypeObject {
            name: spec.name,
            doc: spec.doc,
            methods: spec.methods,
            getsets: spec.getsets,
            init: spec.init,
            alloc: spec.alloc,
            dealloc: spec.dealloc,
            context: spec.context,
        }))
    }

    /// Context attached to a heap type
    pub fn type_context(&self) -> Option<Rc<dyn Any>> {
        match self.body() {
            Body::Type(t) => t.context.clone(),
            _ => None,
        }
    }

    /// Type of an instance of a heap type
    pub fn get_type(&self) -> Option<Object> {
        match self.body() {
            Body::Instance(inst) => Some(inst.ty.clone()),
            _ => None,
        }
    }

    /// Whether `self` is an instance of the heap type `ty`
    pub fn is_instance_of(&self, ty: &Object) -> bool {
        match self.body() {
            Body::Instance(inst) => inst.ty.is(ty),
            _ => false,
        }
    }

    /// State attached to an instance by its allocator
    pub fn instance_state(&self) -> Option<&dyn Any> {
        match self.body() {
            Body::Instance(inst) => inst.state.get().map(|b| b.as_ref()),
            _ => None,
        }
    }

    /// Attach state to a freshly allocated instance. State is write-once.
    pub fn set_instance_state(&self, state: Box<dyn Any>) -> RtResult<()> {
        match self.body() {
            Body::Instance(inst) => inst
                .state
                .set(state)
                .map_err(|_| Exception::runtime_error("instance state is already set")),
            _ => Err(Exception::type_error(format!(
                "'{}' object is not an extension instance",
                self.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static RELEASED: Cell<usize> = const { Cell::new(0) };
    }

    fn count_release(_ty: &Object, state: Option<Box<dyn Any>>) {
        if state.is_some() {
            RELEASED.with(|r| r.set(r.get() + 1));
        }
    }

    fn answer(_slf: &Object, _closure: usize) -> RtResult<Object> {
        Ok(Object::int(42))
    }

    #[test]
    fn test_call_type_without_init() {
        let ty = Object::new_type(TypeSpec::new("Plain"));
        let obj = ty.call(&[]).unwrap();
        assert!(obj.is_instance_of(&ty));
        assert_eq!(obj.type_name(), "Plain");

        let err = ty.call(&[Object::int(1)]).unwrap_err();
        assert!(err.is(crate::ExceptionKind::TypeError));
    }

    #[test]
    fn test_dealloc_receives_state() {
        let mut spec = TypeSpec::new("Tracked");
        spec.dealloc = Some(count_release);
        let ty = Object::new_type(spec);

        let obj = ty.call(&[]).unwrap();
        obj.set_instance_state(Box::new(7u32)).unwrap();
        assert!(obj.set_instance_state(Box::new(8u32)).is_err());
        assert_eq!(obj.instance_state().and_then(|s| s.downcast_ref::<u32>()), Some(&7));

        let before = RELEASED.with(|r| r.get());
        drop(obj);
        assert_eq!(RELEASED.with(|r| r.get()), before + 1);
    }

    #[test]
    fn test_getset_lookup() {
        let mut spec = TypeSpec::new("Answer");
        spec.getsets.push(GetSetDef {
            name: "value".to_string(),
            get: answer,
            set: None,
            doc: String::new(),
            get_closure: 0,
            set_closure: 0,
        });
        let ty = Object::new_type(spec);
        let obj = ty.call(&[]).unwrap();
        assert_eq!(obj.getattr("value").unwrap(), Object::int(42));

        let err = obj.setattr("value", &Object::int(1)).unwrap_err();
        assert!(err.is(crate::ExceptionKind::AttributeError));
    }
}
