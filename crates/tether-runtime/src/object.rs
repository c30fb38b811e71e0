//! Reference-counted object handles

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_complex::Complex64;

use crate::dict::Dict;
use crate::error::{Exception, RtResult};
use crate::function::{Capsule, Function};
use crate::module::Module;
use crate::types::{Instance, TypeObject};

// ============================================================================
// Object
// ============================================================================

/// Owned reference to a runtime object.
///
/// Cloning takes a new reference and dropping releases one. Handles are
/// confined to the thread that owns the interpreter; use
/// [`crate::Interpreter::detach`] to move a reference across threads.
#[derive(Clone)]
pub struct Object(pub(crate) Rc<Body>);

pub(crate) enum Body {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Complex(Complex64),
    Str(String),
    Bytes(Vec<u8>),
    List(RefCell<Vec<Object>>),
    Tuple(Vec<Object>),
    Dict(RefCell<Dict>),
    Module(Module),
    Function(Function),
    Type(TypeObject),
    Capsule(Capsule),
    Instance(Instance),
}

thread_local! {
    static NONE: Object = Object(Rc::new(Body::None));
    static TRUE: Object = Object(Rc::new(Body::Bool(true)));
    static FALSE: Object = Object(Rc::new(Body::Bool(false)));
}

impl Object {
    pub(crate) fn from_body(body: Body) -> Object {
        Object(Rc::new(body))
    }

    pub(crate) fn body(&self) -> &Body {
        &self.0
    }

    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    /// The `None` singleton
    pub fn none() -> Object {
        NONE.with(Object::clone)
    }

    /// One of the two boolean singletons
    pub fn bool(value: bool) -> Object {
        if value {
            TRUE.with(Object::clone)
        } else {
            FALSE.with(Object::clone)
        }
    }

    /// Integer object
    pub fn int(value: impl Into<i128>) -> Object {
        Object::from_body(Body::Int(value.into()))
    }

    /// Float object
    pub fn float(value: f64) -> Object {
        Object::from_body(Body::Float(value))
    }

    /// Complex object
    pub fn complex(value: Complex64) -> Object {
        Object::from_body(Body::Complex(value))
    }

    /// String object
    pub fn str(value: impl Into<String>) -> Object {
        Object::from_body(Body::Str(value.into()))
    }

    /// Bytes object
    pub fn bytes(value: impl Into<Vec<u8>>) -> Object {
        Object::from_body(Body::Bytes(value.into()))
    }

    /// List object
    pub fn list(items: Vec<Object>) -> Object {
        Object::from_body(Body::List(RefCell::new(items)))
    }

    /// Tuple object
    pub fn tuple(items: Vec<Object>) -> Object {
        Object::from_body(Body::Tuple(items))
    }

    /// Empty dict
    pub fn dict() -> Object {
        Object::from_body(Body::Dict(RefCell::new(Dict::default())))
    }

    /// Dict built from key/value pairs, later keys overwriting earlier ones
    pub fn dict_from(pairs: Vec<(Object, Object)>) -> RtResult<Object> {
        let mut dict = Dict::default();
        for (k, v) in pairs {
            dict.set(k, v)?;
        }
        Ok(Object::from_body(Body::Dict(RefCell::new(dict))))
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    /// Identity comparison
    pub fn is(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the object, stable for its lifetime
    pub fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    /// Current number of references
    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Name of the object's type
    pub fn type_name(&self) -> String {
        match self.body() {
            Body::None => "NoneType".to_string(),
            Body::Bool(_) => "bool".to_string(),
            Body::Int(_) => "int".to_string(),
            Body::Float(_) => "float".to_string(),
            Body::Complex(_) => "complex".to_string(),
            Body::Str(_) => "str".to_string(),
            Body::Bytes(_) => "bytes".to_string(),
            Body::List(_) => "list".to_string(),
            Body::Tuple(_) => "tuple".to_string(),
            Body::Dict(_) => "dict".to_string(),
            Body::Module(_) => "module".to_string(),
            Body::Function(_) => "builtin_function_or_method".to_string(),
            Body::Type(_) => "type".to_string(),
            Body::Capsule(_) => "capsule".to_string(),
            Body::Instance(inst) => inst
                .type_object()
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "object".to_string()),
        }
    }

    // ------------------------------------------------------------------------
    // Kind checks
    // ------------------------------------------------------------------------

    /// `None` check
    pub fn is_none(&self) -> bool {
        matches!(self.body(), Body::None)
    }

    /// Boolean check
    pub fn is_bool(&self) -> bool {
        matches!(self.body(), Body::Bool(_))
    }

    /// Integer check. Booleans are not integers here.
    pub fn is_int(&self) -> bool {
        matches!(self.body(), Body::Int(_))
    }

    /// Float check
    pub fn is_float(&self) -> bool {
        matches!(self.body(), Body::Float(_))
    }

    /// Complex check
    pub fn is_complex(&self) -> bool {
        matches!(self.body(), Body::Complex(_))
    }

    /// String check
    pub fn is_str(&self) -> bool {
        matches!(self.body(), Body::Str(_))
    }

    /// Bytes check
    pub fn is_bytes(&self) -> bool {
        matches!(self.body(), Body::Bytes(_))
    }

    /// List check
    pub fn is_list(&self) -> bool {
        matches!(self.body(), Body::List(_))
    }

    /// Tuple check
    pub fn is_tuple(&self) -> bool {
        matches!(self.body(), Body::Tuple(_))
    }

    /// Dict check
    pub fn is_dict(&self) -> bool {
        matches!(self.body(), Body::Dict(_))
    }

    /// Module check
    pub fn is_module(&self) -> bool {
        matches!(self.body(), Body::Module(_))
    }

    /// Type check
    pub fn is_type(&self) -> bool {
        matches!(self.body(), Body::Type(_))
    }

    /// Capsule check
    pub fn is_capsule(&self) -> bool {
        matches!(self.body(), Body::Capsule(_))
    }

    /// Whether calling the object can succeed
    pub fn is_callable(&self) -> bool {
        matches!(self.body(), Body::Function(_) | Body::Type(_))
    }

    // ------------------------------------------------------------------------
    // Scalar access
    // ------------------------------------------------------------------------

    /// Boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self.body() {
            Body::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value
    pub fn as_int(&self) -> Option<i128> {
        match self.body() {
            Body::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float value, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self.body() {
            Body::Float(f) => Some(*f),
            Body::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Complex value
    pub fn as_complex(&self) -> Option<Complex64> {
        match self.body() {
            Body::Complex(c) => Some(*c),
            _ => None,
        }
    }

    /// String contents
    pub fn as_str(&self) -> Option<&str> {
        match self.body() {
            Body::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Bytes contents
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.body() {
            Body::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------------

    /// Snapshot of a list's or tuple's items
    pub fn sequence_items(&self) -> Option<Vec<Object>> {
        match self.body() {
            Body::List(items) => Some(items.borrow().clone()),
            Body::Tuple(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Length of a list or tuple
    pub fn len(&self) -> RtResult<usize> {
        match self.body() {
            Body::List(items) => Ok(items.borrow().len()),
            Body::Tuple(items) => Ok(items.len()),
            Body::Dict(dict) => Ok(dict.borrow().len()),
            Body::Str(s) => Ok(s.chars().count()),
            Body::Bytes(b) => Ok(b.len()),
            _ => Err(Exception::type_error(format!(
                "object of type '{}' has no len()",
                self.type_name()
            ))),
        }
    }

    /// Whether `len()` is zero
    pub fn is_empty(&self) -> RtResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Item of a list or tuple
    pub fn get_item(&self, index: usize) -> RtResult<Object> {
        let item = match self.body() {
            Body::List(items) => items.borrow().get(index).cloned(),
            Body::Tuple(items) => items.get(index).cloned(),
            _ => {
                return Err(Exception::type_error(format!(
                    "'{}' object is not subscriptable",
                    self.type_name()
                )))
            }
        };
        item.ok_or_else(|| Exception::index_error("index out of range"))
    }

    /// Replace an item of a list
    pub fn set_item(&self, index: usize, value: Object) -> RtResult<()> {
        let Body::List(items) = self.body() else {
            return Err(Exception::type_error(format!(
                "'{}' object does not support item assignment",
                self.type_name()
            )));
        };
        let old = {
            let mut items = items.borrow_mut();
            let slot = items
                .get_mut(index)
                .ok_or_else(|| Exception::index_error("list assignment index out of range"))?;
            std::mem::replace(slot, value)
        };
        drop(old);
        Ok(())
    }

    /// Append to a list
    pub fn append(&self, value: Object) -> RtResult<()> {
        match self.body() {
            Body::List(items) => {
                items.borrow_mut().push(value);
                Ok(())
            }
            _ => Err(Exception::attribute_error(format!(
                "'{}' object has no attribute 'append'",
                self.type_name()
            ))),
        }
    }

    // ------------------------------------------------------------------------
    // Dicts
    // ------------------------------------------------------------------------

    fn dict_cell(&self) -> RtResult<&RefCell<Dict>> {
        match self.body() {
            Body::Dict(dict) => Ok(dict),
            _ => Err(Exception::type_error(format!(
                "expected dict, got '{}'",
                self.type_name()
            ))),
        }
    }

    /// Number of entries, zero for non-dicts
    pub fn dict_len(&self) -> usize {
        match self.body() {
            Body::Dict(dict) => dict.borrow().len(),
            _ => 0,
        }
    }

    /// Look a key up
    pub fn dict_get(&self, key: &Object) -> RtResult<Option<Object>> {
        self.dict_cell()?.borrow().get(key)
    }

    /// Look a string key up
    pub fn dict_get_str(&self, key: &str) -> Option<Object> {
        match self.body() {
            Body::Dict(dict) => dict.borrow().get_str(key),
            _ => None,
        }
    }

    /// Whether a string key is present
    pub fn dict_contains_str(&self, key: &str) -> bool {
        match self.body() {
            Body::Dict(dict) => dict.borrow().contains_str(key),
            _ => false,
        }
    }

    /// Insert or overwrite an entry
    pub fn dict_set(&self, key: Object, value: Object) -> RtResult<()> {
        let old = self.dict_cell()?.borrow_mut().set(key, value)?;
        drop(old);
        Ok(())
    }

    /// Remove an entry, returning its value
    pub fn dict_del(&self, key: &Object) -> RtResult<Object> {
        let removed = self.dict_cell()?.borrow_mut().remove(key)?;
        removed
            .map(|(_, v)| v)
            .ok_or_else(|| Exception::key_error(key.repr()))
    }

    /// Snapshot of the entries in insertion order
    pub fn dict_items(&self) -> RtResult<Vec<(Object, Object)>> {
        Ok(self.dict_cell()?.borrow().items())
    }

    // ------------------------------------------------------------------------
    // Comparison and display
    // ------------------------------------------------------------------------

    /// Value equality: numeric across int/float/bool, structural for
    /// containers, identity for everything else
    pub fn rich_eq(&self, other: &Object) -> bool {
        if self.is(other) {
            return true;
        }
        if let (Some(a), Some(b)) = (number(self.body()), number(other.body())) {
            return a.eq(&b);
        }
        match (self.body(), other.body()) {
            (Body::Complex(a), Body::Complex(b)) => a == b,
            (Body::Str(a), Body::Str(b)) => a == b,
            (Body::Bytes(a), Body::Bytes(b)) => a == b,
            (Body::List(a), Body::List(b)) => seq_eq(&a.borrow(), &b.borrow()),
            (Body::Tuple(a), Body::Tuple(b)) => seq_eq(a, b),
            (Body::Dict(a), Body::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.items().iter().all(|(k, v)| match b.get(k) {
                        Ok(Some(other)) => v.rich_eq(&other),
                        _ => false,
                    })
            }
            _ => false,
        }
    }

    /// Printable representation
    pub fn repr(&self) -> String {
        match self.body() {
            Body::None => "None".to_string(),
            Body::Bool(true) => "True".to_string(),
            Body::Bool(false) => "False".to_string(),
            Body::Int(i) => i.to_string(),
            Body::Float(f) => float_repr(*f),
            Body::Complex(c) => {
                let sign = if c.im < 0.0 { '-' } else { '+' };
                format!("({}{}{}j)", float_repr(c.re), sign, float_repr(c.im.abs()))
            }
            Body::Str(s) => format!("'{}'", s.replace('\'', "\\'")),
            Body::Bytes(b) => format!("b'{}'", b.escape_ascii()),
            Body::List(items) => format!("[{}]", join_repr(&items.borrow())),
            Body::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Body::Tuple(items) => format!("({})", join_repr(items)),
            Body::Dict(dict) => {
                let parts: Vec<String> = dict
                    .borrow()
                    .items()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Body::Module(m) => format!("<module '{}'>", m.name),
            Body::Function(f) => format!("<built-in function {}>", f.def.name),
            Body::Type(t) => format!("<class '{}'>", t.name),
            Body::Capsule(c) => format!("<capsule object \"{}\">", c.name),
            Body::Instance(_) => format!("<{} object at {:p}>", self.type_name(), self.as_ptr()),
        }
    }
}

enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn eq(&self, other: &Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a == b,
            (Number::Int(a), Number::Float(b)) | (Number::Float(b), Number::Int(a)) => {
                (*a as f64) == *b
            }
        }
    }
}

fn number(body: &Body) -> Option<Number> {
    match body {
        Body::Bool(b) => Some(Number::Int(*b as i128)),
        Body::Int(i) => Some(Number::Int(*i)),
        Body::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

fn seq_eq(a: &[Object], b: &[Object]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.rich_eq(y))
}

fn join_repr(items: &[Object]) -> String {
    items.iter().map(Object::repr).collect::<Vec<_>>().join(", ")
}

fn float_repr(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::none()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.rich_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.body() {
            Body::Str(s) => f.write_str(s),
            _ => f.write_str(&self.repr()),
        }
    }
}
