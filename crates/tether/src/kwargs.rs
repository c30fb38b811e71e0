//! Keyword arguments handed to host functions

use tether_runtime::{Object, RtResult};

use crate::reflect::{describe, Kind, Reflect, TypeDesc};

/// The keyword dict of a call.
///
/// Declared as the last parameter of an exported function, it receives the
/// caller's keyword arguments; functions without it reject keywords.
#[derive(Clone)]
pub struct KwArgs(Object);

impl KwArgs {
    /// Wrap a dict
    pub fn new(dict: Object) -> Self {
        KwArgs(dict)
    }

    /// Value passed for `name`
    pub fn get(&self, name: &str) -> Option<Object> {
        self.0.dict_get_str(name)
    }

    /// Whether `name` was passed
    pub fn contains(&self, name: &str) -> bool {
        self.0.dict_contains_str(name)
    }

    /// Entries in call order
    pub fn items(&self) -> RtResult<Vec<(Object, Object)>> {
        self.0.dict_items()
    }

    /// Number of keyword arguments
    pub fn len(&self) -> usize {
        self.0.dict_len()
    }

    /// No keyword arguments were passed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The underlying dict
    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Default for KwArgs {
    fn default() -> Self {
        KwArgs(Object::dict())
    }
}

impl Reflect for KwArgs {
    fn type_desc() -> &'static TypeDesc {
        describe::<KwArgs>("KwArgs", || Kind::KwArgs)
    }
}
