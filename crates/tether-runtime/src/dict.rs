//! Insertion-ordered mapping storage

use rustc_hash::FxHashMap;

use crate::error::{Exception, RtResult};
use crate::object::{Body, Object};

/// Hashable projection of an object. Numerically equal keys collapse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum HashKey {
    None,
    Int(i128),
    Float(u64),
    Complex(u64, u64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<HashKey>),
    Identity(usize),
}

impl HashKey {
    pub(crate) fn of(obj: &Object) -> RtResult<HashKey> {
        Ok(match obj.body() {
            Body::None => HashKey::None,
            Body::Bool(b) => HashKey::Int(*b as i128),
            Body::Int(i) => HashKey::Int(*i),
            Body::Float(f) => float_key(*f),
            Body::Complex(c) if c.im == 0.0 => float_key(c.re),
            Body::Complex(c) => HashKey::Complex(c.re.to_bits(), c.im.to_bits()),
            Body::Str(s) => HashKey::Str(s.clone()),
            Body::Bytes(b) => HashKey::Bytes(b.clone()),
            Body::Tuple(items) => HashKey::Tuple(
                items
                    .iter()
                    .map(HashKey::of)
                    .collect::<RtResult<Vec<_>>>()?,
            ),
            Body::List(_) | Body::Dict(_) => {
                return Err(Exception::type_error(format!(
                    "unhashable type: '{}'",
                    obj.type_name()
                )))
            }
            _ => HashKey::Identity(obj.as_ptr() as usize),
        })
    }
}

fn float_key(f: f64) -> HashKey {
    if f.fract() == 0.0 && f.abs() < 1e30 {
        HashKey::Int(f as i128)
    } else {
        HashKey::Float(f.to_bits())
    }
}

#[derive(Default)]
pub(crate) struct Dict {
    entries: Vec<(Object, Object)>,
    index: FxHashMap<HashKey, usize>,
}

impl Dict {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, key: &Object) -> RtResult<Option<Object>> {
        let key = HashKey::of(key)?;
        Ok(self.index.get(&key).map(|&i| self.entries[i].1.clone()))
    }

    pub(crate) fn get_str(&self, key: &str) -> Option<Object> {
        self.index
            .get(&HashKey::Str(key.to_string()))
            .map(|&i| self.entries[i].1.clone())
    }

    pub(crate) fn contains_str(&self, key: &str) -> bool {
        self.index.contains_key(&HashKey::Str(key.to_string()))
    }

    /// Insert or overwrite. The displaced value is handed back so the caller
    /// can release it outside of any borrow.
    pub(crate) fn set(&mut self, key: Object, value: Object) -> RtResult<Option<Object>> {
        let hashed = HashKey::of(&key)?;
        if let Some(&i) = self.index.get(&hashed) {
            return Ok(Some(std::mem::replace(&mut self.entries[i].1, value)));
        }
        self.index.insert(hashed, self.entries.len());
        self.entries.push((key, value));
        Ok(None)
    }

    pub(crate) fn remove(&mut self, key: &Object) -> RtResult<Option<(Object, Object)>> {
        let hashed = HashKey::of(key)?;
        let Some(i) = self.index.remove(&hashed) else {
            return Ok(None);
        };
        let removed = self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Ok(Some(removed))
    }

    pub(crate) fn items(&self) -> Vec<(Object, Object)> {
        self.entries.clone()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &Object> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub(crate) fn take_all(&mut self) -> Vec<(Object, Object)> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }
}
