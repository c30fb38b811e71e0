//! `Reflect` for std, num-complex and runtime types

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::ptr;

use num_complex::Complex;
use tether_runtime::Object;

use super::{
    describe, describe_named, BoxDesc, FloatKind, IntKind, Kind, MapDesc, OptionDesc, Reflect,
    SeqDesc, TupleDesc, TypeDesc,
};

// ============================================================================
// Scalars
// ============================================================================

macro_rules! reflect_scalar {
    ($($t:ty => $kind:expr),* $(,)?) => {
        $(
            impl Reflect for $t {
                fn type_desc() -> &'static TypeDesc {
                    describe::<$t>(stringify!($t), || $kind)
                }
            }
        )*
    };
}

reflect_scalar! {
    () => Kind::Unit,
    bool => Kind::Bool,
    i8 => Kind::Int(IntKind::I8),
    i16 => Kind::Int(IntKind::I16),
    i32 => Kind::Int(IntKind::I32),
    i64 => Kind::Int(IntKind::I64),
    isize => Kind::Int(IntKind::Isize),
    u8 => Kind::Int(IntKind::U8),
    u16 => Kind::Int(IntKind::U16),
    u32 => Kind::Int(IntKind::U32),
    u64 => Kind::Int(IntKind::U64),
    usize => Kind::Int(IntKind::Usize),
    f32 => Kind::Float(FloatKind::F32),
    f64 => Kind::Float(FloatKind::F64),
    Complex<f32> => Kind::Complex(FloatKind::F32),
    Complex<f64> => Kind::Complex(FloatKind::F64),
    String => Kind::Str,
    Object => Kind::Dynamic,
}

// ============================================================================
// Sequences
// ============================================================================

impl<T: Reflect> Reflect for Vec<T> {
    fn type_desc() -> &'static TypeDesc {
        describe_named::<Self>(|| {
            if TypeId::of::<T>() == TypeId::of::<u8>() {
                return Kind::Bytes;
            }
            Kind::Seq(SeqDesc {
                elem: T::type_desc,
                len: seq_len::<T>,
                elem_ptr: seq_elem::<T>,
                push: seq_push::<T>,
            })
        })
    }
}

unsafe fn seq_len<T>(seq: *const u8) -> usize {
    let vec = &*(seq as *const Vec<T>);
    vec.len()
}

unsafe fn seq_elem<T>(seq: *const u8, index: usize) -> *const u8 {
    let vec = &*(seq as *const Vec<T>);
    debug_assert!(index < vec.len());
    vec.as_ptr().add(index) as *const u8
}

unsafe fn seq_push<T: Default>(seq: *mut u8, item: *mut u8) {
    let vec = &mut *(seq as *mut Vec<T>);
    vec.push(std::mem::take(&mut *(item as *mut T)));
}

// ============================================================================
// Maps
// ============================================================================

impl<K, V, S> Reflect for HashMap<K, V, S>
where
    K: Reflect + Eq + Hash,
    V: Reflect,
    S: BuildHasher + Default + Clone + 'static,
{
    fn type_desc() -> &'static TypeDesc {
        describe_named::<Self>(|| {
            Kind::Map(MapDesc {
                key: K::type_desc,
                value: V::type_desc,
                for_each: hash_map_for_each::<K, V, S>,
                insert: hash_map_insert::<K, V, S>,
            })
        })
    }
}

unsafe fn hash_map_for_each<K, V, S>(map: *const u8, f: &mut dyn FnMut(*const u8, *const u8)) {
    for (k, v) in (&*(map as *const HashMap<K, V, S>)).iter() {
        f(k as *const K as *const u8, v as *const V as *const u8);
    }
}

unsafe fn hash_map_insert<K, V, S>(map: *mut u8, key: *mut u8, value: *mut u8)
where
    K: Default + Eq + Hash,
    V: Default,
    S: BuildHasher,
{
    let key = std::mem::take(&mut *(key as *mut K));
    let value = std::mem::take(&mut *(value as *mut V));
    (&mut *(map as *mut HashMap<K, V, S>)).insert(key, value);
}

impl<K: Reflect + Ord, V: Reflect> Reflect for BTreeMap<K, V> {
    fn type_desc() -> &'static TypeDesc {
        describe_named::<Self>(|| {
            Kind::Map(MapDesc {
                key: K::type_desc,
                value: V::type_desc,
                for_each: btree_map_for_each::<K, V>,
                insert: btree_map_insert::<K, V>,
            })
        })
    }
}

unsafe fn btree_map_for_each<K, V>(map: *const u8, f: &mut dyn FnMut(*const u8, *const u8)) {
    for (k, v) in (&*(map as *const BTreeMap<K, V>)).iter() {
        f(k as *const K as *const u8, v as *const V as *const u8);
    }
}

unsafe fn btree_map_insert<K: Default + Ord, V: Default>(map: *mut u8, key: *mut u8, value: *mut u8) {
    let key = std::mem::take(&mut *(key as *mut K));
    let value = std::mem::take(&mut *(value as *mut V));
    (&mut *(map as *mut BTreeMap<K, V>)).insert(key, value);
}

// ============================================================================
// Indirection
// ============================================================================

impl<T: Reflect> Reflect for Box<T> {
    fn type_desc() -> &'static TypeDesc {
        describe_named::<Self>(|| {
            Kind::Boxed(BoxDesc {
                elem: T::type_desc,
                deref: box_deref::<T>,
            })
        })
    }
}

unsafe fn box_deref<T>(boxed: *const u8) -> *mut u8 {
    &mut **(boxed as *mut Box<T>) as *mut T as *mut u8
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_desc() -> &'static TypeDesc {
        describe_named::<Self>(|| {
            Kind::Optional(OptionDesc {
                elem: T::type_desc,
                get: option_get::<T>,
                set_none: option_set_none::<T>,
                set_some: option_set_some::<T>,
            })
        })
    }
}

unsafe fn option_get<T>(opt: *const u8) -> *mut u8 {
    match &mut *(opt as *mut Option<T>) {
        Some(value) => value as *mut T as *mut u8,
        None => ptr::null_mut(),
    }
}

unsafe fn option_set_none<T>(opt: *mut u8) {
    *(opt as *mut Option<T>) = None;
}

unsafe fn option_set_some<T: Default>(opt: *mut u8, value: *mut u8) {
    *(opt as *mut Option<T>) = Some(std::mem::take(&mut *(value as *mut T)));
}

// ============================================================================
// Tuples
// ============================================================================

macro_rules! reflect_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: Reflect),+> Reflect for ($($name,)+) {
            fn type_desc() -> &'static TypeDesc {
                unsafe fn elem_ptr<$($name),+>(tuple: *const u8, index: usize) -> *mut u8 {
                    let tuple = &mut *(tuple as *mut ($($name,)+));
                    $(
                        if index == $idx {
                            return &mut tuple.$idx as *mut $name as *mut u8;
                        }
                    )+
                    ptr::null_mut()
                }
                describe_named::<Self>(|| {
                    Kind::Tuple(TupleDesc {
                        elems: vec![$(<$name as Reflect>::type_desc),+],
                        elem_ptr: elem_ptr::<$($name),+>,
                    })
                })
            }
        }
    };
}

reflect_tuple!(A 0);
reflect_tuple!(A 0, B 1);
reflect_tuple!(A 0, B 1, C 2);
reflect_tuple!(A 0, B 1, C 2, D 3);
reflect_tuple!(A 0, B 1, C 2, D 3, E 4);
reflect_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
reflect_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
reflect_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_kinds() {
        assert!(matches!(i64::type_desc().kind, Kind::Int(IntKind::I64)));
        assert!(matches!(u8::type_desc().kind, Kind::Int(IntKind::U8)));
        assert!(matches!(f32::type_desc().kind, Kind::Float(FloatKind::F32)));
        assert!(matches!(Complex::<f64>::type_desc().kind, Kind::Complex(FloatKind::F64)));
        assert!(matches!(<()>::type_desc().kind, Kind::Unit));
        assert!(matches!(Object::type_desc().kind, Kind::Dynamic));
        assert_eq!(String::type_desc().name, "String");
    }

    #[test]
    fn test_seq_access() {
        let desc = Vec::<i32>::type_desc();
        let Kind::Seq(seq) = &desc.kind else {
            panic!("expected sequence");
        };
        let mut v = vec![5i32, 6];
        let p = &mut v as *mut Vec<i32> as *mut u8;
        let mut extra = 7i32;
        unsafe {
            assert_eq!((seq.len)(p), 2);
            assert_eq!(*((seq.elem_ptr)(p, 1) as *const i32), 6);
            (seq.push)(p, &mut extra as *mut i32 as *mut u8);
        }
        assert_eq!(v, vec![5, 6, 7]);
        assert!(std::ptr::eq((seq.elem)(), i32::type_desc()));
    }

    #[test]
    fn test_option_access() {
        let desc = Option::<String>::type_desc();
        let Kind::Optional(opt) = &desc.kind else {
            panic!("expected option");
        };
        let mut value: Option<String> = None;
        let p = &mut value as *mut Option<String> as *mut u8;
        let mut payload = String::from("x");
        unsafe {
            assert!((opt.get)(p).is_null());
            (opt.set_some)(p, &mut payload as *mut String as *mut u8);
            assert!(!(opt.get)(p).is_null());
        }
        assert_eq!(value.as_deref(), Some("x"));
        unsafe { (opt.set_none)(&mut value as *mut Option<String> as *mut u8) };
        assert!(value.is_none());
    }

    #[test]
    fn test_btree_map_insert_and_iterate() {
        let desc = BTreeMap::<String, i64>::type_desc();
        let Kind::Map(map) = &desc.kind else {
            panic!("expected map");
        };
        let mut m: BTreeMap<String, i64> = BTreeMap::new();
        let p = &mut m as *mut BTreeMap<String, i64> as *mut u8;
        let mut k = String::from("a");
        let mut v = 1i64;
        unsafe {
            (map.insert)(p, &mut k as *mut String as *mut u8, &mut v as *mut i64 as *mut u8);
        }
        let mut seen = 0;
        unsafe { (map.for_each)(p, &mut |_, _| seen += 1) };
        assert_eq!(seen, 1);
        assert_eq!(m.get("a"), Some(&1));
    }

    #[test]
    fn test_tuple_elements() {
        let desc = <(i8, String)>::type_desc();
        let Kind::Tuple(t) = &desc.kind else {
            panic!("expected tuple");
        };
        let mut value = (3i8, String::from("s"));
        let p = &mut value as *mut (i8, String) as *mut u8;
        unsafe {
            assert_eq!(*((t.elem_ptr)(p, 0) as *const i8), 3);
            assert_eq!(&*((t.elem_ptr)(p, 1) as *const String), "s");
            assert!((t.elem_ptr)(p, 2).is_null());
        }
    }
}
