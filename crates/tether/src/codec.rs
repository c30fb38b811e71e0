//! Value codec
//!
//! Converts host values, seen through their [`TypeDesc`], to runtime objects
//! and back. Every [`Kind`] has exactly one runtime representation:
//!
//! | host                          | runtime                               |
//! |-------------------------------|---------------------------------------|
//! | `()`                          | `None`                                |
//! | `bool`                        | `bool`                                |
//! | integers                      | `int`                                 |
//! | `f32`, `f64`                  | `float` (ints accepted on the way in) |
//! | `Complex<f32>`, `Complex<f64>`| `complex`                             |
//! | `String`                      | `str`                                 |
//! | `Vec<u8>`                     | `bytes`                               |
//! | `Vec<T>`                      | `list` (tuples accepted)              |
//! | maps                          | `dict`                                |
//! | registered struct             | wrapper instance                      |
//! | unregistered struct           | `dict` of snake_case field names      |
//! | `Box<T>`                      | conversion of `T`                     |
//! | `Option<T>`                   | `None` or conversion of `T`           |
//! | tuples                        | `tuple`                               |
//! | `Object`                      | passed through                        |
//!
//! Conversions into the host never write a partial scalar: the destination is
//! only touched once the whole value converted.

use std::ptr::{self, NonNull};

use num_complex::{Complex, Complex64};
use tether_runtime::{Object, RtResult};

use crate::context::BridgeContext;
use crate::error::ConversionError;
use crate::instance::{wrap_copy, wrapper_value};
use crate::kwargs::KwArgs;
use crate::name::to_snake_case;
use crate::reflect::{FloatKind, IntKind, Kind, OwnedValue, StructDesc, TypeDesc};

// ============================================================================
// Host to runtime
// ============================================================================

/// Build a runtime object from the host value at `ptr`.
///
/// # Safety
/// `ptr` must point to a live value described by `desc`.
///
/// # Panics
/// On kinds without a runtime representation.
pub(crate) unsafe fn to_dynamic(
    ctx: &BridgeContext,
    ptr: *const u8,
    desc: &'static TypeDesc,
) -> RtResult<Object> {
    let obj = match &desc.kind {
        Kind::Unit => Object::none(),
        Kind::Bool => Object::bool(*(ptr as *const bool)),
        Kind::Int(kind) => Object::int(read_int(ptr, *kind)),
        Kind::Float(FloatKind::F32) => Object::float(*(ptr as *const f32) as f64),
        Kind::Float(FloatKind::F64) => Object::float(*(ptr as *const f64)),
        Kind::Complex(FloatKind::F32) => {
            let c = *(ptr as *const Complex<f32>);
            Object::complex(Complex64::new(c.re as f64, c.im as f64))
        }
        Kind::Complex(FloatKind::F64) => Object::complex(*(ptr as *const Complex64)),
        Kind::Str => Object::str((*(ptr as *const String)).clone()),
        Kind::Bytes => Object::bytes((*(ptr as *const Vec<u8>)).clone()),
        Kind::Seq(seq) => {
            let elem = (seq.elem)();
            let len = (seq.len)(ptr);
            let mut items = Vec::with_capacity(len);
            for i in 0..len {
                items.push(to_dynamic(ctx, (seq.elem_ptr)(ptr, i), elem)?);
            }
            Object::list(items)
        }
        Kind::Map(map) => {
            let (key_desc, value_desc) = ((map.key)(), (map.value)());
            let mut pairs = Vec::new();
            let mut failed = None;
            (map.for_each)(ptr, &mut |k, v| {
                if failed.is_some() {
                    return;
                }
                let pair = to_dynamic(ctx, k, key_desc)
                    .and_then(|key| Ok((key, to_dynamic(ctx, v, value_desc)?)));
                match pair {
                    Ok(pair) => pairs.push(pair),
                    Err(err) => failed = Some(err),
                }
            });
            if let Some(err) = failed {
                return Err(err);
            }
            Object::dict_from(pairs)?
        }
        Kind::Struct(shape) => match ctx.type_handle(desc) {
            Some(ty) => wrap_copy(ctx, &ty, desc, ptr)?,
            None => struct_to_dict(ctx, ptr, shape)?,
        },
        Kind::Boxed(boxed) => to_dynamic(ctx, (boxed.deref)(ptr), (boxed.elem)())?,
        Kind::Optional(opt) => {
            let inner = (opt.get)(ptr);
            if inner.is_null() {
                Object::none()
            } else {
                to_dynamic(ctx, inner, (opt.elem)())?
            }
        }
        Kind::Tuple(tuple) => {
            let mut items = Vec::with_capacity(tuple.elems.len());
            for (i, elem) in tuple.elems.iter().enumerate() {
                items.push(to_dynamic(ctx, (tuple.elem_ptr)(ptr, i), elem())?);
            }
            Object::tuple(items)
        }
        Kind::Dynamic => (*(ptr as *const Object)).clone(),
        Kind::KwArgs => (*(ptr as *const KwArgs)).as_object().clone(),
        Kind::Opaque => panic!("values of type {} have no runtime representation", desc.name),
    };
    Ok(obj)
}

unsafe fn struct_to_dict(
    ctx: &BridgeContext,
    ptr: *const u8,
    shape: &StructDesc,
) -> RtResult<Object> {
    let dict = Object::dict();
    for field in &shape.fields {
        let value = to_dynamic(ctx, ptr.add(field.offset), (field.ty)())?;
        dict.dict_set(Object::str(to_snake_case(field.name)), value)?;
    }
    Ok(dict)
}

unsafe fn read_int(ptr: *const u8, kind: IntKind) -> i128 {
    match kind {
        IntKind::I8 => *(ptr as *const i8) as i128,
        IntKind::I16 => *(ptr as *const i16) as i128,
        IntKind::I32 => *(ptr as *const i32) as i128,
        IntKind::I64 => *(ptr as *const i64) as i128,
        IntKind::Isize => *(ptr as *const isize) as i128,
        IntKind::U8 => *(ptr as *const u8) as i128,
        IntKind::U16 => *(ptr as *const u16) as i128,
        IntKind::U32 => *(ptr as *const u32) as i128,
        IntKind::U64 => *(ptr as *const u64) as i128,
        IntKind::Usize => *(ptr as *const usize) as i128,
    }
}

// ============================================================================
// Runtime to host
// ============================================================================

/// Fill the host value at `dest` from `obj`.
///
/// # Safety
/// `dest` must be null or point to a live value described by `desc`.
///
/// # Panics
/// When `dest` is null, on kinds without a runtime representation and when
/// a field of a struct built from a dict fails to convert.
pub(crate) unsafe fn from_dynamic(
    ctx: &BridgeContext,
    obj: &Object,
    dest: *mut u8,
    desc: &'static TypeDesc,
) -> Result<(), ConversionError> {
    assert!(!dest.is_null(), "invalid conversion destination for {}", desc.name);
    match &desc.kind {
        Kind::Unit => {
            if !obj.is_none() {
                return Err(ConversionError::mismatch("None", obj));
            }
        }
        Kind::Bool => {
            let value = obj.as_bool().ok_or_else(|| ConversionError::mismatch("bool", obj))?;
            ptr::write(dest as *mut bool, value);
        }
        Kind::Int(kind) => {
            let value = obj.as_int().ok_or_else(|| ConversionError::mismatch("int", obj))?;
            write_int(dest, *kind, value)?;
        }
        Kind::Float(width) => {
            if !(obj.is_int() || obj.is_float()) {
                return Err(ConversionError::mismatch("float", obj));
            }
            let value = obj.as_float().ok_or_else(|| ConversionError::mismatch("float", obj))?;
            match width {
                FloatKind::F32 => ptr::write(dest as *mut f32, value as f32),
                FloatKind::F64 => ptr::write(dest as *mut f64, value),
            }
        }
        Kind::Complex(width) => {
            let c = obj
                .as_complex()
                .ok_or_else(|| ConversionError::mismatch("complex", obj))?;
            match width {
                FloatKind::F32 => {
                    *(dest as *mut Complex<f32>) = Complex::new(c.re as f32, c.im as f32)
                }
                FloatKind::F64 => *(dest as *mut Complex64) = c,
            }
        }
        Kind::Str => {
            let s = obj.as_str().ok_or_else(|| ConversionError::mismatch("str", obj))?;
            *(dest as *mut String) = s.to_string();
        }
        Kind::Bytes => {
            let b = obj.as_bytes().ok_or_else(|| ConversionError::mismatch("bytes", obj))?;
            *(dest as *mut Vec<u8>) = b.to_vec();
        }
        Kind::Seq(seq) => {
            let items = obj
                .sequence_items()
                .ok_or_else(|| ConversionError::mismatch("list", obj))?;
            let elem_desc = (seq.elem)();
            let tmp = OwnedValue::zero(desc);
            for (i, item) in items.iter().enumerate() {
                let elem = OwnedValue::zero(elem_desc);
                from_dynamic(ctx, item, elem.as_ptr(), elem_desc)
                    .map_err(|err| err.at(format!("[{i}]")))?;
                (seq.push)(tmp.as_ptr(), elem.as_ptr());
            }
            tmp.replace(dest);
        }
        Kind::Map(map) => {
            if !obj.is_dict() {
                return Err(ConversionError::mismatch("dict", obj));
            }
            let (key_desc, value_desc) = ((map.key)(), (map.value)());
            let tmp = OwnedValue::zero(desc);
            for (k, v) in obj.dict_items()? {
                let key = OwnedValue::zero(key_desc);
                let value = OwnedValue::zero(value_desc);
                from_dynamic(ctx, &k, key.as_ptr(), key_desc)
                    .map_err(|err| err.at(format!("key {}", k.repr())))?;
                from_dynamic(ctx, &v, value.as_ptr(), value_desc)
                    .map_err(|err| err.at(format!("[{}]", k.repr())))?;
                (map.insert)(tmp.as_ptr(), key.as_ptr(), value.as_ptr());
            }
            tmp.replace(dest);
        }
        Kind::Struct(shape) => struct_from_dynamic(ctx, obj, dest, desc, shape)?,
        Kind::Boxed(boxed) => from_dynamic(ctx, obj, (boxed.deref)(dest), (boxed.elem)())?,
        Kind::Optional(opt) => {
            if obj.is_none() {
                (opt.set_none)(dest);
            } else {
                let elem_desc = (opt.elem)();
                let value = OwnedValue::zero(elem_desc);
                from_dynamic(ctx, obj, value.as_ptr(), elem_desc)?;
                (opt.set_some)(dest, value.as_ptr());
            }
        }
        Kind::Tuple(tuple) => {
            let items = obj
                .sequence_items()
                .filter(|items| items.len() == tuple.elems.len())
                .ok_or_else(|| {
                    ConversionError::mismatch(format!("tuple of {}", tuple.elems.len()), obj)
                })?;
            let tmp = OwnedValue::zero(desc);
            for (i, (item, elem)) in items.iter().zip(&tuple.elems).enumerate() {
                from_dynamic(ctx, item, (tuple.elem_ptr)(tmp.as_ptr(), i), elem())
                    .map_err(|err| err.at(format!("[{i}]")))?;
            }
            tmp.replace(dest);
        }
        Kind::Dynamic => *(dest as *mut Object) = obj.clone(),
        Kind::KwArgs => {
            if !obj.is_dict() {
                return Err(ConversionError::mismatch("dict", obj));
            }
            *(dest as *mut KwArgs) = KwArgs::new(obj.clone());
        }
        Kind::Opaque => panic!("values of type {} have no runtime representation", desc.name),
    }
    Ok(())
}

unsafe fn struct_from_dynamic(
    ctx: &BridgeContext,
    obj: &Object,
    dest: *mut u8,
    desc: &'static TypeDesc,
    shape: &StructDesc,
) -> Result<(), ConversionError> {
    if let Some((src, bridged)) = wrapper_value(obj) {
        if !ctx.owns(&bridged) || bridged.desc.type_id != desc.type_id {
            return Err(ConversionError::WrongWrapper {
                expected: desc.name,
                got: obj.type_name(),
            });
        }
        if !ptr::eq(src, dest) {
            OwnedValue::clone_from(desc, src).replace(dest);
        }
        return Ok(());
    }
    if !obj.is_dict() {
        return Err(ConversionError::mismatch(shape.name, obj));
    }
    let tmp = OwnedValue::clone_from(desc, dest);
    for field in &shape.fields {
        let Some(value) = obj.dict_get_str(&to_snake_case(field.name)) else {
            continue;
        };
        let field_desc = (field.ty)();
        if let Err(err) = from_dynamic(ctx, &value, tmp.as_ptr().add(field.offset), field_desc) {
            panic!("failed to convert value to {}.{}: {err}", shape.name, field.name);
        }
    }
    tmp.replace(dest);
    Ok(())
}

unsafe fn write_int(dest: *mut u8, kind: IntKind, value: i128) -> Result<(), ConversionError> {
    macro_rules! store {
        ($t:ty) => {{
            let narrowed = <$t>::try_from(value).map_err(|_| ConversionError::OutOfRange {
                value: value.to_string(),
                target: stringify!($t),
            })?;
            ptr::write(dest as *mut $t, narrowed);
        }};
    }
    match kind {
        IntKind::I8 => store!(i8),
        IntKind::I16 => store!(i16),
        IntKind::I32 => store!(i32),
        IntKind::I64 => store!(i64),
        IntKind::Isize => store!(isize),
        IntKind::U8 => store!(u8),
        IntKind::U16 => store!(u16),
        IntKind::U32 => store!(u32),
        IntKind::U64 => store!(u64),
        IntKind::Usize => store!(usize),
    }
    Ok(())
}

/// Non-null pointer to a struct field
///
/// # Safety
/// `base` must point to a live struct containing a field at `offset`.
pub(crate) unsafe fn field_ptr(base: *mut u8, offset: usize) -> NonNull<u8> {
    NonNull::new_unchecked(base.add(offset))
}
