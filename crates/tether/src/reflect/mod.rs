//! Host type descriptors
//!
//! Every marshalable Rust type implements [`Reflect`], which hands out one
//! interned [`TypeDesc`] per type. The descriptor carries the layout, a
//! value vtable (default-construct, drop, clone) and a [`Kind`]: the closed
//! set of shapes the value codec knows how to convert.
//!
//! Child descriptors are referenced through [`TypeRef`] function pointers so
//! recursive types (`struct Node { next: Option<Box<Node>> }`) describe
//! themselves lazily.

mod impls;
mod value;

use std::alloc::Layout;
use std::any::{type_name, TypeId};
use std::fmt;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

pub use value::OwnedValue;

/// Lazily resolved descriptor
pub type TypeRef = fn() -> &'static TypeDesc;

/// A host type the bridge can marshal.
///
/// `Default` provides the zero value used for fresh arguments and newly
/// allocated instances; `Clone` provides copy semantics.
pub trait Reflect: Default + Clone + 'static {
    /// Interned descriptor of `Self`
    fn type_desc() -> &'static TypeDesc;
}

/// Exported methods of a struct, produced by `#[tether::methods]`
pub trait Methods {
    /// Method descriptors in declaration order
    fn methods() -> Vec<MethodDesc>;
}

// ============================================================================
// Descriptors
// ============================================================================

/// Interned description of one host type
pub struct TypeDesc {
    /// Type name used in diagnostics
    pub name: &'static str,
    /// Identity of the described type
    pub type_id: TypeId,
    /// Size and alignment
    pub layout: Layout,
    /// Shape
    pub kind: Kind,
    pub(crate) vtable: ValueVTable,
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDesc")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl TypeDesc {
    /// Whether this descriptor describes `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Struct shape, if any
    pub fn as_struct(&self) -> Option<&StructDesc> {
        match &self.kind {
            Kind::Struct(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct ValueVTable {
    pub(crate) write_default: unsafe fn(*mut u8),
    pub(crate) drop_in_place: unsafe fn(*mut u8),
    pub(crate) clone_to: unsafe fn(*const u8, *mut u8),
}

impl ValueVTable {
    fn of<T: Reflect>() -> Self {
        unsafe fn write_default<T: Default>(dst: *mut u8) {
            std::ptr::write(dst as *mut T, T::default());
        }
        unsafe fn drop_in_place<T>(dst: *mut u8) {
            std::ptr::drop_in_place(dst as *mut T);
        }
        unsafe fn clone_to<T: Clone>(src: *const u8, dst: *mut u8) {
            std::ptr::write(dst as *mut T, (*(src as *const T)).clone());
        }
        Self {
            write_default: write_default::<T>,
            drop_in_place: drop_in_place::<T>,
            clone_to: clone_to::<T>,
        }
    }
}

/// Closed set of host shapes
pub enum Kind {
    /// `()`, converted to `None`
    Unit,
    /// `bool`
    Bool,
    /// Fixed-width integers
    Int(IntKind),
    /// `f32` / `f64`
    Float(FloatKind),
    /// `Complex<f32>` / `Complex<f64>`
    Complex(FloatKind),
    /// `String`
    Str,
    /// `Vec<u8>`
    Bytes,
    /// `Vec<T>`
    Seq(SeqDesc),
    /// `HashMap<K, V>` / `BTreeMap<K, V>`
    Map(MapDesc),
    /// Struct with exported fields and methods
    Struct(StructDesc),
    /// `Box<T>`
    Boxed(BoxDesc),
    /// `Option<T>`, `None` maps to the runtime's `None`
    Optional(OptionDesc),
    /// `(A, B, ..)`, also used for multiple results
    Tuple(TupleDesc),
    /// A runtime object passed through unchanged
    Dynamic,
    /// Keyword arguments of a call
    KwArgs,
    /// Described but not convertible
    Opaque,
}

/// Integer widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `isize`
    Isize,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `usize`
    Usize,
}

/// Float widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    /// 32-bit
    F32,
    /// 64-bit
    F64,
}

/// `Vec<T>` operations
pub struct SeqDesc {
    /// Element type
    pub elem: TypeRef,
    pub(crate) len: unsafe fn(*const u8) -> usize,
    pub(crate) elem_ptr: unsafe fn(*const u8, usize) -> *const u8,
    /// Moves the element out of the second pointer
    pub(crate) push: unsafe fn(*mut u8, *mut u8),
}

/// Map operations
pub struct MapDesc {
    /// Key type
    pub key: TypeRef,
    /// Value type
    pub value: TypeRef,
    pub(crate) for_each: unsafe fn(*const u8, &mut dyn FnMut(*const u8, *const u8)),
    /// Moves key and value out of the last two pointers
    pub(crate) insert: unsafe fn(*mut u8, *mut u8, *mut u8),
}

/// `Box<T>` operations
pub struct BoxDesc {
    /// Pointee type
    pub elem: TypeRef,
    pub(crate) deref: unsafe fn(*const u8) -> *mut u8,
}

/// `Option<T>` operations
pub struct OptionDesc {
    /// Payload type
    pub elem: TypeRef,
    /// Null when the option is `None`
    pub(crate) get: unsafe fn(*const u8) -> *mut u8,
    pub(crate) set_none: unsafe fn(*mut u8),
    /// Moves the payload out of the second pointer
    pub(crate) set_some: unsafe fn(*mut u8, *mut u8),
}

/// Tuple operations
pub struct TupleDesc {
    /// Element types in order
    pub elems: Vec<TypeRef>,
    pub(crate) elem_ptr: unsafe fn(*const u8, usize) -> *mut u8,
}

/// Struct shape, generated by `#[derive(Reflect)]`
pub struct StructDesc {
    /// Declared struct name
    pub name: &'static str,
    /// Exported (`pub`) fields in declaration order
    pub fields: Vec<FieldDesc>,
    /// Exported methods
    pub methods: fn() -> Vec<MethodDesc>,
}

/// One exported field
pub struct FieldDesc {
    /// Declared field name
    pub name: &'static str,
    /// Byte offset inside the struct
    pub offset: usize,
    /// Field type
    pub ty: TypeRef,
}

/// How a method takes `self`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// `&self`
    Ref,
    /// `&mut self`
    Mut,
    /// `self`, called on a clone
    Value,
}

/// One exported method, generated by `#[tether::methods]`
#[derive(Clone)]
pub struct MethodDesc {
    /// Declared method name
    pub name: &'static str,
    /// Docstring
    pub doc: &'static str,
    /// Receiver kind
    pub receiver: Receiver,
    /// Parameter types, receiver excluded
    pub params: Vec<TypeRef>,
    /// Return type
    pub ret: TypeRef,
    /// Calls the method on the value behind the pointer, consuming `args`
    pub call: unsafe fn(*mut u8, &mut [OwnedValue]) -> OwnedValue,
}

/// Method table of structs without `#[reflect(methods)]`
pub fn no_methods() -> Vec<MethodDesc> {
    Vec::new()
}

// ============================================================================
// Interning
// ============================================================================

static DESCRIPTORS: Lazy<Mutex<FxHashMap<TypeId, &'static TypeDesc>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

/// Intern the descriptor of `T`, building it on first use
pub fn describe<T: Reflect>(name: &'static str, kind: impl FnOnce() -> Kind) -> &'static TypeDesc {
    let id = TypeId::of::<T>();
    let cached = DESCRIPTORS.lock().get(&id).copied();
    if let Some(desc) = cached {
        return desc;
    }
    let built: &'static TypeDesc = Box::leak(Box::new(TypeDesc {
        name,
        type_id: id,
        layout: Layout::new::<T>(),
        kind: kind(),
        vtable: ValueVTable::of::<T>(),
    }));
    *DESCRIPTORS.lock().entry(id).or_insert(built)
}

/// [`describe`] with the compiler's name for `T`
pub(crate) fn describe_named<T: Reflect>(kind: impl FnOnce() -> Kind) -> &'static TypeDesc {
    describe::<T>(type_name::<T>(), kind)
}
