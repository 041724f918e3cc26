//! Static type descriptions.
//!
//! Rust has no runtime reflection, so the shape of a sample value is described by the
//! [`Describe`] trait instead: primitives, containers and date-times are covered here,
//! and records implement it by listing their fields. Descriptions may also be derived
//! from source code (see [`crate::type_resolver`]).
//!
//! ```
//! use openapi_declare::reflect::{Describe, FieldShape, Shape};
//!
//! struct Category {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Describe for Category {
//!     fn describe() -> Shape {
//!         Shape::record("Category", || {
//!             vec![
//!                 FieldShape::of::<i64>("id").tag("example"),
//!                 FieldShape::of::<String>("name").tag("description:'Category name'"),
//!             ]
//!         })
//!     }
//! }
//! ```

use crate::model::DataType;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

/// A described type: its display name plus its kind.
#[derive(Debug, Clone)]
pub struct Shape {
    pub type_name: String,
    pub kind: Kind,
}

#[derive(Debug, Clone)]
pub enum Kind {
    Bool,
    Int(u8),
    Uint(u8),
    Float(u8),
    String,
    DateTime,
    /// A closed set of string values
    Enumeration(Vec<String>),
    Slice(Box<Shape>),
    /// String-keyed map with the given value shape
    Map(Box<Shape>),
    /// Anything at all (dynamic values)
    Any,
    /// Optional or boxed value; transparent for documentation
    Pointer(Box<Shape>),
    Struct(Record),
}

#[derive(Debug, Clone)]
pub struct Record {
    pub name: String,
    pub fields: Fields,
}

/// How a record's fields are obtained.
#[derive(Debug, Clone)]
pub enum Fields {
    /// Produced on demand, so self-referencing types can be described
    Lazy(fn() -> Vec<FieldShape>),
    Eager(Vec<FieldShape>),
    /// Known by name only; cannot be expanded inline
    Opaque,
}

impl Fields {
    pub fn resolve(&self) -> Option<Vec<FieldShape>> {
        match self {
            Fields::Lazy(f) => Some(f()),
            Fields::Eager(fields) => Some(fields.clone()),
            Fields::Opaque => None,
        }
    }
}

/// One field of a record.
#[derive(Debug, Clone)]
pub struct FieldShape {
    /// Identifier in the source
    pub ident: String,
    /// Field-name annotation: `"photoUrls"`, `"-"` (skip), `"-,"` (literal `-`),
    /// `"id,omitempty"`
    pub rename: Option<String>,
    /// Tag mini-language string
    pub tag: Option<String>,
    pub shape: Shape,
}

impl FieldShape {
    pub fn new(ident: impl Into<String>, shape: Shape) -> Self {
        Self {
            ident: ident.into(),
            rename: None,
            tag: None,
            shape,
        }
    }

    pub fn of<T: Describe + ?Sized>(ident: impl Into<String>) -> Self {
        Self::new(ident, T::describe())
    }

    pub fn rename(mut self, rename: impl Into<String>) -> Self {
        self.rename = Some(rename.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The wire name, or `None` when the annotation suppresses the field.
    pub fn wire_name(&self) -> Option<String> {
        let Some(rename) = self.rename.as_deref() else {
            return Some(self.ident.clone());
        };
        match rename.split_once(',') {
            Some(("-", _)) => Some("-".to_string()),
            Some(("", _)) => Some(self.ident.clone()),
            Some((name, _)) => Some(name.to_string()),
            None if rename == "-" => None,
            None if rename.is_empty() => Some(self.ident.clone()),
            None => Some(rename.to_string()),
        }
    }
}

impl Shape {
    pub fn new(type_name: impl Into<String>, kind: Kind) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
        }
    }

    pub fn record(name: &str, fields: fn() -> Vec<FieldShape>) -> Self {
        Self::new(
            name,
            Kind::Struct(Record {
                name: name.to_string(),
                fields: Fields::Lazy(fields),
            }),
        )
    }

    pub fn enumeration(name: &str, variants: &[&str]) -> Self {
        Self::new(
            name,
            Kind::Enumeration(variants.iter().map(|v| v.to_string()).collect()),
        )
    }

    /// Strips any number of pointer layers.
    pub fn deref(&self) -> &Shape {
        let mut shape = self;
        while let Kind::Pointer(inner) = &shape.kind {
            shape = inner;
        }
        shape
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, Kind::Pointer(_))
    }
}

/// Wire type of a kind: `(type, format, is_container)`.
///
/// Pointers are looked through; containers (objects and arrays) need further expansion.
pub fn wire_type(kind: &Kind) -> (DataType, Option<&'static str>, bool) {
    match kind {
        Kind::Bool => (DataType::Boolean, None, false),
        Kind::Int(bits) | Kind::Uint(bits) => {
            let format = if *bits > 32 { "int64" } else { "int32" };
            (DataType::Integer, Some(format), false)
        }
        Kind::Float(32) => (DataType::Number, Some("float"), false),
        Kind::Float(_) => (DataType::Number, Some("double"), false),
        Kind::String | Kind::Enumeration(_) => (DataType::String, None, false),
        Kind::DateTime => (DataType::String, Some("date-time"), false),
        Kind::Slice(_) => (DataType::Array, None, true),
        Kind::Map(_) | Kind::Any | Kind::Struct(_) => (DataType::Object, None, true),
        Kind::Pointer(inner) => wire_type(&inner.kind),
    }
}

/// Types that can describe their own shape.
pub trait Describe {
    fn describe() -> Shape;
}

macro_rules! describe_scalar {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> Shape {
                    Shape::new(stringify!($ty), $kind)
                }
            }
        )*
    };
}

describe_scalar! {
    bool => Kind::Bool,
    i8 => Kind::Int(8),
    i16 => Kind::Int(16),
    i32 => Kind::Int(32),
    i64 => Kind::Int(64),
    i128 => Kind::Int(128),
    isize => Kind::Int(64),
    u8 => Kind::Uint(8),
    u16 => Kind::Uint(16),
    u32 => Kind::Uint(32),
    u64 => Kind::Uint(64),
    u128 => Kind::Uint(128),
    usize => Kind::Uint(64),
    f32 => Kind::Float(32),
    f64 => Kind::Float(64),
    char => Kind::String,
    String => Kind::String,
    str => Kind::String,
    std::time::SystemTime => Kind::DateTime,
    chrono::NaiveDateTime => Kind::DateTime,
    serde_json::Value => Kind::Any,
}

impl<Tz: chrono::TimeZone> Describe for chrono::DateTime<Tz> {
    fn describe() -> Shape {
        Shape::new("DateTime", Kind::DateTime)
    }
}

fn slice_of<T: Describe + ?Sized>(name: &str) -> Shape {
    let inner = T::describe();
    Shape::new(
        format!("{}<{}>", name, inner.type_name),
        Kind::Slice(Box::new(inner)),
    )
}

fn pointer_to<T: Describe + ?Sized>(name: &str) -> Shape {
    let inner = T::describe();
    Shape::new(
        format!("{}<{}>", name, inner.type_name),
        Kind::Pointer(Box::new(inner)),
    )
}

fn map_of<V: Describe + ?Sized>(name: &str) -> Shape {
    let inner = V::describe();
    Shape::new(
        format!("{}<String, {}>", name, inner.type_name),
        Kind::Map(Box::new(inner)),
    )
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> Shape {
        slice_of::<T>("Vec")
    }
}

impl<T: Describe> Describe for [T] {
    fn describe() -> Shape {
        slice_of::<T>("Slice")
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> Shape {
        slice_of::<T>("Array")
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn describe() -> Shape {
        slice_of::<T>("VecDeque")
    }
}

impl<T: Describe> Describe for HashSet<T> {
    fn describe() -> Shape {
        slice_of::<T>("HashSet")
    }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn describe() -> Shape {
        slice_of::<T>("BTreeSet")
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> Shape {
        pointer_to::<T>("Option")
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe() -> Shape {
        pointer_to::<T>("Box")
    }
}

impl<T: Describe + ?Sized> Describe for Rc<T> {
    fn describe() -> Shape {
        pointer_to::<T>("Rc")
    }
}

impl<T: Describe + ?Sized> Describe for Arc<T> {
    fn describe() -> Shape {
        pointer_to::<T>("Arc")
    }
}

impl<T: Describe + ?Sized> Describe for &T {
    fn describe() -> Shape {
        pointer_to::<T>("Ref")
    }
}

impl<K, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe() -> Shape {
        map_of::<V>("HashMap")
    }
}

impl<K, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> Shape {
        map_of::<V>("BTreeMap")
    }
}
