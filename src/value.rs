//! Script value representation
//!
//! The core [`Value`] type stored in object properties. Object references are
//! generational handles into the [`Heap`](crate::gc::Heap), so a value never
//! owns the object it names; the heap does the reference accounting when a
//! value is stored into or removed from a property slot.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::gc::ObjectId;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This trait makes it explicit when a clone is cheap (just incrementing a reference count
/// or copying a handle) vs when it might be expensive (copying data).
pub trait CheapClone: Clone {
    /// Create a cheap clone of this value.
    ///
    /// This is semantically identical to `clone()` but makes it explicit that
    /// the operation is O(1).
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Arc<T> {}

/// A script value
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(AsString),
    Object(ObjectId),
    /// Getter/setter pair; see [`Accessor`]
    Accessor(Accessor),
}

// Every variant is either Copy or an Arc
impl CheapClone for Value {}

/// An accessor property value.
///
/// Getter and setter are function objects. An accessor stored in a property
/// map is unbound; the heap binds it to the receiver the lookup started from,
/// so an accessor declared on a prototype operates on the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Accessor {
    pub getter: Option<ObjectId>,
    pub setter: Option<ObjectId>,
    /// Receiver the accessor is bound to (set at lookup time)
    pub target: Option<ObjectId>,
}

impl Accessor {
    pub fn new(getter: Option<ObjectId>, setter: Option<ObjectId>) -> Self {
        Self {
            getter,
            setter,
            target: None,
        }
    }

    /// Rebind this accessor to a concrete receiver
    pub fn bind(self, target: ObjectId) -> Self {
        Self {
            target: Some(target),
            ..self
        }
    }
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, Value::Accessor(_))
    }

    /// Get the referenced object, if this value is an object reference
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_accessor(&self) -> Option<&Accessor> {
        match self {
            Value::Accessor(accessor) => Some(accessor),
            _ => None,
        }
    }

    /// Visit every heap object this value keeps alive.
    ///
    /// The bound target of an accessor is a transient back-reference and is
    /// not reported.
    pub(crate) fn for_each_ref(&self, mut visitor: impl FnMut(ObjectId)) {
        match self {
            Value::Object(id) => visitor(*id),
            Value::Accessor(accessor) => {
                if let Some(getter) = accessor.getter {
                    visitor(getter);
                }
                if let Some(setter) = accessor.setter {
                    visitor(setter);
                }
            }
            Value::Undefined
            | Value::Null
            | Value::Boolean(_)
            | Value::Number(_)
            | Value::String(_) => {}
        }
    }

    /// True if this value holds `id` as an object or as an accessor function
    pub(crate) fn references(&self, id: ObjectId) -> bool {
        let mut found = false;
        self.for_each_ref(|r| found |= r == id);
        found
    }

    /// Convert to number.
    ///
    /// Strings must be a complete float literal (or `Infinity`, `-Infinity`,
    /// `NaN`); anything else converts to 0. Objects and accessors convert to
    /// 0 here; resolve accessors through the heap first.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined | Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s.as_str()).unwrap_or(0.0),
            Value::Object(_) | Value::Accessor(_) => 0.0,
        }
    }

    /// Convert to a 32-bit integer with wrap-around
    pub fn to_int(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        let wrapped = libm::fmod(libm::trunc(n), 4_294_967_296.0);
        let wrapped = if wrapped < 0.0 {
            wrapped + 4_294_967_296.0
        } else {
            wrapped
        };
        (wrapped as u32) as i32
    }

    /// Convert to boolean
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => match s.as_str() {
                "false" => false,
                "true" => true,
                other => {
                    let n = string_to_number(other).unwrap_or(0.0);
                    n != 0.0 && !n.is_nan()
                }
            },
            Value::Object(_) => true,
            Value::Accessor(_) => false,
        }
    }

    /// Convert to string
    pub fn to_display_string(&self) -> AsString {
        match self {
            Value::Undefined => AsString::from("undefined"),
            Value::Null => AsString::from("null"),
            Value::Boolean(true) => AsString::from("true"),
            Value::Boolean(false) => AsString::from("false"),
            Value::Number(n) => AsString::from(number_to_string(*n)),
            Value::String(s) => s.cheap_clone(),
            Value::Object(_) => AsString::from("[object Object]"),
            Value::Accessor(_) => AsString::from("[property]"),
        }
    }

    /// Strict equality: no conversions, NaN never equals itself
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Accessor(a), Value::Accessor(b)) => {
                a.getter == b.getter && a.setter == b.setter
            }
            _ => false,
        }
    }
}

/// Parse a complete float literal
pub fn string_to_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    match s {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        "NaN" => return Some(f64::NAN),
        "" => return None,
        _ => {}
    }
    // Rust's float parser also takes "inf" and "nan" spellings; scripts don't
    if s.bytes()
        .any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E')
    {
        return None;
    }
    s.parse::<f64>().ok()
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s.as_str()),
            Value::Object(id) => write!(f, "<object {}>", id),
            Value::Accessor(accessor) => {
                write!(f, "<property getter={:?} setter={:?}", accessor.getter, accessor.setter)?;
                if let Some(target) = accessor.target {
                    write!(f, " target={}", target)?;
                }
                write!(f, ">")
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(AsString::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(AsString::from(s))
    }
}

impl From<AsString> for Value {
    fn from(s: AsString) -> Self {
        Value::String(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

impl From<Accessor> for Value {
    fn from(accessor: Accessor) -> Self {
        Value::Accessor(accessor)
    }
}

/// Reference-counted, thread-shareable string
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AsString(Arc<str>);

// AsString wraps Arc<str>, so clone is cheap (just reference count increment)
impl CheapClone for AsString {}

impl AsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<str> for AsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for AsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AsString {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for AsString {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl From<&str> for AsString {
    fn from(s: &str) -> Self {
        AsString(Arc::from(s))
    }
}

impl From<String> for AsString {
    fn from(s: String) -> Self {
        AsString(Arc::from(s))
    }
}

impl fmt::Debug for AsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for AsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &*self.0)
    }
}
