//! Property table
//!
//! Objects store their own properties in an insertion-ordered map keyed by
//! case-insensitive names. Enumeration order is insertion order; updating an
//! existing key keeps its position and the spelling it was first defined with.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitOr, BitOrAssign};

use indexmap::{Equivalent, IndexMap};
use rustc_hash::FxBuildHasher;

use crate::value::{AsString, CheapClone, Value};

/// Protection flags of a property.
///
/// All clear by default: writable, enumerable, deletable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    /// Hidden from enumeration
    pub const NON_ENUMERABLE: PropertyFlags = PropertyFlags(0x01);
    /// Survives `delete`
    pub const NON_DELETABLE: PropertyFlags = PropertyFlags(0x02);
    /// Writes are silently dropped
    pub const READ_ONLY: PropertyFlags = PropertyFlags(0x04);
    /// Locks the flags themselves; further updates are ignored
    pub const PROTECTED: PropertyFlags = PropertyFlags(0x08);

    const MASK: u8 = 0x0F;

    pub const fn empty() -> Self {
        PropertyFlags(0)
    }

    /// Build from raw bits, dropping unknown ones
    pub const fn from_bits_truncate(bits: u8) -> Self {
        PropertyFlags(bits & Self::MASK)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: PropertyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_read_only(self) -> bool {
        self.contains(Self::READ_ONLY)
    }

    pub const fn is_enumerable(self) -> bool {
        !self.contains(Self::NON_ENUMERABLE)
    }

    pub const fn is_deletable(self) -> bool {
        !self.contains(Self::NON_DELETABLE)
    }

    pub const fn is_protected(self) -> bool {
        self.contains(Self::PROTECTED)
    }

    /// Clear `set_false`, then set `set_true`. Protected flags never change.
    ///
    /// Returns the resulting flags.
    pub fn update(&mut self, set_true: PropertyFlags, set_false: PropertyFlags) -> PropertyFlags {
        if !self.is_protected() {
            self.0 = (self.0 & !set_false.0) | set_true.0;
        }
        *self
    }
}

impl BitOr for PropertyFlags {
    type Output = PropertyFlags;

    fn bitor(self, rhs: PropertyFlags) -> PropertyFlags {
        PropertyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertyFlags {
    fn bitor_assign(&mut self, rhs: PropertyFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for PropertyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_read_only() {
            names.push("READ_ONLY");
        }
        if !self.is_enumerable() {
            names.push("NON_ENUMERABLE");
        }
        if !self.is_deletable() {
            names.push("NON_DELETABLE");
        }
        if self.is_protected() {
            names.push("PROTECTED");
        }
        write!(f, "PropertyFlags({})", names.join(" | "))
    }
}

/// A property slot: value plus protection flags
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Property {
    pub value: Value,
    pub flags: PropertyFlags,
}

impl Property {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            flags: PropertyFlags::empty(),
        }
    }

    pub fn with_flags(value: Value, flags: PropertyFlags) -> Self {
        Self { value, flags }
    }
}

/// A property name compared and hashed without regard to ASCII case
#[derive(Clone)]
pub struct PropertyName(AsString);

impl CheapClone for PropertyName {}

impl PropertyName {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_string(&self) -> &AsString {
        &self.0
    }
}

fn hash_folded<H: Hasher>(name: &str, state: &mut H) {
    for b in name.bytes() {
        state.write_u8(b.to_ascii_lowercase());
    }
    state.write_u8(0xff);
}

impl Hash for PropertyName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_folded(self.as_str(), state);
    }
}

impl PartialEq for PropertyName {
    fn eq(&self, other: &Self) -> bool {
        self.as_str().eq_ignore_ascii_case(other.as_str())
    }
}

impl Eq for PropertyName {}

impl From<&str> for PropertyName {
    fn from(s: &str) -> Self {
        PropertyName(AsString::from(s))
    }
}

impl From<AsString> for PropertyName {
    fn from(s: AsString) -> Self {
        PropertyName(s)
    }
}

impl fmt::Debug for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed lookup key, hashed the same way as [`PropertyName`]
struct NameRef<'a>(&'a str);

impl Hash for NameRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_folded(self.0, state);
    }
}

impl Equivalent<PropertyName> for NameRef<'_> {
    fn equivalent(&self, key: &PropertyName) -> bool {
        self.0.eq_ignore_ascii_case(key.as_str())
    }
}

/// Insertion-ordered, case-insensitive property map owned by one object
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: IndexMap<PropertyName, Property, FxBuildHasher>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.entries.get(&NameRef(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.entries.get_mut(&NameRef(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&NameRef(name))
    }

    /// Insert or replace. A replaced key keeps its position; a new key goes last.
    ///
    /// Returns the previous property, if any.
    pub fn insert(&mut self, name: PropertyName, property: Property) -> Option<Property> {
        self.entries.insert(name, property)
    }

    /// Remove a property, keeping the order of the rest
    pub fn remove(&mut self, name: &str) -> Option<Property> {
        self.entries.shift_remove(&NameRef(name))
    }

    /// Entry at insertion position `index`
    pub fn get_index(&self, index: usize) -> Option<(&PropertyName, &Property)> {
        self.entries.get_index(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &Property)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&PropertyName, &mut Property)> {
        self.entries.iter_mut()
    }

    /// Remove every property, handing back the values in insertion order
    pub fn take_all(&mut self) -> Vec<Property> {
        self.entries.drain(..).map(|(_, property)| property).collect()
    }
}
