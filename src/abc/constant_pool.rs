//! ABC constant pool
//!
//! Seven count-prefixed tables in fixed order: ints, uints, doubles,
//! strings, namespaces, namespace sets, multinames. A count of `n` is
//! followed by `n - 1` entries; index 0 of every table is a sentinel meaning
//! "any" and is never read from the stream. A count of 0 also means no
//! entries. The tables below always hold the sentinel, so `len() >= 1`.

use std::borrow::Cow;
use std::fmt;

use serde::{Serialize, Serializer};
use tracing::trace;

use super::stream::AbcReader;
use crate::error::DecodeError;

// ============================================================================
// Pool lookups
// ============================================================================

/// Result of a pool lookup that succeeded
#[derive(Debug, PartialEq)]
pub enum PoolRef<'a, T: ?Sized> {
    /// Index 0: the reserved "any" sentinel
    Any,
    Value(&'a T),
}

impl<T: ?Sized> Clone for PoolRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for PoolRef<'_, T> {}

impl<'a, T: ?Sized> PoolRef<'a, T> {
    pub fn is_any(self) -> bool {
        matches!(self, PoolRef::Any)
    }

    pub fn value(self) -> Option<&'a T> {
        match self {
            PoolRef::Any => None,
            PoolRef::Value(v) => Some(v),
        }
    }
}

/// `None` when out of range, `Any` for index 0
fn lookup<T>(table: &[T], index: u32) -> Option<PoolRef<'_, T>> {
    if index == 0 {
        return Some(PoolRef::Any);
    }
    table.get(index as usize).map(PoolRef::Value)
}

pub(crate) fn check_index(table: &'static str, index: u32, len: usize) -> Result<(), DecodeError> {
    if (index as usize) < len {
        Ok(())
    } else {
        Err(DecodeError::out_of_range(table, index, len))
    }
}

// ============================================================================
// Entries
// ============================================================================

/// Raw string bytes as written in the module (not necessarily UTF-8)
#[derive(Clone, PartialEq, Eq, Default)]
pub struct PoolString(Box<[u8]>);

impl PoolString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&[u8]> for PoolString {
    fn from(bytes: &[u8]) -> Self {
        PoolString(bytes.into())
    }
}

impl fmt::Debug for PoolString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_str_lossy())
    }
}

impl Serialize for PoolString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_str_lossy())
    }
}

/// Namespace kind byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NamespaceKind {
    Namespace,
    Package,
    PackageInternal,
    Protected,
    Explicit,
    StaticProtected,
    Private,
}

impl NamespaceKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x08 => NamespaceKind::Namespace,
            0x16 => NamespaceKind::Package,
            0x17 => NamespaceKind::PackageInternal,
            0x18 => NamespaceKind::Protected,
            0x19 => NamespaceKind::Explicit,
            0x1A => NamespaceKind::StaticProtected,
            0x05 => NamespaceKind::Private,
            _ => return None,
        })
    }

    pub fn to_byte(self) -> u8 {
        match self {
            NamespaceKind::Namespace => 0x08,
            NamespaceKind::Package => 0x16,
            NamespaceKind::PackageInternal => 0x17,
            NamespaceKind::Protected => 0x18,
            NamespaceKind::Explicit => 0x19,
            NamespaceKind::StaticProtected => 0x1A,
            NamespaceKind::Private => 0x05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
    pub kind: NamespaceKind,
    /// String index
    pub name: u32,
}

/// Multiname kind byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MultinameKind {
    QName,
    QNameA,
    RTQName,
    RTQNameA,
    RTQNameL,
    RTQNameLA,
    Multiname,
    MultinameA,
    MultinameL,
    MultinameLA,
    TypeName,
}

impl MultinameKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x07 => MultinameKind::QName,
            0x0D => MultinameKind::QNameA,
            0x0F => MultinameKind::RTQName,
            0x10 => MultinameKind::RTQNameA,
            0x11 => MultinameKind::RTQNameL,
            0x12 => MultinameKind::RTQNameLA,
            0x09 => MultinameKind::Multiname,
            0x0E => MultinameKind::MultinameA,
            0x1B => MultinameKind::MultinameL,
            0x1C => MultinameKind::MultinameLA,
            0x1D => MultinameKind::TypeName,
            _ => return None,
        })
    }

    pub fn flags(self) -> MultinameFlags {
        match self {
            MultinameKind::QName | MultinameKind::Multiname | MultinameKind::TypeName => {
                MultinameFlags::empty()
            }
            MultinameKind::QNameA | MultinameKind::MultinameA => MultinameFlags::ATTRIBUTE,
            MultinameKind::RTQName => MultinameFlags::RUNTIME_NAMESPACE,
            MultinameKind::RTQNameA => MultinameFlags::RUNTIME_NAMESPACE | MultinameFlags::ATTRIBUTE,
            MultinameKind::RTQNameL => MultinameFlags::RUNTIME_NAMESPACE | MultinameFlags::RUNTIME_NAME,
            MultinameKind::RTQNameLA => {
                MultinameFlags::RUNTIME_NAMESPACE
                    | MultinameFlags::RUNTIME_NAME
                    | MultinameFlags::ATTRIBUTE
            }
            MultinameKind::MultinameL => MultinameFlags::RUNTIME_NAME,
            MultinameKind::MultinameLA => MultinameFlags::RUNTIME_NAME | MultinameFlags::ATTRIBUTE,
        }
    }
}

/// Properties of a multiname implied by its kind
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct MultinameFlags(u8);

impl MultinameFlags {
    /// Names an XML attribute
    pub const ATTRIBUTE: MultinameFlags = MultinameFlags(0x01);
    /// Namespace comes from the operand stack
    pub const RUNTIME_NAMESPACE: MultinameFlags = MultinameFlags(0x02);
    /// Name comes from the operand stack
    pub const RUNTIME_NAME: MultinameFlags = MultinameFlags(0x04);

    pub const fn empty() -> Self {
        MultinameFlags(0)
    }

    pub const fn contains(self, other: MultinameFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for MultinameFlags {
    type Output = MultinameFlags;

    fn bitor(self, rhs: MultinameFlags) -> MultinameFlags {
        MultinameFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for MultinameFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MultinameFlags({:#04x})", self.0)
    }
}

/// Parameterized type reference such as `Vector.<int>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericName {
    /// Multiname index of the generic type
    pub base: u32,
    /// Multiname indices of the type parameters
    pub params: Vec<u32>,
}

/// A possibly qualified name.
///
/// Which indices are meaningful depends on `kind`; unused ones are 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Multiname {
    pub kind: MultinameKind,
    pub flags: MultinameFlags,
    /// Namespace index (QName kinds)
    pub namespace: u32,
    /// Namespace set index (Multiname kinds)
    pub ns_set: u32,
    /// String index
    pub name: u32,
    pub generic: Option<GenericName>,
}

impl Multiname {
    fn new(kind: MultinameKind) -> Self {
        Self {
            kind,
            flags: kind.flags(),
            namespace: 0,
            ns_set: 0,
            name: 0,
            generic: None,
        }
    }
}

// ============================================================================
// ConstantPool
// ============================================================================

const MAX_DISPLAY_DEPTH: usize = 8;
/// Multinames rendered per top-level display call
const MAX_DISPLAY_NODES: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct ConstantPool {
    ints: Vec<i32>,
    uints: Vec<u32>,
    doubles: Vec<f64>,
    strings: Vec<PoolString>,
    namespaces: Vec<Namespace>,
    ns_sets: Vec<Vec<u32>>,
    multinames: Vec<Multiname>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self {
            ints: vec![0],
            uints: vec![0],
            doubles: vec![f64::NAN],
            strings: vec![PoolString::default()],
            namespaces: vec![Namespace {
                kind: NamespaceKind::Namespace,
                name: 0,
            }],
            ns_sets: vec![Vec::new()],
            multinames: vec![Multiname::new(MultinameKind::QName)],
        }
    }
}

/// Read a count-prefixed table, keeping the sentinel in slot 0
fn read_table<'a, T>(
    reader: &mut AbcReader<'a>,
    table: &mut Vec<T>,
    mut read_entry: impl FnMut(&mut AbcReader<'a>) -> Result<T, DecodeError>,
) -> Result<(), DecodeError> {
    let (count, hint) = reader.read_count()?;
    table.reserve(hint);
    for _ in 1..count {
        table.push(read_entry(reader)?);
    }
    Ok(())
}

impl ConstantPool {
    pub(crate) fn read(reader: &mut AbcReader<'_>, verbose: bool) -> Result<Self, DecodeError> {
        let mut pool = ConstantPool::default();

        read_table(reader, &mut pool.ints, |r| r.read_s32())?;
        read_table(reader, &mut pool.uints, |r| r.read_u32())?;
        read_table(reader, &mut pool.doubles, |r| r.read_d64())?;
        read_table(reader, &mut pool.strings, |r| Ok(PoolString::from(r.read_string()?)))?;
        read_table(reader, &mut pool.namespaces, read_namespace)?;
        read_table(reader, &mut pool.ns_sets, |r| {
            let (count, hint) = r.read_count()?;
            let mut set = Vec::with_capacity(hint);
            for _ in 0..count {
                set.push(r.read_u30()?);
            }
            Ok(set)
        })?;
        read_table(reader, &mut pool.multinames, read_multiname)?;

        if verbose {
            trace!(
                ints = pool.ints.len(),
                uints = pool.uints.len(),
                doubles = pool.doubles.len(),
                strings = pool.strings.len(),
                namespaces = pool.namespaces.len(),
                ns_sets = pool.ns_sets.len(),
                multinames = pool.multinames.len(),
                "constant pool"
            );
        }
        Ok(pool)
    }

    pub fn get_int(&self, index: u32) -> Option<PoolRef<'_, i32>> {
        lookup(&self.ints, index)
    }

    pub fn get_uint(&self, index: u32) -> Option<PoolRef<'_, u32>> {
        lookup(&self.uints, index)
    }

    pub fn get_double(&self, index: u32) -> Option<PoolRef<'_, f64>> {
        lookup(&self.doubles, index)
    }

    pub fn get_string(&self, index: u32) -> Option<PoolRef<'_, PoolString>> {
        lookup(&self.strings, index)
    }

    pub fn get_namespace(&self, index: u32) -> Option<PoolRef<'_, Namespace>> {
        lookup(&self.namespaces, index)
    }

    pub fn get_ns_set(&self, index: u32) -> Option<PoolRef<'_, [u32]>> {
        if index == 0 {
            return Some(PoolRef::Any);
        }
        self.ns_sets
            .get(index as usize)
            .map(|set| PoolRef::Value(set.as_slice()))
    }

    pub fn get_multiname(&self, index: u32) -> Option<PoolRef<'_, Multiname>> {
        lookup(&self.multinames, index)
    }

    // Table sizes, sentinel included

    pub fn int_count(&self) -> usize {
        self.ints.len()
    }

    pub fn uint_count(&self) -> usize {
        self.uints.len()
    }

    pub fn double_count(&self) -> usize {
        self.doubles.len()
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    pub fn ns_set_count(&self) -> usize {
        self.ns_sets.len()
    }

    pub fn multiname_count(&self) -> usize {
        self.multinames.len()
    }

    pub(crate) fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub(crate) fn ns_sets(&self) -> &[Vec<u32>] {
        &self.ns_sets
    }

    pub(crate) fn multinames(&self) -> &[Multiname] {
        &self.multinames
    }

    /// String entry as text; `*` for the sentinel, `?` when out of range
    pub fn string_lossy(&self, index: u32) -> Cow<'_, str> {
        match self.get_string(index) {
            Some(PoolRef::Value(s)) => s.to_str_lossy(),
            Some(PoolRef::Any) => Cow::Borrowed("*"),
            None => Cow::Borrowed("?"),
        }
    }

    /// Render a multiname as `namespace::name` for diagnostics
    pub fn multiname_display(&self, index: u32) -> String {
        let mut budget = MAX_DISPLAY_NODES;
        self.display_nested(index, 0, &mut budget)
    }

    fn display_nested(&self, index: u32, depth: usize, budget: &mut usize) -> String {
        // Type names may refer to themselves
        if depth > MAX_DISPLAY_DEPTH || *budget == 0 {
            return "...".to_string();
        }
        *budget -= 1;
        let multiname = match self.get_multiname(index) {
            Some(PoolRef::Value(m)) => m,
            Some(PoolRef::Any) => return "*".to_string(),
            None => return format!("<invalid multiname {index}>"),
        };
        let name = if multiname.flags.contains(MultinameFlags::RUNTIME_NAME) {
            Cow::Borrowed("[runtime]")
        } else {
            self.string_lossy(multiname.name)
        };
        match multiname.kind {
            MultinameKind::QName | MultinameKind::QNameA => {
                let ns = match self.get_namespace(multiname.namespace) {
                    Some(PoolRef::Value(ns)) => self.string_lossy(ns.name),
                    _ => Cow::Borrowed("*"),
                };
                if ns.is_empty() {
                    name.into_owned()
                } else {
                    format!("{ns}::{name}")
                }
            }
            MultinameKind::TypeName => match &multiname.generic {
                Some(generic) => {
                    let params: Vec<String> = generic
                        .params
                        .iter()
                        .map(|p| self.display_nested(*p, depth + 1, budget))
                        .collect();
                    let base = self.display_nested(generic.base, depth + 1, budget);
                    format!("{}.<{}>", base, params.join(", "))
                }
                None => "<generic>".to_string(),
            },
            MultinameKind::RTQName
            | MultinameKind::RTQNameA
            | MultinameKind::RTQNameL
            | MultinameKind::RTQNameLA => format!("[runtime]::{name}"),
            MultinameKind::Multiname
            | MultinameKind::MultinameA
            | MultinameKind::MultinameL
            | MultinameKind::MultinameLA => format!("{{set {}}}::{name}", multiname.ns_set),
        }
    }

    /// Check every index held by namespace, set and multiname entries
    pub(crate) fn validate(&self) -> Result<(), DecodeError> {
        let strings = self.strings.len();
        let namespaces = self.namespaces.len();
        let ns_sets = self.ns_sets.len();
        let multinames = self.multinames.len();

        for ns in &self.namespaces {
            check_index("string", ns.name, strings)?;
        }
        for set in &self.ns_sets {
            for ns in set {
                check_index("namespace", *ns, namespaces)?;
            }
        }
        for multiname in &self.multinames {
            check_index("namespace", multiname.namespace, namespaces)?;
            check_index("namespace set", multiname.ns_set, ns_sets)?;
            check_index("string", multiname.name, strings)?;
            if let Some(generic) = &multiname.generic {
                check_index("multiname", generic.base, multinames)?;
                for param in &generic.params {
                    check_index("multiname", *param, multinames)?;
                }
            }
        }
        Ok(())
    }
}

fn read_namespace(reader: &mut AbcReader<'_>) -> Result<Namespace, DecodeError> {
    let offset = reader.position();
    let byte = reader.read_u8()?;
    let kind = NamespaceKind::from_byte(byte)
        .ok_or(DecodeError::InvalidNamespaceKind { offset, kind: byte })?;
    let name = reader.read_u30()?;
    Ok(Namespace { kind, name })
}

fn read_multiname(reader: &mut AbcReader<'_>) -> Result<Multiname, DecodeError> {
    let offset = reader.position();
    let byte = reader.read_u8()?;
    let kind = MultinameKind::from_byte(byte)
        .ok_or(DecodeError::InvalidMultinameKind { offset, kind: byte })?;

    let mut multiname = Multiname::new(kind);
    match kind {
        MultinameKind::QName | MultinameKind::QNameA => {
            multiname.namespace = reader.read_u30()?;
            multiname.name = reader.read_u30()?;
        }
        MultinameKind::RTQName | MultinameKind::RTQNameA => {
            multiname.name = reader.read_u30()?;
        }
        MultinameKind::RTQNameL | MultinameKind::RTQNameLA => {}
        MultinameKind::Multiname | MultinameKind::MultinameA => {
            multiname.name = reader.read_u30()?;
            multiname.ns_set = reader.read_u30()?;
        }
        MultinameKind::MultinameL | MultinameKind::MultinameLA => {
            multiname.ns_set = reader.read_u30()?;
        }
        MultinameKind::TypeName => {
            let base = reader.read_u30()?;
            let (count, hint) = reader.read_count()?;
            let mut params = Vec::with_capacity(hint);
            for _ in 0..count {
                params.push(reader.read_u30()?);
            }
            multiname.generic = Some(GenericName { base, params });
        }
    }
    Ok(multiname)
}
