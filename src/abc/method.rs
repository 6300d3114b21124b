//! Method signatures

use std::fmt;

use serde::Serialize;
use tracing::trace;

use super::stream::AbcReader;
use crate::error::DecodeError;

/// Kind byte attached to a default value (optional parameters, slot values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstantKind {
    Undefined,
    Utf8,
    Int,
    UInt,
    PrivateNs,
    Double,
    Namespace,
    False,
    True,
    Null,
    PackageNamespace,
    PackageInternalNs,
    ProtectedNamespace,
    ExplicitNamespace,
    StaticProtectedNs,
}

impl ConstantKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => ConstantKind::Undefined,
            0x01 => ConstantKind::Utf8,
            0x03 => ConstantKind::Int,
            0x04 => ConstantKind::UInt,
            0x05 => ConstantKind::PrivateNs,
            0x06 => ConstantKind::Double,
            0x08 => ConstantKind::Namespace,
            0x0A => ConstantKind::False,
            0x0B => ConstantKind::True,
            0x0C => ConstantKind::Null,
            0x16 => ConstantKind::PackageNamespace,
            0x17 => ConstantKind::PackageInternalNs,
            0x18 => ConstantKind::ProtectedNamespace,
            0x19 => ConstantKind::ExplicitNamespace,
            0x1A => ConstantKind::StaticProtectedNs,
            _ => return None,
        })
    }

    pub(crate) fn read(reader: &mut AbcReader<'_>) -> Result<Self, DecodeError> {
        let offset = reader.position();
        let byte = reader.read_u8()?;
        Self::from_byte(byte).ok_or(DecodeError::InvalidConstantKind { offset, kind: byte })
    }

    /// Pool table the value index points into, if any
    pub fn table(self) -> Option<&'static str> {
        match self {
            ConstantKind::Utf8 => Some("string"),
            ConstantKind::Int => Some("int"),
            ConstantKind::UInt => Some("uint"),
            ConstantKind::Double => Some("double"),
            ConstantKind::PrivateNs
            | ConstantKind::Namespace
            | ConstantKind::PackageNamespace
            | ConstantKind::PackageInternalNs
            | ConstantKind::ProtectedNamespace
            | ConstantKind::ExplicitNamespace
            | ConstantKind::StaticProtectedNs => Some("namespace"),
            ConstantKind::Undefined
            | ConstantKind::False
            | ConstantKind::True
            | ConstantKind::Null => None,
        }
    }
}

/// Default value of an optional parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptionDetail {
    /// Index into the table selected by `kind`
    pub value: u32,
    pub kind: ConstantKind,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct MethodFlags(u8);

impl MethodFlags {
    pub const NEED_ARGUMENTS: MethodFlags = MethodFlags(0x01);
    pub const NEED_ACTIVATION: MethodFlags = MethodFlags(0x02);
    pub const NEED_REST: MethodFlags = MethodFlags(0x04);
    pub const HAS_OPTIONAL: MethodFlags = MethodFlags(0x08);
    pub const NATIVE: MethodFlags = MethodFlags(0x20);
    pub const SET_DXNS: MethodFlags = MethodFlags(0x40);
    pub const HAS_PARAM_NAMES: MethodFlags = MethodFlags(0x80);

    pub const fn from_bits(bits: u8) -> Self {
        MethodFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: MethodFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Debug for MethodFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodFlags({:#04x})", self.0)
    }
}

/// A method signature. The body, if any, is a separate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    /// Multiname index; 0 means any type
    pub return_type: u32,
    /// Multiname index per parameter
    pub param_types: Vec<u32>,
    /// String index
    pub name: u32,
    pub flags: MethodFlags,
    /// Defaults for the trailing optional parameters
    pub options: Vec<OptionDetail>,
    /// String index per parameter, when present
    pub param_names: Vec<u32>,
}

impl MethodInfo {
    pub(crate) fn read(reader: &mut AbcReader<'_>, verbose: bool) -> Result<Self, DecodeError> {
        let (param_count, hint) = reader.read_count()?;
        let return_type = reader.read_u30()?;
        let mut param_types = Vec::with_capacity(hint);
        for _ in 0..param_count {
            param_types.push(reader.read_u30()?);
        }
        let name = reader.read_u30()?;
        let flags = MethodFlags(reader.read_u8()?);

        let mut options = Vec::new();
        if flags.contains(MethodFlags::HAS_OPTIONAL) {
            let (count, hint) = reader.read_count()?;
            options.reserve(hint);
            for _ in 0..count {
                let value = reader.read_u30()?;
                let kind = ConstantKind::read(reader)?;
                options.push(OptionDetail { value, kind });
            }
        }

        let mut param_names = Vec::new();
        if flags.contains(MethodFlags::HAS_PARAM_NAMES) {
            param_names.reserve(hint);
            for _ in 0..param_count {
                param_names.push(reader.read_u30()?);
            }
        }

        if verbose {
            trace!(name, params = param_count, flags = flags.0, "method");
        }
        Ok(MethodInfo {
            return_type,
            param_types,
            name,
            flags,
            options,
            param_names,
        })
    }
}
