//! Instance, class and script records

use std::fmt;

use serde::Serialize;
use tracing::trace;

use super::stream::AbcReader;
use super::traits::{Trait, read_traits};
use crate::error::DecodeError;

#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct InstanceFlags(u8);

impl InstanceFlags {
    pub const SEALED: InstanceFlags = InstanceFlags(0x01);
    pub const FINAL: InstanceFlags = InstanceFlags(0x02);
    pub const INTERFACE: InstanceFlags = InstanceFlags(0x04);
    /// A protected namespace index follows the flags
    pub const PROTECTED_NS: InstanceFlags = InstanceFlags(0x08);

    pub const fn contains(self, other: InstanceFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Debug for InstanceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceFlags({:#04x})", self.0)
    }
}

/// Instance side of a class: what `new` produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceInfo {
    /// Multiname index of the class
    pub name: u32,
    /// Multiname index of the base class; 0 for none
    pub super_name: u32,
    pub flags: InstanceFlags,
    /// Namespace index, present only with [`InstanceFlags::PROTECTED_NS`]
    pub protected_ns: Option<u32>,
    /// Multiname indices
    pub interfaces: Vec<u32>,
    /// Constructor method index
    pub init: u32,
    pub traits: Vec<Trait>,
}

impl InstanceInfo {
    pub fn is_interface(&self) -> bool {
        self.flags.contains(InstanceFlags::INTERFACE)
    }

    pub(crate) fn read(reader: &mut AbcReader<'_>, verbose: bool) -> Result<Self, DecodeError> {
        let name = reader.read_u30()?;
        let super_name = reader.read_u30()?;
        let flags = InstanceFlags(reader.read_u8()?);
        let protected_ns = if flags.contains(InstanceFlags::PROTECTED_NS) {
            Some(reader.read_u30()?)
        } else {
            None
        };
        let (count, hint) = reader.read_count()?;
        let mut interfaces = Vec::with_capacity(hint);
        for _ in 0..count {
            interfaces.push(reader.read_u30()?);
        }
        let init = reader.read_u30()?;
        let traits = read_traits(reader, verbose)?;

        if verbose {
            trace!(name, super_name, traits = traits.len(), "instance");
        }
        Ok(InstanceInfo {
            name,
            super_name,
            flags,
            protected_ns,
            interfaces,
            init,
            traits,
        })
    }
}

/// Static side of a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    /// Static initializer method index
    pub init: u32,
    pub traits: Vec<Trait>,
}

impl ClassInfo {
    pub(crate) fn read(reader: &mut AbcReader<'_>, verbose: bool) -> Result<Self, DecodeError> {
        let init = reader.read_u30()?;
        let traits = read_traits(reader, verbose)?;
        Ok(ClassInfo { init, traits })
    }
}

/// Top-level script: an entry point plus the globals it defines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptInfo {
    pub init: u32,
    pub traits: Vec<Trait>,
}

impl ScriptInfo {
    pub(crate) fn read(reader: &mut AbcReader<'_>, verbose: bool) -> Result<Self, DecodeError> {
        let init = reader.read_u30()?;
        let traits = read_traits(reader, verbose)?;
        Ok(ScriptInfo { init, traits })
    }
}
