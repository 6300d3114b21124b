//! Traits: declared members of instances, classes, scripts and activations
//!
//! Layout: name (multiname index), kind byte, kind-specific data, then
//! metadata indices when the metadata attribute is set. The low nibble of
//! the kind byte selects the kind, the high nibble holds attributes.

use std::fmt;

use serde::Serialize;
use tracing::trace;

use super::method::ConstantKind;
use super::stream::AbcReader;
use crate::error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraitKind {
    Slot,
    Method,
    Getter,
    Setter,
    Class,
    Function,
    Const,
}

impl TraitKind {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        Some(match nibble {
            0 => TraitKind::Slot,
            1 => TraitKind::Method,
            2 => TraitKind::Getter,
            3 => TraitKind::Setter,
            4 => TraitKind::Class,
            5 => TraitKind::Function,
            6 => TraitKind::Const,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TraitAttributes(u8);

impl TraitAttributes {
    pub const FINAL: TraitAttributes = TraitAttributes(0x1);
    pub const OVERRIDE: TraitAttributes = TraitAttributes(0x2);
    pub const METADATA: TraitAttributes = TraitAttributes(0x4);

    pub const fn contains(self, other: TraitAttributes) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Debug for TraitAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraitAttributes({:#x})", self.0)
    }
}

/// Default value of a slot or const
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotValue {
    pub index: u32,
    pub kind: ConstantKind,
}

/// Kind-specific trait payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TraitData {
    Slot {
        slot_id: u32,
        /// Multiname index; 0 means any type
        type_name: u32,
        value: Option<SlotValue>,
    },
    Const {
        slot_id: u32,
        type_name: u32,
        value: Option<SlotValue>,
    },
    Class {
        slot_id: u32,
        /// Class table index
        class: u32,
    },
    Function {
        slot_id: u32,
        /// Method table index
        function: u32,
    },
    Method {
        disp_id: u32,
        method: u32,
    },
    Getter {
        disp_id: u32,
        method: u32,
    },
    Setter {
        disp_id: u32,
        method: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trait {
    /// Multiname index
    pub name: u32,
    pub attributes: TraitAttributes,
    pub data: TraitData,
    /// Metadata table indices
    pub metadata: Vec<u32>,
}

impl Trait {
    pub fn kind(&self) -> TraitKind {
        match self.data {
            TraitData::Slot { .. } => TraitKind::Slot,
            TraitData::Const { .. } => TraitKind::Const,
            TraitData::Class { .. } => TraitKind::Class,
            TraitData::Function { .. } => TraitKind::Function,
            TraitData::Method { .. } => TraitKind::Method,
            TraitData::Getter { .. } => TraitKind::Getter,
            TraitData::Setter { .. } => TraitKind::Setter,
        }
    }

    /// Method table index for method, getter, setter and function traits
    pub fn method(&self) -> Option<u32> {
        match self.data {
            TraitData::Method { method, .. }
            | TraitData::Getter { method, .. }
            | TraitData::Setter { method, .. } => Some(method),
            TraitData::Function { function, .. } => Some(function),
            TraitData::Slot { .. } | TraitData::Const { .. } | TraitData::Class { .. } => None,
        }
    }

    fn read(reader: &mut AbcReader<'_>, verbose: bool) -> Result<Self, DecodeError> {
        let name = reader.read_u30()?;
        let offset = reader.position();
        let byte = reader.read_u8()?;
        let kind = TraitKind::from_nibble(byte & 0x0F)
            .ok_or(DecodeError::InvalidTraitKind { offset, kind: byte & 0x0F })?;
        let attributes = TraitAttributes(byte >> 4);

        let data = match kind {
            TraitKind::Slot | TraitKind::Const => {
                let slot_id = reader.read_u30()?;
                let type_name = reader.read_u30()?;
                let index = reader.read_u30()?;
                let value = if index == 0 {
                    None
                } else {
                    Some(SlotValue {
                        index,
                        kind: ConstantKind::read(reader)?,
                    })
                };
                if kind == TraitKind::Slot {
                    TraitData::Slot {
                        slot_id,
                        type_name,
                        value,
                    }
                } else {
                    TraitData::Const {
                        slot_id,
                        type_name,
                        value,
                    }
                }
            }
            TraitKind::Class => TraitData::Class {
                slot_id: reader.read_u30()?,
                class: reader.read_u30()?,
            },
            TraitKind::Function => TraitData::Function {
                slot_id: reader.read_u30()?,
                function: reader.read_u30()?,
            },
            TraitKind::Method => TraitData::Method {
                disp_id: reader.read_u30()?,
                method: reader.read_u30()?,
            },
            TraitKind::Getter => TraitData::Getter {
                disp_id: reader.read_u30()?,
                method: reader.read_u30()?,
            },
            TraitKind::Setter => TraitData::Setter {
                disp_id: reader.read_u30()?,
                method: reader.read_u30()?,
            },
        };

        let mut metadata = Vec::new();
        if attributes.contains(TraitAttributes::METADATA) {
            let (count, hint) = reader.read_count()?;
            metadata.reserve(hint);
            for _ in 0..count {
                metadata.push(reader.read_u30()?);
            }
        }

        if verbose {
            trace!(name, kind = ?kind, "trait");
        }
        Ok(Trait {
            name,
            attributes,
            data,
            metadata,
        })
    }
}

/// Read a count-prefixed trait list
pub(crate) fn read_traits(reader: &mut AbcReader<'_>, verbose: bool) -> Result<Vec<Trait>, DecodeError> {
    let (count, hint) = reader.read_count()?;
    let mut traits = Vec::with_capacity(hint);
    for _ in 0..count {
        traits.push(Trait::read(reader, verbose)?);
    }
    Ok(traits)
}
