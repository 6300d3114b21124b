//! Metadata records (`[Name(key="value")]` annotations)

use serde::Serialize;

use super::stream::AbcReader;
use crate::error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetadataItem {
    /// String index; 0 for a keyless item
    pub key: u32,
    /// String index
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataInfo {
    /// String index
    pub name: u32,
    pub items: Vec<MetadataItem>,
}

impl MetadataInfo {
    /// Layout: name, item count, every key, then every value
    pub(crate) fn read(reader: &mut AbcReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_u30()?;
        let (count, hint) = reader.read_count()?;
        let mut keys = Vec::with_capacity(hint);
        for _ in 0..count {
            keys.push(reader.read_u30()?);
        }
        let mut items = Vec::with_capacity(hint);
        for key in keys {
            let value = reader.read_u30()?;
            items.push(MetadataItem { key, value });
        }
        Ok(MetadataInfo { name, items })
    }
}
