//! Method bodies and exception handlers

use serde::{Serialize, Serializer};
use tracing::trace;

use super::stream::AbcReader;
use super::traits::{Trait, read_traits};
use crate::error::DecodeError;

/// A try/catch range. Offsets are relative to the start of the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    pub from: u32,
    pub to: u32,
    pub target: u32,
    /// Multiname index of the caught type; 0 catches everything
    pub exc_type: u32,
    /// Multiname index of the catch variable
    pub var_name: u32,
}

impl ExceptionInfo {
    fn read(reader: &mut AbcReader<'_>) -> Result<Self, DecodeError> {
        Ok(ExceptionInfo {
            from: reader.read_u30()?,
            to: reader.read_u30()?,
            target: reader.read_u30()?,
            exc_type: reader.read_u30()?,
            var_name: reader.read_u30()?,
        })
    }
}

fn serialize_code<S: Serializer>(code: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    let hex: String = code.iter().map(|b| format!("{b:02x}")).collect();
    serializer.serialize_str(&hex)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodBody {
    /// Method table index this body implements
    pub method: u32,
    pub max_stack: u32,
    pub local_count: u32,
    pub init_scope_depth: u32,
    pub max_scope_depth: u32,
    #[serde(serialize_with = "serialize_code")]
    pub code: Vec<u8>,
    pub exceptions: Vec<ExceptionInfo>,
    /// Activation object traits
    pub traits: Vec<Trait>,
}

impl MethodBody {
    pub(crate) fn read(reader: &mut AbcReader<'_>, verbose: bool) -> Result<Self, DecodeError> {
        let method = reader.read_u30()?;
        let max_stack = reader.read_u30()?;
        let local_count = reader.read_u30()?;
        let init_scope_depth = reader.read_u30()?;
        let max_scope_depth = reader.read_u30()?;

        let offset = reader.position();
        let code_length = reader.read_u30()?;
        if code_length as usize > reader.remaining() {
            return Err(DecodeError::LengthTooLarge {
                offset,
                len: code_length,
            });
        }
        let code = reader.read_bytes(code_length as usize)?.to_vec();

        let (count, hint) = reader.read_count()?;
        let mut exceptions = Vec::with_capacity(hint);
        for _ in 0..count {
            exceptions.push(ExceptionInfo::read(reader)?);
        }
        let traits = read_traits(reader, verbose)?;

        if verbose {
            trace!(method, code = code.len(), exceptions = exceptions.len(), "method body");
        }
        Ok(MethodBody {
            method,
            max_stack,
            local_count,
            init_scope_depth,
            max_scope_depth,
            code,
            exceptions,
            traits,
        })
    }
}
