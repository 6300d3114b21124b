//! Error types for the runtime and the ABC decoder
//!
//! Property operations on the heap never fail with an error: they report
//! `bool`/`Option` results. Only module decoding and configuration loading
//! produce `Result`s.

use thiserror::Error;

/// Failure while decoding an ABC module.
///
/// Any of these aborts the decode of the whole module; no partially built
/// graph is ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unexpected end of stream at offset {offset}: needed {needed} more byte(s)")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("variable-length integer at offset {offset} is longer than 5 bytes")]
    VarintTooLong { offset: usize },

    #[error("unsupported ABC version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("invalid namespace kind 0x{kind:02X} at offset {offset}")]
    InvalidNamespaceKind { offset: usize, kind: u8 },

    #[error("invalid multiname kind 0x{kind:02X} at offset {offset}")]
    InvalidMultinameKind { offset: usize, kind: u8 },

    #[error("invalid trait kind {kind} at offset {offset}")]
    InvalidTraitKind { offset: usize, kind: u8 },

    #[error("invalid constant kind 0x{kind:02X} at offset {offset}")]
    InvalidConstantKind { offset: usize, kind: u8 },

    #[error("{table} index {index} out of range (table has {len} entries)")]
    IndexOutOfRange {
        table: &'static str,
        index: u32,
        len: usize,
    },

    #[error("length {len} at offset {offset} exceeds the remaining input")]
    LengthTooLarge { offset: usize, len: u32 },
}

impl DecodeError {
    pub(crate) fn out_of_range(table: &'static str, index: u32, len: usize) -> Self {
        DecodeError::IndexOutOfRange { table, index, len }
    }
}

/// Failure while loading a [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
}
