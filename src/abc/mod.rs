//! ABC (ActionScript Byte Code) module decoder
//!
//! Decodes a compiled module from an in-memory buffer into a [`ModuleGraph`]:
//!
//! ```text
//! u16 minor_version
//! u16 major_version
//! constant pool
//! u30 method_count,   method_info[]
//! u30 metadata_count, metadata_info[]
//! u30 class_count,    instance_info[class_count], class_info[class_count]
//! u30 script_count,   script_info[]
//! u30 body_count,     method_body_info[]
//! ```
//!
//! Decoding is all-or-nothing. Records are collected into locals and the
//! graph is assembled and validated only after the whole stream has been
//! read; any failure discards everything.

mod body;
mod class;
mod constant_pool;
mod metadata;
mod method;
mod stream;
mod traits;
mod validate;

pub use body::{ExceptionInfo, MethodBody};
pub use class::{ClassInfo, InstanceFlags, InstanceInfo, ScriptInfo};
pub use constant_pool::{
    ConstantPool, GenericName, Multiname, MultinameFlags, MultinameKind, Namespace, NamespaceKind,
    PoolRef, PoolString,
};
pub use metadata::{MetadataInfo, MetadataItem};
pub use method::{ConstantKind, MethodFlags, MethodInfo, OptionDetail};
pub use stream::AbcReader;
pub use traits::{SlotValue, Trait, TraitAttributes, TraitData, TraitKind};

use std::borrow::Cow;

use serde::Serialize;
use tracing::{debug, debug_span};

use crate::config::{ABC_MAJOR_VERSION, RuntimeConfig};
use crate::error::DecodeError;

/// Decoder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Required major version; `None` accepts any
    pub expected_major_version: Option<u16>,
    /// Trace every record as it is read
    pub verbose: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            expected_major_version: Some(ABC_MAJOR_VERSION),
            verbose: false,
        }
    }
}

impl From<&RuntimeConfig> for DecodeOptions {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            expected_major_version: config.expected_major_version,
            verbose: config.verbose_parse,
        }
    }
}

/// A decoded module. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleGraph {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub methods: Vec<MethodInfo>,
    pub metadata: Vec<MetadataInfo>,
    pub instances: Vec<InstanceInfo>,
    pub classes: Vec<ClassInfo>,
    pub scripts: Vec<ScriptInfo>,
    pub bodies: Vec<MethodBody>,
}

impl ModuleGraph {
    /// Decode with default options
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Decoder::default().decode(bytes)
    }

    pub fn get_string(&self, index: u32) -> Option<PoolRef<'_, PoolString>> {
        self.constant_pool.get_string(index)
    }

    pub fn get_namespace(&self, index: u32) -> Option<PoolRef<'_, Namespace>> {
        self.constant_pool.get_namespace(index)
    }

    pub fn get_multiname(&self, index: u32) -> Option<PoolRef<'_, Multiname>> {
        self.constant_pool.get_multiname(index)
    }

    /// Render a multiname as `namespace::name`
    pub fn multiname_display(&self, index: u32) -> String {
        self.constant_pool.multiname_display(index)
    }

    /// Body implementing method `method`, if it has one
    pub fn method_body(&self, method: u32) -> Option<&MethodBody> {
        self.bodies.iter().find(|body| body.method == method)
    }

    /// Name of the method at `method`; `?` when out of range
    pub fn method_name(&self, method: u32) -> Cow<'_, str> {
        match self.methods.get(method as usize) {
            Some(info) => self.constant_pool.string_lossy(info.name),
            None => Cow::Borrowed("?"),
        }
    }

    /// Qualified name of class `class`
    pub fn class_name(&self, class: u32) -> Option<String> {
        let instance = self.instances.get(class as usize)?;
        Some(self.multiname_display(instance.name))
    }
}

/// Module decoder
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

fn read_records<'a, T>(
    reader: &mut AbcReader<'a>,
    count: usize,
    hint: usize,
    mut read: impl FnMut(&mut AbcReader<'a>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let mut records = Vec::with_capacity(hint);
    for _ in 0..count {
        records.push(read(reader)?);
    }
    Ok(records)
}

impl Decoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode a whole module
    pub fn decode(&self, bytes: &[u8]) -> Result<ModuleGraph, DecodeError> {
        let span = debug_span!("abc_decode", len = bytes.len());
        let _guard = span.enter();

        let result = self.decode_inner(bytes);
        match &result {
            Ok(graph) => debug!(
                methods = graph.methods.len(),
                classes = graph.classes.len(),
                scripts = graph.scripts.len(),
                bodies = graph.bodies.len(),
                "decoded module"
            ),
            Err(err) => debug!(error = %err, "decode failed"),
        }
        result
    }

    fn decode_inner(&self, bytes: &[u8]) -> Result<ModuleGraph, DecodeError> {
        let verbose = self.options.verbose;
        let mut reader = AbcReader::new(bytes);

        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;
        if let Some(expected) = self.options.expected_major_version {
            if major_version != expected {
                return Err(DecodeError::UnsupportedVersion {
                    major: major_version,
                    minor: minor_version,
                });
            }
        }

        let constant_pool = ConstantPool::read(&mut reader, verbose)?;

        let (count, hint) = reader.read_count()?;
        let methods = read_records(&mut reader, count, hint, |r| MethodInfo::read(r, verbose))?;

        let (count, hint) = reader.read_count()?;
        let metadata = read_records(&mut reader, count, hint, MetadataInfo::read)?;

        // One instance and one class record per class
        let (class_count, hint) = reader.read_count()?;
        let instances = read_records(&mut reader, class_count, hint, |r| {
            InstanceInfo::read(r, verbose)
        })?;
        let classes = read_records(&mut reader, class_count, hint, |r| ClassInfo::read(r, verbose))?;

        let (count, hint) = reader.read_count()?;
        let scripts = read_records(&mut reader, count, hint, |r| ScriptInfo::read(r, verbose))?;

        let (count, hint) = reader.read_count()?;
        let bodies = read_records(&mut reader, count, hint, |r| MethodBody::read(r, verbose))?;

        if !reader.is_at_end() {
            debug!(trailing = reader.remaining(), "ignoring trailing bytes");
        }

        let graph = ModuleGraph {
            minor_version,
            major_version,
            constant_pool,
            methods,
            metadata,
            instances,
            classes,
            scripts,
            bodies,
        };
        validate::validate(&graph)?;
        Ok(graph)
    }
}

/// Decode a module with default options
pub fn decode(bytes: &[u8]) -> Result<ModuleGraph, DecodeError> {
    ModuleGraph::decode(bytes)
}
