//! Cross-table index checks run after a module is fully read
//!
//! Records only store indices. Before a graph is handed out, every index is
//! checked against the table it points into so consumers can resolve them
//! without further bounds handling. Pool tables include the index-0
//! sentinel; method, metadata and class tables have none.

use super::ModuleGraph;
use super::constant_pool::{ConstantPool, check_index};
use super::method::ConstantKind;
use super::traits::{Trait, TraitData};
use crate::error::DecodeError;

struct Limits {
    strings: usize,
    ints: usize,
    uints: usize,
    doubles: usize,
    namespaces: usize,
    multinames: usize,
    methods: usize,
    metadata: usize,
    classes: usize,
}

impl Limits {
    fn new(graph: &ModuleGraph) -> Self {
        let pool: &ConstantPool = &graph.constant_pool;
        Self {
            strings: pool.string_count(),
            ints: pool.int_count(),
            uints: pool.uint_count(),
            doubles: pool.double_count(),
            namespaces: pool.namespace_count(),
            multinames: pool.multiname_count(),
            methods: graph.methods.len(),
            metadata: graph.metadata.len(),
            classes: graph.classes.len(),
        }
    }

    fn string(&self, index: u32) -> Result<(), DecodeError> {
        check_index("string", index, self.strings)
    }

    fn multiname(&self, index: u32) -> Result<(), DecodeError> {
        check_index("multiname", index, self.multinames)
    }

    fn method(&self, index: u32) -> Result<(), DecodeError> {
        check_index("method", index, self.methods)
    }

    fn constant(&self, index: u32, kind: ConstantKind) -> Result<(), DecodeError> {
        let len = match kind {
            ConstantKind::Utf8 => self.strings,
            ConstantKind::Int => self.ints,
            ConstantKind::UInt => self.uints,
            ConstantKind::Double => self.doubles,
            ConstantKind::PrivateNs
            | ConstantKind::Namespace
            | ConstantKind::PackageNamespace
            | ConstantKind::PackageInternalNs
            | ConstantKind::ProtectedNamespace
            | ConstantKind::ExplicitNamespace
            | ConstantKind::StaticProtectedNs => self.namespaces,
            ConstantKind::Undefined
            | ConstantKind::False
            | ConstantKind::True
            | ConstantKind::Null => return Ok(()),
        };
        check_index(kind.table().unwrap_or("constant"), index, len)
    }

    fn traits(&self, traits: &[Trait]) -> Result<(), DecodeError> {
        for t in traits {
            self.multiname(t.name)?;
            match &t.data {
                TraitData::Slot {
                    type_name, value, ..
                }
                | TraitData::Const {
                    type_name, value, ..
                } => {
                    self.multiname(*type_name)?;
                    if let Some(value) = value {
                        self.constant(value.index, value.kind)?;
                    }
                }
                TraitData::Class { class, .. } => check_index("class", *class, self.classes)?,
                TraitData::Function { function, .. } => self.method(*function)?,
                TraitData::Method { method, .. }
                | TraitData::Getter { method, .. }
                | TraitData::Setter { method, .. } => self.method(*method)?,
            }
            for index in &t.metadata {
                check_index("metadata", *index, self.metadata)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn validate(graph: &ModuleGraph) -> Result<(), DecodeError> {
    graph.constant_pool.validate()?;
    let limits = Limits::new(graph);

    for method in &graph.methods {
        limits.multiname(method.return_type)?;
        for param in &method.param_types {
            limits.multiname(*param)?;
        }
        limits.string(method.name)?;
        for option in &method.options {
            limits.constant(option.value, option.kind)?;
        }
        for name in &method.param_names {
            limits.string(*name)?;
        }
    }

    for info in &graph.metadata {
        limits.string(info.name)?;
        for item in &info.items {
            limits.string(item.key)?;
            limits.string(item.value)?;
        }
    }

    for instance in &graph.instances {
        limits.multiname(instance.name)?;
        limits.multiname(instance.super_name)?;
        if let Some(ns) = instance.protected_ns {
            check_index("namespace", ns, limits.namespaces)?;
        }
        for interface in &instance.interfaces {
            limits.multiname(*interface)?;
        }
        limits.method(instance.init)?;
        limits.traits(&instance.traits)?;
    }

    for class in &graph.classes {
        limits.method(class.init)?;
        limits.traits(&class.traits)?;
    }

    for script in &graph.scripts {
        limits.method(script.init)?;
        limits.traits(&script.traits)?;
    }

    for body in &graph.bodies {
        limits.method(body.method)?;
        let code_len = body.code.len();
        for handler in &body.exceptions {
            limits.multiname(handler.exc_type)?;
            limits.multiname(handler.var_name)?;
            // from <= to <= code length, target inside the code
            check_index("exception start", handler.from, handler.to as usize + 1)?;
            check_index("exception end", handler.to, code_len + 1)?;
            check_index("exception target", handler.target, code_len)?;
        }
        limits.traits(&body.traits)?;
    }

    Ok(())
}
