//! Byte-level builder for hand-assembled ABC modules

#![allow(dead_code)]

/// Assembles a module section by section. Every table defaults to empty.
#[derive(Default)]
pub struct AbcBuilder {
    pub ints: Vec<i32>,
    pub uints: Vec<u32>,
    pub doubles: Vec<f64>,
    pub strings: Vec<Vec<u8>>,
    /// (kind byte, name string index)
    pub namespaces: Vec<(u8, u32)>,
    pub ns_sets: Vec<Vec<u32>>,
    /// Raw multiname records, kind byte included
    pub multinames: Vec<Vec<u8>>,
    pub methods: Vec<Vec<u8>>,
    pub metadata: Vec<Vec<u8>>,
    /// (instance record, class record)
    pub classes: Vec<(Vec<u8>, Vec<u8>)>,
    pub scripts: Vec<Vec<u8>>,
    pub bodies: Vec<Vec<u8>>,
    pub major: u16,
    pub minor: u16,
}

pub fn u30(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Signed varint; shorter encodings are sign-extended from bit 6 of the
/// last byte.
pub fn s32(out: &mut Vec<u8>, mut value: i32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn count(out: &mut Vec<u8>, len: usize) {
    // Entry count includes the sentinel
    if len == 0 {
        out.push(0);
    } else {
        u30(out, len as u32 + 1);
    }
}

/// Encode a QName multiname record
pub fn qname(ns: u32, name: u32) -> Vec<u8> {
    let mut out = vec![0x07];
    u30(&mut out, ns);
    u30(&mut out, name);
    out
}

/// Method record with no params, no options, no names
pub fn method(name: u32) -> Vec<u8> {
    let mut out = vec![0, 0];
    u30(&mut out, name);
    out.push(0);
    out
}

/// Body for `method` with the given code and no handlers or traits
pub fn body(method: u32, code: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    u30(&mut out, method);
    out.extend_from_slice(&[1, 1, 0, 1]);
    u30(&mut out, code.len() as u32);
    out.extend_from_slice(code);
    out.extend_from_slice(&[0, 0]);
    out
}

impl AbcBuilder {
    pub fn new() -> Self {
        Self {
            major: 46,
            minor: 16,
            ..Self::default()
        }
    }

    pub fn string(mut self, s: &str) -> Self {
        self.strings.push(s.as_bytes().to_vec());
        self
    }

    pub fn int(mut self, value: i32) -> Self {
        self.ints.push(value);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.minor.to_le_bytes());
        out.extend_from_slice(&self.major.to_le_bytes());

        count(&mut out, self.ints.len());
        for v in &self.ints {
            s32(&mut out, *v);
        }
        count(&mut out, self.uints.len());
        for v in &self.uints {
            u30(&mut out, *v);
        }
        count(&mut out, self.doubles.len());
        for v in &self.doubles {
            out.extend_from_slice(&v.to_le_bytes());
        }
        count(&mut out, self.strings.len());
        for s in &self.strings {
            u30(&mut out, s.len() as u32);
            out.extend_from_slice(s);
        }
        count(&mut out, self.namespaces.len());
        for (kind, name) in &self.namespaces {
            out.push(*kind);
            u30(&mut out, *name);
        }
        count(&mut out, self.ns_sets.len());
        for set in &self.ns_sets {
            u30(&mut out, set.len() as u32);
            for ns in set {
                u30(&mut out, *ns);
            }
        }
        count(&mut out, self.multinames.len());
        for m in &self.multinames {
            out.extend_from_slice(m);
        }

        for table in [&self.methods, &self.metadata] {
            u30(&mut out, table.len() as u32);
            for record in table {
                out.extend_from_slice(record);
            }
        }

        u30(&mut out, self.classes.len() as u32);
        for (instance, _) in &self.classes {
            out.extend_from_slice(instance);
        }
        for (_, class) in &self.classes {
            out.extend_from_slice(class);
        }

        for table in [&self.scripts, &self.bodies] {
            u30(&mut out, table.len() as u32);
            for record in table {
                out.extend_from_slice(record);
            }
        }
        out
    }
}
