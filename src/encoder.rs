//! Encodes a [`Module`] to WebAssembly binary format (`.wasm`).
//!
//! This is the inverse of [`crate::parser::load`]: a module decoded from bytes
//! encodes back to the same bytes.
//!
//! # Binary format overview
//!
//! A WebAssembly binary begins with a magic number (`\0asm`) and version (1),
//! followed by sections in the order they appear in the module. Each section
//! is encoded as:
//!
//! ```text
//! section_id: u8 | byte_length: vu32 | contents: byte*
//! ```
//!
//! The byte length is computed from the section contents right before the
//! header is written. Every LEB128 field outside function bodies keeps the
//! width it was read with. Fields of a module built in code use minimal LEB128.
//!
//! # Example
//!
//! ```
//! use wasmkit::encoder;
//! use wasmkit::parser::module::Module;
//!
//! let bytes = encoder::store(&Module::new());
//! assert_eq!(bytes, b"\0asm\x01\x00\x00\x00");
//! ```

use std::io::Write;

use crate::error::Result;
use crate::parser::encoding::{size_of_u8vec, write_u8vec, MAGIC, OP_END, TYPE_FUNC, TYPE_FUNCREF, VERSION};
use crate::parser::encoding::{LIMITS_MIN, LIMITS_MIN_MAX, OP_GLOBAL_GET, OP_I32_CONST, OP_I64_CONST};
use crate::parser::instruction::Instruction;
use crate::parser::module::{Module, Section, VectorSection};
use crate::parser::types::{
    CodeEntry, DataSegment, ElementSegment, ExportEntry, Expression, FuncType, Function, GlobalDefinition, GlobalType,
    ImportDescriptor, ImportEntry, Limits, LocalGroup, MemoryType, Name, TableType, ValueType,
};

/// Types that can be written in their binary encoding.
///
/// `byte_size` must equal the number of bytes `encode` appends, without
/// encoding anything.
pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);

    fn byte_size(&self) -> u32;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_size() as usize);
        self.encode(&mut buf);
        buf
    }
}

// ===========================================================================
// Public API
// ===========================================================================

/// Encodes a module to binary format.
pub fn store(module: &Module) -> Vec<u8> {
    let size = 8 + module.sections().iter().map(Encode::byte_size).sum::<u32>();
    let mut buf = Vec::with_capacity(size as usize);

    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());

    for section in module.sections() {
        section.encode(&mut buf);
    }

    log::debug!("stored module: {} sections, {} bytes", module.sections().len(), buf.len());
    buf
}

/// Encodes a module and writes it to `out`.
pub fn store_to<W: Write>(module: &Module, mut out: W) -> Result<()> {
    out.write_all(&store(module))?;
    out.flush()?;
    Ok(())
}

// ===========================================================================
// Sections
// ===========================================================================

/// ```text
/// section ::= id:byte size:u32 contents
/// custom  ::= name byte*
/// vecsec  ::= vec(entry)
/// start   ::= funcidx
/// ```
impl Encode for Section {
    fn encode(&self, buf: &mut Vec<u8>) {
        let payload_size = self.payload_size();
        log::debug!("storing {} section: {} bytes", self.kind(), payload_size);

        buf.push(self.id());
        self.length_prefix().write_u32(buf, payload_size);

        match self {
            Section::Custom(custom) => {
                custom.name.encode(buf);
                buf.extend_from_slice(&custom.data);
            }
            Section::Start(start) => start.function_index_width.write_u32(buf, start.function_index),
            Section::Type(s) => encode_entries(s, buf),
            Section::Import(s) => encode_entries(s, buf),
            Section::Function(s) => encode_entries(s, buf),
            Section::Table(s) => encode_entries(s, buf),
            Section::Memory(s) => encode_entries(s, buf),
            Section::Global(s) => encode_entries(s, buf),
            Section::Export(s) => encode_entries(s, buf),
            Section::Element(s) => encode_entries(s, buf),
            Section::Code(s) => encode_entries(s, buf),
            Section::Data(s) => encode_entries(s, buf),
        }
    }

    fn byte_size(&self) -> u32 {
        let payload_size = self.payload_size();
        1 + self.length_prefix().size_u32(payload_size) + payload_size
    }
}

fn encode_entries<E: Encode>(section: &VectorSection<E>, buf: &mut Vec<u8>) {
    section.count_width.write_u32(buf, section.entries.len() as u32);
    for entry in &section.entries {
        entry.encode(buf);
    }
}

// ===========================================================================
// Types
// ===========================================================================

impl Encode for ValueType {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.byte());
    }

    fn byte_size(&self) -> u32 {
        1
    }
}

impl Encode for Name {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u8vec(buf, self.as_bytes(), self.length_width());
    }

    fn byte_size(&self) -> u32 {
        size_of_u8vec(self.as_bytes(), self.length_width())
    }
}

/// ```text
/// limits ::= 0x00 min:u32 | 0x01 min:u32 max:u32
/// ```
impl Encode for Limits {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self.max {
            Some(max) => {
                buf.push(LIMITS_MIN_MAX);
                self.min_width.write_u32(buf, self.min);
                self.max_width.write_u32(buf, max);
            }
            None => {
                buf.push(LIMITS_MIN);
                self.min_width.write_u32(buf, self.min);
            }
        }
    }

    fn byte_size(&self) -> u32 {
        1 + self.min_width.size_u32(self.min) + self.max.map_or(0, |max| self.max_width.size_u32(max))
    }
}

/// ```text
/// functype ::= 0x60 vec(valtype) vec(valtype)
/// ```
impl Encode for FuncType {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(TYPE_FUNC);
        self.param_count_width.write_u32(buf, self.params.len() as u32);
        for param in &self.params {
            param.encode(buf);
        }
        self.result_count_width.write_u32(buf, self.results.len() as u32);
        for result in &self.results {
            result.encode(buf);
        }
    }

    fn byte_size(&self) -> u32 {
        1 + self.param_count_width.size_u32(self.params.len() as u32)
            + self.params.len() as u32
            + self.result_count_width.size_u32(self.results.len() as u32)
            + self.results.len() as u32
    }
}

/// ```text
/// tabletype ::= 0x70 limits
/// ```
impl Encode for TableType {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(TYPE_FUNCREF);
        self.limits.encode(buf);
    }

    fn byte_size(&self) -> u32 {
        1 + self.limits.byte_size()
    }
}

impl Encode for MemoryType {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.limits.encode(buf);
    }

    fn byte_size(&self) -> u32 {
        self.limits.byte_size()
    }
}

/// ```text
/// globaltype ::= valtype mut:(0x00 | 0x01)
/// ```
impl Encode for GlobalType {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.value_type.encode(buf);
        buf.push(u8::from(self.mutable));
    }

    fn byte_size(&self) -> u32 {
        2
    }
}

// ===========================================================================
// Imports and exports
// ===========================================================================

/// ```text
/// import     ::= module:name name:name importdesc
/// importdesc ::= 0x00 typeidx | 0x01 tabletype | 0x02 memtype | 0x03 globaltype
/// ```
impl Encode for ImportEntry {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.module.encode(buf);
        self.field.encode(buf);
        buf.push(self.descriptor.kind().byte());
        match &self.descriptor {
            ImportDescriptor::Function(type_index) => self.type_index_width.write_u32(buf, *type_index),
            ImportDescriptor::Table(table) => table.encode(buf),
            ImportDescriptor::Memory(memory) => memory.encode(buf),
            ImportDescriptor::Global(global) => global.encode(buf),
        }
    }

    fn byte_size(&self) -> u32 {
        let descriptor = match &self.descriptor {
            ImportDescriptor::Function(type_index) => self.type_index_width.size_u32(*type_index),
            ImportDescriptor::Table(table) => table.byte_size(),
            ImportDescriptor::Memory(memory) => memory.byte_size(),
            ImportDescriptor::Global(global) => global.byte_size(),
        };
        self.module.byte_size() + self.field.byte_size() + 1 + descriptor
    }
}

/// ```text
/// export ::= name exportdesc
/// exportdesc ::= (0x00 | 0x01 | 0x02 | 0x03) idx
/// ```
impl Encode for ExportEntry {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.name.encode(buf);
        buf.push(self.descriptor.kind().byte());
        self.index_width.write_u32(buf, self.descriptor.index());
    }

    fn byte_size(&self) -> u32 {
        self.name.byte_size() + 1 + self.index_width.size_u32(self.descriptor.index())
    }
}

// ===========================================================================
// Definitions
// ===========================================================================

/// ```text
/// expr ::= instr 0x0b
/// ```
impl Encode for Expression {
    fn encode(&self, buf: &mut Vec<u8>) {
        let width = self.immediate_width;
        match self.instruction {
            Instruction::I32Const { value } => {
                buf.push(OP_I32_CONST);
                width.write_s32(buf, value);
            }
            Instruction::I64Const { value } => {
                buf.push(OP_I64_CONST);
                width.write_s64(buf, value);
            }
            Instruction::GlobalGet { global_idx } => {
                buf.push(OP_GLOBAL_GET);
                width.write_u32(buf, global_idx);
            }
            ref other => other.encode(buf),
        }
        buf.push(OP_END);
    }

    fn byte_size(&self) -> u32 {
        let width = self.immediate_width;
        let instruction = match self.instruction {
            Instruction::I32Const { value } => 1 + width.size_s32(value),
            Instruction::I64Const { value } => 1 + width.size_s64(value),
            Instruction::GlobalGet { global_idx } => 1 + width.size_u32(global_idx),
            ref other => other.byte_size(),
        };
        instruction + 1
    }
}

impl Encode for GlobalDefinition {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.global_type.encode(buf);
        self.init.encode(buf);
    }

    fn byte_size(&self) -> u32 {
        self.global_type.byte_size() + self.init.byte_size()
    }
}

/// ```text
/// elem ::= tableidx expr vec(funcidx)
/// ```
impl Encode for ElementSegment {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.table_index_width.write_u32(buf, self.table_index);
        self.offset.encode(buf);
        self.count_width.write_u32(buf, self.function_indices.len() as u32);
        for (i, index) in self.function_indices.iter().enumerate() {
            self.function_index_width(i).write_u32(buf, *index);
        }
    }

    fn byte_size(&self) -> u32 {
        let indices: u32 = self
            .function_indices
            .iter()
            .enumerate()
            .map(|(i, index)| self.function_index_width(i).size_u32(*index))
            .sum();
        self.table_index_width.size_u32(self.table_index)
            + self.offset.byte_size()
            + self.count_width.size_u32(self.function_indices.len() as u32)
            + indices
    }
}

/// ```text
/// data ::= memidx expr vec(byte)
/// ```
impl Encode for DataSegment {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.memory_index_width.write_u32(buf, self.memory_index);
        self.offset.encode(buf);
        write_u8vec(buf, &self.data, self.length_width);
    }

    fn byte_size(&self) -> u32 {
        self.memory_index_width.size_u32(self.memory_index)
            + self.offset.byte_size()
            + size_of_u8vec(&self.data, self.length_width)
    }
}

impl Encode for Function {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.type_index_width.write_u32(buf, self.type_index);
    }

    fn byte_size(&self) -> u32 {
        self.type_index_width.size_u32(self.type_index)
    }
}

impl Encode for LocalGroup {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.count_width.write_u32(buf, self.count);
        self.value_type.encode(buf);
    }

    fn byte_size(&self) -> u32 {
        self.count_width.size_u32(self.count) + 1
    }
}

/// ```text
/// code ::= size:u32 vec(locals) expr
/// ```
impl Encode for CodeEntry {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.size_prefix.write_u32(buf, self.content_size());
        self.local_count_width.write_u32(buf, self.locals.len() as u32);
        for group in &self.locals {
            group.encode(buf);
        }
        buf.extend_from_slice(self.body.as_bytes());
    }

    fn byte_size(&self) -> u32 {
        let content_size = self.content_size();
        self.size_prefix.size_u32(content_size) + content_size
    }
}
