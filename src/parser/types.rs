//! Structural elements of a module: value and composite types, import and
//! export entries, globals, segments and function bodies.

use std::borrow::Cow;
use std::fmt;

use super::encoding::{
    VarWidth, DESC_FUNC, DESC_GLOBAL, DESC_MEMORY, DESC_TABLE, LIMITS_MIN, LIMITS_MIN_MAX, OP_END,
    OP_GLOBAL_GET, OP_I32_CONST, OP_I64_CONST, TYPE_F32, TYPE_F64, TYPE_FUNC, TYPE_FUNCREF, TYPE_I32, TYPE_I64,
};
use super::instruction::{decode_body, Instruction};
use super::limits::{MAX_FUNCTION_PARAMS, MAX_FUNCTION_RETURNS, MAX_LOCAL_GROUPS, MAX_TABLE_INIT_ENTRIES};
use super::reader::Reader;
use super::Decode;
use crate::encoder::Encode;
use crate::error::{Error, Result};

// =============================================================================
// Value types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    pub fn from_byte(byte: u8) -> Option<ValueType> {
        match byte {
            TYPE_I32 => Some(ValueType::I32),
            TYPE_I64 => Some(ValueType::I64),
            TYPE_F32 => Some(ValueType::F32),
            TYPE_F64 => Some(ValueType::F64),
            _ => None,
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            ValueType::I32 => TYPE_I32,
            ValueType::I64 => TYPE_I64,
            ValueType::F32 => TYPE_F32,
            ValueType::F64 => TYPE_F64,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        write!(f, "{name}")
    }
}

impl Decode for ValueType {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.offset();
        let byte = reader.read_byte()?;
        match ValueType::from_byte(byte) {
            Some(value_type) => Ok(value_type),
            // v128, funcref, externref
            None if matches!(byte, 0x7b | 0x70 | 0x6f) => Err(Error::unsupported(format!(
                "value type 0x{byte:02x} at offset {offset}"
            ))),
            None => Err(Error::UnknownValueType { offset, byte }),
        }
    }
}

/// Wrapper for f32 that compares by bit pattern, so NaN constants survive
/// structural equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct FloatBits32(pub u32);

impl FloatBits32 {
    pub const NAN: Self = FloatBits32(0x7fc0_0000);

    pub fn from_float(val: f32) -> Self {
        Self(val.to_bits())
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn value(self) -> f32 {
        f32::from_bits(self.0)
    }

    pub const fn to_bits(self) -> u32 {
        self.0
    }
}

/// Wrapper for f64 that compares by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct FloatBits64(pub u64);

impl FloatBits64 {
    pub const NAN: Self = FloatBits64(0x7ff8_0000_0000_0000);

    pub fn from_float(val: f64) -> Self {
        Self(val.to_bits())
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }

    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

// =============================================================================
// Names
// =============================================================================

/// A length-prefixed name, kept as the raw bytes found in the binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Name {
    bytes: Vec<u8>,
    length_width: VarWidth,
}

impl Name {
    pub fn new(bytes: Vec<u8>) -> Self {
        Name {
            bytes,
            length_width: VarWidth::Minimal,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn length_width(&self) -> VarWidth {
        self.length_width
    }

    pub fn with_length_width(mut self, length_width: VarWidth) -> Self {
        self.length_width = length_width;
        self
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s.as_bytes().to_vec())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

impl Decode for Name {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let (bytes, length_width) = reader.read_byte_vec()?;
        Ok(Name {
            bytes: bytes.to_vec(),
            length_width,
        })
    }
}

// =============================================================================
// Composite types
// =============================================================================

/// Size bounds of a table or memory. Whether `max` is present is encoded by a
/// flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
    pub min_width: VarWidth,
    pub max_width: VarWidth,
}

impl Limits {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Limits {
            min,
            max,
            min_width: VarWidth::Minimal,
            max_width: VarWidth::Minimal,
        }
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{} {}", self.min, max),
            None => write!(f, "{}", self.min),
        }
    }
}

impl Decode for Limits {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.offset();
        let has_max = match reader.read_byte()? {
            LIMITS_MIN => false,
            LIMITS_MIN_MAX => true,
            byte => return Err(Error::InvalidFlag { offset, byte }),
        };
        let (min, min_width) = reader.read_var_u32()?;
        let mut limits = Limits::new(min, None);
        limits.min_width = min_width;
        if has_max {
            let (max, max_width) = reader.read_var_u32()?;
            limits.max = Some(max);
            limits.max_width = max_width;
        }
        Ok(limits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FuncType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
    pub param_count_width: VarWidth,
    pub result_count_width: VarWidth,
}

impl FuncType {
    pub fn new(params: Vec<ValueType>, results: Vec<ValueType>) -> Self {
        FuncType {
            params,
            results,
            ..Default::default()
        }
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(func")?;
        if !self.params.is_empty() {
            write!(f, " (param")?;
            for param in &self.params {
                write!(f, " {param}")?;
            }
            write!(f, ")")?;
        }
        if !self.results.is_empty() {
            write!(f, " (result")?;
            for result in &self.results {
                write!(f, " {result}")?;
            }
            write!(f, ")")?;
        }
        write!(f, ")")
    }
}

fn decode_value_types(
    reader: &mut Reader<'_>,
    limit: u32,
    what: &'static str,
) -> Result<(Vec<ValueType>, VarWidth)> {
    let (count, width) = reader.read_count_var(limit, what)?;
    let types = (0..count).map(|_| ValueType::decode(reader)).collect::<Result<_>>()?;
    Ok((types, width))
}

impl Decode for FuncType {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.expect_byte(TYPE_FUNC)?;
        let (params, param_count_width) = decode_value_types(reader, MAX_FUNCTION_PARAMS, "function param")?;
        let (results, result_count_width) = decode_value_types(reader, MAX_FUNCTION_RETURNS, "function result")?;
        Ok(FuncType {
            params,
            results,
            param_count_width,
            result_count_width,
        })
    }
}

/// A table of function references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub limits: Limits,
}

impl Decode for TableType {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.expect_byte(TYPE_FUNCREF)?;
        Ok(TableType {
            limits: Limits::decode(reader)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
}

impl Decode for MemoryType {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(MemoryType {
            limits: Limits::decode(reader)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

impl fmt::Display for GlobalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mutable {
            write!(f, "(mut {})", self.value_type)
        } else {
            write!(f, "{}", self.value_type)
        }
    }
}

impl Decode for GlobalType {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let value_type = ValueType::decode(reader)?;
        let offset = reader.offset();
        let mutable = match reader.read_byte()? {
            0 => false,
            1 => true,
            byte => return Err(Error::InvalidFlag { offset, byte }),
        };
        Ok(GlobalType { value_type, mutable })
    }
}

// =============================================================================
// Imports and exports
// =============================================================================

/// The kind byte shared by import and export descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Function,
    Table,
    Memory,
    Global,
}

impl ExternalKind {
    pub fn byte(self) -> u8 {
        match self {
            ExternalKind::Function => DESC_FUNC,
            ExternalKind::Table => DESC_TABLE,
            ExternalKind::Memory => DESC_MEMORY,
            ExternalKind::Global => DESC_GLOBAL,
        }
    }
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExternalKind::Function => "func",
            ExternalKind::Table => "table",
            ExternalKind::Memory => "memory",
            ExternalKind::Global => "global",
        };
        write!(f, "{name}")
    }
}

impl Decode for ExternalKind {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.offset();
        match reader.read_byte()? {
            DESC_FUNC => Ok(ExternalKind::Function),
            DESC_TABLE => Ok(ExternalKind::Table),
            DESC_MEMORY => Ok(ExternalKind::Memory),
            DESC_GLOBAL => Ok(ExternalKind::Global),
            byte => Err(Error::UnknownExternalKind { offset, byte }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportDescriptor {
    Function(u32),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

impl ImportDescriptor {
    pub fn kind(&self) -> ExternalKind {
        match self {
            ImportDescriptor::Function(_) => ExternalKind::Function,
            ImportDescriptor::Table(_) => ExternalKind::Table,
            ImportDescriptor::Memory(_) => ExternalKind::Memory,
            ImportDescriptor::Global(_) => ExternalKind::Global,
        }
    }
}

impl ImportDescriptor {
    /// Decodes a descriptor along with the width of a function type index.
    fn decode_with_width(reader: &mut Reader<'_>) -> Result<(Self, VarWidth)> {
        Ok(match ExternalKind::decode(reader)? {
            ExternalKind::Function => {
                let (type_index, width) = reader.read_var_u32()?;
                (ImportDescriptor::Function(type_index), width)
            }
            ExternalKind::Table => (ImportDescriptor::Table(TableType::decode(reader)?), VarWidth::Minimal),
            ExternalKind::Memory => (ImportDescriptor::Memory(MemoryType::decode(reader)?), VarWidth::Minimal),
            ExternalKind::Global => (ImportDescriptor::Global(GlobalType::decode(reader)?), VarWidth::Minimal),
        })
    }
}

impl Decode for ImportDescriptor {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(ImportDescriptor::decode_with_width(reader)?.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub module: Name,
    pub field: Name,
    pub descriptor: ImportDescriptor,
    /// Width of the type index of a function import.
    pub type_index_width: VarWidth,
}

impl ImportEntry {
    pub fn new(module: &str, field: &str, descriptor: ImportDescriptor) -> Self {
        ImportEntry {
            module: Name::from(module),
            field: Name::from(field),
            descriptor,
            type_index_width: VarWidth::Minimal,
        }
    }
}

impl fmt::Display for ImportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({}", self.module, self.field, self.descriptor.kind())?;
        match &self.descriptor {
            ImportDescriptor::Function(type_index) => write!(f, " type {type_index})"),
            ImportDescriptor::Table(table) => write!(f, " {})", table.limits),
            ImportDescriptor::Memory(memory) => write!(f, " {})", memory.limits),
            ImportDescriptor::Global(global) => write!(f, " {global})"),
        }
    }
}

impl Decode for ImportEntry {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let module = Name::decode(reader)?;
        let field = Name::decode(reader)?;
        let (descriptor, type_index_width) = ImportDescriptor::decode_with_width(reader)?;
        Ok(ImportEntry {
            module,
            field,
            descriptor,
            type_index_width,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportDescriptor {
    Function(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
}

impl ExportDescriptor {
    pub fn kind(&self) -> ExternalKind {
        match self {
            ExportDescriptor::Function(_) => ExternalKind::Function,
            ExportDescriptor::Table(_) => ExternalKind::Table,
            ExportDescriptor::Memory(_) => ExternalKind::Memory,
            ExportDescriptor::Global(_) => ExternalKind::Global,
        }
    }

    pub fn index(&self) -> u32 {
        match *self {
            ExportDescriptor::Function(index)
            | ExportDescriptor::Table(index)
            | ExportDescriptor::Memory(index)
            | ExportDescriptor::Global(index) => index,
        }
    }
}

impl ExportDescriptor {
    fn decode_with_width(reader: &mut Reader<'_>) -> Result<(Self, VarWidth)> {
        let kind = ExternalKind::decode(reader)?;
        let (index, width) = reader.read_var_u32()?;
        let descriptor = match kind {
            ExternalKind::Function => ExportDescriptor::Function(index),
            ExternalKind::Table => ExportDescriptor::Table(index),
            ExternalKind::Memory => ExportDescriptor::Memory(index),
            ExternalKind::Global => ExportDescriptor::Global(index),
        };
        Ok((descriptor, width))
    }
}

impl Decode for ExportDescriptor {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(ExportDescriptor::decode_with_width(reader)?.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub name: Name,
    pub descriptor: ExportDescriptor,
    pub index_width: VarWidth,
}

impl ExportEntry {
    pub fn new(name: &str, descriptor: ExportDescriptor) -> Self {
        ExportEntry {
            name: Name::from(name),
            descriptor,
            index_width: VarWidth::Minimal,
        }
    }
}

impl fmt::Display for ExportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" ({} {})",
            self.name,
            self.descriptor.kind(),
            self.descriptor.index()
        )
    }
}

impl Decode for ExportEntry {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let name = Name::decode(reader)?;
        let (descriptor, index_width) = ExportDescriptor::decode_with_width(reader)?;
        Ok(ExportEntry {
            name,
            descriptor,
            index_width,
        })
    }
}

// =============================================================================
// Definitions with initializer expressions
// =============================================================================

/// A constant expression: exactly one instruction followed by `end`.
///
/// The width of an `i32.const`, `i64.const` or `global.get` immediate is kept
/// so padded offsets and initializers store back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub instruction: Instruction,
    pub immediate_width: VarWidth,
}

impl Expression {
    pub fn new(instruction: Instruction) -> Self {
        Expression {
            instruction,
            immediate_width: VarWidth::Minimal,
        }
    }
}

impl Decode for Expression {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.offset();
        let (instruction, immediate_width) = match reader.peek_byte()? {
            OP_END => {
                return Err(Error::unsupported(format!(
                    "empty initializer expression at offset {offset}"
                )))
            }
            OP_I32_CONST => {
                reader.read_byte()?;
                let (value, width) = reader.read_var_s32()?;
                (Instruction::I32Const { value }, width)
            }
            OP_I64_CONST => {
                reader.read_byte()?;
                let (value, width) = reader.read_var_s64()?;
                (Instruction::I64Const { value }, width)
            }
            OP_GLOBAL_GET => {
                reader.read_byte()?;
                let (global_idx, width) = reader.read_var_u32()?;
                (Instruction::GlobalGet { global_idx }, width)
            }
            _ => (Instruction::decode(reader)?, VarWidth::Minimal),
        };
        reader.expect_byte(OP_END)?;
        Ok(Expression {
            instruction,
            immediate_width,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDefinition {
    pub global_type: GlobalType,
    pub init: Expression,
}

impl Decode for GlobalDefinition {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let global_type = GlobalType::decode(reader)?;
        let init = Expression::decode(reader)?;
        Ok(GlobalDefinition { global_type, init })
    }
}

/// Function indices copied into a table at an offset.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSegment {
    pub table_index: u32,
    pub offset: Expression,
    pub function_indices: Vec<u32>,
    pub table_index_width: VarWidth,
    pub count_width: VarWidth,
    /// Per-index widths, empty when every index is minimal.
    pub function_index_widths: Vec<VarWidth>,
}

impl ElementSegment {
    pub fn new(table_index: u32, offset: Expression, function_indices: Vec<u32>) -> Self {
        ElementSegment {
            table_index,
            offset,
            function_indices,
            table_index_width: VarWidth::Minimal,
            count_width: VarWidth::Minimal,
            function_index_widths: Vec::new(),
        }
    }

    pub fn function_index_width(&self, i: usize) -> VarWidth {
        self.function_index_widths.get(i).copied().unwrap_or_default()
    }
}

impl Decode for ElementSegment {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let (table_index, table_index_width) = reader.read_var_u32()?;
        let offset = Expression::decode(reader)?;
        let (count, count_width) = reader.read_count_var(MAX_TABLE_INIT_ENTRIES, "element segment function")?;
        let (function_indices, mut function_index_widths): (Vec<u32>, Vec<VarWidth>) = (0..count)
            .map(|_| reader.read_var_u32())
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();
        if function_index_widths.iter().all(|w| *w == VarWidth::Minimal) {
            function_index_widths.clear();
        }
        Ok(ElementSegment {
            table_index,
            offset,
            function_indices,
            table_index_width,
            count_width,
            function_index_widths,
        })
    }
}

/// Bytes copied into a memory at an offset.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSegment {
    pub memory_index: u32,
    pub offset: Expression,
    pub data: Vec<u8>,
    pub memory_index_width: VarWidth,
    pub length_width: VarWidth,
}

impl DataSegment {
    pub fn new(memory_index: u32, offset: Expression, data: Vec<u8>) -> Self {
        DataSegment {
            memory_index,
            offset,
            data,
            memory_index_width: VarWidth::Minimal,
            length_width: VarWidth::Minimal,
        }
    }
}

impl Decode for DataSegment {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let (memory_index, memory_index_width) = reader.read_var_u32()?;
        let offset = Expression::decode(reader)?;
        let (data, length_width) = reader.read_byte_vec()?;
        Ok(DataSegment {
            memory_index,
            offset,
            data: data.to_vec(),
            memory_index_width,
            length_width,
        })
    }
}

// =============================================================================
// Functions and bodies
// =============================================================================

/// A function section entry: the index of the function's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    pub type_index: u32,
    pub type_index_width: VarWidth,
}

impl Function {
    pub fn new(type_index: u32) -> Self {
        Function {
            type_index,
            type_index_width: VarWidth::Minimal,
        }
    }
}

impl Decode for Function {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let (type_index, type_index_width) = reader.read_var_u32()?;
        Ok(Function {
            type_index,
            type_index_width,
        })
    }
}

/// `count` consecutive locals of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalGroup {
    pub count: u32,
    pub value_type: ValueType,
    pub count_width: VarWidth,
}

impl LocalGroup {
    pub fn new(count: u32, value_type: ValueType) -> Self {
        LocalGroup {
            count,
            value_type,
            count_width: VarWidth::Minimal,
        }
    }
}

impl Decode for LocalGroup {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let (count, count_width) = reader.read_var_u32()?;
        let value_type = ValueType::decode(reader)?;
        Ok(LocalGroup {
            count,
            value_type,
            count_width,
        })
    }
}

/// The instruction bytes of a function body, including the final `end`.
///
/// Bodies are kept undecoded until [`CodeBlock::instructions`] is called.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeBlock {
    bytes: Vec<u8>,
}

impl CodeBlock {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        CodeBlock { bytes }
    }

    /// Builds a body from instructions, appending the closing `end`.
    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        let mut bytes = Vec::new();
        super::instruction::encode::encode_body(instructions, &mut bytes);
        CodeBlock { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes the body. Error offsets are relative to the start of the body.
    pub fn instructions(&self) -> Result<Vec<Instruction>> {
        log::trace!("decoding function body of {} bytes", self.bytes.len());
        let mut reader = Reader::new(&self.bytes);
        let instructions = decode_body(&mut reader)?;
        reader.finish()?;
        Ok(instructions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeEntry {
    pub locals: Vec<LocalGroup>,
    pub body: CodeBlock,
    /// Width of the body size field as found in the input.
    pub size_prefix: VarWidth,
    pub local_count_width: VarWidth,
}

impl CodeEntry {
    pub fn new(locals: Vec<LocalGroup>, body: CodeBlock) -> Self {
        CodeEntry {
            locals,
            body,
            size_prefix: VarWidth::Minimal,
            local_count_width: VarWidth::Minimal,
        }
    }

    /// Bytes following the size field: local declarations and body.
    pub fn content_size(&self) -> u32 {
        let locals: u32 = self.locals.iter().map(Encode::byte_size).sum();
        self.local_count_width.size_u32(self.locals.len() as u32) + locals + self.body.len() as u32
    }
}

impl Decode for CodeEntry {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let (size, size_prefix) = reader.read_var_u32()?;
        let mut body_reader = reader.sub_reader(size as usize)?;
        let (count, local_count_width) = body_reader.read_count_var(MAX_LOCAL_GROUPS, "local group")?;
        let locals = (0..count)
            .map(|_| LocalGroup::decode(&mut body_reader))
            .collect::<Result<Vec<_>>>()?;
        let body = CodeBlock::from_bytes(body_reader.read_rest().to_vec());
        Ok(CodeEntry {
            locals,
            body,
            size_prefix,
            local_count_width,
        })
    }
}
