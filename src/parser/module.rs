use std::fmt;

use super::encoding::{
    VarWidth, SECTION_CODE, SECTION_CUSTOM,
    SECTION_DATA, SECTION_ELEMENT, SECTION_EXPORT, SECTION_FUNCTION, SECTION_GLOBAL, SECTION_IMPORT, SECTION_MEMORY,
    SECTION_START, SECTION_TABLE, SECTION_TYPE, VERSION,
};
use super::types::{
    CodeEntry, DataSegment, ElementSegment, ExportEntry, FuncType, Function, GlobalDefinition, ImportEntry,
    MemoryType, Name, TableType,
};
use crate::encoder::Encode;
use crate::error::{Error, Result};

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Custom,
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Element,
    Code,
    Data,
}

impl SectionKind {
    pub fn id(self) -> u8 {
        match self {
            SectionKind::Custom => SECTION_CUSTOM,
            SectionKind::Type => SECTION_TYPE,
            SectionKind::Import => SECTION_IMPORT,
            SectionKind::Function => SECTION_FUNCTION,
            SectionKind::Table => SECTION_TABLE,
            SectionKind::Memory => SECTION_MEMORY,
            SectionKind::Global => SECTION_GLOBAL,
            SectionKind::Export => SECTION_EXPORT,
            SectionKind::Start => SECTION_START,
            SectionKind::Element => SECTION_ELEMENT,
            SectionKind::Code => SECTION_CODE,
            SectionKind::Data => SECTION_DATA,
        }
    }

    pub fn from_id(id: u8) -> Option<SectionKind> {
        Some(match id {
            SECTION_CUSTOM => SectionKind::Custom,
            SECTION_TYPE => SectionKind::Type,
            SECTION_IMPORT => SectionKind::Import,
            SECTION_FUNCTION => SectionKind::Function,
            SECTION_TABLE => SectionKind::Table,
            SECTION_MEMORY => SectionKind::Memory,
            SECTION_GLOBAL => SectionKind::Global,
            SECTION_EXPORT => SectionKind::Export,
            SECTION_START => SectionKind::Start,
            SECTION_ELEMENT => SectionKind::Element,
            SECTION_CODE => SectionKind::Code,
            SECTION_DATA => SectionKind::Data,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Custom => "custom",
            SectionKind::Type => "type",
            SectionKind::Import => "import",
            SectionKind::Function => "function",
            SectionKind::Table => "table",
            SectionKind::Memory => "memory",
            SectionKind::Global => "global",
            SectionKind::Export => "export",
            SectionKind::Start => "start",
            SectionKind::Element => "element",
            SectionKind::Code => "code",
            SectionKind::Data => "data",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A count-prefixed list of elements of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSection<E> {
    pub entries: Vec<E>,
    /// Width of the section length field as found in the input.
    pub length_prefix: VarWidth,
    pub count_width: VarWidth,
}

impl<E> VectorSection<E> {
    pub fn new(entries: Vec<E>) -> Self {
        VectorSection {
            entries,
            length_prefix: VarWidth::Minimal,
            count_width: VarWidth::Minimal,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }
}

impl<E> Default for VectorSection<E> {
    fn default() -> Self {
        VectorSection::new(Vec::new())
    }
}

impl<E> From<Vec<E>> for VectorSection<E> {
    fn from(entries: Vec<E>) -> Self {
        VectorSection::new(entries)
    }
}

impl<E: Encode> VectorSection<E> {
    pub fn payload_size(&self) -> u32 {
        self.count_width.size_u32(self.entries.len() as u32) + self.entries.iter().map(Encode::byte_size).sum::<u32>()
    }
}

/// A named section of uninterpreted bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomSection {
    pub name: Name,
    pub data: Vec<u8>,
    pub length_prefix: VarWidth,
}

impl CustomSection {
    pub fn new(name: impl Into<Name>, data: Vec<u8>) -> Self {
        CustomSection {
            name: name.into(),
            data,
            length_prefix: VarWidth::Minimal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartSection {
    pub function_index: u32,
    pub length_prefix: VarWidth,
    pub function_index_width: VarWidth,
}

impl StartSection {
    pub fn new(function_index: u32) -> Self {
        StartSection {
            function_index,
            length_prefix: VarWidth::Minimal,
            function_index_width: VarWidth::Minimal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Custom(CustomSection),
    Type(VectorSection<FuncType>),
    Import(VectorSection<ImportEntry>),
    Function(VectorSection<Function>),
    Table(VectorSection<TableType>),
    Memory(VectorSection<MemoryType>),
    Global(VectorSection<GlobalDefinition>),
    Export(VectorSection<ExportEntry>),
    Start(StartSection),
    Element(VectorSection<ElementSegment>),
    Code(VectorSection<CodeEntry>),
    Data(VectorSection<DataSegment>),
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Custom(_) => SectionKind::Custom,
            Section::Type(_) => SectionKind::Type,
            Section::Import(_) => SectionKind::Import,
            Section::Function(_) => SectionKind::Function,
            Section::Table(_) => SectionKind::Table,
            Section::Memory(_) => SectionKind::Memory,
            Section::Global(_) => SectionKind::Global,
            Section::Export(_) => SectionKind::Export,
            Section::Start(_) => SectionKind::Start,
            Section::Element(_) => SectionKind::Element,
            Section::Code(_) => SectionKind::Code,
            Section::Data(_) => SectionKind::Data,
        }
    }

    pub fn id(&self) -> u8 {
        self.kind().id()
    }

    pub fn length_prefix(&self) -> VarWidth {
        match self {
            Section::Custom(s) => s.length_prefix,
            Section::Start(s) => s.length_prefix,
            Section::Type(s) => s.length_prefix,
            Section::Import(s) => s.length_prefix,
            Section::Function(s) => s.length_prefix,
            Section::Table(s) => s.length_prefix,
            Section::Memory(s) => s.length_prefix,
            Section::Global(s) => s.length_prefix,
            Section::Export(s) => s.length_prefix,
            Section::Element(s) => s.length_prefix,
            Section::Code(s) => s.length_prefix,
            Section::Data(s) => s.length_prefix,
        }
    }

    /// Number of elements in a vector section; `None` for custom and start.
    pub fn element_count(&self) -> Option<usize> {
        match self {
            Section::Custom(_) | Section::Start(_) => None,
            Section::Type(s) => Some(s.len()),
            Section::Import(s) => Some(s.len()),
            Section::Function(s) => Some(s.len()),
            Section::Table(s) => Some(s.len()),
            Section::Memory(s) => Some(s.len()),
            Section::Global(s) => Some(s.len()),
            Section::Export(s) => Some(s.len()),
            Section::Element(s) => Some(s.len()),
            Section::Code(s) => Some(s.len()),
            Section::Data(s) => Some(s.len()),
        }
    }

    /// Length of the section contents, excluding id and length field.
    pub fn payload_size(&self) -> u32 {
        match self {
            Section::Custom(s) => s.name.byte_size() + s.data.len() as u32,
            Section::Start(s) => s.function_index_width.size_u32(s.function_index),
            Section::Type(s) => s.payload_size(),
            Section::Import(s) => s.payload_size(),
            Section::Function(s) => s.payload_size(),
            Section::Table(s) => s.payload_size(),
            Section::Memory(s) => s.payload_size(),
            Section::Global(s) => s.payload_size(),
            Section::Export(s) => s.payload_size(),
            Section::Element(s) => s.payload_size(),
            Section::Code(s) => s.payload_size(),
            Section::Data(s) => s.payload_size(),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Custom(custom) => write!(f, "custom \"{}\" ({} bytes)", custom.name, custom.data.len()),
            Section::Start(start) => write!(f, "start (func {})", start.function_index),
            _ => write!(
                f,
                "{} ({} entries, {} bytes)",
                self.kind(),
                self.element_count().unwrap_or(0),
                self.payload_size()
            ),
        }
    }
}

// =============================================================================
// Module
// =============================================================================

/// A module: the format version and its sections in binary order.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    version: u32,
    sections: Vec<Section>,
}

impl Default for Module {
    fn default() -> Self {
        Module::new()
    }
}

macro_rules! section_accessors {
    ($( $(#[$doc:meta])* $fn_name:ident => $variant:ident($ty:ty); )*) => {
        $(
            $(#[$doc])*
            pub fn $fn_name(&self) -> Option<&$ty> {
                self.sections.iter().find_map(|section| match section {
                    Section::$variant(s) => Some(s),
                    _ => None,
                })
            }
        )*
    };
}

impl Module {
    pub fn new() -> Self {
        Module {
            version: VERSION,
            sections: Vec::new(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Appends a section. Non-custom sections must arrive in strictly
    /// increasing id order; custom sections may appear anywhere.
    pub fn add_section(&mut self, section: Section) -> Result<()> {
        let id = section.id();
        if id != SECTION_CUSTOM {
            if let Some(previous) = self.last_known_id() {
                if id <= previous {
                    return Err(Error::SectionOrderViolation { id, previous });
                }
            }
        }
        self.sections.push(section);
        Ok(())
    }

    fn last_known_id(&self) -> Option<u8> {
        self.sections
            .iter()
            .rev()
            .map(Section::id)
            .find(|&id| id != SECTION_CUSTOM)
    }

    /// First section of the given kind.
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|section| section.kind() == kind)
    }

    pub fn custom_sections(&self) -> impl Iterator<Item = &CustomSection> {
        self.sections.iter().filter_map(|section| match section {
            Section::Custom(s) => Some(s),
            _ => None,
        })
    }

    section_accessors! {
        type_section => Type(VectorSection<FuncType>);
        import_section => Import(VectorSection<ImportEntry>);
        /// Type indices of the functions defined by this module.
        function_section => Function(VectorSection<Function>);
        table_section => Table(VectorSection<TableType>);
        memory_section => Memory(VectorSection<MemoryType>);
        global_section => Global(VectorSection<GlobalDefinition>);
        export_section => Export(VectorSection<ExportEntry>);
        start_section => Start(StartSection);
        element_section => Element(VectorSection<ElementSegment>);
        /// Bodies of the functions defined by this module.
        code_section => Code(VectorSection<CodeEntry>);
        data_section => Data(VectorSection<DataSegment>);
    }

    /// Whether every declared function has exactly one body.
    pub fn is_valid(&self) -> bool {
        let functions = self.function_section().map_or(0, VectorSection::len);
        let bodies = self.code_section().map_or(0, VectorSection::len);
        functions == bodies
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module (version {})", self.version)?;
        for section in &self.sections {
            writeln!(f, "  {section}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::{CodeBlock, ValueType};

    fn function_section(count: u32) -> Section {
        Section::Function((0..count).map(Function::new).collect::<Vec<_>>().into())
    }

    fn code_section(count: usize) -> Section {
        let entries = vec![CodeEntry::new(vec![], CodeBlock::from_bytes(vec![0x0b])); count];
        Section::Code(entries.into())
    }

    #[test]
    fn test_section_order_enforced() {
        let mut module = Module::new();
        module.add_section(function_section(1)).unwrap();
        let err = module
            .add_section(Section::Type(VectorSection::default()))
            .unwrap_err();
        assert!(matches!(err, Error::SectionOrderViolation { id: 1, previous: 3 }));

        // same kind twice is also out of order
        assert!(module.add_section(function_section(1)).is_err());
        assert_eq!(module.sections().len(), 1);
    }

    #[test]
    fn test_custom_sections_anywhere() {
        let mut module = Module::new();
        module.add_section(Section::Custom(CustomSection::new("a", vec![]))).unwrap();
        module.add_section(Section::Custom(CustomSection::new("b", vec![1]))).unwrap();
        module.add_section(function_section(0)).unwrap();
        module.add_section(Section::Custom(CustomSection::new("c", vec![]))).unwrap();
        module.add_section(code_section(0)).unwrap();
        module.add_section(Section::Custom(CustomSection::new("d", vec![]))).unwrap();

        let names: Vec<String> = module.custom_sections().map(|s| s.name.to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        // a custom section does not reset the order check
        assert!(module.add_section(function_section(0)).is_err());
    }

    #[test]
    fn test_is_valid_counts() {
        let mut module = Module::new();
        assert!(module.is_valid());

        module.add_section(function_section(3)).unwrap();
        assert!(!module.is_valid());

        module.add_section(code_section(2)).unwrap();
        assert!(!module.is_valid());

        let mut module = Module::new();
        module.add_section(function_section(2)).unwrap();
        module.add_section(code_section(2)).unwrap();
        assert!(module.is_valid());
    }

    #[test]
    fn test_accessors() {
        let mut module = Module::new();
        module
            .add_section(Section::Type(vec![FuncType::new(vec![ValueType::I32], vec![])].into()))
            .unwrap();
        module.add_section(Section::Start(StartSection::new(4))).unwrap();

        assert_eq!(module.type_section().map(VectorSection::len), Some(1));
        assert_eq!(module.start_section().map(|s| s.function_index), Some(4));
        assert!(module.code_section().is_none());
        assert_eq!(module.section(SectionKind::Start).map(Section::id), Some(8));
        assert_eq!(module.version(), 1);
    }

    #[test]
    fn test_payload_sizes() {
        let custom = Section::Custom(CustomSection::new("name", vec![1, 2, 3]));
        assert_eq!(custom.payload_size(), 8);

        let func_type = FuncType::new(vec![ValueType::I32, ValueType::I32], vec![ValueType::I32]);
        let types = Section::Type(vec![func_type].into());
        assert_eq!(types.payload_size(), 7);
        assert_eq!(types.element_count(), Some(1));
        assert_eq!(types.to_string(), "type (1 entries, 7 bytes)");

        assert_eq!(Section::Start(StartSection::new(200)).payload_size(), 2);
    }

    #[test]
    fn test_padded_counts_in_payload_size() {
        let mut functions = VectorSection::new(vec![Function::new(0), Function::new(1)]);
        assert_eq!(functions.payload_size(), 3);
        functions.count_width = VarWidth::Fixed(5);
        functions.entries[0].type_index_width = VarWidth::Fixed(2);
        assert_eq!(Section::Function(functions).payload_size(), 8);

        let mut start = StartSection::new(1);
        start.function_index_width = VarWidth::Fixed(4);
        assert_eq!(Section::Start(start).payload_size(), 4);
    }

    #[test]
    fn test_section_kind_ids() {
        for id in 0..=11 {
            let kind = SectionKind::from_id(id).unwrap();
            assert_eq!(kind.id(), id);
        }
        assert_eq!(SectionKind::from_id(12), None);
    }
}
