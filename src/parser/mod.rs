//! Decoding of WebAssembly MVP binary modules.
//!
//! A module is the 4 byte magic number, the 4 byte version and a sequence of
//! sections:
//!
//! ```text
//! section ::= id:byte size:u32 payload:byte{size}
//! ```
//!
//! Each payload is sliced out by its declared size and must be consumed
//! exactly by its contents.

pub mod encoding;
pub mod instruction;
pub mod limits;
pub mod module;
pub mod reader;
pub mod types;

use std::io::Read;

use crate::error::{Error, Result};
use encoding::{VarWidth, MAGIC, SECTION_DATA_COUNT, VERSION};
use limits::{
    MAX_DATA_SEGMENTS, MAX_ELEMENT_SEGMENTS, MAX_EXPORTS, MAX_FUNCTIONS, MAX_GLOBALS, MAX_IMPORTS, MAX_MEMORIES,
    MAX_TABLES, MAX_TYPES,
};
use module::{CustomSection, Module, Section, SectionKind, StartSection, VectorSection};
use reader::Reader;
use types::Name;

/// Types that can be read from their binary encoding.
pub trait Decode: Sized {
    fn decode(reader: &mut Reader<'_>) -> Result<Self>;
}

/// Decodes a complete module from `bytes`.
pub fn load(bytes: &[u8]) -> Result<Module> {
    let mut reader = Reader::new(bytes);
    for expected in MAGIC {
        reader.expect_byte(expected)?;
    }
    for expected in VERSION.to_le_bytes() {
        reader.expect_byte(expected)?;
    }

    let mut module = Module::new();
    while !reader.is_empty() {
        let section = decode_section(&mut reader)?;
        module.add_section(section)?;
    }

    log::debug!("loaded module with {} sections", module.sections().len());
    Ok(module)
}

/// Reads `input` to the end and decodes the result.
pub fn load_from<R: Read>(mut input: R) -> Result<Module> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    load(&bytes)
}

fn decode_section(reader: &mut Reader<'_>) -> Result<Section> {
    let offset = reader.offset();
    let id = reader.read_byte()?;
    let kind = match SectionKind::from_id(id) {
        Some(kind) => kind,
        None if id == SECTION_DATA_COUNT => {
            return Err(Error::unsupported(format!(
                "data count section at offset {offset}"
            )))
        }
        None => return Err(Error::UnknownSectionKind { offset, id }),
    };

    let (size, length_prefix) = reader.read_var_u32()?;
    let mut payload = reader.sub_reader(size as usize)?;

    let section = match kind {
        SectionKind::Custom => {
            let name = Name::decode(&mut payload)?;
            let data = payload.read_rest().to_vec();
            Section::Custom(CustomSection {
                name,
                data,
                length_prefix,
            })
        }
        SectionKind::Type => Section::Type(decode_vector(&mut payload, MAX_TYPES, "type", length_prefix)?),
        SectionKind::Import => Section::Import(decode_vector(&mut payload, MAX_IMPORTS, "import", length_prefix)?),
        SectionKind::Function => {
            Section::Function(decode_vector(&mut payload, MAX_FUNCTIONS, "function", length_prefix)?)
        }
        SectionKind::Table => Section::Table(decode_vector(&mut payload, MAX_TABLES, "table", length_prefix)?),
        SectionKind::Memory => Section::Memory(decode_vector(&mut payload, MAX_MEMORIES, "memory", length_prefix)?),
        SectionKind::Global => Section::Global(decode_vector(&mut payload, MAX_GLOBALS, "global", length_prefix)?),
        SectionKind::Export => Section::Export(decode_vector(&mut payload, MAX_EXPORTS, "export", length_prefix)?),
        SectionKind::Start => {
            let (function_index, function_index_width) = payload.read_var_u32()?;
            Section::Start(StartSection {
                function_index,
                length_prefix,
                function_index_width,
            })
        }
        SectionKind::Element => Section::Element(decode_vector(
            &mut payload,
            MAX_ELEMENT_SEGMENTS,
            "element segment",
            length_prefix,
        )?),
        SectionKind::Code => Section::Code(decode_vector(&mut payload, MAX_FUNCTIONS, "function body", length_prefix)?),
        SectionKind::Data => {
            Section::Data(decode_vector(&mut payload, MAX_DATA_SEGMENTS, "data segment", length_prefix)?)
        }
    };

    if !payload.is_empty() {
        return Err(Error::SectionSizeMismatch {
            id,
            declared: size,
            consumed: payload.pos() as u32,
        });
    }

    log::debug!(
        "decoded {} section at offset {}: {} bytes, {} entries",
        kind,
        offset,
        size,
        section.element_count().unwrap_or(0)
    );
    Ok(section)
}

fn decode_vector<E: Decode>(
    reader: &mut Reader<'_>,
    limit: u32,
    what: &'static str,
    length_prefix: VarWidth,
) -> Result<VectorSection<E>> {
    let (count, count_width) = reader.read_count_var(limit, what)?;
    let entries = (0..count).map(|_| E::decode(reader)).collect::<Result<Vec<_>>>()?;
    Ok(VectorSection {
        entries,
        length_prefix,
        count_width,
    })
}
