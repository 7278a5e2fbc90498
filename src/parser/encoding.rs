//! Binary encoding primitives for WebAssembly values.
//!
//! Provides LEB128 integer encoding, IEEE 754 float encoding, and byte vector
//! encoding as used by the MVP binary format, plus size calculations that
//! avoid producing the bytes.
//!
//! All writers append to a caller-provided `&mut Vec<u8>` buffer.

use byteorder::{ByteOrder, LittleEndian};

// ---------------------------------------------------------------------------
// Binary format constants
// ---------------------------------------------------------------------------

pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
pub const VERSION: u32 = 1;

// Section IDs
pub const SECTION_CUSTOM: u8 = 0;
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_TABLE: u8 = 4;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_GLOBAL: u8 = 6;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_START: u8 = 8;
pub const SECTION_ELEMENT: u8 = 9;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;
pub const SECTION_DATA_COUNT: u8 = 12;

// Type constructors
pub const TYPE_FUNC: u8 = 0x60;
pub const TYPE_FUNCREF: u8 = 0x70;

// Value types
pub const TYPE_I32: u8 = 0x7f;
pub const TYPE_I64: u8 = 0x7e;
pub const TYPE_F32: u8 = 0x7d;
pub const TYPE_F64: u8 = 0x7c;

// Import/export descriptor kinds
pub const DESC_FUNC: u8 = 0x00;
pub const DESC_TABLE: u8 = 0x01;
pub const DESC_MEMORY: u8 = 0x02;
pub const DESC_GLOBAL: u8 = 0x03;

// Limits flags
pub const LIMITS_MIN: u8 = 0x00;
pub const LIMITS_MIN_MAX: u8 = 0x01;

// Instruction markers
pub const OP_ELSE: u8 = 0x05;
pub const OP_END: u8 = 0x0b;
pub const BLOCK_TYPE_EMPTY: u8 = 0x40;
pub const RESERVED_ZERO: u8 = 0x00;

// Opcodes that may start a constant expression with an integer immediate
pub const OP_GLOBAL_GET: u8 = 0x23;
pub const OP_I32_CONST: u8 = 0x41;
pub const OP_I64_CONST: u8 = 0x42;

/// Longest unsigned LEB128 encoding of a u32.
pub const MAX_VU32_WIDTH: u8 = 5;
/// Longest signed LEB128 encoding of an i32.
pub const MAX_VS32_WIDTH: u8 = 5;
/// Longest signed LEB128 encoding of an i64.
pub const MAX_VS64_WIDTH: u8 = 10;

// ---------------------------------------------------------------------------
// Field widths
// ---------------------------------------------------------------------------

/// How many bytes a LEB128 field occupies.
///
/// LEB128 allows padding a value with continuation bytes, and some producers
/// reserve fixed-width fields (five bytes for a u32) and patch the value in
/// afterwards. Decoding records non-minimal widths so storing the module
/// reproduces the input exactly. A recorded width too narrow for the current
/// value falls back to the minimal encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VarWidth {
    /// Shortest LEB128 encoding
    #[default]
    Minimal,
    /// Padded to this many bytes
    Fixed(u8),
}

impl VarWidth {
    fn from_sizes(minimal: u32, width: u8) -> Self {
        if width as u32 == minimal {
            VarWidth::Minimal
        } else {
            VarWidth::Fixed(width)
        }
    }

    /// The width that reproduces `value` read from `width` bytes.
    pub fn of_u32(value: u32, width: u8) -> Self {
        Self::from_sizes(size_of_vu32(value), width)
    }

    pub fn of_s32(value: i32, width: u8) -> Self {
        Self::from_sizes(size_of_vs32(value), width)
    }

    pub fn of_s64(value: i64, width: u8) -> Self {
        Self::from_sizes(size_of_vs64(value), width)
    }

    pub fn size_u32(self, value: u32) -> u32 {
        match self {
            VarWidth::Minimal => size_of_vu32(value),
            VarWidth::Fixed(width) => padded_width(value, width),
        }
    }

    pub fn write_u32(self, buf: &mut Vec<u8>, value: u32) {
        match self {
            VarWidth::Minimal => write_vu32(buf, value),
            VarWidth::Fixed(width) => write_vu32_padded(buf, value, width),
        }
    }

    pub fn size_s32(self, value: i32) -> u32 {
        self.size_signed(value as i64, MAX_VS32_WIDTH)
    }

    pub fn write_s32(self, buf: &mut Vec<u8>, value: i32) {
        let width = self.size_s32(value);
        write_vs_padded(buf, value as i64, width);
    }

    pub fn size_s64(self, value: i64) -> u32 {
        self.size_signed(value, MAX_VS64_WIDTH)
    }

    pub fn write_s64(self, buf: &mut Vec<u8>, value: i64) {
        let width = self.size_s64(value);
        write_vs_padded(buf, value, width);
    }

    fn size_signed(self, value: i64, max_width: u8) -> u32 {
        let minimal = size_of_vs(value);
        match self {
            VarWidth::Minimal => minimal,
            VarWidth::Fixed(width) => (width.min(max_width) as u32).max(minimal),
        }
    }
}

// ---------------------------------------------------------------------------
// Unsigned LEB128
// ---------------------------------------------------------------------------

/// Appends the unsigned LEB128 encoding of a u32 value to `buf`.
pub fn write_vu32(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

/// Appends `value` as unsigned LEB128 padded with continuation bytes to at
/// least `width` bytes. The width is capped at five bytes and never drops below
/// the minimal encoding, so the result always decodes back to `value`.
pub fn write_vu32_padded(buf: &mut Vec<u8>, mut value: u32, width: u8) {
    let width = padded_width(value, width);
    for i in 0..width {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if i + 1 < width {
            byte |= 0x80;
        }
        buf.push(byte);
    }
}

/// Number of bytes [`write_vu32_padded`] produces for `value` and `width`.
pub fn padded_width(value: u32, width: u8) -> u32 {
    (width.min(MAX_VU32_WIDTH) as u32).max(size_of_vu32(value))
}

/// Number of bytes the minimal unsigned LEB128 encoding of `value` takes.
pub fn size_of_vu32(value: u32) -> u32 {
    match value {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0x0fff_ffff => 4,
        _ => 5,
    }
}

// ---------------------------------------------------------------------------
// Signed LEB128
// ---------------------------------------------------------------------------

fn write_vs(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0) {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

/// Writes exactly `width` bytes. Bytes past the minimal encoding repeat the
/// sign, so `width` must be at least the minimal size.
fn write_vs_padded(buf: &mut Vec<u8>, mut value: i64, width: u32) {
    for i in 0..width {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if i + 1 < width {
            byte |= 0x80;
        }
        buf.push(byte);
    }
}

fn size_of_vs(mut value: i64) -> u32 {
    let mut size = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        size += 1;
        if (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0) {
            return size;
        }
    }
}

/// Appends the signed LEB128 encoding of an i32 value to `buf`.
pub fn write_vs32(buf: &mut Vec<u8>, v: i32) {
    write_vs(buf, v as i64);
}

/// Appends the signed LEB128 encoding of an i64 value to `buf`.
pub fn write_vs64(buf: &mut Vec<u8>, v: i64) {
    write_vs(buf, v);
}

pub fn size_of_vs32(v: i32) -> u32 {
    size_of_vs(v as i64)
}

pub fn size_of_vs64(v: i64) -> u32 {
    size_of_vs(v)
}

// ---------------------------------------------------------------------------
// IEEE 754 floats (little-endian)
// ---------------------------------------------------------------------------

/// Appends an f32 given as its bit pattern. Going through the bits keeps NaN
/// payloads intact.
pub fn write_f32_bits(buf: &mut Vec<u8>, bits: u32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, bits);
    buf.extend_from_slice(&bytes);
}

pub fn write_f64_bits(buf: &mut Vec<u8>, bits: u64) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_u64(&mut bytes, bits);
    buf.extend_from_slice(&bytes);
}

// ---------------------------------------------------------------------------
// Length-prefixed byte vector
// ---------------------------------------------------------------------------

/// Appends a length-prefixed byte vector (vu32 length + raw bytes) to `buf`.
pub fn write_u8vec(buf: &mut Vec<u8>, v: &[u8], length_width: VarWidth) {
    length_width.write_u32(buf, v.len() as u32);
    buf.extend_from_slice(v);
}

pub fn size_of_u8vec(v: &[u8], length_width: VarWidth) -> u32 {
    length_width.size_u32(v.len() as u32) + v.len() as u32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
