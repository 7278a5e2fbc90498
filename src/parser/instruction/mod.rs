//! WebAssembly MVP instruction representation.
//!
//! Instructions carry exactly the immediates present in their binary encoding.
//! Structured instructions (`block`, `loop`, `if`) own their nested bodies, so
//! a function body decodes to a tree rather than a flat list with `end` markers.

pub mod decode;
pub mod encode;

pub use decode::decode_body;

use super::types::{FloatBits32, FloatBits64, ValueType};
use fhex::ToHex;
use std::fmt;

/// Memory argument for load and store instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    /// Alignment exponent (log2 of the byte alignment)
    pub align: u32,
    /// Static address offset
    pub offset: u32,
}

impl MemArg {
    pub fn new(align: u32, offset: u32) -> Self {
        MemArg { align, offset }
    }
}

/// Result type of a structured control instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// No result
    Empty,
    /// A single result value
    Value(ValueType),
}

/// Declares [`Instruction`] from the opcode tables.
///
/// Nullary instructions have no immediates. Memory instructions carry a
/// [`MemArg`]. Everything else is spelled out by hand in the enum body below,
/// including its opcode and mnemonic.
macro_rules! instructions {
    (
        nullary {
            $( $nop:literal => $nvar:ident, $nname:literal; )*
        }
        memory {
            $( $mop:literal => $mvar:ident, $mname:literal; )*
        }
    ) => {
        /// A decoded MVP instruction
        #[derive(Debug, Clone, PartialEq)]
        pub enum Instruction {
            Block { block_type: BlockType, body: Vec<Instruction> },
            Loop { block_type: BlockType, body: Vec<Instruction> },
            If {
                block_type: BlockType,
                then_branch: Vec<Instruction>,
                else_branch: Option<Vec<Instruction>>,
            },
            Br { label_idx: u32 },
            BrIf { label_idx: u32 },
            BrTable { labels: Vec<u32>, default: u32 },
            Call { func_idx: u32 },
            CallIndirect { type_idx: u32 },
            LocalGet { local_idx: u32 },
            LocalSet { local_idx: u32 },
            LocalTee { local_idx: u32 },
            GlobalGet { global_idx: u32 },
            GlobalSet { global_idx: u32 },
            MemorySize,
            MemoryGrow,
            I32Const { value: i32 },
            I64Const { value: i64 },
            F32Const { value: FloatBits32 },
            F64Const { value: FloatBits64 },
            $( $nvar, )*
            $( $mvar { memarg: MemArg }, )*
        }

        impl Instruction {
            pub fn opcode(&self) -> u8 {
                match self {
                    Instruction::Block { .. } => 0x02,
                    Instruction::Loop { .. } => 0x03,
                    Instruction::If { .. } => 0x04,
                    Instruction::Br { .. } => 0x0c,
                    Instruction::BrIf { .. } => 0x0d,
                    Instruction::BrTable { .. } => 0x0e,
                    Instruction::Call { .. } => 0x10,
                    Instruction::CallIndirect { .. } => 0x11,
                    Instruction::LocalGet { .. } => 0x20,
                    Instruction::LocalSet { .. } => 0x21,
                    Instruction::LocalTee { .. } => 0x22,
                    Instruction::GlobalGet { .. } => 0x23,
                    Instruction::GlobalSet { .. } => 0x24,
                    Instruction::MemorySize => 0x3f,
                    Instruction::MemoryGrow => 0x40,
                    Instruction::I32Const { .. } => 0x41,
                    Instruction::I64Const { .. } => 0x42,
                    Instruction::F32Const { .. } => 0x43,
                    Instruction::F64Const { .. } => 0x44,
                    $( Instruction::$nvar => $nop, )*
                    $( Instruction::$mvar { .. } => $mop, )*
                }
            }

            pub fn mnemonic(&self) -> &'static str {
                match self {
                    Instruction::Block { .. } => "block",
                    Instruction::Loop { .. } => "loop",
                    Instruction::If { .. } => "if",
                    Instruction::Br { .. } => "br",
                    Instruction::BrIf { .. } => "br_if",
                    Instruction::BrTable { .. } => "br_table",
                    Instruction::Call { .. } => "call",
                    Instruction::CallIndirect { .. } => "call_indirect",
                    Instruction::LocalGet { .. } => "local.get",
                    Instruction::LocalSet { .. } => "local.set",
                    Instruction::LocalTee { .. } => "local.tee",
                    Instruction::GlobalGet { .. } => "global.get",
                    Instruction::GlobalSet { .. } => "global.set",
                    Instruction::MemorySize => "memory.size",
                    Instruction::MemoryGrow => "memory.grow",
                    Instruction::I32Const { .. } => "i32.const",
                    Instruction::I64Const { .. } => "i64.const",
                    Instruction::F32Const { .. } => "f32.const",
                    Instruction::F64Const { .. } => "f64.const",
                    $( Instruction::$nvar => $nname, )*
                    $( Instruction::$mvar { .. } => $mname, )*
                }
            }

            /// The memory argument of a load or store.
            pub fn memarg(&self) -> Option<&MemArg> {
                match self {
                    $( Instruction::$mvar { memarg } => Some(memarg), )*
                    _ => None,
                }
            }

            pub(crate) fn from_nullary_opcode(opcode: u8) -> Option<Instruction> {
                match opcode {
                    $( $nop => Some(Instruction::$nvar), )*
                    _ => None,
                }
            }

            pub(crate) fn from_memory_opcode(opcode: u8, memarg: MemArg) -> Option<Instruction> {
                match opcode {
                    $( $mop => Some(Instruction::$mvar { memarg }), )*
                    _ => None,
                }
            }

            pub(crate) fn is_memory_opcode(opcode: u8) -> bool {
                matches!(opcode, $( $mop )|*)
            }
        }
    };
}

instructions! {
    nullary {
        0x00 => Unreachable, "unreachable";
        0x01 => Nop, "nop";
        0x0f => Return, "return";
        0x1a => Drop, "drop";
        0x1b => Select, "select";

        0x45 => I32Eqz, "i32.eqz";
        0x46 => I32Eq, "i32.eq";
        0x47 => I32Ne, "i32.ne";
        0x48 => I32LtS, "i32.lt_s";
        0x49 => I32LtU, "i32.lt_u";
        0x4a => I32GtS, "i32.gt_s";
        0x4b => I32GtU, "i32.gt_u";
        0x4c => I32LeS, "i32.le_s";
        0x4d => I32LeU, "i32.le_u";
        0x4e => I32GeS, "i32.ge_s";
        0x4f => I32GeU, "i32.ge_u";

        0x50 => I64Eqz, "i64.eqz";
        0x51 => I64Eq, "i64.eq";
        0x52 => I64Ne, "i64.ne";
        0x53 => I64LtS, "i64.lt_s";
        0x54 => I64LtU, "i64.lt_u";
        0x55 => I64GtS, "i64.gt_s";
        0x56 => I64GtU, "i64.gt_u";
        0x57 => I64LeS, "i64.le_s";
        0x58 => I64LeU, "i64.le_u";
        0x59 => I64GeS, "i64.ge_s";
        0x5a => I64GeU, "i64.ge_u";

        0x5b => F32Eq, "f32.eq";
        0x5c => F32Ne, "f32.ne";
        0x5d => F32Lt, "f32.lt";
        0x5e => F32Gt, "f32.gt";
        0x5f => F32Le, "f32.le";
        0x60 => F32Ge, "f32.ge";

        0x61 => F64Eq, "f64.eq";
        0x62 => F64Ne, "f64.ne";
        0x63 => F64Lt, "f64.lt";
        0x64 => F64Gt, "f64.gt";
        0x65 => F64Le, "f64.le";
        0x66 => F64Ge, "f64.ge";

        0x67 => I32Clz, "i32.clz";
        0x68 => I32Ctz, "i32.ctz";
        0x69 => I32Popcnt, "i32.popcnt";
        0x6a => I32Add, "i32.add";
        0x6b => I32Sub, "i32.sub";
        0x6c => I32Mul, "i32.mul";
        0x6d => I32DivS, "i32.div_s";
        0x6e => I32DivU, "i32.div_u";
        0x6f => I32RemS, "i32.rem_s";
        0x70 => I32RemU, "i32.rem_u";
        0x71 => I32And, "i32.and";
        0x72 => I32Or, "i32.or";
        0x73 => I32Xor, "i32.xor";
        0x74 => I32Shl, "i32.shl";
        0x75 => I32ShrS, "i32.shr_s";
        0x76 => I32ShrU, "i32.shr_u";
        0x77 => I32Rotl, "i32.rotl";
        0x78 => I32Rotr, "i32.rotr";

        0x79 => I64Clz, "i64.clz";
        0x7a => I64Ctz, "i64.ctz";
        0x7b => I64Popcnt, "i64.popcnt";
        0x7c => I64Add, "i64.add";
        0x7d => I64Sub, "i64.sub";
        0x7e => I64Mul, "i64.mul";
        0x7f => I64DivS, "i64.div_s";
        0x80 => I64DivU, "i64.div_u";
        0x81 => I64RemS, "i64.rem_s";
        0x82 => I64RemU, "i64.rem_u";
        0x83 => I64And, "i64.and";
        0x84 => I64Or, "i64.or";
        0x85 => I64Xor, "i64.xor";
        0x86 => I64Shl, "i64.shl";
        0x87 => I64ShrS, "i64.shr_s";
        0x88 => I64ShrU, "i64.shr_u";
        0x89 => I64Rotl, "i64.rotl";
        0x8a => I64Rotr, "i64.rotr";

        0x8b => F32Abs, "f32.abs";
        0x8c => F32Neg, "f32.neg";
        0x8d => F32Ceil, "f32.ceil";
        0x8e => F32Floor, "f32.floor";
        0x8f => F32Trunc, "f32.trunc";
        0x90 => F32Nearest, "f32.nearest";
        0x91 => F32Sqrt, "f32.sqrt";
        0x92 => F32Add, "f32.add";
        0x93 => F32Sub, "f32.sub";
        0x94 => F32Mul, "f32.mul";
        0x95 => F32Div, "f32.div";
        0x96 => F32Min, "f32.min";
        0x97 => F32Max, "f32.max";
        0x98 => F32Copysign, "f32.copysign";

        0x99 => F64Abs, "f64.abs";
        0x9a => F64Neg, "f64.neg";
        0x9b => F64Ceil, "f64.ceil";
        0x9c => F64Floor, "f64.floor";
        0x9d => F64Trunc, "f64.trunc";
        0x9e => F64Nearest, "f64.nearest";
        0x9f => F64Sqrt, "f64.sqrt";
        0xa0 => F64Add, "f64.add";
        0xa1 => F64Sub, "f64.sub";
        0xa2 => F64Mul, "f64.mul";
        0xa3 => F64Div, "f64.div";
        0xa4 => F64Min, "f64.min";
        0xa5 => F64Max, "f64.max";
        0xa6 => F64Copysign, "f64.copysign";

        0xa7 => I32WrapI64, "i32.wrap_i64";
        0xa8 => I32TruncF32S, "i32.trunc_f32_s";
        0xa9 => I32TruncF32U, "i32.trunc_f32_u";
        0xaa => I32TruncF64S, "i32.trunc_f64_s";
        0xab => I32TruncF64U, "i32.trunc_f64_u";
        0xac => I64ExtendI32S, "i64.extend_i32_s";
        0xad => I64ExtendI32U, "i64.extend_i32_u";
        0xae => I64TruncF32S, "i64.trunc_f32_s";
        0xaf => I64TruncF32U, "i64.trunc_f32_u";
        0xb0 => I64TruncF64S, "i64.trunc_f64_s";
        0xb1 => I64TruncF64U, "i64.trunc_f64_u";
        0xb2 => F32ConvertI32S, "f32.convert_i32_s";
        0xb3 => F32ConvertI32U, "f32.convert_i32_u";
        0xb4 => F32ConvertI64S, "f32.convert_i64_s";
        0xb5 => F32ConvertI64U, "f32.convert_i64_u";
        0xb6 => F32DemoteF64, "f32.demote_f64";
        0xb7 => F64ConvertI32S, "f64.convert_i32_s";
        0xb8 => F64ConvertI32U, "f64.convert_i32_u";
        0xb9 => F64ConvertI64S, "f64.convert_i64_s";
        0xba => F64ConvertI64U, "f64.convert_i64_u";
        0xbb => F64PromoteF32, "f64.promote_f32";
        0xbc => I32ReinterpretF32, "i32.reinterpret_f32";
        0xbd => I64ReinterpretF64, "i64.reinterpret_f64";
        0xbe => F32ReinterpretI32, "f32.reinterpret_i32";
        0xbf => F64ReinterpretI64, "f64.reinterpret_i64";
    }
    memory {
        0x28 => I32Load, "i32.load";
        0x29 => I64Load, "i64.load";
        0x2a => F32Load, "f32.load";
        0x2b => F64Load, "f64.load";
        0x2c => I32Load8S, "i32.load8_s";
        0x2d => I32Load8U, "i32.load8_u";
        0x2e => I32Load16S, "i32.load16_s";
        0x2f => I32Load16U, "i32.load16_u";
        0x30 => I64Load8S, "i64.load8_s";
        0x31 => I64Load8U, "i64.load8_u";
        0x32 => I64Load16S, "i64.load16_s";
        0x33 => I64Load16U, "i64.load16_u";
        0x34 => I64Load32S, "i64.load32_s";
        0x35 => I64Load32U, "i64.load32_u";
        0x36 => I32Store, "i32.store";
        0x37 => I64Store, "i64.store";
        0x38 => F32Store, "f32.store";
        0x39 => F64Store, "f64.store";
        0x3a => I32Store8, "i32.store8";
        0x3b => I32Store16, "i32.store16";
        0x3c => I64Store8, "i64.store8";
        0x3d => I64Store16, "i64.store16";
        0x3e => I64Store32, "i64.store32";
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        write!(f, "{}", self.mnemonic())?;

        match self {
            Block { block_type, .. } | Loop { block_type, .. } | If { block_type, .. } => {
                write!(f, "{block_type}")
            }
            Br { label_idx } | BrIf { label_idx } => write!(f, " {label_idx}"),
            BrTable { labels, default } => {
                for label in labels {
                    write!(f, " {label}")?;
                }
                write!(f, " {default}")
            }
            Call { func_idx } => write!(f, " {func_idx}"),
            CallIndirect { type_idx } => write!(f, " (type {type_idx})"),
            LocalGet { local_idx } | LocalSet { local_idx } | LocalTee { local_idx } => {
                write!(f, " {local_idx}")
            }
            GlobalGet { global_idx } | GlobalSet { global_idx } => write!(f, " {global_idx}"),
            I32Const { value } => write!(f, " {value}"),
            I64Const { value } => write!(f, " {value}"),
            F32Const { value } => write!(f, " {}", value.value().to_hex()),
            F64Const { value } => write!(f, " {}", value.value().to_hex()),
            _ => match self.memarg() {
                Some(memarg) => write!(f, " {memarg}"),
                None => Ok(()),
            },
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Empty => Ok(()),
            BlockType::Value(vt) => write!(f, " (result {vt})"),
        }
    }
}

impl fmt::Display for MemArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset={} align={}", self.offset, 1u64 << self.align.min(63))
    }
}

/// Renders an instruction sequence one instruction per line, indenting the
/// bodies of structured instructions.
pub fn disassemble(instructions: &[Instruction]) -> String {
    let mut out = String::new();
    write_listing(&mut out, instructions, 0);
    out
}

fn write_listing(out: &mut String, instructions: &[Instruction], depth: usize) {
    for instruction in instructions {
        push_line(out, depth, &instruction.to_string());
        match instruction {
            Instruction::Block { body, .. } | Instruction::Loop { body, .. } => {
                write_listing(out, body, depth + 1);
                push_line(out, depth, "end");
            }
            Instruction::If {
                then_branch,
                else_branch,
                ..
            } => {
                write_listing(out, then_branch, depth + 1);
                if let Some(else_branch) = else_branch {
                    push_line(out, depth, "else");
                    write_listing(out, else_branch, depth + 1);
                }
                push_line(out, depth, "end");
            }
            _ => {}
        }
    }
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(text);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_tables() {
        assert_eq!(Instruction::I32Add.opcode(), 0x6a);
        assert_eq!(Instruction::I32Add.mnemonic(), "i32.add");
        assert_eq!(Instruction::from_nullary_opcode(0xb6), Some(Instruction::F32DemoteF64));
        assert_eq!(Instruction::from_nullary_opcode(0xb5), Some(Instruction::F32ConvertI64U));
        assert_eq!(Instruction::from_nullary_opcode(0x28), None);
        assert!(Instruction::is_memory_opcode(0x28));
        assert!(Instruction::is_memory_opcode(0x3e));
        assert!(!Instruction::is_memory_opcode(0x3f));

        let load = Instruction::from_memory_opcode(0x2d, MemArg::new(0, 8));
        assert_eq!(load, Some(Instruction::I32Load8U { memarg: MemArg::new(0, 8) }));
        assert_eq!(load.as_ref().and_then(|i| i.memarg()), Some(&MemArg::new(0, 8)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::I32Const { value: -7 }.to_string(), "i32.const -7");
        assert_eq!(
            Instruction::I32Store { memarg: MemArg::new(2, 16) }.to_string(),
            "i32.store offset=16 align=4"
        );
        assert_eq!(
            Instruction::BrTable {
                labels: vec![0, 1],
                default: 2
            }
            .to_string(),
            "br_table 0 1 2"
        );
        assert_eq!(
            Instruction::CallIndirect { type_idx: 3 }.to_string(),
            "call_indirect (type 3)"
        );
        assert_eq!(
            Instruction::F32Const {
                value: FloatBits32::from_float(1.0)
            }
            .to_string(),
            format!("f32.const {}", 1.0f32.to_hex())
        );
    }

    #[test]
    fn test_disassemble_nested() {
        let body = vec![
            Instruction::Block {
                block_type: BlockType::Value(ValueType::I32),
                body: vec![
                    Instruction::I32Const { value: 1 },
                    Instruction::If {
                        block_type: BlockType::Empty,
                        then_branch: vec![Instruction::Nop],
                        else_branch: Some(vec![]),
                    },
                ],
            },
            Instruction::Drop,
        ];

        let expected = "\
block (result i32)
  i32.const 1
  if
    nop
  else
  end
end
drop
";
        assert_eq!(disassemble(&body), expected);
    }
}
