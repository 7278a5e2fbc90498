use super::{BlockType, Instruction, MemArg};
use crate::error::{Error, Result};
use crate::parser::encoding::{BLOCK_TYPE_EMPTY, OP_ELSE, OP_END, RESERVED_ZERO};
use crate::parser::limits::MAX_BR_TABLE_LABELS;
use crate::parser::reader::Reader;
use crate::parser::types::{FloatBits32, FloatBits64, ValueType};
use crate::parser::Decode;

/// How a nested instruction sequence was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    End,
    Else,
}

/// Decodes instructions up to and including the closing `end`. With
/// `allow_else` an `else` also closes the sequence.
fn decode_sequence(reader: &mut Reader<'_>, allow_else: bool) -> Result<(Vec<Instruction>, Terminator)> {
    let mut instructions = Vec::new();
    loop {
        let offset = reader.offset();
        match reader.peek_byte()? {
            OP_END => {
                reader.read_byte()?;
                return Ok((instructions, Terminator::End));
            }
            OP_ELSE if allow_else => {
                reader.read_byte()?;
                return Ok((instructions, Terminator::Else));
            }
            OP_ELSE => {
                return Err(Error::UnexpectedByte {
                    offset,
                    expected: OP_END,
                    found: OP_ELSE,
                })
            }
            _ => instructions.push(Instruction::decode(reader)?),
        }
    }
}

/// Decodes an instruction sequence terminated by `end`, consuming the `end`.
pub fn decode_body(reader: &mut Reader<'_>) -> Result<Vec<Instruction>> {
    Ok(decode_sequence(reader, false)?.0)
}

/// Opcodes from later proposals that are recognised but not handled.
fn is_post_mvp_opcode(opcode: u8) -> bool {
    matches!(
        opcode,
        0x06..=0x0a | 0x12..=0x14 | 0x18 | 0x19 | 0x1c | 0x25 | 0x26 | 0xc0..=0xc4 | 0xd0..=0xd6 | 0xfb..=0xfe
    )
}

impl Decode for Instruction {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.offset();
        let opcode = reader.read_byte()?;

        if let Some(instruction) = Instruction::from_nullary_opcode(opcode) {
            return Ok(instruction);
        }
        if Instruction::is_memory_opcode(opcode) {
            let memarg = MemArg::decode(reader)?;
            return Instruction::from_memory_opcode(opcode, memarg).ok_or(Error::UnknownOpcode { offset, opcode });
        }

        let instruction = match opcode {
            0x02 => {
                let block_type = BlockType::decode(reader)?;
                let body = decode_body(reader)?;
                Instruction::Block { block_type, body }
            }
            0x03 => {
                let block_type = BlockType::decode(reader)?;
                let body = decode_body(reader)?;
                Instruction::Loop { block_type, body }
            }
            0x04 => {
                let block_type = BlockType::decode(reader)?;
                let (then_branch, terminator) = decode_sequence(reader, true)?;
                let else_branch = match terminator {
                    Terminator::Else => Some(decode_body(reader)?),
                    Terminator::End => None,
                };
                Instruction::If {
                    block_type,
                    then_branch,
                    else_branch,
                }
            }
            0x0c => Instruction::Br {
                label_idx: reader.read_vu32()?,
            },
            0x0d => Instruction::BrIf {
                label_idx: reader.read_vu32()?,
            },
            0x0e => {
                let count = reader.read_count(MAX_BR_TABLE_LABELS, "br_table label")?;
                let labels = (0..count)
                    .map(|_| reader.read_vu32())
                    .collect::<Result<Vec<_>>>()?;
                let default = reader.read_vu32()?;
                Instruction::BrTable { labels, default }
            }
            0x10 => Instruction::Call {
                func_idx: reader.read_vu32()?,
            },
            0x11 => {
                let type_idx = reader.read_vu32()?;
                reader.expect_byte(RESERVED_ZERO)?;
                Instruction::CallIndirect { type_idx }
            }
            0x20 => Instruction::LocalGet {
                local_idx: reader.read_vu32()?,
            },
            0x21 => Instruction::LocalSet {
                local_idx: reader.read_vu32()?,
            },
            0x22 => Instruction::LocalTee {
                local_idx: reader.read_vu32()?,
            },
            0x23 => Instruction::GlobalGet {
                global_idx: reader.read_vu32()?,
            },
            0x24 => Instruction::GlobalSet {
                global_idx: reader.read_vu32()?,
            },
            0x3f => {
                reader.expect_byte(RESERVED_ZERO)?;
                Instruction::MemorySize
            }
            0x40 => {
                reader.expect_byte(RESERVED_ZERO)?;
                Instruction::MemoryGrow
            }
            0x41 => Instruction::I32Const {
                value: reader.read_vs32()?,
            },
            0x42 => Instruction::I64Const {
                value: reader.read_vs64()?,
            },
            0x43 => Instruction::F32Const {
                value: FloatBits32::from_bits(reader.read_f32_bits()?),
            },
            0x44 => Instruction::F64Const {
                value: FloatBits64::from_bits(reader.read_f64_bits()?),
            },
            _ if is_post_mvp_opcode(opcode) => {
                return Err(Error::unsupported(format!(
                    "opcode 0x{opcode:02x} at offset {offset}"
                )))
            }
            _ => return Err(Error::UnknownOpcode { offset, opcode }),
        };

        Ok(instruction)
    }
}

impl Decode for BlockType {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.offset();
        let byte = reader.peek_byte()?;
        if byte == BLOCK_TYPE_EMPTY {
            reader.read_byte()?;
            return Ok(BlockType::Empty);
        }
        // a non-negative s33 is a type index
        if byte & 0x40 == 0 {
            return Err(Error::unsupported(format!(
                "type index block type at offset {offset}"
            )));
        }
        Ok(BlockType::Value(ValueType::decode(reader)?))
    }
}

impl Decode for MemArg {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let align = reader.read_vu32()?;
        let offset = reader.read_vu32()?;
        Ok(MemArg { align, offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_hex(s: &str) -> Result<Instruction> {
        let bytes = hex::decode(s.replace(' ', "")).expect("valid hex");
        let mut reader = Reader::new(&bytes);
        let instruction = Instruction::decode(&mut reader)?;
        reader.finish()?;
        Ok(instruction)
    }

    #[test]
    fn test_decode_block_with_br_if() {
        let instruction = decode_hex("02 40 41 01 0d 00 0b").unwrap();
        assert_eq!(
            instruction,
            Instruction::Block {
                block_type: BlockType::Empty,
                body: vec![Instruction::I32Const { value: 1 }, Instruction::BrIf { label_idx: 0 }],
            }
        );
    }

    #[test]
    fn test_decode_if_else() {
        let instruction = decode_hex("04 7f 41 01 05 41 02 0b").unwrap();
        assert_eq!(
            instruction,
            Instruction::If {
                block_type: BlockType::Value(ValueType::I32),
                then_branch: vec![Instruction::I32Const { value: 1 }],
                else_branch: Some(vec![Instruction::I32Const { value: 2 }]),
            }
        );

        // no else at all versus an empty else
        assert_eq!(
            decode_hex("04 40 01 0b").unwrap(),
            Instruction::If {
                block_type: BlockType::Empty,
                then_branch: vec![Instruction::Nop],
                else_branch: None,
            }
        );
        assert_eq!(
            decode_hex("04 40 01 05 0b").unwrap(),
            Instruction::If {
                block_type: BlockType::Empty,
                then_branch: vec![Instruction::Nop],
                else_branch: Some(vec![]),
            }
        );
    }

    #[test]
    fn test_decode_immediates() {
        assert_eq!(
            decode_hex("0e 02 00 01 02").unwrap(),
            Instruction::BrTable {
                labels: vec![0, 1],
                default: 2
            }
        );
        assert_eq!(
            decode_hex("11 03 00").unwrap(),
            Instruction::CallIndirect { type_idx: 3 }
        );
        assert_eq!(
            decode_hex("28 02 90 ce 00").unwrap(),
            Instruction::I32Load {
                memarg: MemArg::new(2, 10000)
            }
        );
        assert_eq!(
            decode_hex("42 80 80 80 80 08").unwrap(),
            Instruction::I64Const { value: 0x8000_0000 }
        );
        assert_eq!(decode_hex("40 00").unwrap(), Instruction::MemoryGrow);
        assert_eq!(
            decode_hex("43 00 00 c0 7f").unwrap(),
            Instruction::F32Const {
                value: FloatBits32::NAN
            }
        );
    }

    #[test]
    fn test_reserved_byte_must_be_zero() {
        assert!(matches!(
            decode_hex("11 00 01"),
            Err(Error::UnexpectedByte {
                offset: 2,
                expected: 0x00,
                found: 0x01
            })
        ));
        assert!(matches!(
            decode_hex("3f 01"),
            Err(Error::UnexpectedByte { offset: 1, .. })
        ));
    }

    #[test]
    fn test_misplaced_else() {
        assert!(matches!(
            decode_hex("02 40 01 05 0b"),
            Err(Error::UnexpectedByte {
                offset: 3,
                expected: OP_END,
                found: OP_ELSE
            })
        ));
        assert!(matches!(
            decode_hex("04 40 05 05 0b"),
            Err(Error::UnexpectedByte { offset: 3, .. })
        ));
    }

    #[test]
    fn test_unknown_and_unsupported_opcodes() {
        assert!(matches!(
            decode_hex("ff"),
            Err(Error::UnknownOpcode {
                offset: 0,
                opcode: 0xff
            })
        ));
        assert!(matches!(decode_hex("c0"), Err(Error::UnsupportedConstruct(_))));
        assert!(matches!(decode_hex("fc 00"), Err(Error::UnsupportedConstruct(_))));
        assert!(matches!(decode_hex("02 00 0b"), Err(Error::UnsupportedConstruct(_))));
        assert!(matches!(decode_hex("02 7b 0b"), Err(Error::UnsupportedConstruct(_))));
        assert!(matches!(
            decode_hex("02 55 0b"),
            Err(Error::UnknownValueType { offset: 1, byte: 0x55 })
        ));
    }

    #[test]
    fn test_truncated_block() {
        assert!(matches!(
            decode_hex("03 40 01"),
            Err(Error::UnexpectedEndOfInput { offset: 3 })
        ));
    }

    #[test]
    fn test_decode_body_stops_at_end() {
        let bytes = [0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b, 0xaa];
        let mut reader = Reader::new(&bytes);
        let body = decode_body(&mut reader).unwrap();
        assert_eq!(
            body,
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::LocalGet { local_idx: 1 },
                Instruction::I32Add
            ]
        );
        assert_eq!(reader.remaining(), 1);
    }
}
