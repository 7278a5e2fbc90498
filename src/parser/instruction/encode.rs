//! Instruction encoding to binary format

use super::{BlockType, Instruction, MemArg};
use crate::encoder::Encode;
use crate::parser::encoding::{self, BLOCK_TYPE_EMPTY, OP_ELSE, OP_END, RESERVED_ZERO};

/// Encodes a sequence followed by its closing `end`.
pub fn encode_body(instructions: &[Instruction], buf: &mut Vec<u8>) {
    for instruction in instructions {
        instruction.encode(buf);
    }
    buf.push(OP_END);
}

/// Size of a sequence including its closing `end`.
pub fn body_size(instructions: &[Instruction]) -> u32 {
    instructions.iter().map(Encode::byte_size).sum::<u32>() + 1
}

impl Encode for Instruction {
    fn encode(&self, buf: &mut Vec<u8>) {
        use Instruction::*;

        buf.push(self.opcode());

        match self {
            Block { block_type, body } | Loop { block_type, body } => {
                block_type.encode(buf);
                encode_body(body, buf);
            }
            If {
                block_type,
                then_branch,
                else_branch,
            } => {
                block_type.encode(buf);
                for instruction in then_branch {
                    instruction.encode(buf);
                }
                if let Some(else_branch) = else_branch {
                    buf.push(OP_ELSE);
                    for instruction in else_branch {
                        instruction.encode(buf);
                    }
                }
                buf.push(OP_END);
            }

            Br { label_idx } | BrIf { label_idx } => encoding::write_vu32(buf, *label_idx),
            BrTable { labels, default } => {
                encoding::write_vu32(buf, labels.len() as u32);
                for label in labels {
                    encoding::write_vu32(buf, *label);
                }
                encoding::write_vu32(buf, *default);
            }

            Call { func_idx } => encoding::write_vu32(buf, *func_idx),
            CallIndirect { type_idx } => {
                encoding::write_vu32(buf, *type_idx);
                buf.push(RESERVED_ZERO);
            }

            LocalGet { local_idx } | LocalSet { local_idx } | LocalTee { local_idx } => {
                encoding::write_vu32(buf, *local_idx)
            }
            GlobalGet { global_idx } | GlobalSet { global_idx } => encoding::write_vu32(buf, *global_idx),

            MemorySize | MemoryGrow => buf.push(RESERVED_ZERO),

            I32Const { value } => encoding::write_vs32(buf, *value),
            I64Const { value } => encoding::write_vs64(buf, *value),
            F32Const { value } => encoding::write_f32_bits(buf, value.to_bits()),
            F64Const { value } => encoding::write_f64_bits(buf, value.to_bits()),

            _ => {
                if let Some(memarg) = self.memarg() {
                    memarg.encode(buf);
                }
            }
        }
    }

    fn byte_size(&self) -> u32 {
        use Instruction::*;

        let immediates = match self {
            Block { block_type, body } | Loop { block_type, body } => block_type.byte_size() + body_size(body),
            If {
                block_type,
                then_branch,
                else_branch,
            } => {
                let then_size: u32 = then_branch.iter().map(Encode::byte_size).sum();
                let else_size = else_branch
                    .as_ref()
                    .map_or(0, |branch| 1 + branch.iter().map(Encode::byte_size).sum::<u32>());
                block_type.byte_size() + then_size + else_size + 1
            }

            Br { label_idx } | BrIf { label_idx } => encoding::size_of_vu32(*label_idx),
            BrTable { labels, default } => {
                encoding::size_of_vu32(labels.len() as u32)
                    + labels.iter().map(|l| encoding::size_of_vu32(*l)).sum::<u32>()
                    + encoding::size_of_vu32(*default)
            }

            Call { func_idx } => encoding::size_of_vu32(*func_idx),
            CallIndirect { type_idx } => encoding::size_of_vu32(*type_idx) + 1,

            LocalGet { local_idx } | LocalSet { local_idx } | LocalTee { local_idx } => {
                encoding::size_of_vu32(*local_idx)
            }
            GlobalGet { global_idx } | GlobalSet { global_idx } => encoding::size_of_vu32(*global_idx),

            MemorySize | MemoryGrow => 1,

            I32Const { value } => encoding::size_of_vs32(*value),
            I64Const { value } => encoding::size_of_vs64(*value),
            F32Const { .. } => 4,
            F64Const { .. } => 8,

            _ => self.memarg().map_or(0, Encode::byte_size),
        };

        1 + immediates
    }
}

impl Encode for BlockType {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            BlockType::Empty => buf.push(BLOCK_TYPE_EMPTY),
            BlockType::Value(value_type) => value_type.encode(buf),
        }
    }

    fn byte_size(&self) -> u32 {
        1
    }
}

impl Encode for MemArg {
    fn encode(&self, buf: &mut Vec<u8>) {
        encoding::write_vu32(buf, self.align);
        encoding::write_vu32(buf, self.offset);
    }

    fn byte_size(&self) -> u32 {
        encoding::size_of_vu32(self.align) + encoding::size_of_vu32(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::reader::Reader;
    use crate::parser::types::{FloatBits64, ValueType};
    use crate::parser::Decode;

    fn assert_instruction_round_trip(hex_bytes: &str) {
        let bytes = hex::decode(hex_bytes.replace(' ', "")).expect("valid hex");
        let mut reader = Reader::new(&bytes);
        let instruction = Instruction::decode(&mut reader).unwrap();
        assert!(reader.is_empty(), "{hex_bytes} left bytes behind");

        let encoded = instruction.to_bytes();
        assert_eq!(hex::encode(&encoded), hex::encode(&bytes), "re-encoding {instruction}");
        assert_eq!(instruction.byte_size() as usize, bytes.len());
    }

    #[test]
    fn test_round_trip_samples() {
        for sample in [
            "00",
            "02 40 41 01 0d 00 0b",
            "03 40 0c 00 0b",
            "04 7f 41 01 05 41 02 0b",
            "04 40 01 05 0b",
            "04 40 04 40 02 40 0b 05 03 7e 42 7f 1a 0b 0b 0b",
            "0e 03 00 01 02 00",
            "11 81 01 00",
            "21 e5 8e 26",
            "41 9b f1 59",
            "42 80 80 80 80 80 80 80 80 80 7f",
            "44 00 00 00 00 00 00 f8 7f",
            "36 02 90 4e",
            "3f 00",
            "bf",
        ] {
            assert_instruction_round_trip(sample);
        }
    }

    #[test]
    fn test_encode_built_instruction() {
        let instruction = Instruction::If {
            block_type: BlockType::Value(ValueType::F64),
            then_branch: vec![Instruction::F64Const {
                value: FloatBits64::from_float(1.5),
            }],
            else_branch: Some(vec![Instruction::Unreachable]),
        };
        let bytes = instruction.to_bytes();
        assert_eq!(
            hex::encode(&bytes),
            "047c44000000000000f83f05000b"
        );
        assert_eq!(instruction.byte_size() as usize, bytes.len());
    }

    #[test]
    fn test_body_size_counts_end() {
        let body = vec![Instruction::LocalGet { local_idx: 200 }, Instruction::Drop];
        let mut buf = Vec::new();
        encode_body(&body, &mut buf);
        assert_eq!(buf, vec![0x20, 0xc8, 0x01, 0x1a, 0x0b]);
        assert_eq!(body_size(&body), 5);
    }
}
