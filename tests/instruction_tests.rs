//! Instruction codec tests: single instructions and whole bodies decoded from
//! hex, compared against the expected value, then encoded back.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use wasmkit::parser::instruction::{decode_body, BlockType, Instruction, MemArg};
    use wasmkit::parser::reader::Reader;
    use wasmkit::parser::types::{CodeBlock, FloatBits32, FloatBits64, ValueType};
    use wasmkit::{Decode, Encode, Error};

    fn bytes(s: &str) -> Vec<u8> {
        hex::decode(s.replace(' ', "")).expect("valid hex")
    }

    #[rstest]
    #[case("00", Instruction::Unreachable)]
    #[case("01", Instruction::Nop)]
    #[case("0f", Instruction::Return)]
    #[case("1b", Instruction::Select)]
    #[case("0c 03", Instruction::Br { label_idx: 3 })]
    #[case("0d 80 01", Instruction::BrIf { label_idx: 128 })]
    #[case("0e 00 05", Instruction::BrTable { labels: vec![], default: 5 })]
    #[case("0e 03 00 01 02 00", Instruction::BrTable { labels: vec![0, 1, 2], default: 0 })]
    #[case("10 e5 8e 26", Instruction::Call { func_idx: 624485 })]
    #[case("11 01 00", Instruction::CallIndirect { type_idx: 1 })]
    #[case("22 02", Instruction::LocalTee { local_idx: 2 })]
    #[case("24 00", Instruction::GlobalSet { global_idx: 0 })]
    #[case("28 02 00", Instruction::I32Load { memarg: MemArg::new(2, 0) })]
    #[case("3b 01 80 08", Instruction::I32Store16 { memarg: MemArg::new(1, 1024) })]
    #[case("3f 00", Instruction::MemorySize)]
    #[case("40 00", Instruction::MemoryGrow)]
    #[case("41 7f", Instruction::I32Const { value: -1 })]
    #[case("41 80 80 80 80 78", Instruction::I32Const { value: i32::MIN })]
    #[case("42 ff ff ff ff ff ff ff ff ff 00", Instruction::I64Const { value: i64::MAX })]
    #[case("43 00 00 c0 7f", Instruction::F32Const { value: FloatBits32::NAN })]
    #[case("43 00 00 80 3f", Instruction::F32Const { value: FloatBits32::from_float(1.0) })]
    #[case("44 00 00 00 00 00 00 f8 7f", Instruction::F64Const { value: FloatBits64::NAN })]
    #[case("6a", Instruction::I32Add)]
    #[case("a7", Instruction::I32WrapI64)]
    #[case("bf", Instruction::F64ReinterpretI64)]
    fn test_instruction(#[case] hex: &str, #[case] expected: Instruction) {
        let input = bytes(hex);
        let mut reader = Reader::new(&input);
        let decoded = Instruction::decode(&mut reader).unwrap_or_else(|e| panic!("failed to decode {}: {}", hex, e));
        assert!(reader.is_empty(), "{} left {} bytes", hex, reader.remaining());
        assert_eq!(decoded, expected);

        assert_eq!(expected.to_bytes(), input);
        assert_eq!(expected.byte_size() as usize, input.len());
    }

    #[rstest]
    #[case("0b", vec![])]
    #[case("02 40 41 01 0d 00 0b 0b", vec![Instruction::Block {
        block_type: BlockType::Empty,
        body: vec![Instruction::I32Const { value: 1 }, Instruction::BrIf { label_idx: 0 }],
    }])]
    #[case("03 7e 42 00 0b 0b", vec![Instruction::Loop {
        block_type: BlockType::Value(ValueType::I64),
        body: vec![Instruction::I64Const { value: 0 }],
    }])]
    #[case("04 40 01 0b 0b", vec![Instruction::If {
        block_type: BlockType::Empty,
        then_branch: vec![Instruction::Nop],
        else_branch: None,
    }])]
    #[case("04 7f 41 01 05 41 02 0b 0b", vec![Instruction::If {
        block_type: BlockType::Value(ValueType::I32),
        then_branch: vec![Instruction::I32Const { value: 1 }],
        else_branch: Some(vec![Instruction::I32Const { value: 2 }]),
    }])]
    #[case("04 40 05 0b 0b", vec![Instruction::If {
        block_type: BlockType::Empty,
        then_branch: vec![],
        else_branch: Some(vec![]),
    }])]
    #[case("02 40 03 40 04 40 0c 02 0b 0b 0b 1a 0b", vec![
        Instruction::Block {
            block_type: BlockType::Empty,
            body: vec![Instruction::Loop {
                block_type: BlockType::Empty,
                body: vec![Instruction::If {
                    block_type: BlockType::Empty,
                    then_branch: vec![Instruction::Br { label_idx: 2 }],
                    else_branch: None,
                }],
            }],
        },
        Instruction::Drop,
    ])]
    fn test_body(#[case] hex: &str, #[case] expected: Vec<Instruction>) {
        let input = bytes(hex);
        let block = CodeBlock::from_bytes(input.clone());
        assert_eq!(block.instructions().unwrap(), expected);
        assert_eq!(CodeBlock::from_instructions(&expected).as_bytes(), input.as_slice());
    }

    #[rstest]
    #[case("05 0b")]
    #[case("02 40 05 0b 0b")]
    fn test_stray_else(#[case] hex: &str) {
        let input = bytes(hex);
        let err = decode_body(&mut Reader::new(&input)).unwrap_err();
        assert!(
            matches!(err, Error::UnexpectedByte { expected: 0x0b, found: 0x05, .. }),
            "got {err}"
        );
    }

    #[rstest]
    #[case("02 40 01")]
    #[case("04 40 01 05")]
    #[case("41 80")]
    #[case("44 00 00 00")]
    #[case("0e 02 00")]
    fn test_truncated_body(#[case] hex: &str) {
        let input = bytes(hex);
        assert!(matches!(
            decode_body(&mut Reader::new(&input)),
            Err(Error::UnexpectedEndOfInput { .. })
        ));
    }

    #[test]
    fn test_unknown_and_unsupported_opcodes() {
        assert!(matches!(
            CodeBlock::from_bytes(bytes("01 ff 0b")).instructions(),
            Err(Error::UnknownOpcode { offset: 1, opcode: 0xff })
        ));
        // saturating truncation and bulk memory prefix
        assert!(matches!(
            CodeBlock::from_bytes(bytes("fc 00 0b")).instructions(),
            Err(Error::UnsupportedConstruct(_))
        ));
        // sign extension
        assert!(matches!(
            CodeBlock::from_bytes(bytes("c0 0b")).instructions(),
            Err(Error::UnsupportedConstruct(_))
        ));
        // block type given as a type index
        assert!(matches!(
            CodeBlock::from_bytes(bytes("02 00 0b 0b")).instructions(),
            Err(Error::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn test_reserved_bytes() {
        assert!(matches!(
            CodeBlock::from_bytes(bytes("3f 01 0b")).instructions(),
            Err(Error::UnexpectedByte { offset: 1, expected: 0, found: 1 })
        ));
        assert!(matches!(
            CodeBlock::from_bytes(bytes("11 00 01 0b")).instructions(),
            Err(Error::UnexpectedByte { offset: 2, expected: 0, found: 1 })
        ));
    }

    #[test]
    fn test_trailing_bytes_after_body() {
        assert!(matches!(
            CodeBlock::from_bytes(bytes("01 0b 01")).instructions(),
            Err(Error::TrailingInput { offset: 2, remaining: 1 })
        ));
    }

    #[test]
    fn test_nested_byte_size() {
        let instruction = Instruction::If {
            block_type: BlockType::Value(ValueType::F64),
            then_branch: vec![Instruction::F64Const {
                value: FloatBits64::from_float(1.5),
            }],
            else_branch: Some(vec![Instruction::Block {
                block_type: BlockType::Empty,
                body: vec![Instruction::Br { label_idx: 200 }],
            }]),
        };
        // if + type, f64.const + 8, else, block + type, br + 2 byte index, end, end
        assert_eq!(instruction.byte_size(), 2 + 9 + 1 + 2 + 3 + 1 + 1);
        assert_eq!(instruction.to_bytes().len() as u32, instruction.byte_size());
    }
}
