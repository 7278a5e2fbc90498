use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use wasmkit::parser::instruction::{BlockType, Instruction, MemArg};
use wasmkit::parser::module::{Section, VectorSection};
use wasmkit::parser::types::{CodeBlock, CodeEntry, FuncType, Function, LocalGroup, ValueType};
use wasmkit::Module;

fn load_fixture(name: &str) -> Vec<u8> {
    let json_path = "tests/fixtures/modules.json";
    let json_content = fs::read_to_string(json_path).unwrap_or_else(|_| panic!("Failed to read {}", json_path));
    let fixtures: serde_json::Value = serde_json::from_str(&json_content).expect("Failed to parse JSON");

    for module in fixtures["modules"].as_array().expect("modules array") {
        if module["name"] == name {
            let wasm = module["wasm"].as_str().expect("wasm string");
            return base64::Engine::decode(&base64::engine::general_purpose::STANDARD, wasm)
                .expect("Failed to decode base64");
        }
    }
    panic!("No fixture named {}", name);
}

/// A module with `count` copies of a loop-heavy function body.
fn synthetic_module(count: usize) -> Module {
    let body = CodeBlock::from_instructions(&[
        Instruction::Block {
            block_type: BlockType::Empty,
            body: vec![Instruction::Loop {
                block_type: BlockType::Empty,
                body: vec![
                    Instruction::LocalGet { local_idx: 0 },
                    Instruction::I32Eqz,
                    Instruction::BrIf { label_idx: 1 },
                    Instruction::LocalGet { local_idx: 0 },
                    Instruction::I32Load {
                        memarg: MemArg::new(2, 16),
                    },
                    Instruction::LocalGet { local_idx: 0 },
                    Instruction::I32Const { value: -1 },
                    Instruction::I32Add,
                    Instruction::LocalTee { local_idx: 0 },
                    Instruction::Drop,
                    Instruction::Drop,
                    Instruction::Br { label_idx: 0 },
                ],
            }],
        },
        Instruction::LocalGet { local_idx: 0 },
    ]);
    let locals = vec![LocalGroup::new(1, ValueType::I64)];

    let mut module = Module::new();
    let sections = vec![
        Section::Type(VectorSection::new(vec![FuncType::new(vec![ValueType::I32], vec![ValueType::I32])])),
        Section::Function(VectorSection::new(vec![Function::new(0); count])),
        Section::Code(VectorSection::new(vec![CodeEntry::new(locals, body); count])),
    ];
    for section in sections {
        module.add_section(section).expect("sections in order");
    }
    module
}

fn benchmark_codec(c: &mut Criterion) {
    let synthetic = synthetic_module(2000);
    let synthetic_bytes = wasmkit::store(&synthetic);
    let rich_bytes = load_fixture("rich");

    println!(
        "\nsynthetic module: {} bytes, rich fixture: {} bytes",
        synthetic_bytes.len(),
        rich_bytes.len()
    );

    let mut group = c.benchmark_group("load");
    group.bench_function("rich", |b| {
        b.iter(|| black_box(wasmkit::load(black_box(&rich_bytes)).expect("Failed to load module")))
    });
    group.bench_function(format!("synthetic_{}kb", synthetic_bytes.len() / 1024), |b| {
        b.iter(|| black_box(wasmkit::load(black_box(&synthetic_bytes)).expect("Failed to load module")))
    });
    group.finish();

    let mut group = c.benchmark_group("store");
    group.bench_function("synthetic", |b| b.iter(|| black_box(wasmkit::store(black_box(&synthetic)))));
    group.finish();

    let mut group = c.benchmark_group("decode_bodies");
    group.bench_function("synthetic", |b| {
        b.iter(|| {
            let code = synthetic.code_section().expect("code section");
            for entry in code.iter() {
                black_box(entry.body.instructions().expect("Failed to decode body"));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, benchmark_codec);
criterion_main!(benches);
