//! # wasmkit
//!
//! Command-line front end for the codec: inspect, round-trip and disassemble
//! `.wasm` files, or write a fresh empty module.

use std::error::Error;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use wasmkit::parser::encoding::VarWidth;
use wasmkit::parser::instruction::disassemble;
use wasmkit::parser::module::Section;
use wasmkit::parser::types::ImportDescriptor;
use wasmkit::Module;

#[derive(Parser)]
#[command(name = "wasmkit")]
#[command(about = "Decode, encode and inspect WebAssembly MVP modules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log decoding and encoding steps
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the sections of a module
    Inspect {
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load and store a module, checking the output is byte-identical
    Roundtrip { file: PathBuf },

    /// Print the instructions of every function body
    Disasm { file: PathBuf },

    /// Write an empty module
    New { out: PathBuf },
}

#[derive(Serialize)]
struct ModuleSummary {
    version: u32,
    size: usize,
    valid: bool,
    sections: Vec<SectionSummary>,
}

#[derive(Serialize)]
struct SectionSummary {
    id: u8,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    payload_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<usize>,
    padded_length: bool,
}

impl ModuleSummary {
    fn new(module: &Module, size: usize) -> Self {
        let sections = module
            .sections()
            .iter()
            .map(|section| SectionSummary {
                id: section.id(),
                kind: section.kind().name(),
                name: match section {
                    Section::Custom(custom) => Some(custom.name.to_string()),
                    _ => None,
                },
                payload_size: section.payload_size(),
                entries: section.element_count(),
                padded_length: section.length_prefix() != VarWidth::Minimal,
            })
            .collect();
        ModuleSummary {
            version: module.version(),
            size,
            valid: module.is_valid(),
            sections,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Commands::Inspect { file, json } => {
            let bytes = fs::read(&file)?;
            let module = wasmkit::load(&bytes)?;
            let summary = ModuleSummary::new(&module, bytes.len());
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{module}");
                println!("function bodies match declarations: {}", summary.valid);
            }
        }

        Commands::Roundtrip { file } => {
            let bytes = fs::read(&file)?;
            let module = wasmkit::load(&bytes)?;
            let stored = wasmkit::store(&module);
            if stored == bytes {
                println!("identical ({} bytes)", bytes.len());
            } else {
                let first_difference = stored
                    .iter()
                    .zip(&bytes)
                    .position(|(a, b)| a != b)
                    .unwrap_or_else(|| stored.len().min(bytes.len()));
                println!(
                    "differs at offset {first_difference}: input {} bytes, output {} bytes",
                    bytes.len(),
                    stored.len()
                );
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Disasm { file } => {
            let module = wasmkit::load_from(File::open(&file)?)?;
            let imported = module.import_section().map_or(0, |imports| {
                imports
                    .iter()
                    .filter(|import| matches!(import.descriptor, ImportDescriptor::Function(_)))
                    .count()
            });
            if let Some(code) = module.code_section() {
                for (i, entry) in code.iter().enumerate() {
                    println!("func {}", imported + i);
                    for group in &entry.locals {
                        println!("  local {} x {}", group.count, group.value_type);
                    }
                    let body = entry.body.instructions()?;
                    for line in disassemble(&body).lines() {
                        println!("  {line}");
                    }
                }
            }
        }

        Commands::New { out } => {
            let file = File::create(&out)?;
            wasmkit::store_to(&Module::new(), BufWriter::new(file))?;
            println!("wrote {}", out.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}
