//! A byte-exact codec for WebAssembly MVP binary modules.
//!
//! wasmkit decodes `.wasm` bytes into a [`Module`] made of typed sections and
//! encodes a `Module` back to bytes. Decoding a module and storing it again
//! reproduces the input, including padded length fields left by producers
//! that reserve fixed-width lengths.
//!
//! # Modules
//!
//! - [`parser`] -- Binary decoder, the module model and the instruction codec.
//! - [`encoder`] -- Binary encoder. Serialises a `Module` back to `.wasm` bytes.
//! - [`error`] -- The error type shared by both directions.
//!
//! # Example
//!
//! Build a module with one function, store it and load it back:
//!
//! ```
//! use wasmkit::parser::instruction::Instruction;
//! use wasmkit::parser::module::{Section, VectorSection};
//! use wasmkit::parser::types::{CodeBlock, CodeEntry, FuncType, Function, ValueType};
//! use wasmkit::Module;
//!
//! let mut module = Module::new();
//! module.add_section(Section::Type(VectorSection::new(vec![FuncType::new(
//!     vec![],
//!     vec![ValueType::I32],
//! )]))).unwrap();
//! module.add_section(Section::Function(VectorSection::new(vec![Function::new(0)]))).unwrap();
//! module.add_section(Section::Code(VectorSection::new(vec![CodeEntry::new(
//!     vec![],
//!     CodeBlock::from_instructions(&[Instruction::I32Const { value: 42 }]),
//! )]))).unwrap();
//! assert!(module.is_valid());
//!
//! let bytes = wasmkit::store(&module);
//! let loaded = wasmkit::load(&bytes).unwrap();
//! assert_eq!(loaded, module);
//!
//! let body = loaded.code_section().unwrap().entries[0].body.instructions().unwrap();
//! assert_eq!(body, vec![Instruction::I32Const { value: 42 }]);
//! ```

pub mod encoder;
pub mod error;
pub mod parser;

pub use encoder::{store, store_to, Encode};
pub use error::{Error, Result};
pub use parser::module::Module;
pub use parser::{load, load_from, Decode};
