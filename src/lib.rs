//! A WebAssembly binary parser and module loader.
//!
//! wasmload reads `.wasm` bytes into a [`parser::Module`]: every standard
//! section decoded and checked, index spaces resolved, custom sections kept
//! verbatim. What the parser accepts is decided by a [`features::Composition`]
//! of independent [`features::Feature`]s, one per WebAssembly proposal, so a
//! binary using SIMD is rejected by a parser composed without it.
//!
//! # Modules
//!
//! - [`parser`] -- The binary decoder, the module representation and the parser configuration.
//! - [`features`] -- Proposal features and the composition that resolves them into a dispatch table.
//! - [`logging`] -- `env_logger` setup used by the `wasmload` binary.
//!
//! # Example
//!
//! ```
//! use wasmload::parser::{self, ErrorKind};
//!
//! let module = parser::parse(b"\0asm\x01\0\0\0").unwrap();
//! assert_eq!(module.version, 1);
//! assert_eq!(module.function_count(), 0);
//!
//! let err = parser::parse(b"\0asm\x02\0\0\0").unwrap_err();
//! assert_eq!(err.kind, ErrorKind::UnsupportedBinfmtVersion(2));
//! assert_eq!(err.to_string(), "byte 4: unsupported binary format version 2");
//! ```
//!
//! # Specification
//!
//! Targets the [WebAssembly binary format](https://webassembly.github.io/spec/core/binary/index.html)
//! version 1, with the multi-value, bulk memory, reference types, SIMD,
//! multi-memory, memory64, threads, extended-const and exception handling
//! proposals selectable as Cargo features.

pub mod features;
pub mod logging;
pub mod parser;
