//! Core vocabulary shared by every stage of the seedc toolchain.
//!
//! This crate holds the types that both the compile-time pipeline and the
//! runtime need to agree on:
//! - [`Span`] for source positions
//! - the unified error hierarchy ([`SeedcError`] and the per-phase enums)
//! - [`Diagnostics`] for structured warnings and notes
//! - target descriptors ([`Target`], [`Architecture`])
//! - the bytecode encoding ([`OpCode`], [`BytecodeChunk`])
//! - the three on-disk container formats (program, native module, executable)
//!
//! Containers live here rather than in the compiler because the compiler
//! writes them and the runtime reads them; both sides must share one codec.

pub mod bytecode;
pub mod container;
pub mod diagnostics;
pub mod error;
pub mod span;
pub mod target;

pub use bytecode::{BytecodeChunk, OpCode, disassemble_chunk};
pub use container::astc::{AstcProgram, ASTC_MAGIC, ASTC_VERSION};
pub use container::elf::{build_executable_image, write_executable};
pub use container::native::{
    ExportSignature, ExportType, ModuleFlags, NativeExport, NativeModuleFile, NATIVE_MAGIC,
    NATIVE_VERSION,
};
pub use container::{write_artifact, ArtifactKind};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{
    exit_code, CodegenError, ContainerError, ModuleError, ParseError, ParseErrorKind, SeedcError,
    VmError,
};
pub use span::Span;
pub use target::{Architecture, ModuleKind, Target};
