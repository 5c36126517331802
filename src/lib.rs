//! seedc: a C-subset compiler toolchain with a bytecode VM and a
//! dynamic module runtime.
//!
//! The pipeline compiles a small C subset through lexing, parsing,
//! optimization, and code generation into one of four artifacts: a
//! bytecode program, an assembly listing, a native module container, or
//! a minimal executable image. Bytecode programs run on the [`Vm`];
//! native modules load into a [`ModuleRegistry`] with reference
//! counting, lazy import resolution, and dependency ordering;
//! executables are handed to the OS loader.
//!
//! The workspace splits along the pipeline:
//!
//! - `seedc-core`: spans, errors, diagnostics, targets, the bytecode
//!   encoding, and the three container codecs
//! - `seedc-parser`: the lexer and the arena-allocated AST
//! - `seedc-compiler`: optimizer passes, the bytecode emitter, native
//!   code generation, and packaging
//! - `seedc-runtime`: the virtual machine and the module registry
//!
//! This crate re-exports that surface and adds the driver layer:
//! [`Session`] and the [`pipeline`] entry points.
//!
//! ```
//! use seedc::Session;
//!
//! let mut session = Session::new();
//! let exit = session
//!     .run_source("int main(void) { int a = 10; int b = 20; return a + b; }")
//!     .unwrap();
//! assert_eq!(exit, 30);
//! ```

/// Compile-to-artifact entry points.
pub mod pipeline;
/// The end-to-end driver.
pub mod session;

pub use pipeline::{
    CompileOptions, compile_to_assembly, compile_to_executable, compile_to_module,
    compile_to_program,
};
pub use session::Session;

pub use seedc_core::{
    ASTC_MAGIC, ASTC_VERSION, Architecture, ArtifactKind, AstcProgram, BytecodeChunk,
    CodegenError, ContainerError, Diagnostic, DiagnosticKind, Diagnostics, ExportSignature,
    ExportType, ModuleError, ModuleFlags, ModuleKind, NATIVE_MAGIC, NATIVE_VERSION, NativeExport,
    NativeModuleFile, OpCode, ParseError, ParseErrorKind, SeedcError, Span, Target, VmError,
    disassemble_chunk, exit_code, write_artifact,
};

pub use seedc_compiler::{
    NativeArtifact, build_executable, emit_program, generate, generate_assembly, optimize,
    package_module, write_executable,
};

pub use seedc_parser::{Lexer, Parser, Token, TokenKind, TranslationUnit};

pub use seedc_runtime::{
    CondFlags, LoadedModule, ModuleId, ModuleImport, ModuleRegistry, REGISTER_COUNT,
    RegistryConfig, Vm, VmConfig, VmState,
};
