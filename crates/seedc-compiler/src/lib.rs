//! seedc compiler crate.
//!
//! This crate turns a parsed translation unit into something runnable.
//! It includes:
//! - AST optimization passes (folding, dead code removal, identities)
//! - The bytecode emitter for the register VM
//! - Native code generators (x86-64 and x86-32, listing or machine code)
//! - Packaging into `.astc` programs, `.native` modules, and executables
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use seedc_compiler::{emit_program, optimize};
//! use seedc_core::Diagnostics;
//! use seedc_parser::Parser;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     int main(void) {
//!         int a = 10;
//!         int b = 20;
//!         return a + b;
//!     }
//! "#;
//!
//! let unit = Parser::parse(source, &arena).unwrap();
//! let mut diagnostics = Diagnostics::new();
//! let (unit, _changed) = optimize(unit, &arena, 1, &mut diagnostics);
//! let program = emit_program(&unit).unwrap();
//! assert!(!program.bytecode.is_empty());
//! ```

// Native code generation
pub mod codegen;

// Bytecode emission
pub mod emit;

// AST optimization passes
pub mod optimizer;

// Artifact packaging
pub mod packager;

mod locals;
mod symbols;

// Re-export commonly used items at crate root
pub use codegen::{NativeArtifact, generate, generate_assembly};
pub use emit::emit_program;
pub use optimizer::optimize;
pub use packager::{build_executable, package_module, write_executable};
