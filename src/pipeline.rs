//! The staged compilation pipeline.
//!
//! One entry point per artifact kind, each running the same front half
//! (lex, parse, optimize) and diverging at the backend:
//!
//! - [`compile_to_program`]: bytecode program for the VM
//! - [`compile_to_module`]: packaged native module container
//! - [`compile_to_executable`]: minimal executable image
//! - [`compile_to_assembly`]: assembly listing
//!
//! Warnings and optimizer notes accumulate in the caller's
//! [`Diagnostics`]; errors abort the artifact and come back as
//! [`SeedcError`]. A failed compilation leaves no partial artifact.

use bumpalo::Bump;

use seedc_compiler::{
    NativeArtifact, build_executable, emit_program, generate, generate_assembly, optimize,
    package_module,
};
use seedc_core::{AstcProgram, Diagnostics, ModuleFlags, ModuleKind, SeedcError, Target};
use seedc_parser::Parser;

/// Options for one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Optimization level, 0 through 3.
    pub opt_level: u8,
    /// Code-generation target.
    pub target: Target,
    /// Embed the source text in the bytecode program container.
    pub embed_source: bool,
}

impl CompileOptions {
    pub fn new(opt_level: u8, target: Target) -> Self {
        Self {
            opt_level,
            target,
            embed_source: false,
        }
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new(1, Target::host())
    }
}

/// Compiles source into a bytecode program.
pub fn compile_to_program(
    source: &str,
    options: &CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<AstcProgram, SeedcError> {
    let arena = Bump::new();
    let unit = Parser::parse(source, &arena)?;
    let (unit, _) = optimize(unit, &arena, options.opt_level, diagnostics);
    let program = emit_program(&unit)?;
    if options.embed_source {
        return Ok(program.with_source(source));
    }
    Ok(program)
}

/// Compiles source into a packaged native module container.
pub fn compile_to_module(
    source: &str,
    options: &CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<u8>, SeedcError> {
    let artifact = generate_artifact(source, options, diagnostics)?;
    let flags = if options.opt_level > 0 {
        ModuleFlags::OPTIMIZED
    } else {
        ModuleFlags::empty()
    };
    Ok(package_module(
        &artifact,
        options.target,
        ModuleKind::User,
        flags,
    )?)
}

/// Compiles source into an executable image for the option target.
pub fn compile_to_executable(
    source: &str,
    options: &CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<u8>, SeedcError> {
    let artifact = generate_artifact(source, options, diagnostics)?;
    Ok(build_executable(&artifact, options.target)?)
}

/// Compiles source into an assembly listing.
pub fn compile_to_assembly(
    source: &str,
    options: &CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<String, SeedcError> {
    let arena = Bump::new();
    let unit = Parser::parse(source, &arena)?;
    let (unit, _) = optimize(unit, &arena, options.opt_level, diagnostics);
    Ok(generate_assembly(&unit, options.target)?)
}

fn generate_artifact(
    source: &str,
    options: &CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<NativeArtifact, SeedcError> {
    let arena = Bump::new();
    let unit = Parser::parse(source, &arena)?;
    let (unit, _) = optimize(unit, &arena, options.opt_level, diagnostics);
    Ok(generate(&unit, options.target)?)
}
