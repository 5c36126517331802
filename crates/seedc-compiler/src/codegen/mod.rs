//! Native code generation for the x86 targets.
//!
//! One lowering walk drives two interchangeable sinks: [`generate`]
//! encodes machine code directly and [`generate_assembly`] renders the
//! same instruction stream as an AT&T listing. The output starts with a
//! `_start` stub that calls `main` and exits with its result, so the raw
//! code is runnable as soon as it is wrapped in an executable image.

mod asm;
mod encode;
mod lower;

use seedc_core::{Architecture, CodegenError, NativeExport, Span, Target};
use seedc_parser::ast::TranslationUnit;

use crate::symbols::FunctionTable;
use asm::AsmSink;
use encode::MachineSink;
use lower::lower_unit;

/// Machine code plus the symbol information the packagers need.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeArtifact {
    /// Raw machine code, entry stub first.
    pub code: Vec<u8>,
    /// One export per function definition.
    pub exports: Vec<NativeExport>,
    /// Offset of `main` within `code`.
    pub entry: u32,
}

/// Compile a unit to machine code.
///
/// # Errors
///
/// Rejects the Arm64 target, a missing `main`, and everything the
/// lowering walk reports: name and arity errors plus constructs with no
/// native lowering. Nothing partial is produced on failure.
pub fn generate(
    unit: &TranslationUnit<'_>,
    target: Target,
) -> Result<NativeArtifact, CodegenError> {
    let (table, main_span) = preflight(unit, target)?;
    let mut sink = MachineSink::new(target);
    sink.start_stub(main_span);
    lower_unit(unit, &table, target, &mut sink)?;
    sink.finish(&table)
}

/// Render a unit as an AT&T assembly listing for `target`.
///
/// # Errors
///
/// Same conditions as [`generate`].
pub fn generate_assembly(
    unit: &TranslationUnit<'_>,
    target: Target,
) -> Result<String, CodegenError> {
    let (table, _) = preflight(unit, target)?;
    let mut sink = AsmSink::new(target);
    sink.start_stub();
    lower_unit(unit, &table, target, &mut sink)?;
    Ok(sink.finish())
}

fn preflight<'ast>(
    unit: &TranslationUnit<'ast>,
    target: Target,
) -> Result<(FunctionTable<'ast>, Span), CodegenError> {
    if target.arch == Architecture::Arm64 {
        return Err(CodegenError::UnsupportedTarget {
            target: target.to_string(),
        });
    }
    let table = FunctionTable::build(unit)?;
    let main_span = match table.get("main") {
        Some(sig) if sig.defined => sig.span,
        _ => return Err(CodegenError::MissingMain),
    };
    Ok((table, main_span))
}
