//! Integration tests driving the full pipeline through [`Session`].
//!
//! These tests validate compilation end to end (parsing, optimization,
//! bytecode and native backends) against complete C programs, plus the
//! artifact containers, the module registry, and the VM's error
//! containment.

use seedc::{
    ArtifactKind, AstcProgram, BytecodeChunk, CompileOptions, ContainerError, ExportSignature,
    ModuleFlags, ModuleKind, NativeArtifact, NativeExport, NativeModuleFile, OpCode, SeedcError,
    Session, Target, VmState, disassemble_chunk, exit_code, package_module,
};
use std::path::PathBuf;

/// Load a test script from the test_scripts directory.
fn load_script(filename: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_scripts")
        .join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Compile and run a script on the VM, returning its exit code.
fn run(source: &str) -> i64 {
    let mut session = Session::new();
    session
        .run_source(source)
        .unwrap_or_else(|e| panic!("Failed to run program: {e}"))
}

/// Session pinned to x86-64 so native backends behave the same on any host.
fn x86_session(opt_level: u8) -> Session {
    Session::with_options(CompileOptions::new(opt_level, Target::X86_64))
}

// =============================================================================
// Complete Programs
// =============================================================================

#[test]
fn test_return_codes_script() {
    assert_eq!(run(&load_script("return_codes.c")), 42);
}

#[test]
fn test_arithmetic_script() {
    assert_eq!(run(&load_script("arithmetic.c")), 42);
}

#[test]
fn test_control_flow_script() {
    assert_eq!(run(&load_script("control_flow.c")), 60);
}

#[test]
fn test_functions_script() {
    assert_eq!(run(&load_script("functions.c")), 71);
}

#[test]
fn test_checksum_script() {
    let reference = run(&load_script("checksum.c"));
    assert!((0..199).contains(&reference));
    // The heavy workload must agree at every optimization level.
    for level in 0..=3 {
        let mut session = Session::with_options(CompileOptions::new(level, Target::host()));
        let code = session.run_source(&load_script("checksum.c")).unwrap();
        assert_eq!(code, reference, "level {level} diverged");
    }
}

#[test]
fn test_output_script() {
    let mut session = Session::new();
    let code = session.run_source(&load_script("output.c")).unwrap();
    assert_eq!(code, 0);
    assert_eq!(session.vm_mut().take_output(), b"7\n11\nok\n");
}

#[test]
fn test_return_literal_round_trip() {
    for value in [0, 1, 7, 42, 127] {
        let source = format!("int main(void) {{ return {value}; }}");
        assert_eq!(run(&source), value);
    }
}

#[test]
fn test_locals_add_up() {
    let source = "int main(void) { int a = 10; int b = 20; return a + b; }";
    assert_eq!(run(source), 30);
}

// =============================================================================
// Optimizer Soundness
// =============================================================================

#[test]
fn test_optimized_result_matches_unoptimized() {
    let source = "\
        int main(void) {\
            int total = 0;\
            int i;\
            for (i = 1; i <= 10; i = i + 1) {\
                if (0) { total = total - 100; }\
                total = total + i * 2;\
            }\
            return total;\
        }";
    let mut plain = Session::with_options(CompileOptions::new(0, Target::host()));
    let mut tuned = Session::with_options(CompileOptions::new(2, Target::host()));
    assert_eq!(
        plain.run_source(source).unwrap(),
        tuned.run_source(source).unwrap()
    );
}

#[test]
fn test_optimization_reaches_a_fixed_point() {
    use bumpalo::Bump;
    use seedc::{Diagnostics, Parser, emit_program, optimize};

    let source = "int main(void) { return (2 + 3) * (4 - 1); }";
    let arena = Bump::new();
    let mut diagnostics = Diagnostics::new();
    let unit = Parser::parse(source, &arena).unwrap();
    let (unit, first) = optimize(unit, &arena, 2, &mut diagnostics);
    assert!(first, "the first pass should fold something");
    let once = emit_program(&unit).unwrap();
    let (unit, second) = optimize(unit, &arena, 2, &mut diagnostics);
    assert!(!second, "a second pass should find nothing left");
    let twice = emit_program(&unit).unwrap();
    assert_eq!(once.bytecode, twice.bytecode);
}

#[test]
fn test_unreachable_code_notes_accumulate() {
    let mut session = Session::with_options(CompileOptions::new(2, Target::host()));
    session
        .compile("int main(void) { return 1; return 2; }")
        .unwrap();
    assert_eq!(session.diagnostics().info_count(), 1);
    session.clear_diagnostics();
    assert!(session.diagnostics().is_empty());
}

// =============================================================================
// Containers
// =============================================================================

#[test]
fn test_program_container_round_trip() {
    let mut session = Session::with_options(CompileOptions {
        embed_source: true,
        ..CompileOptions::default()
    });
    let source = "int main(void) { return 9; }";
    let program = session.compile(source).unwrap();
    let bytes = program.to_bytes().unwrap();
    assert_eq!(ArtifactKind::detect(&bytes), Some(ArtifactKind::Program));

    let decoded = AstcProgram::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.entry_point, program.entry_point);
    assert_eq!(decoded.bytecode, program.bytecode);
    assert_eq!(decoded.source.as_deref(), Some(source));

    assert_eq!(session.run_artifact(&bytes).unwrap(), 9);
}

#[test]
fn test_foreign_magic_is_rejected() {
    let mut session = Session::new();
    let err = session.run_artifact(b"BADCBADCBADCBADC").unwrap_err();
    assert!(matches!(
        err,
        SeedcError::Container(ContainerError::BadMagic { .. })
    ));
    assert_eq!(exit_code(&err), 2);
}

#[test]
fn test_native_modules_do_not_run_in_process() {
    let mut session = x86_session(1);
    let module = session
        .compile_module("int main(void) { return 3; }")
        .unwrap();
    assert_eq!(
        ArtifactKind::detect(&module),
        Some(ArtifactKind::NativeModule)
    );
    let err = session.run_artifact(&module).unwrap_err();
    assert!(matches!(err, SeedcError::Container(_)));
}

#[test]
fn test_executable_image_shape() {
    let mut session = x86_session(1);
    let image = session
        .compile_executable("int main(void) { return 0; }")
        .unwrap();
    assert_eq!(ArtifactKind::detect(&image), Some(ArtifactKind::Executable));
    assert_eq!(&image[..4], b"\x7fELF");
    assert!(image.len() > 0x1000, "header page plus code expected");
}

#[test]
fn test_duplicate_exports_are_rejected_at_packaging() {
    let signature = ExportSignature {
        param_count: 0,
        returns_value: true,
    };
    let artifact = NativeArtifact {
        code: vec![0xC3, 0xC3],
        exports: vec![
            NativeExport::function("twin", 0, 1, signature),
            NativeExport::function("twin", 1, 1, signature),
        ],
        entry: 0,
    };
    let err = package_module(
        &artifact,
        Target::X86_64,
        ModuleKind::User,
        ModuleFlags::empty(),
    )
    .unwrap_err();
    assert!(matches!(err, ContainerError::DuplicateExport { .. }));
}

// =============================================================================
// Native Backends
// =============================================================================

#[test]
fn test_assembly_listing_names_every_function() {
    let mut session = x86_session(1);
    let listing = session
        .compile_assembly(&load_script("functions.c"))
        .unwrap();
    for label in ["fib:", "max:", "square:", "main:"] {
        assert!(listing.contains(label), "missing {label}");
    }
    assert!(listing.contains(".globl"));
}

#[test]
fn test_unsupported_constructs_fail_codegen() {
    let mut session = x86_session(1);
    let err = session
        .compile_module("int shared = 1; int main(void) { return shared; }")
        .unwrap_err();
    assert!(matches!(err, SeedcError::Codegen(_)));
    assert_eq!(exit_code(&err), 4);
}

// =============================================================================
// Module Registry
// =============================================================================

/// Scratch directory for tests that write module files.
fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("seedc-unit-{test}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_module_lifecycle_counts_references() {
    let dir = scratch_dir("lifecycle");
    let path = dir.join("mathlib.native");
    let mut session = x86_session(1);
    let bytes = session
        .compile_module("int add(int a, int b) { return a + b; } int main(void) { return 0; }")
        .unwrap();
    std::fs::write(&path, &bytes).unwrap();

    let id = session.load_module("mathlib", Some(&path)).unwrap();
    let again = session.load_module("mathlib", None).unwrap();
    assert_eq!(id, again);
    assert_eq!(session.registry().get(id).unwrap().ref_count(), 2);

    session.registry_mut().unload(id).unwrap();
    assert_eq!(session.registry().get(id).unwrap().ref_count(), 1);
    session.registry_mut().unload(id).unwrap();
    assert!(session.registry().get(id).is_err());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_import_resolution_is_repeatable() {
    let dir = scratch_dir("repeatable");
    let provider_path = dir.join("provider.native");
    let consumer_path = dir.join("consumer.native");
    let mut session = x86_session(1);
    let provider = session
        .compile_module("int answer(void) { return 42; } int main(void) { return 0; }")
        .unwrap();
    let consumer = session
        .compile_module("int main(void) { return 0; }")
        .unwrap();
    std::fs::write(&provider_path, &provider).unwrap();
    std::fs::write(&consumer_path, &consumer).unwrap();

    let provider_id = session.load_module("provider", Some(&provider_path)).unwrap();
    let consumer_id = session.load_module("consumer", Some(&consumer_path)).unwrap();
    session
        .registry_mut()
        .add_import(consumer_id, "provider", "answer")
        .unwrap();

    assert_eq!(session.link_module(consumer_id).unwrap(), 1);
    let import = &session.registry().get(consumer_id).unwrap().imports()[0];
    assert!(import.resolved);
    let base = session.registry().get(provider_id).unwrap().base_address();
    assert!(import.address >= base);

    // A second pass has nothing left to bind and warns about nothing.
    assert_eq!(session.link_module(consumer_id).unwrap(), 0);
    assert!(session.diagnostics().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_module_files_map_to_exit_one() {
    let mut session = Session::new();
    let err = session.load_module("no-such-module", None).unwrap_err();
    assert_eq!(exit_code(&err), 1);
}

// =============================================================================
// Virtual Machine
// =============================================================================

#[test]
fn test_vm_faults_leave_prior_state_intact() {
    let mut chunk = BytecodeChunk::new();
    chunk.write_op(OpCode::LoadImm, 1);
    chunk.write_byte(0, 1);
    chunk.write_i64(7, 1);
    chunk.write_op(OpCode::Jmp, 1);
    chunk.write_u32(9999, 1);
    let program = AstcProgram::new(chunk.into_code(), 0);

    let mut session = Session::new();
    let err = session.run_program(program).unwrap_err();
    assert!(matches!(err, SeedcError::Vm(_)));
    assert_eq!(exit_code(&err), 6);
    assert_eq!(session.vm().state(), VmState::Error);
    assert_eq!(session.vm().registers()[0], 7);
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_divide_by_zero_reports_the_offset() {
    let mut session = Session::new();
    let err = session
        .run_source("int main(void) { int d = 0; return 5 / d; }")
        .unwrap_err();
    match err {
        SeedcError::Vm(vm_err) => assert!(vm_err.to_string().contains("division by zero")),
        other => panic!("expected a VM fault, got {other}"),
    }
}

#[test]
fn test_disassembly_covers_a_compiled_program() {
    let mut session = Session::new();
    let program = session.compile("int main(void) { return 1 + 2; }").unwrap();
    let chunk = BytecodeChunk::from_bytes(program.bytecode.clone());
    let listing = disassemble_chunk(&chunk);
    assert!(listing.contains("load"));
    assert!(listing.contains("exit"));
    assert!(!listing.contains("<truncated>"));
}

// =============================================================================
// Error Taxonomy
// =============================================================================

#[test]
fn test_exit_codes_partition_the_failures() {
    let mut session = Session::new();

    let parse = session.compile("int main( {").unwrap_err();
    assert_eq!(exit_code(&parse), 3);

    let mut module = NativeModuleFile::new(seedc::Architecture::X86_64, ModuleKind::User);
    module.code = vec![0xC3];
    let bytes = module.to_bytes().unwrap();
    let container = session.run_artifact(&bytes).unwrap_err();
    assert_eq!(exit_code(&container), 2);
}
