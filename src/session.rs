//! One toolchain session, from source text to executed program.
//!
//! [`Session`] owns everything a driver needs end to end: the compile
//! options, a [`Diagnostics`] collection that accumulates across
//! operations, a [`ModuleRegistry`] for native containers, and a [`Vm`]
//! for bytecode programs. The compile methods wrap the
//! [`crate::pipeline`] entry points; the run methods execute programs
//! on the session VM; the module methods load and link containers
//! through the registry.
//!
//! ```
//! use seedc::Session;
//!
//! let mut session = Session::new();
//! let exit = session.run_source("int main(void) { return 4 + 3; }").unwrap();
//! assert_eq!(exit, 7);
//! ```

use std::path::Path;

use seedc_core::{AstcProgram, Diagnostics, SeedcError};
use seedc_runtime::{ModuleId, ModuleRegistry, Vm};

use crate::pipeline::{self, CompileOptions};

/// Compilation and execution state for one driver.
pub struct Session {
    options: CompileOptions,
    diagnostics: Diagnostics,
    registry: ModuleRegistry,
    vm: Vm,
}

impl Session {
    /// Creates a session with default options.
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    /// Creates a session compiling for the given options; the module
    /// registry searches for containers named after the option target.
    pub fn with_options(options: CompileOptions) -> Self {
        let registry = ModuleRegistry::with_target(options.target);
        Self {
            options,
            diagnostics: Diagnostics::new(),
            registry,
            vm: Vm::new(),
        }
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Compiles source into a bytecode program.
    pub fn compile(&mut self, source: &str) -> Result<AstcProgram, SeedcError> {
        pipeline::compile_to_program(source, &self.options, &mut self.diagnostics)
    }

    /// Compiles source into a packaged native module container.
    pub fn compile_module(&mut self, source: &str) -> Result<Vec<u8>, SeedcError> {
        pipeline::compile_to_module(source, &self.options, &mut self.diagnostics)
    }

    /// Compiles source into an executable image.
    pub fn compile_executable(&mut self, source: &str) -> Result<Vec<u8>, SeedcError> {
        pipeline::compile_to_executable(source, &self.options, &mut self.diagnostics)
    }

    /// Compiles source into an assembly listing.
    pub fn compile_assembly(&mut self, source: &str) -> Result<String, SeedcError> {
        pipeline::compile_to_assembly(source, &self.options, &mut self.diagnostics)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Loads a bytecode program into the session VM and runs it to
    /// completion, returning its exit code.
    pub fn run_program(&mut self, program: AstcProgram) -> Result<i64, SeedcError> {
        self.vm.load(program)?;
        Ok(self.vm.execute()?)
    }

    /// Runs a compiled artifact, dispatching on its magic tag.
    ///
    /// Only bytecode program containers execute in process; native
    /// modules load through the registry and executables run through
    /// the OS loader, so any other magic is rejected as a format error
    /// before a byte of it is interpreted.
    pub fn run_artifact(&mut self, bytes: &[u8]) -> Result<i64, SeedcError> {
        let program = AstcProgram::from_bytes(bytes)?;
        self.run_program(program)
    }

    /// Compiles and immediately runs a source program on the VM.
    pub fn run_source(&mut self, source: &str) -> Result<i64, SeedcError> {
        let program = self.compile(source)?;
        self.run_program(program)
    }

    // ========================================================================
    // Modules
    // ========================================================================

    /// Loads a native module into the session registry.
    pub fn load_module(
        &mut self,
        name: &str,
        path: Option<&Path>,
    ) -> Result<ModuleId, SeedcError> {
        Ok(self.registry.load(name, path)?)
    }

    /// Registers a resident system module from memory.
    pub fn register_resident(&mut self, name: &str, bytes: &[u8]) -> Result<ModuleId, SeedcError> {
        Ok(self.registry.register_resident(name, bytes)?)
    }

    /// Resolves a module's imports against the loaded providers,
    /// reporting the unresolved ones into the session diagnostics.
    pub fn link_module(&mut self, id: ModuleId) -> Result<usize, SeedcError> {
        Ok(self.registry.resolve_imports(id, &mut self.diagnostics)?)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Warnings and notes accumulated by every operation since the last
    /// [`Session::clear_diagnostics`].
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedc_core::{ContainerError, Target};
    use seedc_runtime::VmState;

    #[test]
    fn sessions_compile_and_run() {
        let mut session = Session::new();
        let exit = session.run_source("int main(void) { return 12; }").unwrap();
        assert_eq!(exit, 12);
        assert_eq!(session.vm().state(), VmState::Stopped);
    }

    #[test]
    fn artifacts_dispatch_on_magic() {
        let mut session = Session::new();
        let program = session.compile("int main(void) { return 9; }").unwrap();
        let bytes = program.to_bytes().unwrap();
        assert_eq!(session.run_artifact(&bytes).unwrap(), 9);
    }

    #[test]
    fn foreign_magic_is_rejected_before_execution() {
        let mut session = Session::with_options(CompileOptions::new(1, Target::X86_64));
        let module = session.compile_module("int main(void) { return 0; }").unwrap();
        let err = session.run_artifact(&module).unwrap_err();
        assert!(matches!(
            err,
            SeedcError::Container(ContainerError::BadMagic { .. })
        ));
    }

    #[test]
    fn diagnostics_accumulate_across_operations() {
        let mut session = Session::with_options(CompileOptions::new(2, Target::X86_64));
        session
            .compile("int main(void) { return 1; return 2; }")
            .unwrap();
        assert_eq!(session.diagnostics().info_count(), 1);
        session
            .compile("int main(void) { return 3; return 4; }")
            .unwrap();
        assert_eq!(session.diagnostics().info_count(), 2);
        session.clear_diagnostics();
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn modules_link_through_the_session() {
        let dir = std::env::temp_dir().join("seedc-session-link");
        std::fs::create_dir_all(&dir).unwrap();
        let mut session = Session::with_options(CompileOptions::new(1, Target::X86_64));

        let provider = session
            .compile_module("int add(int a, int b) { return a + b; } int main(void) { return 0; }")
            .unwrap();
        let path = dir.join("mathlib.native");
        std::fs::write(&path, &provider).unwrap();

        let consumer = session.compile_module("int main(void) { return 1; }").unwrap();
        let consumer_path = dir.join("game.native");
        std::fs::write(&consumer_path, &consumer).unwrap();

        let provider = session.load_module("mathlib", Some(&path)).unwrap();
        let consumer = session.load_module("game", Some(&consumer_path)).unwrap();
        session
            .registry_mut()
            .add_import(consumer, "mathlib", "add")
            .unwrap();

        assert_eq!(session.link_module(consumer).unwrap(), 1);
        assert!(session.diagnostics().is_empty());
        let imports = session.registry().get(consumer).unwrap().imports();
        assert!(imports[0].resolved);
        let base = session.registry().get(provider).unwrap().base_address();
        assert!(imports[0].address >= base);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
