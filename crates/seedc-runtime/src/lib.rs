//! seedc runtime crate.
//!
//! Hosts compiled programs:
//!
//! - [`vm`]: the bytecode virtual machine, a sixteen-register state
//!   machine with bounded stacks, a handle-table heap, and contained
//!   faults
//! - [`registry`]: the dynamic module registry, reference-counted
//!   loading of `.native` containers with lazy import resolution and
//!   dependency ordering
//!
//! ```
//! use seedc_core::{AstcProgram, BytecodeChunk, OpCode};
//! use seedc_runtime::{Vm, VmState};
//!
//! let mut chunk = BytecodeChunk::new();
//! chunk.write_op(OpCode::LoadImm, 1);
//! chunk.write_byte(0, 1);
//! chunk.write_i64(7, 1);
//! chunk.write_op(OpCode::Exit, 1);
//! chunk.write_byte(0, 1);
//!
//! let mut vm = Vm::new();
//! vm.load(AstcProgram::new(chunk.into_code(), 0)).unwrap();
//! assert_eq!(vm.execute().unwrap(), 7);
//! assert_eq!(vm.state(), VmState::Stopped);
//! ```

/// Dynamic module registry.
pub mod registry;
/// Bytecode virtual machine.
pub mod vm;

pub use registry::{LoadedModule, ModuleId, ModuleImport, ModuleRegistry, RegistryConfig};
pub use vm::{CondFlags, REGISTER_COUNT, Vm, VmConfig, VmState};
