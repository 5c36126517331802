//! Bytecode types shared by the compiler and the VM.
//!
//! - [`OpCode`] - The instruction set
//! - [`BytecodeChunk`] - An instruction stream with patching support
//! - [`disassemble_chunk`] - Textual listing of a chunk

mod chunk;
mod disasm;
mod opcode;

pub use chunk::BytecodeChunk;
pub use disasm::{disassemble_chunk, disassemble_instruction};
pub use opcode::OpCode;
