//! Bytecode disassembler.
//!
//! Renders a chunk as one instruction per line: a four-digit offset, the
//! mnemonic, and the decoded operands. Truncated or unknown bytes are
//! listed as data so that a listing always covers the whole chunk.

use std::fmt::Write;

use super::{BytecodeChunk, OpCode};

/// Disassemble a whole chunk into a listing.
pub fn disassemble_chunk(chunk: &BytecodeChunk) -> String {
    let mut out = String::new();
    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// Disassemble the instruction at `offset`.
///
/// Returns the rendered line and the offset of the next instruction.
pub fn disassemble_instruction(chunk: &BytecodeChunk, offset: usize) -> (String, usize) {
    let mut line = String::new();
    let _ = write!(line, "{offset:04} ");

    let Some(op) = chunk.read_op(offset) else {
        let byte = chunk.read_byte(offset).unwrap_or(0);
        let _ = write!(line, ".byte {byte:#04x}");
        return (line, offset + 1);
    };

    let _ = write!(line, "{:<7}", op.name());
    let operand = offset + 1;
    let next = operand + op.operand_size();

    if next > chunk.len() {
        let _ = write!(line, " <truncated>");
        return (line, chunk.len());
    }

    match op {
        OpCode::Nop | OpCode::Halt | OpCode::Ret => {}

        OpCode::Exit
        | OpCode::Neg
        | OpCode::Not
        | OpCode::Push
        | OpCode::Pop
        | OpCode::Print
        | OpCode::PrintChar
        | OpCode::Free => {
            if let Some(r) = chunk.read_byte(operand) {
                let _ = write!(line, " r{r}");
            }
        }

        OpCode::Syscall => {
            if let Some(n) = chunk.read_byte(operand) {
                let _ = write!(line, " {n}");
            }
        }

        OpCode::Mov
        | OpCode::Add
        | OpCode::Sub
        | OpCode::Mul
        | OpCode::Div
        | OpCode::Mod
        | OpCode::And
        | OpCode::Or
        | OpCode::Xor
        | OpCode::Shl
        | OpCode::Shr
        | OpCode::Cmp
        | OpCode::Alloc => {
            if let (Some(a), Some(b)) = (chunk.read_byte(operand), chunk.read_byte(operand + 1)) {
                let _ = write!(line, " r{a}, r{b}");
            }
        }

        OpCode::Jmp
        | OpCode::Jz
        | OpCode::Jnz
        | OpCode::Jl
        | OpCode::Jle
        | OpCode::Jg
        | OpCode::Jge
        | OpCode::Call => {
            if let Some(target) = chunk.read_u32(operand) {
                let _ = write!(line, " {target:04}");
            }
        }

        OpCode::LoadImm => {
            if let (Some(r), Some(value)) = (chunk.read_byte(operand), chunk.read_i64(operand + 1))
            {
                let _ = write!(line, " r{r}, {value}");
            }
        }
    }

    (line, next)
}
