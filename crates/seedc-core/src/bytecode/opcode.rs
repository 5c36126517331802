//! Bytecode operation codes.
//!
//! The instruction set of the register VM. Each opcode is a single byte
//! with operands following inline: registers as one byte, immediates as
//! i64 little-endian, jump and call targets as u32 little-endian absolute
//! chunk offsets. Discriminants are grouped by function and are part of
//! the on-disk program format.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
///
/// The VM is a register machine with a value stack for temporaries.
/// Binary operations read both registers and write the result into the
/// first; comparison results live in the flags until a conditional jump
/// consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Control
    // =========================================================================
    /// Do nothing.
    Nop = 0x00,
    /// Stop execution; the machine moves to Stopped.
    Halt = 0x01,
    /// Stop execution with the exit code taken from a register.
    /// Operand: u8 register
    Exit = 0x02,

    // =========================================================================
    // Data Movement
    // =========================================================================
    /// Load an immediate into a register.
    /// Operands: u8 register, i64 value
    LoadImm = 0x10,
    /// Copy one register into another.
    /// Operands: u8 destination, u8 source
    Mov = 0x11,

    // =========================================================================
    // Arithmetic and Logic
    // =========================================================================
    /// `rd = rd + rs`. Operands: u8 rd, u8 rs
    Add = 0x20,
    /// `rd = rd - rs`. Operands: u8 rd, u8 rs
    Sub = 0x21,
    /// `rd = rd * rs`. Operands: u8 rd, u8 rs
    Mul = 0x22,
    /// `rd = rd / rs`; division by zero faults. Operands: u8 rd, u8 rs
    Div = 0x23,
    /// `rd = rd % rs`; division by zero faults. Operands: u8 rd, u8 rs
    Mod = 0x24,
    /// `r = -r`. Operand: u8 register
    Neg = 0x25,
    /// `rd = rd & rs`. Operands: u8 rd, u8 rs
    And = 0x26,
    /// `rd = rd | rs`. Operands: u8 rd, u8 rs
    Or = 0x27,
    /// `rd = rd ^ rs`. Operands: u8 rd, u8 rs
    Xor = 0x28,
    /// `r = !r`. Operand: u8 register
    Not = 0x29,
    /// `rd = rd << rs`. Operands: u8 rd, u8 rs
    Shl = 0x2A,
    /// `rd = rd >> rs` (arithmetic). Operands: u8 rd, u8 rs
    Shr = 0x2B,

    // =========================================================================
    // Comparison
    // =========================================================================
    /// Compare two registers and set the flags.
    /// Operands: u8 ra, u8 rb
    Cmp = 0x30,

    // =========================================================================
    // Jumps
    // =========================================================================
    /// Unconditional jump. Operand: u32 absolute offset
    Jmp = 0x38,
    /// Jump if the zero flag is set. Operand: u32 absolute offset
    Jz = 0x39,
    /// Jump if the zero flag is clear. Operand: u32 absolute offset
    Jnz = 0x3A,
    /// Jump if less (signed). Operand: u32 absolute offset
    Jl = 0x3B,
    /// Jump if less or equal (signed). Operand: u32 absolute offset
    Jle = 0x3C,
    /// Jump if greater (signed). Operand: u32 absolute offset
    Jg = 0x3D,
    /// Jump if greater or equal (signed). Operand: u32 absolute offset
    Jge = 0x3E,

    // =========================================================================
    // Calls
    // =========================================================================
    /// Push a return frame and jump. Operand: u32 absolute offset
    Call = 0x40,
    /// Pop a return frame and jump back.
    Ret = 0x41,

    // =========================================================================
    // Stack
    // =========================================================================
    /// Push a register onto the value stack. Operand: u8 register
    Push = 0x48,
    /// Pop the value stack into a register. Operand: u8 register
    Pop = 0x49,

    // =========================================================================
    // Services
    // =========================================================================
    /// Print a register as a signed decimal with a trailing newline.
    /// Operand: u8 register
    Print = 0x50,
    /// Print a register's low byte as a character.
    /// Operand: u8 register
    PrintChar = 0x51,
    /// Allocate from the handle heap: `rd = handle(alloc(rs bytes))`.
    /// Operands: u8 rd, u8 rs
    Alloc = 0x52,
    /// Release a heap handle. Operand: u8 register
    Free = 0x53,
    /// Invoke a numbered runtime service. Operand: u8 number
    Syscall = 0x54,
}

impl OpCode {
    /// Get the size of operands for this opcode in bytes.
    ///
    /// This does NOT include the opcode byte itself.
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::Nop | OpCode::Halt | OpCode::Ret => 0,

            OpCode::Exit
            | OpCode::Neg
            | OpCode::Not
            | OpCode::Push
            | OpCode::Pop
            | OpCode::Print
            | OpCode::PrintChar
            | OpCode::Free
            | OpCode::Syscall => 1,

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
            | OpCode::Alloc => 2,

            OpCode::Jmp
            | OpCode::Jz
            | OpCode::Jnz
            | OpCode::Jl
            | OpCode::Jle
            | OpCode::Jg
            | OpCode::Jge
            | OpCode::Call => 4,

            // register byte + i64 immediate
            OpCode::LoadImm => 9,
        }
    }

    /// Nominal cycle cost, accumulated by the VM's cycle counter.
    pub fn cycles(&self) -> u64 {
        match self {
            OpCode::Nop | OpCode::Halt | OpCode::Exit => 1,
            OpCode::LoadImm | OpCode::Mov => 1,
            OpCode::Add
            | OpCode::Sub
            | OpCode::Neg
            | OpCode::And
            | OpCode::Or
            | OpCode::Xor
            | OpCode::Not
            | OpCode::Shl
            | OpCode::Shr
            | OpCode::Cmp => 1,
            OpCode::Mul => 3,
            OpCode::Div | OpCode::Mod => 10,
            OpCode::Jmp
            | OpCode::Jz
            | OpCode::Jnz
            | OpCode::Jl
            | OpCode::Jle
            | OpCode::Jg
            | OpCode::Jge => 2,
            OpCode::Push | OpCode::Pop => 2,
            OpCode::Call | OpCode::Ret => 5,
            OpCode::Print | OpCode::PrintChar => 20,
            OpCode::Alloc | OpCode::Free => 40,
            OpCode::Syscall => 25,
        }
    }

    /// Whether this opcode's u32 operand is a branch target.
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            OpCode::Jmp
                | OpCode::Jz
                | OpCode::Jnz
                | OpCode::Jl
                | OpCode::Jle
                | OpCode::Jg
                | OpCode::Jge
                | OpCode::Call
        )
    }

    /// Get the mnemonic for this opcode.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Nop => "nop",
            OpCode::Halt => "halt",
            OpCode::Exit => "exit",
            OpCode::LoadImm => "load",
            OpCode::Mov => "mov",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Mod => "mod",
            OpCode::Neg => "neg",
            OpCode::And => "and",
            OpCode::Or => "or",
            OpCode::Xor => "xor",
            OpCode::Not => "not",
            OpCode::Shl => "shl",
            OpCode::Shr => "shr",
            OpCode::Cmp => "cmp",
            OpCode::Jmp => "jmp",
            OpCode::Jz => "jz",
            OpCode::Jnz => "jnz",
            OpCode::Jl => "jl",
            OpCode::Jle => "jle",
            OpCode::Jg => "jg",
            OpCode::Jge => "jge",
            OpCode::Call => "call",
            OpCode::Ret => "ret",
            OpCode::Push => "push",
            OpCode::Pop => "pop",
            OpCode::Print => "print",
            OpCode::PrintChar => "printc",
            OpCode::Alloc => "alloc",
            OpCode::Free => "free",
            OpCode::Syscall => "syscall",
        }
    }
}
