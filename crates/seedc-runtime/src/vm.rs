//! The bytecode virtual machine.
//!
//! [`Vm`] is a register machine with sixteen 64-bit registers, a bounded
//! value stack, a bounded call stack, and a handle-table heap backing the
//! alloc/free services. It runs [`AstcProgram`] images one instruction at
//! a time and keeps per-run instruction and cycle counters.
//!
//! The machine is an explicit state machine. A fresh machine is
//! [`VmState::Uninitialized`]; [`Vm::load`] makes it [`VmState::Ready`];
//! [`Vm::step`] and [`Vm::execute`] drive it through
//! [`VmState::Running`] until it reaches [`VmState::Stopped`] or faults
//! into [`VmState::Error`]. Faults never tear the machine down: the
//! failed instruction has no effect, the [`VmError`] is retained for
//! inspection, and every register written before the fault keeps its
//! value.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use seedc_core::{AstcProgram, BytecodeChunk, OpCode, VmError};

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 16;

/// Service numbers accepted by the `syscall` instruction.
const SYS_PRINT: u8 = 1;
const SYS_PRINT_CHAR: u8 = 2;
const SYS_ALLOC: u8 = 3;
const SYS_FREE: u8 = 4;

bitflags! {
    /// Condition flags updated by comparisons and arithmetic.
    ///
    /// Conditional jumps read these the way x86 condition codes are
    /// read: `jl` is taken when `NEGATIVE != OVERFLOW`, `jz` when
    /// `ZERO` is set, and so on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CondFlags: u8 {
        const ZERO = 1;
        const NEGATIVE = 1 << 1;
        const CARRY = 1 << 2;
        const OVERFLOW = 1 << 3;
    }
}

/// Execution state of a [`Vm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    /// No program loaded.
    Uninitialized,
    /// Program loaded, nothing executed yet (or the machine was reset).
    Ready,
    /// Executing instructions.
    Running,
    /// Suspended between instructions; stepping resumes execution.
    Paused,
    /// Halted normally, either by an instruction or by running off the
    /// end of the bytecode.
    Stopped,
    /// Faulted; the cause is retained and readable via [`Vm::error`].
    Error,
}

/// Capacity limits for one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Value stack slots available to `push`/`pop`.
    pub stack_capacity: usize,
    /// Maximum call depth.
    pub call_capacity: usize,
    /// Largest single allocation the heap service will grant, in bytes.
    pub alloc_limit: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_capacity: 1024,
            call_capacity: 256,
            alloc_limit: 1 << 20,
        }
    }
}

/// The virtual machine.
#[derive(Debug)]
pub struct Vm {
    config: VmConfig,
    state: VmState,
    chunk: BytecodeChunk,
    entry: u32,
    pc: usize,
    registers: [i64; REGISTER_COUNT],
    flags: CondFlags,
    stack: Vec<i64>,
    frames: Vec<usize>,
    heap: FxHashMap<i64, Vec<u8>>,
    next_handle: i64,
    instructions: u64,
    cycles: u64,
    exit_code: i64,
    error: Option<VmError>,
    output: Vec<u8>,
}

impl Vm {
    /// Creates a machine with the default capacity limits.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// Creates a machine with explicit capacity limits.
    pub fn with_config(config: VmConfig) -> Self {
        Self {
            config,
            state: VmState::Uninitialized,
            chunk: BytecodeChunk::new(),
            entry: 0,
            pc: 0,
            registers: [0; REGISTER_COUNT],
            flags: CondFlags::empty(),
            stack: Vec::new(),
            frames: Vec::new(),
            heap: FxHashMap::default(),
            next_handle: 1,
            instructions: 0,
            cycles: 0,
            exit_code: 0,
            error: None,
            output: Vec::new(),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Loads a program, replacing any previous one, and readies the
    /// machine.
    ///
    /// The entry point must land inside the bytecode; a rejected program
    /// leaves the machine exactly as it was.
    pub fn load(&mut self, program: AstcProgram) -> Result<(), VmError> {
        let len = program.bytecode.len();
        if program.entry_point as usize >= len {
            return Err(VmError::JumpOutOfBounds {
                target: program.entry_point,
                len,
            });
        }
        self.chunk = BytecodeChunk::from_bytes(program.bytecode);
        self.entry = program.entry_point;
        self.reset();
        Ok(())
    }

    /// Clears registers, flags, stacks, heap, counters, output, and any
    /// retained error, then readies the machine at the entry point. The
    /// loaded program is kept; without one the machine stays
    /// uninitialized.
    pub fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.flags = CondFlags::empty();
        self.stack.clear();
        self.frames.clear();
        self.heap.clear();
        self.next_handle = 1;
        self.instructions = 0;
        self.cycles = 0;
        self.exit_code = 0;
        self.error = None;
        self.output.clear();
        if self.chunk.is_empty() {
            self.state = VmState::Uninitialized;
            self.pc = 0;
        } else {
            self.state = VmState::Ready;
            self.pc = self.entry as usize;
        }
    }

    /// Suspends a running machine between instructions.
    pub fn pause(&mut self) {
        if self.state == VmState::Running {
            self.state = VmState::Paused;
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Executes one instruction and returns the new state.
    ///
    /// Stepping a stopped or faulted machine is a no-op; stepping a
    /// machine with no program faults it.
    pub fn step(&mut self) -> VmState {
        match self.state {
            VmState::Uninitialized => {
                self.fault(VmError::NoProgram);
                return self.state;
            }
            VmState::Stopped | VmState::Error => return self.state,
            VmState::Ready | VmState::Running | VmState::Paused => {
                self.state = VmState::Running;
            }
        }
        if self.pc >= self.chunk.len() {
            // Fell off the end of the bytecode.
            self.state = VmState::Stopped;
            return self.state;
        }
        if let Err(error) = self.dispatch() {
            self.fault(error);
        }
        self.state
    }

    /// Runs until the machine stops or faults.
    ///
    /// Returns the exit code on a normal stop and the retained fault
    /// otherwise.
    pub fn execute(&mut self) -> Result<i64, VmError> {
        loop {
            match self.step() {
                VmState::Running => {}
                VmState::Error => {
                    return Err(self.error.clone().unwrap_or(VmError::NoProgram));
                }
                _ => return Ok(self.exit_code),
            }
        }
    }

    fn fault(&mut self, error: VmError) {
        self.error = Some(error);
        self.state = VmState::Error;
    }

    /// Decodes and runs the instruction at `pc`, advancing `pc` past it
    /// (or to the jump target). Errors leave all machine state untouched.
    fn dispatch(&mut self) -> Result<(), VmError> {
        let offset = self.pc;
        let opcode = self
            .chunk
            .read_byte(offset)
            .ok_or(VmError::TruncatedInstruction { offset })?;
        let op =
            OpCode::try_from(opcode).map_err(|_| VmError::InvalidOpcode { opcode, offset })?;
        self.run_op(op, offset)?;
        self.instructions += 1;
        self.cycles += op.cycles();
        Ok(())
    }

    fn run_op(&mut self, op: OpCode, offset: usize) -> Result<(), VmError> {
        match op {
            OpCode::Nop => self.pc = offset + 1,
            OpCode::Halt => {
                self.state = VmState::Stopped;
                self.pc = offset + 1;
            }
            OpCode::Exit => {
                let r = self.reg_operand(offset + 1)?;
                self.exit_code = self.registers[r];
                self.state = VmState::Stopped;
                self.pc = offset + 2;
            }
            OpCode::LoadImm => {
                let r = self.reg_operand(offset + 1)?;
                let value = self.imm_operand(offset + 2)?;
                self.registers[r] = value;
                self.pc = offset + 10;
            }
            OpCode::Mov => {
                let (rd, rs) = self.reg_pair(offset)?;
                self.registers[rd] = self.registers[rs];
                self.pc = offset + 3;
            }
            OpCode::Add => {
                let (rd, rs) = self.reg_pair(offset)?;
                let (a, b) = (self.registers[rd], self.registers[rs]);
                let (result, overflow) = a.overflowing_add(b);
                let (_, carry) = (a as u64).overflowing_add(b as u64);
                self.registers[rd] = result;
                self.set_arith_flags(result, carry, overflow);
                self.pc = offset + 3;
            }
            OpCode::Sub => {
                let (rd, rs) = self.reg_pair(offset)?;
                let (a, b) = (self.registers[rd], self.registers[rs]);
                let (result, overflow) = a.overflowing_sub(b);
                let carry = (a as u64) < (b as u64);
                self.registers[rd] = result;
                self.set_arith_flags(result, carry, overflow);
                self.pc = offset + 3;
            }
            OpCode::Mul => {
                let (rd, rs) = self.reg_pair(offset)?;
                let result = self.registers[rd].wrapping_mul(self.registers[rs]);
                self.registers[rd] = result;
                self.set_result_flags(result);
                self.pc = offset + 3;
            }
            OpCode::Div => {
                let (rd, rs) = self.reg_pair(offset)?;
                if self.registers[rs] == 0 {
                    return Err(VmError::DivideByZero { offset });
                }
                let result = self.registers[rd].wrapping_div(self.registers[rs]);
                self.registers[rd] = result;
                self.set_result_flags(result);
                self.pc = offset + 3;
            }
            OpCode::Mod => {
                let (rd, rs) = self.reg_pair(offset)?;
                if self.registers[rs] == 0 {
                    return Err(VmError::DivideByZero { offset });
                }
                let result = self.registers[rd].wrapping_rem(self.registers[rs]);
                self.registers[rd] = result;
                self.set_result_flags(result);
                self.pc = offset + 3;
            }
            OpCode::Neg => {
                let r = self.reg_operand(offset + 1)?;
                let result = self.registers[r].wrapping_neg();
                self.registers[r] = result;
                self.set_result_flags(result);
                self.pc = offset + 2;
            }
            OpCode::And => {
                let (rd, rs) = self.reg_pair(offset)?;
                let result = self.registers[rd] & self.registers[rs];
                self.registers[rd] = result;
                self.set_result_flags(result);
                self.pc = offset + 3;
            }
            OpCode::Or => {
                let (rd, rs) = self.reg_pair(offset)?;
                let result = self.registers[rd] | self.registers[rs];
                self.registers[rd] = result;
                self.set_result_flags(result);
                self.pc = offset + 3;
            }
            OpCode::Xor => {
                let (rd, rs) = self.reg_pair(offset)?;
                let result = self.registers[rd] ^ self.registers[rs];
                self.registers[rd] = result;
                self.set_result_flags(result);
                self.pc = offset + 3;
            }
            OpCode::Not => {
                let r = self.reg_operand(offset + 1)?;
                let result = !self.registers[r];
                self.registers[r] = result;
                self.set_result_flags(result);
                self.pc = offset + 2;
            }
            OpCode::Shl => {
                let (rd, rs) = self.reg_pair(offset)?;
                // Shift counts are taken modulo 64.
                let result = self.registers[rd].wrapping_shl(self.registers[rs] as u32);
                self.registers[rd] = result;
                self.set_result_flags(result);
                self.pc = offset + 3;
            }
            OpCode::Shr => {
                let (rd, rs) = self.reg_pair(offset)?;
                let result = self.registers[rd].wrapping_shr(self.registers[rs] as u32);
                self.registers[rd] = result;
                self.set_result_flags(result);
                self.pc = offset + 3;
            }
            OpCode::Cmp => {
                let (ra, rb) = self.reg_pair(offset)?;
                self.set_compare_flags(self.registers[ra], self.registers[rb]);
                self.pc = offset + 3;
            }
            OpCode::Jmp => {
                let target = self.target_operand(offset + 1)?;
                self.branch_to(target)?;
            }
            OpCode::Jz
            | OpCode::Jnz
            | OpCode::Jl
            | OpCode::Jle
            | OpCode::Jg
            | OpCode::Jge => {
                let target = self.target_operand(offset + 1)?;
                if self.condition(op) {
                    self.branch_to(target)?;
                } else {
                    self.pc = offset + 5;
                }
            }
            OpCode::Call => {
                let target = self.target_operand(offset + 1)?;
                if self.frames.len() >= self.config.call_capacity {
                    return Err(VmError::CallDepthExceeded {
                        capacity: self.config.call_capacity,
                    });
                }
                let return_to = offset + 5;
                self.branch_to(target)?;
                self.frames.push(return_to);
            }
            OpCode::Ret => {
                let return_to = self.frames.pop().ok_or(VmError::CallStackUnderflow)?;
                self.pc = return_to;
            }
            OpCode::Push => {
                let r = self.reg_operand(offset + 1)?;
                if self.stack.len() >= self.config.stack_capacity {
                    return Err(VmError::StackOverflow {
                        capacity: self.config.stack_capacity,
                    });
                }
                self.stack.push(self.registers[r]);
                self.pc = offset + 2;
            }
            OpCode::Pop => {
                let r = self.reg_operand(offset + 1)?;
                let value = self.stack.pop().ok_or(VmError::StackUnderflow)?;
                self.registers[r] = value;
                self.pc = offset + 2;
            }
            OpCode::Print => {
                let r = self.reg_operand(offset + 1)?;
                self.print_value(self.registers[r]);
                self.pc = offset + 2;
            }
            OpCode::PrintChar => {
                let r = self.reg_operand(offset + 1)?;
                self.print_char(self.registers[r]);
                self.pc = offset + 2;
            }
            OpCode::Alloc => {
                let (rd, rs) = self.reg_pair(offset)?;
                let handle = self.service_alloc(self.registers[rs])?;
                self.registers[rd] = handle;
                self.pc = offset + 3;
            }
            OpCode::Free => {
                let r = self.reg_operand(offset + 1)?;
                self.service_free(self.registers[r])?;
                self.pc = offset + 2;
            }
            OpCode::Syscall => {
                let number = self
                    .chunk
                    .read_byte(offset + 1)
                    .ok_or(VmError::TruncatedInstruction { offset })?;
                self.service_call(number)?;
                self.pc = offset + 2;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Services
    // ========================================================================

    fn print_value(&mut self, value: i64) {
        self.output.extend_from_slice(value.to_string().as_bytes());
        self.output.push(b'\n');
    }

    fn print_char(&mut self, value: i64) {
        self.output.push(value as u8);
    }

    fn service_alloc(&mut self, size: i64) -> Result<i64, VmError> {
        if size <= 0 || size as u64 > self.config.alloc_limit as u64 {
            return Err(VmError::AllocTooLarge {
                size,
                limit: self.config.alloc_limit,
            });
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.heap.insert(handle, vec![0; size as usize]);
        Ok(handle)
    }

    fn service_free(&mut self, handle: i64) -> Result<(), VmError> {
        self.heap
            .remove(&handle)
            .map(|_| ())
            .ok_or(VmError::InvalidHandle { handle })
    }

    /// `syscall` reaches the same services the dedicated opcodes use:
    /// print r0, print the low byte of r0, allocate r1 bytes into r0,
    /// free the handle in r0.
    fn service_call(&mut self, number: u8) -> Result<(), VmError> {
        match number {
            SYS_PRINT => self.print_value(self.registers[0]),
            SYS_PRINT_CHAR => self.print_char(self.registers[0]),
            SYS_ALLOC => {
                let handle = self.service_alloc(self.registers[1])?;
                self.registers[0] = handle;
            }
            SYS_FREE => self.service_free(self.registers[0])?,
            _ => return Err(VmError::UnknownSyscall { number }),
        }
        Ok(())
    }

    // ========================================================================
    // Flags and branches
    // ========================================================================

    fn set_compare_flags(&mut self, a: i64, b: i64) {
        let (result, overflow) = a.overflowing_sub(b);
        let mut flags = CondFlags::empty();
        flags.set(CondFlags::ZERO, result == 0);
        flags.set(CondFlags::NEGATIVE, result < 0);
        flags.set(CondFlags::CARRY, (a as u64) < (b as u64));
        flags.set(CondFlags::OVERFLOW, overflow);
        self.flags = flags;
    }

    fn set_arith_flags(&mut self, result: i64, carry: bool, overflow: bool) {
        let mut flags = CondFlags::empty();
        flags.set(CondFlags::ZERO, result == 0);
        flags.set(CondFlags::NEGATIVE, result < 0);
        flags.set(CondFlags::CARRY, carry);
        flags.set(CondFlags::OVERFLOW, overflow);
        self.flags = flags;
    }

    fn set_result_flags(&mut self, result: i64) {
        self.set_arith_flags(result, false, false);
    }

    fn condition(&self, op: OpCode) -> bool {
        let zero = self.flags.contains(CondFlags::ZERO);
        let negative = self.flags.contains(CondFlags::NEGATIVE);
        let overflow = self.flags.contains(CondFlags::OVERFLOW);
        match op {
            OpCode::Jz => zero,
            OpCode::Jnz => !zero,
            OpCode::Jl => negative != overflow,
            OpCode::Jle => zero || negative != overflow,
            OpCode::Jg => !zero && negative == overflow,
            OpCode::Jge => negative == overflow,
            _ => unreachable!("not a conditional branch: {op:?}"),
        }
    }

    fn branch_to(&mut self, target: u32) -> Result<(), VmError> {
        let len = self.chunk.len();
        if target as usize >= len {
            return Err(VmError::JumpOutOfBounds { target, len });
        }
        self.pc = target as usize;
        Ok(())
    }

    // ========================================================================
    // Operand decoding
    // ========================================================================

    fn reg_operand(&self, at: usize) -> Result<usize, VmError> {
        let index = self
            .chunk
            .read_byte(at)
            .ok_or(VmError::TruncatedInstruction { offset: self.pc })?;
        if index as usize >= REGISTER_COUNT {
            return Err(VmError::InvalidRegister { index });
        }
        Ok(index as usize)
    }

    fn reg_pair(&self, offset: usize) -> Result<(usize, usize), VmError> {
        let rd = self.reg_operand(offset + 1)?;
        let rs = self.reg_operand(offset + 2)?;
        Ok((rd, rs))
    }

    fn imm_operand(&self, at: usize) -> Result<i64, VmError> {
        self.chunk
            .read_i64(at)
            .ok_or(VmError::TruncatedInstruction { offset: self.pc })
    }

    fn target_operand(&self, at: usize) -> Result<u32, VmError> {
        self.chunk
            .read_u32(at)
            .ok_or(VmError::TruncatedInstruction { offset: self.pc })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current execution state.
    pub fn state(&self) -> VmState {
        self.state
    }

    /// Offset of the next instruction to execute.
    pub fn program_counter(&self) -> usize {
        self.pc
    }

    /// The register file.
    pub fn registers(&self) -> &[i64; REGISTER_COUNT] {
        &self.registers
    }

    /// Current condition flags.
    pub fn flags(&self) -> CondFlags {
        self.flags
    }

    /// Instructions executed since the last load or reset.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Simulated cycles consumed since the last load or reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Exit code of the last stopped run (zero until an `exit` runs).
    pub fn exit_code(&self) -> i64 {
        self.exit_code
    }

    /// The retained fault, if the machine is in the error state.
    pub fn error(&self) -> Option<&VmError> {
        self.error.as_ref()
    }

    /// Everything the program printed so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Takes the buffered output, leaving the sink empty.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
