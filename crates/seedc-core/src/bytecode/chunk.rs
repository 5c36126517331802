//! Bytecode chunk for compiled programs.
//!
//! A `BytecodeChunk` holds the instruction stream for a whole translation
//! unit (all functions laid out back to back), along with source line
//! information used by the disassembler and by diagnostics.

use super::OpCode;

/// A chunk of compiled bytecode.
///
/// Operands are little-endian, matching the program container. Jump and
/// call operands hold absolute chunk offsets; forward references are
/// emitted as placeholders and patched once the target offset is known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytecodeChunk {
    /// The bytecode instructions.
    code: Vec<u8>,
    /// Source line per byte of `code`.
    lines: Vec<u32>,
}

/// Placeholder written by `emit_jump` until the target is patched.
const JUMP_PLACEHOLDER: u32 = u32::MAX;

impl BytecodeChunk {
    /// Create a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bytecode chunk with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
            lines: Vec::with_capacity(capacity),
        }
    }

    /// Rebuild a chunk from raw bytes, e.g. out of a program container.
    ///
    /// Line information is not stored in containers; every byte reads as
    /// line 0.
    pub fn from_bytes(code: Vec<u8>) -> Self {
        let lines = vec![0; code.len()];
        Self { code, lines }
    }

    /// Write an opcode.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.code.push(op as u8);
        self.lines.push(line);
    }

    /// Write a byte operand (register index or syscall number).
    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write a 32-bit operand (little-endian).
    pub fn write_u32(&mut self, value: u32, line: u32) {
        for byte in value.to_le_bytes() {
            self.code.push(byte);
            self.lines.push(line);
        }
    }

    /// Write a 64-bit immediate (little-endian).
    pub fn write_i64(&mut self, value: i64, line: u32) {
        for byte in value.to_le_bytes() {
            self.code.push(byte);
            self.lines.push(line);
        }
    }

    /// Get current code offset (the address of the next instruction).
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a branch with a placeholder target and return the offset of the
    /// operand to patch later.
    pub fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        debug_assert!(op.is_branch());
        self.write_op(op, line);
        let operand = self.code.len();
        self.write_u32(JUMP_PLACEHOLDER, line);
        operand
    }

    /// Patch the branch operand at `operand` to target the current offset.
    ///
    /// # Panics
    ///
    /// Panics if the chunk has outgrown the 32-bit address space or the
    /// operand offset was not produced by `emit_jump`.
    pub fn patch_jump(&mut self, operand: usize) {
        let target = u32::try_from(self.code.len()).unwrap_or_else(|_| {
            panic!("chunk exceeds the 32-bit address space");
        });
        self.patch_u32(operand, target);
    }

    /// Overwrite a previously written u32 operand, e.g. a forward call
    /// target recorded before the callee's offset was known.
    pub fn patch_u32(&mut self, operand: usize, value: u32) {
        assert!(
            operand + 4 <= self.code.len(),
            "patch offset {operand} outside chunk of {} bytes",
            self.code.len()
        );
        self.code[operand..operand + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Get the bytecode.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Consume the chunk, keeping only the instruction bytes.
    pub fn into_code(self) -> Vec<u8> {
        self.code
    }

    /// Get the line number for a given offset.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    /// Get the length of the bytecode.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Read a byte at the given offset.
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a u32 at the given offset (little-endian).
    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.code.get(offset..offset + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read an i64 at the given offset (little-endian).
    pub fn read_i64(&self, offset: usize) -> Option<i64> {
        let bytes = self.code.get(offset..offset + 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Some(i64::from_le_bytes(raw))
    }

    /// Read an opcode at the given offset.
    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code
            .get(offset)
            .and_then(|&b| OpCode::try_from(b).ok())
    }

    /// Extract all opcodes from the chunk, skipping operands.
    ///
    /// Useful for testing instruction sequences without pinning operand
    /// values or offsets.
    pub fn opcodes(&self) -> Vec<OpCode> {
        let mut ops = Vec::new();
        let mut offset = 0;

        while offset < self.code.len() {
            if let Some(op) = self.read_op(offset) {
                ops.push(op);
                offset += 1 + op.operand_size();
            } else {
                offset += 1;
            }
        }

        ops
    }

    /// Check that this chunk contains exactly the given opcode sequence.
    ///
    /// Ignores operand values. Panics with both sequences on mismatch.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Check that the given opcodes appear in order, not necessarily
    /// contiguously.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }
}
