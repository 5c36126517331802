//! x86 machine code output.
//!
//! Encodes the lowered instruction stream directly, no assembler in the
//! path. Both targets share one implementation: 64-bit operations carry a
//! REX.W prefix the 32-bit target simply omits, and the opcode bytes are
//! identical from there on.
//!
//! Forward references are emitted as zeroed rel32 operands and patched in
//! `finish`, once every label is bound and every function placed.

use seedc_core::{CodegenError, ExportSignature, NativeExport, Span, Target};

use super::NativeArtifact;
use super::lower::{ArithOp, Condition, InsnSink, Label};
use crate::symbols::FunctionTable;

pub(crate) struct MachineSink {
    target: Target,
    code: Vec<u8>,
    /// Bound offset per label id.
    labels: Vec<Option<usize>>,
    /// Jump operands waiting for their label: (operand offset, label id).
    label_sites: Vec<(usize, u32)>,
    /// Call operands waiting for their target function.
    call_sites: Vec<(usize, String, Span)>,
    /// Placed functions with their code ranges.
    functions: Vec<PlacedFunction>,
    current: Option<(String, usize)>,
}

struct PlacedFunction {
    name: String,
    start: usize,
    end: usize,
}

impl MachineSink {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            code: Vec::new(),
            labels: Vec::new(),
            label_sites: Vec::new(),
            call_sites: Vec::new(),
            functions: Vec::new(),
            current: None,
        }
    }

    /// Entry stub: call `main` and hand its result to the exit system
    /// call. Emitted first so the stub sits at the fixed entry address
    /// the executable writer points at.
    pub(crate) fn start_stub(&mut self, main_span: Span) {
        self.emit_call("main", main_span);
        if self.target.bits() == 64 {
            // mov %eax, %edi; mov $60, %rax; syscall
            self.code.extend_from_slice(&[0x89, 0xC7]);
            self.code.extend_from_slice(&[0x48, 0xC7, 0xC0, 0x3C, 0x00, 0x00, 0x00]);
            self.code.extend_from_slice(&[0x0F, 0x05]);
        } else {
            // mov %eax, %ebx; mov $1, %eax; int $0x80
            self.code.extend_from_slice(&[0x89, 0xC3]);
            self.code.extend_from_slice(&[0xB8, 0x01, 0x00, 0x00, 0x00]);
            self.code.extend_from_slice(&[0xCD, 0x80]);
        }
    }

    /// Resolve every pending operand and assemble the artifact.
    pub(crate) fn finish(mut self, table: &FunctionTable<'_>) -> Result<NativeArtifact, CodegenError> {
        let label_sites = std::mem::take(&mut self.label_sites);
        for (site, label) in label_sites {
            let Some(target) = self.labels[label as usize] else {
                panic!("label L{label} was never bound");
            };
            self.patch_rel32(site, target)?;
        }

        let call_sites = std::mem::take(&mut self.call_sites);
        for (site, name, span) in call_sites {
            let Some(target) = self.function_start(&name) else {
                return Err(CodegenError::UndefinedFunction { name, span });
            };
            self.patch_rel32(site, target)?;
        }

        let entry = self
            .function_start("main")
            .map(|start| start as u32)
            .ok_or(CodegenError::MissingMain)?;

        let mut exports = Vec::with_capacity(self.functions.len());
        for func in &self.functions {
            let Some(sig) = table.get(&func.name) else {
                // Every placed function came out of the same unit the
                // table was built from.
                debug_assert!(false, "function '{}' missing from the table", func.name);
                continue;
            };
            exports.push(NativeExport::function(
                &func.name,
                func.start as u64,
                (func.end - func.start) as u64,
                ExportSignature::new(sig.params as u8, sig.returns_value),
            ));
        }

        Ok(NativeArtifact {
            code: self.code,
            exports,
            entry,
        })
    }

    // ============ Encoding helpers ============

    /// REX.W prefix on the 64-bit target, nothing on the 32-bit one.
    fn rex(&mut self) {
        if self.target.bits() == 64 {
            self.code.push(0x48);
        }
    }

    fn imm32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a rel32 branch with a zero placeholder; returns the operand
    /// offset.
    fn rel32_site(&mut self, opcode: &[u8]) -> usize {
        self.code.extend_from_slice(opcode);
        let site = self.code.len();
        self.code.extend_from_slice(&[0; 4]);
        site
    }

    fn emit_call(&mut self, name: &str, span: Span) {
        let site = self.rel32_site(&[0xE8]);
        self.call_sites.push((site, name.to_string(), span));
    }

    /// test acc, acc
    fn test_acc(&mut self) {
        self.rex();
        self.code.extend_from_slice(&[0x85, 0xC0]);
    }

    fn patch_rel32(&mut self, site: usize, target: usize) -> Result<(), CodegenError> {
        let rel = target as i64 - (site as i64 + 4);
        let Ok(rel) = i32::try_from(rel) else {
            return Err(CodegenError::JumpTooFar {
                name: self.owner_of(site),
            });
        };
        self.code[site..site + 4].copy_from_slice(&rel.to_le_bytes());
        Ok(())
    }

    /// Function containing a code offset, for error messages.
    fn owner_of(&self, site: usize) -> String {
        self.functions
            .iter()
            .find(|func| (func.start..func.end).contains(&site))
            .map(|func| func.name.clone())
            .unwrap_or_else(|| "_start".to_string())
    }

    fn function_start(&self, name: &str) -> Option<usize> {
        self.functions
            .iter()
            .find(|func| func.name == name)
            .map(|func| func.start)
    }
}

impl InsnSink for MachineSink {
    fn begin_function(&mut self, name: &str, frame_bytes: u32) {
        self.current = Some((name.to_string(), self.code.len()));
        // push fp; mov sp, fp
        self.code.push(0x55);
        self.rex();
        self.code.extend_from_slice(&[0x89, 0xE5]);
        if frame_bytes > 0 {
            // sub $frame, sp
            self.rex();
            self.code.extend_from_slice(&[0x81, 0xEC]);
            self.imm32(frame_bytes as i32);
        }
    }

    fn end_function(&mut self) {
        if let Some((name, start)) = self.current.take() {
            self.functions.push(PlacedFunction {
                name,
                start,
                end: self.code.len(),
            });
        }
    }

    fn load_imm(&mut self, value: i64) {
        if self.target.bits() == 64 {
            match i32::try_from(value) {
                // mov $imm32, %rax (sign-extended)
                Ok(small) => {
                    self.code.extend_from_slice(&[0x48, 0xC7, 0xC0]);
                    self.imm32(small);
                }
                // movabs $imm64, %rax
                Err(_) => {
                    self.code.extend_from_slice(&[0x48, 0xB8]);
                    self.code.extend_from_slice(&value.to_le_bytes());
                }
            }
        } else {
            // mov $imm32, %eax; the lowerer has range-checked the value
            self.code.push(0xB8);
            self.imm32(value as i32);
        }
    }

    fn load_local(&mut self, offset: i32) {
        // mov disp32(fp), acc
        self.rex();
        self.code.extend_from_slice(&[0x8B, 0x85]);
        self.imm32(offset);
    }

    fn store_local(&mut self, offset: i32) {
        // mov acc, disp32(fp)
        self.rex();
        self.code.extend_from_slice(&[0x89, 0x85]);
        self.imm32(offset);
    }

    fn push_acc(&mut self) {
        self.code.push(0x50);
    }

    fn stage_rhs(&mut self) {
        // mov acc, scratch; pop acc
        self.rex();
        self.code.extend_from_slice(&[0x89, 0xC1]);
        self.code.push(0x58);
    }

    fn arith(&mut self, op: ArithOp) {
        match op {
            ArithOp::Add => {
                self.rex();
                self.code.extend_from_slice(&[0x01, 0xC8]);
            }
            ArithOp::Sub => {
                self.rex();
                self.code.extend_from_slice(&[0x29, 0xC8]);
            }
            ArithOp::Mul => {
                self.rex();
                self.code.extend_from_slice(&[0x0F, 0xAF, 0xC1]);
            }
            ArithOp::Div | ArithOp::Mod => {
                // Sign-extend into the data register, divide by scratch.
                self.rex();
                self.code.push(0x99);
                self.rex();
                self.code.extend_from_slice(&[0xF7, 0xF9]);
                if op == ArithOp::Mod {
                    // mov data, acc
                    self.rex();
                    self.code.extend_from_slice(&[0x89, 0xD0]);
                }
            }
        }
    }

    fn compare(&mut self, cond: Condition) {
        // cmp scratch, acc
        self.rex();
        self.code.extend_from_slice(&[0x39, 0xC8]);
        let setcc = match cond {
            Condition::Equal => 0x94,
            Condition::NotEqual => 0x95,
            Condition::Less => 0x9C,
            Condition::LessEqual => 0x9E,
            Condition::Greater => 0x9F,
            Condition::GreaterEqual => 0x9D,
        };
        self.code.extend_from_slice(&[0x0F, setcc, 0xC0]);
        // movzx acc, %al
        self.rex();
        self.code.extend_from_slice(&[0x0F, 0xB6, 0xC0]);
    }

    fn negate(&mut self) {
        self.rex();
        self.code.extend_from_slice(&[0xF7, 0xD8]);
    }

    fn logical_not(&mut self) {
        self.test_acc();
        self.code.extend_from_slice(&[0x0F, 0x94, 0xC0]);
        self.rex();
        self.code.extend_from_slice(&[0x0F, 0xB6, 0xC0]);
    }

    fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    fn bind_label(&mut self, label: Label) {
        self.labels[label.0 as usize] = Some(self.code.len());
    }

    fn jump(&mut self, label: Label) {
        let site = self.rel32_site(&[0xE9]);
        self.label_sites.push((site, label.0));
    }

    fn jump_if_zero(&mut self, label: Label) {
        self.test_acc();
        let site = self.rel32_site(&[0x0F, 0x84]);
        self.label_sites.push((site, label.0));
    }

    fn call(&mut self, name: &str, span: Span) {
        self.emit_call(name, span);
    }

    fn drop_args(&mut self, count: u32) {
        // add $bytes, sp
        self.rex();
        self.code.extend_from_slice(&[0x81, 0xC4]);
        self.imm32((count * self.target.word_size()) as i32);
    }

    fn epilogue(&mut self) {
        // leave; ret
        self.code.extend_from_slice(&[0xC9, 0xC3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::lower::lower_unit;
    use bumpalo::Bump;
    use seedc_parser::Parser;

    fn encode(source: &str, target: Target) -> NativeArtifact {
        let arena = Bump::new();
        let unit = Parser::parse(source, &arena)
            .unwrap_or_else(|error| panic!("parse failed: {error}"));
        let table = FunctionTable::build(&unit).unwrap();
        let main = unit.find_function("main").unwrap();
        let mut sink = MachineSink::new(target);
        sink.start_stub(main.span);
        lower_unit(&unit, &table, target, &mut sink)
            .unwrap_or_else(|error| panic!("lowering failed: {error}"));
        sink.finish(&table)
            .unwrap_or_else(|error| panic!("encoding failed: {error}"))
    }

    fn contains(code: &[u8], needle: &[u8]) -> bool {
        code.windows(needle.len()).any(|window| window == needle)
    }

    #[test]
    fn minimal_64_bit_image() {
        let artifact = encode("int main(void) { return 42; }", Target::X86_64);
        #[rustfmt::skip]
        let expected = vec![
            // _start: call main; mov %eax, %edi; mov $60, %rax; syscall
            0xE8, 0x0B, 0x00, 0x00, 0x00,
            0x89, 0xC7,
            0x48, 0xC7, 0xC0, 0x3C, 0x00, 0x00, 0x00,
            0x0F, 0x05,
            // main: push %rbp; mov %rsp, %rbp; mov $42, %rax; leave; ret
            0x55,
            0x48, 0x89, 0xE5,
            0x48, 0xC7, 0xC0, 0x2A, 0x00, 0x00, 0x00,
            0xC9, 0xC3,
        ];
        assert_eq!(artifact.code, expected);
        assert_eq!(artifact.entry, 16);
        assert_eq!(artifact.exports.len(), 1);
        let main = &artifact.exports[0];
        assert_eq!(main.name, "main");
        assert_eq!(main.offset, 16);
        assert_eq!(main.size, 13);
        assert_eq!(main.signature.param_count, 0);
        assert!(main.signature.returns_value);
    }

    #[test]
    fn minimal_32_bit_image() {
        let artifact = encode("int main(void) { return 42; }", Target::X86_32);
        #[rustfmt::skip]
        let expected = vec![
            // _start: call main; mov %eax, %ebx; mov $1, %eax; int $0x80
            0xE8, 0x09, 0x00, 0x00, 0x00,
            0x89, 0xC3,
            0xB8, 0x01, 0x00, 0x00, 0x00,
            0xCD, 0x80,
            // main: push %ebp; mov %esp, %ebp; mov $42, %eax; leave; ret
            0x55,
            0x89, 0xE5,
            0xB8, 0x2A, 0x00, 0x00, 0x00,
            0xC9, 0xC3,
        ];
        assert_eq!(artifact.code, expected);
        assert_eq!(artifact.entry, 14);
    }

    #[test]
    fn locals_use_frame_pointer_disp32() {
        let artifact = encode("int main(void) { int a = 7; return a; }", Target::X86_64);
        #[rustfmt::skip]
        let body = [
            0x55,                                            // push %rbp
            0x48, 0x89, 0xE5,                                // mov %rsp, %rbp
            0x48, 0x81, 0xEC, 0x08, 0x00, 0x00, 0x00,        // sub $8, %rsp
            0x48, 0xC7, 0xC0, 0x07, 0x00, 0x00, 0x00,        // mov $7, %rax
            0x48, 0x89, 0x85, 0xF8, 0xFF, 0xFF, 0xFF,        // mov %rax, -8(%rbp)
            0x48, 0x8B, 0x85, 0xF8, 0xFF, 0xFF, 0xFF,        // mov -8(%rbp), %rax
            0xC9, 0xC3,                                      // leave; ret
        ];
        assert_eq!(&artifact.code[16..], &body);
    }

    #[test]
    fn forward_branches_are_patched() {
        let artifact = encode("int main(void) { if (1) return 2; return 3; }", Target::X86_64);
        // jz operand sits at 32; the false edge lands after the then
        // branch's epilogue at 45, nine bytes past the operand's end.
        assert_eq!(&artifact.code[32..36], &9i32.to_le_bytes());
    }

    #[test]
    fn forward_calls_are_patched() {
        let artifact = encode(
            "int main(void) { return late(); }
             int late(void) { return 9; }",
            Target::X86_64,
        );
        // main: prologue (4 bytes from 16), call at 20, operand 21..25,
        // late placed at 27.
        assert_eq!(&artifact.code[21..25], &2i32.to_le_bytes());
        assert_eq!(artifact.entry, 16);
        let late = artifact
            .exports
            .iter()
            .find(|export| export.name == "late")
            .unwrap();
        assert_eq!(late.offset, 27);
    }

    #[test]
    fn export_signatures_carry_arity_and_return() {
        let artifact = encode(
            "void ping(int a, int b) { return; }
             int main(void) { ping(1, 2); return 0; }",
            Target::X86_64,
        );
        let ping = artifact
            .exports
            .iter()
            .find(|export| export.name == "ping")
            .unwrap();
        assert_eq!(ping.signature.param_count, 2);
        assert!(!ping.signature.returns_value);
        // cdecl cleanup of two 8-byte arguments.
        assert!(contains(&artifact.code, &[0x48, 0x81, 0xC4, 0x10, 0x00, 0x00, 0x00]));
    }

    #[test]
    fn division_encodes_sign_extension() {
        let artifact = encode("int main(void) { return 7 / 2; }", Target::X86_64);
        assert!(contains(&artifact.code, &[0x48, 0x99, 0x48, 0xF7, 0xF9]));

        let artifact = encode("int main(void) { return 7 % 2; }", Target::X86_32);
        assert!(contains(&artifact.code, &[0x99, 0xF7, 0xF9, 0x89, 0xD0]));
    }

    #[test]
    fn comparisons_encode_setcc_and_widen() {
        let artifact = encode("int main(void) { return 5 < 9; }", Target::X86_64);
        assert!(contains(
            &artifact.code,
            &[0x48, 0x39, 0xC8, 0x0F, 0x9C, 0xC0, 0x48, 0x0F, 0xB6, 0xC0]
        ));
    }

    #[test]
    fn wide_constants_take_the_movabs_form() {
        let artifact = encode("int main(void) { return 5000000000; }", Target::X86_64);
        let mut needle = vec![0x48, 0xB8];
        needle.extend_from_slice(&5_000_000_000i64.to_le_bytes());
        assert!(contains(&artifact.code, &needle));
    }

    #[test]
    fn back_edges_encode_negative_displacements() {
        let artifact = encode(
            "int main(void) { while (1) { } return 0; }",
            Target::X86_64,
        );
        // Loop head at 20 (after the prologue); the back edge's jmp
        // operand occupies 37..41, so the displacement is 20 - 41.
        assert_eq!(&artifact.code[37..41], &(-21i32).to_le_bytes());
    }
}
