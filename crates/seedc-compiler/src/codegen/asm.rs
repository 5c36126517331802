//! AT&T assembly text output.
//!
//! Produces a listing GNU `as` would accept for the selected target. The
//! instruction selection matches the machine encoder byte for byte; only
//! the rendering differs.

use seedc_core::{Span, Target};

use super::lower::{ArithOp, Condition, InsnSink, Label};

pub(crate) struct AsmSink {
    target: Target,
    out: String,
    next_label: u32,
}

impl AsmSink {
    pub(crate) fn new(target: Target) -> Self {
        let mut out = String::new();
        out.push_str("\t.text\n");
        Self {
            target,
            out,
            next_label: 0,
        }
    }

    /// Entry stub: call `main` and hand its result to the exit system
    /// call. This is the first code in the image, matching the fixed
    /// entry address the executable writer uses.
    pub(crate) fn start_stub(&mut self) {
        self.out.push_str("\t.globl _start\n_start:\n");
        self.line("call main");
        if self.target.bits() == 64 {
            self.line("mov %eax, %edi");
            self.line("mov $60, %rax");
            self.line("syscall");
        } else {
            self.line("mov %eax, %ebx");
            self.line("mov $1, %eax");
            self.line("int $0x80");
        }
        self.out.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, insn: &str) {
        self.out.push('\t');
        self.out.push_str(insn);
        self.out.push('\n');
    }

    fn widen_byte(&mut self) {
        if self.target.bits() == 64 {
            self.line("movzbq %al, %rax");
        } else {
            self.line("movzbl %al, %eax");
        }
    }
}

impl InsnSink for AsmSink {
    fn begin_function(&mut self, name: &str, frame_bytes: u32) {
        let fp = self.target.frame_pointer();
        let sp = self.target.stack_pointer();
        self.out.push_str(&format!("\t.globl {name}\n{name}:\n"));
        self.line(&format!("push {fp}"));
        self.line(&format!("mov {sp}, {fp}"));
        if frame_bytes > 0 {
            self.line(&format!("sub ${frame_bytes}, {sp}"));
        }
    }

    fn end_function(&mut self) {
        self.out.push('\n');
    }

    fn load_imm(&mut self, value: i64) {
        let acc = self.target.accumulator();
        if self.target.bits() == 64 && i32::try_from(value).is_err() {
            self.line(&format!("movabs ${value}, {acc}"));
        } else {
            self.line(&format!("mov ${value}, {acc}"));
        }
    }

    fn load_local(&mut self, offset: i32) {
        let acc = self.target.accumulator();
        let fp = self.target.frame_pointer();
        self.line(&format!("mov {offset}({fp}), {acc}"));
    }

    fn store_local(&mut self, offset: i32) {
        let acc = self.target.accumulator();
        let fp = self.target.frame_pointer();
        self.line(&format!("mov {acc}, {offset}({fp})"));
    }

    fn push_acc(&mut self) {
        self.line(&format!("push {}", self.target.accumulator()));
    }

    fn stage_rhs(&mut self) {
        let acc = self.target.accumulator();
        let scratch = self.target.scratch();
        self.line(&format!("mov {acc}, {scratch}"));
        self.line(&format!("pop {acc}"));
    }

    fn arith(&mut self, op: ArithOp) {
        let acc = self.target.accumulator();
        let scratch = self.target.scratch();
        match op {
            ArithOp::Add => self.line(&format!("add {scratch}, {acc}")),
            ArithOp::Sub => self.line(&format!("sub {scratch}, {acc}")),
            ArithOp::Mul => self.line(&format!("imul {scratch}, {acc}")),
            ArithOp::Div | ArithOp::Mod => {
                // Signed division of the sign-extended accumulator; the
                // remainder lands in the data register.
                if self.target.bits() == 64 {
                    self.line("cqto");
                    self.line(&format!("idiv {scratch}"));
                    if op == ArithOp::Mod {
                        self.line("mov %rdx, %rax");
                    }
                } else {
                    self.line("cltd");
                    self.line(&format!("idiv {scratch}"));
                    if op == ArithOp::Mod {
                        self.line("mov %edx, %eax");
                    }
                }
            }
        }
    }

    fn compare(&mut self, cond: Condition) {
        let acc = self.target.accumulator();
        let scratch = self.target.scratch();
        self.line(&format!("cmp {scratch}, {acc}"));
        let set = match cond {
            Condition::Equal => "sete",
            Condition::NotEqual => "setne",
            Condition::Less => "setl",
            Condition::LessEqual => "setle",
            Condition::Greater => "setg",
            Condition::GreaterEqual => "setge",
        };
        self.line(&format!("{set} %al"));
        self.widen_byte();
    }

    fn negate(&mut self) {
        self.line(&format!("neg {}", self.target.accumulator()));
    }

    fn logical_not(&mut self) {
        let acc = self.target.accumulator();
        self.line(&format!("test {acc}, {acc}"));
        self.line("sete %al");
        self.widen_byte();
    }

    fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn bind_label(&mut self, label: Label) {
        self.out.push_str(&format!(".L{}:\n", label.0));
    }

    fn jump(&mut self, label: Label) {
        self.line(&format!("jmp .L{}", label.0));
    }

    fn jump_if_zero(&mut self, label: Label) {
        let acc = self.target.accumulator();
        self.line(&format!("test {acc}, {acc}"));
        self.line(&format!("jz .L{}", label.0));
    }

    fn call(&mut self, name: &str, _span: Span) {
        self.line(&format!("call {name}"));
    }

    fn drop_args(&mut self, count: u32) {
        let bytes = count * self.target.word_size();
        self.line(&format!("add ${bytes}, {}", self.target.stack_pointer()));
    }

    fn epilogue(&mut self) {
        self.line("leave");
        self.line("ret");
    }
}
