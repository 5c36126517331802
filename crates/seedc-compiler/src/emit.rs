//! Bytecode emission.
//!
//! Walks a parsed translation unit and produces an [`AstcProgram`] for the
//! register virtual machine. Functions are laid out back to back in one
//! chunk; call operands are patched once every definition has an offset, so
//! source order never matters.
//!
//! Register plan: `r0` is the accumulator every expression leaves its value
//! in, `r1` stages the right operand of binary operations, and `r4` upward
//! hold named locals, one register per declaration. The data stack carries
//! expression staging, call arguments and caller-saved locals.
//!
//! Calls follow the same discipline as the native backend: arguments are
//! pushed last-first, so the callee pops them into its parameter registers
//! in declaration order. The caller saves every local register it has
//! allocated around the call and the callee leaves its result in `r0`.

use rustc_hash::FxHashMap;
use seedc_core::{AstcProgram, BytecodeChunk, CodegenError, OpCode, Span};
use seedc_parser::ast::{
    AssignExpr, BinaryExpr, BinaryOp, CallExpr, Expr, ForInit, ForStmt, FunctionDecl, IfStmt,
    Item, LiteralKind, Stmt, TranslationUnit, TypeDesc, TypeExpr, UnaryExpr, UnaryOp,
    VarDeclStmt, WhileStmt,
};

use crate::locals::Locals;
use crate::symbols::FunctionTable;

/// Accumulator register. Every expression leaves its value here.
const ACC: u8 = 0;
/// Staging register for the right operand of binary operations.
const SCRATCH: u8 = 1;
/// First register available for named locals.
const FIRST_LOCAL: u8 = 4;
/// Local registers per function (`r4` through `r15`).
const LOCAL_REGS: usize = 12;

/// Compile a translation unit into a bytecode program.
///
/// The entry point is the offset of `main`, which must be defined and take
/// no parameters.
///
/// # Errors
///
/// Fails on name errors (undefined or redeclared variables, undefined or
/// conflicting functions, arity mismatches), on a missing `main`, on
/// functions needing more than twelve locals, and on constructs the
/// bytecode backend does not support: globals, arrays, pointer operations
/// and string literal values. Nothing partial is produced on failure.
pub fn emit_program(unit: &TranslationUnit<'_>) -> Result<AstcProgram, CodegenError> {
    let table = FunctionTable::build(unit)?;
    let mut emitter = Emitter {
        chunk: BytecodeChunk::new(),
        table,
        offsets: FxHashMap::default(),
        call_sites: Vec::new(),
        locals: Locals::new(),
        slots: 0,
        loops: Vec::new(),
        function: "",
        is_main: false,
        line: 1,
    };

    for item in unit.items() {
        match item {
            Item::Global(decl) => {
                return Err(CodegenError::UnsupportedConstruct {
                    construct: "global variable declaration".to_string(),
                    span: decl.span,
                });
            }
            Item::Function(func) => {
                if func.is_definition() {
                    emitter.compile_function(func)?;
                }
            }
        }
    }

    emitter.patch_calls()?;

    let entry = emitter
        .offsets
        .get("main")
        .copied()
        .ok_or(CodegenError::MissingMain)?;
    Ok(AstcProgram::new(emitter.chunk.into_code(), entry))
}

/// Break and continue sites of the innermost loop, patched when the loop's
/// layout is final.
#[derive(Default)]
struct LoopFrame {
    break_sites: Vec<usize>,
    continue_sites: Vec<usize>,
}

struct Emitter<'ast> {
    chunk: BytecodeChunk,
    table: FunctionTable<'ast>,
    /// Start offset of every compiled function.
    offsets: FxHashMap<&'ast str, u32>,
    /// Call operands waiting for their target's offset.
    call_sites: Vec<(usize, &'ast str, Span)>,
    locals: Locals<'ast, u8>,
    /// Local registers handed out in the current function.
    slots: usize,
    loops: Vec<LoopFrame>,
    /// Name of the function being compiled, for diagnostics.
    function: &'ast str,
    is_main: bool,
    /// Source line attached to emitted bytes.
    line: u32,
}

impl<'ast> Emitter<'ast> {
    // ============ Functions ============

    fn compile_function(&mut self, func: &FunctionDecl<'ast>) -> Result<(), CodegenError> {
        let name = func.name.name;
        self.set_line(func.span);
        self.offsets.insert(name, self.mark());
        self.function = name;
        self.is_main = name == "main";
        self.locals = Locals::new();
        self.slots = 0;

        if self.is_main && !func.params.is_empty() {
            return Err(CodegenError::UnsupportedConstruct {
                construct: "'main' with parameters".to_string(),
                span: func.span,
            });
        }

        // Arguments were pushed last-first, so the first parameter is on
        // top of the stack.
        for param in func.params {
            let Some(ident) = param.name else {
                // The parser requires names on definitions.
                return Err(CodegenError::UnsupportedConstruct {
                    construct: "unnamed parameter in a definition".to_string(),
                    span: param.span,
                });
            };
            self.check_scalar(&param.ty, param.span)?;
            let reg = self.allocate_slot()?;
            self.locals.declare(ident.name, reg, ident.span)?;
            self.pop_reg(reg);
        }

        let Some(body) = func.body else {
            return Ok(());
        };
        // Parameters share the body's outermost scope, as in C.
        for stmt in body.stmts {
            self.compile_stmt(stmt)?;
        }

        let falls_off = body.stmts.last().is_none_or(|stmt| !stmt.is_terminator());
        if self.is_main {
            if falls_off {
                self.load_reg(ACC, 0);
                self.emit_exit();
            }
            self.chunk.write_op(OpCode::Halt, self.line);
        } else if falls_off {
            self.load_reg(ACC, 0);
            self.chunk.write_op(OpCode::Ret, self.line);
        }
        Ok(())
    }

    fn patch_calls(&mut self) -> Result<(), CodegenError> {
        for &(site, name, span) in &self.call_sites {
            match self.offsets.get(name) {
                Some(&offset) => self.chunk.patch_u32(site, offset),
                None => {
                    return Err(CodegenError::UndefinedFunction {
                        name: name.to_string(),
                        span,
                    });
                }
            }
        }
        Ok(())
    }

    // ============ Statements ============

    fn compile_stmt(&mut self, stmt: &Stmt<'ast>) -> Result<(), CodegenError> {
        self.set_line(stmt.span());
        match stmt {
            Stmt::Expr(node) => {
                if let Some(expr) = node.expr {
                    self.compile_expr(expr)?;
                }
                Ok(())
            }
            Stmt::VarDecl(decl) => self.compile_var_decl(decl),
            Stmt::Return(node) => {
                match node.value {
                    Some(value) => self.compile_expr(value)?,
                    None => self.load_reg(ACC, 0),
                }
                if self.is_main {
                    self.emit_exit();
                } else {
                    self.chunk.write_op(OpCode::Ret, self.line);
                }
                Ok(())
            }
            Stmt::Break(node) => {
                let site = self.chunk.emit_jump(OpCode::Jmp, self.line);
                self.loop_frame(node.span)?.break_sites.push(site);
                Ok(())
            }
            Stmt::Continue(node) => {
                let site = self.chunk.emit_jump(OpCode::Jmp, self.line);
                self.loop_frame(node.span)?.continue_sites.push(site);
                Ok(())
            }
            Stmt::Block(block) => {
                self.locals.enter_scope();
                for stmt in block.stmts {
                    self.compile_stmt(stmt)?;
                }
                self.locals.exit_scope();
                Ok(())
            }
            Stmt::If(node) => self.compile_if(node),
            Stmt::While(node) => self.compile_while(node),
            Stmt::For(node) => self.compile_for(node),
        }
    }

    fn compile_var_decl(&mut self, decl: &VarDeclStmt<'ast>) -> Result<(), CodegenError> {
        for var in decl.vars {
            self.check_scalar(&var.ty, var.span)?;
            let reg = self.allocate_slot()?;
            // In scope from its own declarator on, per C.
            self.locals.declare(var.name.name, reg, var.span)?;
            match var.init {
                Some(init) => self.compile_expr(init)?,
                None => self.load_reg(ACC, 0),
            }
            self.move_reg(reg, ACC);
        }
        Ok(())
    }

    fn compile_if(&mut self, node: &IfStmt<'ast>) -> Result<(), CodegenError> {
        self.compile_expr(node.condition)?;
        let skip_then = self.branch_if_false();
        self.compile_stmt(node.then_stmt)?;
        match node.else_stmt {
            Some(else_stmt) => {
                let skip_else = self.chunk.emit_jump(OpCode::Jmp, self.line);
                self.chunk.patch_jump(skip_then);
                self.compile_stmt(else_stmt)?;
                self.chunk.patch_jump(skip_else);
            }
            None => self.chunk.patch_jump(skip_then),
        }
        Ok(())
    }

    fn compile_while(&mut self, node: &WhileStmt<'ast>) -> Result<(), CodegenError> {
        let start = self.mark();
        self.compile_expr(node.condition)?;
        let exit_site = self.branch_if_false();

        self.loops.push(LoopFrame::default());
        let body = self.compile_stmt(node.body);
        let frame = self.loops.pop().unwrap_or_default();
        body?;

        // continue re-tests the condition
        for site in frame.continue_sites {
            self.chunk.patch_u32(site, start);
        }
        self.jump_back(start);
        self.chunk.patch_jump(exit_site);
        for site in frame.break_sites {
            self.chunk.patch_jump(site);
        }
        Ok(())
    }

    fn compile_for(&mut self, node: &ForStmt<'ast>) -> Result<(), CodegenError> {
        // The header declaration is scoped to the loop.
        self.locals.enter_scope();
        match node.init {
            Some(ForInit::VarDecl(decl)) => self.compile_var_decl(&decl)?,
            Some(ForInit::Expr(expr)) => self.compile_expr(expr)?,
            None => {}
        }

        let start = self.mark();
        let exit_site = match node.condition {
            Some(condition) => {
                self.compile_expr(condition)?;
                Some(self.branch_if_false())
            }
            None => None,
        };

        self.loops.push(LoopFrame::default());
        let body = self.compile_stmt(node.body);
        let frame = self.loops.pop().unwrap_or_default();
        body?;

        // continue lands on the update expression
        for site in frame.continue_sites {
            self.chunk.patch_jump(site);
        }
        if let Some(update) = node.update {
            self.compile_expr(update)?;
        }
        self.jump_back(start);
        if let Some(site) = exit_site {
            self.chunk.patch_jump(site);
        }
        for site in frame.break_sites {
            self.chunk.patch_jump(site);
        }
        self.locals.exit_scope();
        Ok(())
    }

    // ============ Expressions ============

    fn compile_expr(&mut self, expr: &Expr<'ast>) -> Result<(), CodegenError> {
        self.set_line(expr.span());
        match expr {
            Expr::Literal(node) => match node.kind {
                LiteralKind::Int(value) => {
                    self.load_reg(ACC, value);
                    Ok(())
                }
                LiteralKind::Char(value) => {
                    self.load_reg(ACC, i64::from(value));
                    Ok(())
                }
                LiteralKind::Str(_) => Err(CodegenError::UnsupportedConstruct {
                    construct: "string literal value".to_string(),
                    span: node.span,
                }),
            },
            Expr::Ident(node) => {
                let Some(reg) = self.locals.get(node.ident.name) else {
                    return Err(CodegenError::UndefinedVariable {
                        name: node.ident.name.to_string(),
                        span: node.span,
                    });
                };
                self.move_reg(ACC, reg);
                Ok(())
            }
            Expr::Unary(node) => self.compile_unary(node),
            Expr::Binary(node) => self.compile_binary(node),
            Expr::Assign(node) => self.compile_assign(node),
            Expr::Call(node) => self.compile_call(node),
        }
    }

    fn compile_unary(&mut self, node: &UnaryExpr<'ast>) -> Result<(), CodegenError> {
        match node.op {
            UnaryOp::Neg => {
                self.compile_expr(node.operand)?;
                self.chunk.write_op(OpCode::Neg, self.line);
                self.chunk.write_byte(ACC, self.line);
                Ok(())
            }
            UnaryOp::LogicalNot => {
                self.compile_expr(node.operand)?;
                self.load_reg(SCRATCH, 0);
                self.flag_value(OpCode::Jz);
                Ok(())
            }
            UnaryOp::Deref => Err(CodegenError::UnsupportedConstruct {
                construct: "pointer dereference".to_string(),
                span: node.span,
            }),
            UnaryOp::AddrOf => Err(CodegenError::UnsupportedConstruct {
                construct: "address-of operator".to_string(),
                span: node.span,
            }),
        }
    }

    fn compile_binary(&mut self, node: &BinaryExpr<'ast>) -> Result<(), CodegenError> {
        self.compile_expr(node.left)?;
        self.push_reg(ACC);
        self.compile_expr(node.right)?;
        // Right lands in the scratch register, left back in the
        // accumulator.
        self.move_reg(SCRATCH, ACC);
        self.pop_reg(ACC);

        match node.op {
            BinaryOp::Add => self.arith(OpCode::Add),
            BinaryOp::Sub => self.arith(OpCode::Sub),
            BinaryOp::Mul => self.arith(OpCode::Mul),
            BinaryOp::Div => self.arith(OpCode::Div),
            BinaryOp::Mod => self.arith(OpCode::Mod),
            BinaryOp::Equal => self.flag_value(OpCode::Jz),
            BinaryOp::NotEqual => self.flag_value(OpCode::Jnz),
            BinaryOp::Less => self.flag_value(OpCode::Jl),
            BinaryOp::LessEqual => self.flag_value(OpCode::Jle),
            BinaryOp::Greater => self.flag_value(OpCode::Jg),
            BinaryOp::GreaterEqual => self.flag_value(OpCode::Jge),
        }
        Ok(())
    }

    fn compile_assign(&mut self, node: &AssignExpr<'ast>) -> Result<(), CodegenError> {
        let target = match *node.target {
            Expr::Ident(ident) => ident,
            other => {
                return Err(CodegenError::UnsupportedConstruct {
                    construct: "assignment through a pointer".to_string(),
                    span: other.span(),
                });
            }
        };
        let Some(reg) = self.locals.get(target.ident.name) else {
            return Err(CodegenError::UndefinedVariable {
                name: target.ident.name.to_string(),
                span: target.span,
            });
        };
        self.compile_expr(node.value)?;
        // The assigned value stays in the accumulator, so chained
        // assignments read it back out.
        self.move_reg(reg, ACC);
        Ok(())
    }

    fn compile_call(&mut self, node: &CallExpr<'ast>) -> Result<(), CodegenError> {
        let Some(name) = node.callee_name() else {
            return Err(CodegenError::UnsupportedConstruct {
                construct: "call through an expression".to_string(),
                span: node.callee.span(),
            });
        };

        // Service names lower to dedicated opcodes unless the program
        // declares its own function of that name.
        if self.table.get(name).is_none()
            && let Some(op) = service_opcode(name)
        {
            if node.args.len() != 1 {
                return Err(CodegenError::ArityMismatch {
                    name: name.to_string(),
                    expected: 1,
                    found: node.args.len(),
                    span: node.span,
                });
            }
            self.compile_expr(&node.args[0])?;
            self.chunk.write_op(op, self.line);
            self.chunk.write_byte(ACC, self.line);
            return Ok(());
        }

        let sig = match self.table.get(name) {
            Some(sig) if sig.defined => *sig,
            _ => {
                return Err(CodegenError::UndefinedFunction {
                    name: name.to_string(),
                    span: node.span,
                });
            }
        };
        if node.args.len() != sig.params {
            return Err(CodegenError::ArityMismatch {
                name: name.to_string(),
                expected: sig.params,
                found: node.args.len(),
                span: node.span,
            });
        }

        // The callee owns the local registers, so save every one handed
        // out so far.
        let live = self.slots;
        for slot in 0..live {
            self.push_reg(FIRST_LOCAL + slot as u8);
        }
        for arg in node.args.iter().rev() {
            self.compile_expr(arg)?;
            self.push_reg(ACC);
        }
        let site = self.chunk.emit_jump(OpCode::Call, self.line);
        self.call_sites.push((site, name, node.span));
        for slot in (0..live).rev() {
            self.pop_reg(FIRST_LOCAL + slot as u8);
        }
        Ok(())
    }

    // ============ Helpers ============

    fn mark(&self) -> u32 {
        self.chunk.current_offset() as u32
    }

    fn set_line(&mut self, span: Span) {
        if span.line != 0 {
            self.line = span.line;
        }
    }

    fn allocate_slot(&mut self) -> Result<u8, CodegenError> {
        if self.slots >= LOCAL_REGS {
            return Err(CodegenError::TooManyLocals {
                name: self.function.to_string(),
                limit: LOCAL_REGS,
            });
        }
        let reg = FIRST_LOCAL + self.slots as u8;
        self.slots += 1;
        Ok(reg)
    }

    fn loop_frame(&mut self, span: Span) -> Result<&mut LoopFrame, CodegenError> {
        self.loops
            .last_mut()
            .ok_or(CodegenError::UnsupportedConstruct {
                construct: "jump outside of a loop".to_string(),
                span,
            })
    }

    fn check_scalar(&self, ty: &TypeExpr<'ast>, span: Span) -> Result<(), CodegenError> {
        match ty.desc {
            TypeDesc::Array(_) => Err(CodegenError::UnsupportedConstruct {
                construct: "array declaration".to_string(),
                span,
            }),
            _ => Ok(()),
        }
    }

    fn load_reg(&mut self, reg: u8, value: i64) {
        self.chunk.write_op(OpCode::LoadImm, self.line);
        self.chunk.write_byte(reg, self.line);
        self.chunk.write_i64(value, self.line);
    }

    fn move_reg(&mut self, dst: u8, src: u8) {
        self.chunk.write_op(OpCode::Mov, self.line);
        self.chunk.write_byte(dst, self.line);
        self.chunk.write_byte(src, self.line);
    }

    fn push_reg(&mut self, reg: u8) {
        self.chunk.write_op(OpCode::Push, self.line);
        self.chunk.write_byte(reg, self.line);
    }

    fn pop_reg(&mut self, reg: u8) {
        self.chunk.write_op(OpCode::Pop, self.line);
        self.chunk.write_byte(reg, self.line);
    }

    fn arith(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.line);
        self.chunk.write_byte(ACC, self.line);
        self.chunk.write_byte(SCRATCH, self.line);
    }

    fn compare_regs(&mut self) {
        self.chunk.write_op(OpCode::Cmp, self.line);
        self.chunk.write_byte(ACC, self.line);
        self.chunk.write_byte(SCRATCH, self.line);
    }

    /// Turn the flags of a comparison into a 0-or-1 accumulator value.
    /// Expects the operands in the accumulator and scratch registers.
    fn flag_value(&mut self, branch: OpCode) {
        self.compare_regs();
        let when_true = self.chunk.emit_jump(branch, self.line);
        self.load_reg(ACC, 0);
        let done = self.chunk.emit_jump(OpCode::Jmp, self.line);
        self.chunk.patch_jump(when_true);
        self.load_reg(ACC, 1);
        self.chunk.patch_jump(done);
    }

    /// Branch taken when the accumulator is zero; returns the operand
    /// offset to patch.
    fn branch_if_false(&mut self) -> usize {
        self.load_reg(SCRATCH, 0);
        self.compare_regs();
        self.chunk.emit_jump(OpCode::Jz, self.line)
    }

    fn jump_back(&mut self, target: u32) {
        self.chunk.write_op(OpCode::Jmp, self.line);
        self.chunk.write_u32(target, self.line);
    }

    fn emit_exit(&mut self) {
        self.chunk.write_op(OpCode::Exit, self.line);
        self.chunk.write_byte(ACC, self.line);
    }
}

/// Opcode behind a service name, called like a function from source.
fn service_opcode(name: &str) -> Option<OpCode> {
    match name {
        "print" => Some(OpCode::Print),
        "put_char" => Some(OpCode::PrintChar),
        _ => None,
    }
}
