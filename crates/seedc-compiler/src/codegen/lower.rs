//! Shared lowering walk for the native backends.
//!
//! The walk turns the syntax tree into a linear instruction sequence and
//! hands each instruction to an [`InsnSink`]. The assembly writer and the
//! machine encoder implement the sink, so the two outputs can never
//! disagree about layout, calling convention or evaluation order.
//!
//! The machine model is the same accumulator scheme as the bytecode
//! backend: every expression leaves its value in the accumulator register,
//! binary operations stage their left operand on the stack and their right
//! operand in the scratch register. Locals live in the stack frame at
//! negative frame-pointer offsets, parameters above the saved frame
//! pointer at positive ones. Calls are cdecl: arguments pushed last-first,
//! caller cleans up.

use seedc_core::{CodegenError, Span, Target};
use seedc_parser::ast::{
    AssignExpr, BinaryExpr, BinaryOp, Block, CallExpr, Expr, ForInit, ForStmt, FunctionDecl,
    IfStmt, Item, LiteralKind, Stmt, TranslationUnit, TypeDesc, TypeExpr, UnaryExpr, UnaryOp,
    VarDeclStmt, WhileStmt,
};

use crate::locals::Locals;
use crate::symbols::FunctionTable;

/// A forward-referencable position in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Label(pub(crate) u32);

/// Arithmetic instructions operating on accumulator and scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Comparison conditions, evaluated as accumulator against scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Condition {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

/// Receiver for the lowered instruction stream.
///
/// Offsets passed to `load_local` and `store_local` are frame-pointer
/// relative byte offsets. `drop_args` receives an argument count; the
/// sink scales it by the word size.
pub(crate) trait InsnSink {
    fn begin_function(&mut self, name: &str, frame_bytes: u32);
    fn end_function(&mut self);
    fn load_imm(&mut self, value: i64);
    fn load_local(&mut self, offset: i32);
    fn store_local(&mut self, offset: i32);
    fn push_acc(&mut self);
    /// Move the accumulator to scratch, pop the staged left operand back
    /// into the accumulator.
    fn stage_rhs(&mut self);
    fn arith(&mut self, op: ArithOp);
    /// Compare accumulator against scratch and leave 0 or 1 in the
    /// accumulator.
    fn compare(&mut self, cond: Condition);
    fn negate(&mut self);
    /// Leave 1 in the accumulator when it held zero, 0 otherwise.
    fn logical_not(&mut self);
    fn new_label(&mut self) -> Label;
    fn bind_label(&mut self, label: Label);
    fn jump(&mut self, label: Label);
    fn jump_if_zero(&mut self, label: Label);
    fn call(&mut self, name: &str, span: Span);
    fn drop_args(&mut self, count: u32);
    /// Tear down the frame and return.
    fn epilogue(&mut self);
}

/// Jump targets of the innermost enclosing loop.
#[derive(Clone, Copy)]
struct LoopLabels {
    continue_target: Label,
    break_target: Label,
}

/// Lower every function definition of `unit` into `sink`.
///
/// The caller is expected to have validated the function table and the
/// presence of `main`; this walk still reports name, arity and
/// unsupported-construct errors it runs into.
pub(crate) fn lower_unit<'ast, S: InsnSink>(
    unit: &TranslationUnit<'ast>,
    table: &FunctionTable<'ast>,
    target: Target,
    sink: &mut S,
) -> Result<(), CodegenError> {
    let mut lowerer = Lowerer {
        table,
        target,
        locals: Locals::new(),
        next_slot: 0,
        loops: Vec::new(),
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
                    lowerer.function(func, sink)?;
                }
            }
        }
    }
    Ok(())
}

struct Lowerer<'ast, 'table> {
    table: &'table FunctionTable<'ast>,
    target: Target,
    locals: Locals<'ast, i32>,
    /// Frame slots handed out so far in the current function.
    next_slot: u32,
    loops: Vec<LoopLabels>,
}

impl<'ast> Lowerer<'ast, '_> {
    // ============ Functions ============

    fn function<S: InsnSink>(
        &mut self,
        func: &FunctionDecl<'ast>,
        sink: &mut S,
    ) -> Result<(), CodegenError> {
        let name = func.name.name;
        self.locals = Locals::new();
        self.next_slot = 0;

        if name == "main" && !func.params.is_empty() {
            return Err(CodegenError::UnsupportedConstruct {
                construct: "'main' with parameters".to_string(),
                span: func.span,
            });
        }
        // The export table stores the parameter count in a byte.
        if func.params.len() > usize::from(u8::MAX) {
            return Err(CodegenError::UnsupportedConstruct {
                construct: "more than 255 parameters".to_string(),
                span: func.span,
            });
        }
        let Some(body) = func.body else {
            return Ok(());
        };

        let word = self.word();
        let slots = frame_slots(&body);
        sink.begin_function(name, slots * self.target.word_size());

        for (index, param) in func.params.iter().enumerate() {
            let Some(ident) = param.name else {
                // The parser requires names on definitions.
                return Err(CodegenError::UnsupportedConstruct {
                    construct: "unnamed parameter in a definition".to_string(),
                    span: param.span,
                });
            };
            self.check_scalar(&param.ty, param.span)?;
            // Above the return address and the saved frame pointer.
            let offset = 2 * word + index as i32 * word;
            self.locals.declare(ident.name, offset, ident.span)?;
        }

        for stmt in body.stmts {
            self.stmt(stmt, sink)?;
        }
        debug_assert_eq!(self.next_slot, slots);

        if body.stmts.last().is_none_or(|stmt| !stmt.is_terminator()) {
            sink.load_imm(0);
            sink.epilogue();
        }
        sink.end_function();
        Ok(())
    }

    // ============ Statements ============

    fn stmt<S: InsnSink>(&mut self, stmt: &Stmt<'ast>, sink: &mut S) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Expr(node) => {
                if let Some(expr) = node.expr {
                    self.expr(expr, sink)?;
                }
                Ok(())
            }
            Stmt::VarDecl(decl) => self.var_decl(decl, sink),
            Stmt::Return(node) => {
                match node.value {
                    Some(value) => self.expr(value, sink)?,
                    None => sink.load_imm(0),
                }
                sink.epilogue();
                Ok(())
            }
            Stmt::Break(node) => {
                let labels = self.loop_labels(node.span)?;
                sink.jump(labels.break_target);
                Ok(())
            }
            Stmt::Continue(node) => {
                let labels = self.loop_labels(node.span)?;
                sink.jump(labels.continue_target);
                Ok(())
            }
            Stmt::Block(block) => {
                self.locals.enter_scope();
                for stmt in block.stmts {
                    self.stmt(stmt, sink)?;
                }
                self.locals.exit_scope();
                Ok(())
            }
            Stmt::If(node) => self.if_stmt(node, sink),
            Stmt::While(node) => self.while_stmt(node, sink),
            Stmt::For(node) => self.for_stmt(node, sink),
        }
    }

    fn var_decl<S: InsnSink>(
        &mut self,
        decl: &VarDeclStmt<'ast>,
        sink: &mut S,
    ) -> Result<(), CodegenError> {
        for var in decl.vars {
            self.check_scalar(&var.ty, var.span)?;
            let offset = self.allocate_slot();
            self.locals.declare(var.name.name, offset, var.span)?;
            match var.init {
                Some(init) => self.expr(init, sink)?,
                None => sink.load_imm(0),
            }
            sink.store_local(offset);
        }
        Ok(())
    }

    fn if_stmt<S: InsnSink>(
        &mut self,
        node: &IfStmt<'ast>,
        sink: &mut S,
    ) -> Result<(), CodegenError> {
        self.expr(node.condition, sink)?;
        let skip_then = sink.new_label();
        sink.jump_if_zero(skip_then);
        self.stmt(node.then_stmt, sink)?;
        match node.else_stmt {
            Some(else_stmt) => {
                let skip_else = sink.new_label();
                sink.jump(skip_else);
                sink.bind_label(skip_then);
                self.stmt(else_stmt, sink)?;
                sink.bind_label(skip_else);
            }
            None => sink.bind_label(skip_then),
        }
        Ok(())
    }

    fn while_stmt<S: InsnSink>(
        &mut self,
        node: &WhileStmt<'ast>,
        sink: &mut S,
    ) -> Result<(), CodegenError> {
        let start = sink.new_label();
        let exit = sink.new_label();
        sink.bind_label(start);
        self.expr(node.condition, sink)?;
        sink.jump_if_zero(exit);

        // continue re-tests the condition
        self.loops.push(LoopLabels {
            continue_target: start,
            break_target: exit,
        });
        let body = self.stmt(node.body, sink);
        self.loops.pop();
        body?;

        sink.jump(start);
        sink.bind_label(exit);
        Ok(())
    }

    fn for_stmt<S: InsnSink>(
        &mut self,
        node: &ForStmt<'ast>,
        sink: &mut S,
    ) -> Result<(), CodegenError> {
        // The header declaration is scoped to the loop.
        self.locals.enter_scope();
        match node.init {
            Some(ForInit::VarDecl(decl)) => self.var_decl(&decl, sink)?,
            Some(ForInit::Expr(expr)) => self.expr(expr, sink)?,
            None => {}
        }

        let start = sink.new_label();
        let update = sink.new_label();
        let exit = sink.new_label();
        sink.bind_label(start);
        if let Some(condition) = node.condition {
            self.expr(condition, sink)?;
            sink.jump_if_zero(exit);
        }

        // continue lands on the update expression
        self.loops.push(LoopLabels {
            continue_target: update,
            break_target: exit,
        });
        let body = self.stmt(node.body, sink);
        self.loops.pop();
        body?;

        sink.bind_label(update);
        if let Some(expr) = node.update {
            self.expr(expr, sink)?;
        }
        sink.jump(start);
        sink.bind_label(exit);
        self.locals.exit_scope();
        Ok(())
    }

    // ============ Expressions ============

    fn expr<S: InsnSink>(&mut self, expr: &Expr<'ast>, sink: &mut S) -> Result<(), CodegenError> {
        match expr {
            Expr::Literal(node) => {
                let value = match node.kind {
                    LiteralKind::Int(value) => value,
                    LiteralKind::Char(value) => i64::from(value),
                    LiteralKind::Str(_) => {
                        return Err(CodegenError::UnsupportedConstruct {
                            construct: "string literal value".to_string(),
                            span: node.span,
                        });
                    }
                };
                self.check_range(value, node.span)?;
                sink.load_imm(value);
                Ok(())
            }
            Expr::Ident(node) => {
                let Some(offset) = self.locals.get(node.ident.name) else {
                    return Err(CodegenError::UndefinedVariable {
                        name: node.ident.name.to_string(),
                        span: node.span,
                    });
                };
                sink.load_local(offset);
                Ok(())
            }
            Expr::Unary(node) => self.unary(node, sink),
            Expr::Binary(node) => self.binary(node, sink),
            Expr::Assign(node) => self.assign(node, sink),
            Expr::Call(node) => self.call(node, sink),
        }
    }

    fn unary<S: InsnSink>(
        &mut self,
        node: &UnaryExpr<'ast>,
        sink: &mut S,
    ) -> Result<(), CodegenError> {
        match node.op {
            UnaryOp::Neg => {
                self.expr(node.operand, sink)?;
                sink.negate();
                Ok(())
            }
            UnaryOp::LogicalNot => {
                self.expr(node.operand, sink)?;
                sink.logical_not();
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

    fn binary<S: InsnSink>(
        &mut self,
        node: &BinaryExpr<'ast>,
        sink: &mut S,
    ) -> Result<(), CodegenError> {
        self.expr(node.left, sink)?;
        sink.push_acc();
        self.expr(node.right, sink)?;
        sink.stage_rhs();

        match node.op {
            BinaryOp::Add => sink.arith(ArithOp::Add),
            BinaryOp::Sub => sink.arith(ArithOp::Sub),
            BinaryOp::Mul => sink.arith(ArithOp::Mul),
            BinaryOp::Div => sink.arith(ArithOp::Div),
            BinaryOp::Mod => sink.arith(ArithOp::Mod),
            BinaryOp::Equal => sink.compare(Condition::Equal),
            BinaryOp::NotEqual => sink.compare(Condition::NotEqual),
            BinaryOp::Less => sink.compare(Condition::Less),
            BinaryOp::LessEqual => sink.compare(Condition::LessEqual),
            BinaryOp::Greater => sink.compare(Condition::Greater),
            BinaryOp::GreaterEqual => sink.compare(Condition::GreaterEqual),
        }
        Ok(())
    }

    fn assign<S: InsnSink>(
        &mut self,
        node: &AssignExpr<'ast>,
        sink: &mut S,
    ) -> Result<(), CodegenError> {
        let target = match *node.target {
            Expr::Ident(ident) => ident,
            other => {
                return Err(CodegenError::UnsupportedConstruct {
                    construct: "assignment through a pointer".to_string(),
                    span: other.span(),
                });
            }
        };
        let Some(offset) = self.locals.get(target.ident.name) else {
            return Err(CodegenError::UndefinedVariable {
                name: target.ident.name.to_string(),
                span: target.span,
            });
        };
        self.expr(node.value, sink)?;
        // The stored value stays in the accumulator for chained
        // assignments.
        sink.store_local(offset);
        Ok(())
    }

    fn call<S: InsnSink>(
        &mut self,
        node: &CallExpr<'ast>,
        sink: &mut S,
    ) -> Result<(), CodegenError> {
        let Some(name) = node.callee_name() else {
            return Err(CodegenError::UnsupportedConstruct {
                construct: "call through an expression".to_string(),
                span: node.callee.span(),
            });
        };
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

        // cdecl: last argument pushed first, caller drops them after.
        for arg in node.args.iter().rev() {
            self.expr(arg, sink)?;
            sink.push_acc();
        }
        sink.call(name, node.span);
        if !node.args.is_empty() {
            sink.drop_args(node.args.len() as u32);
        }
        Ok(())
    }

    // ============ Helpers ============

    fn word(&self) -> i32 {
        self.target.word_size() as i32
    }

    fn allocate_slot(&mut self) -> i32 {
        self.next_slot += 1;
        -(self.next_slot as i32 * self.word())
    }

    fn loop_labels(&self, span: Span) -> Result<LoopLabels, CodegenError> {
        self.loops
            .last()
            .copied()
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

    fn check_range(&self, value: i64, span: Span) -> Result<(), CodegenError> {
        if self.target.bits() == 32 && i32::try_from(value).is_err() {
            return Err(CodegenError::UnsupportedConstruct {
                construct: format!("integer constant {value} beyond the 32-bit range"),
                span,
            });
        }
        Ok(())
    }
}

/// Count the frame slots a function body needs: one per declarator,
/// including loop headers and nested blocks. Slots are never reused
/// between sibling scopes, which keeps offsets stable and the layout
/// trivially correct.
pub(crate) fn frame_slots(block: &Block<'_>) -> u32 {
    block.stmts.iter().map(stmt_slots).sum()
}

fn stmt_slots(stmt: &Stmt<'_>) -> u32 {
    match stmt {
        Stmt::VarDecl(decl) => decl.vars.len() as u32,
        Stmt::Block(block) => frame_slots(block),
        Stmt::If(node) => {
            stmt_slots(node.then_stmt) + node.else_stmt.map_or(0, stmt_slots)
        }
        Stmt::While(node) => stmt_slots(node.body),
        Stmt::For(node) => {
            let header = match node.init {
                Some(ForInit::VarDecl(decl)) => decl.vars.len() as u32,
                _ => 0,
            };
            header + stmt_slots(node.body)
        }
        _ => 0,
    }
}
