//! AST optimization passes.
//!
//! [`optimize`] rewrites a translation unit depth-first, repeating until
//! no rewrite fires. The level selects which rewrites are active:
//!
//! - level 1: constant folding ([`fold`])
//! - level 2: dead code removal on top of folding ([`dce`])
//! - level 3: algebraic identities on top of both ([`algebra`])
//!
//! Level 0 returns the unit untouched. Rebuilt nodes go into the same
//! arena as the input; unchanged subtrees are reused by reference, so
//! the pass never copies more of the tree than it rewrites.

mod algebra;
mod dce;
mod fold;

use bumpalo::Bump;
use seedc_core::Diagnostics;
use seedc_parser::TranslationUnit;
use seedc_parser::ast::{
    AssignExpr, BinaryExpr, Block, CallExpr, Expr, ExprStmt, ForInit, ForStmt, FunctionDecl,
    IfStmt, Item, LiteralExpr, LiteralKind, Stmt, UnaryExpr, VarDeclStmt, VarDeclarator, WhileStmt,
};

/// Optimize a translation unit at the given level.
///
/// Returns the rewritten unit and whether anything changed. Dropped
/// unreachable statements are reported through `diagnostics` as notes;
/// the pass itself never fails.
pub fn optimize<'ast>(
    unit: TranslationUnit<'ast>,
    arena: &'ast Bump,
    level: u8,
    diagnostics: &mut Diagnostics,
) -> (TranslationUnit<'ast>, bool) {
    if level == 0 {
        return (unit, false);
    }

    let mut current = unit;
    let mut changed_any = false;
    loop {
        let mut pass = Rewriter {
            arena,
            level,
            diagnostics,
            changed: false,
        };
        let next = pass.unit(&current);
        if !pass.changed {
            break;
        }
        changed_any = true;
        current = next;
    }
    (current, changed_any)
}

// ============================================================================
// Rewriter
// ============================================================================

/// One depth-first rewrite pass over the tree.
///
/// Every rewrite strictly shrinks the tree, so the fixed-point loop in
/// [`optimize`] terminates.
struct Rewriter<'ast, 'd> {
    arena: &'ast Bump,
    level: u8,
    diagnostics: &'d mut Diagnostics,
    changed: bool,
}

impl<'ast> Rewriter<'ast, '_> {
    /// Run `f` and report whether it changed anything, keeping the
    /// cumulative flag intact.
    fn probe<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> (T, bool) {
        let outer = self.changed;
        self.changed = false;
        let value = f(self);
        let local = self.changed;
        self.changed = outer || local;
        (value, local)
    }

    fn unit(&mut self, unit: &TranslationUnit<'ast>) -> TranslationUnit<'ast> {
        let (items, changed) = self.probe(|this| {
            unit.items()
                .iter()
                .map(|item| this.item(item))
                .collect::<Vec<_>>()
        });
        if changed {
            TranslationUnit::new(self.arena.alloc_slice_copy(&items), unit.span())
        } else {
            *unit
        }
    }

    fn item(&mut self, item: &Item<'ast>) -> Item<'ast> {
        match item {
            Item::Function(func) => Item::Function(self.function(func)),
            Item::Global(decl) => Item::Global(self.var_decl(decl)),
        }
    }

    fn function(&mut self, func: &FunctionDecl<'ast>) -> FunctionDecl<'ast> {
        let Some(body) = func.body else {
            return *func;
        };
        let (body, changed) = self.probe(|this| this.block(&body));
        if changed {
            FunctionDecl {
                body: Some(body),
                ..*func
            }
        } else {
            *func
        }
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn block(&mut self, block: &Block<'ast>) -> Block<'ast> {
        let (mut stmts, mut changed) = self.probe(|this| {
            block
                .stmts
                .iter()
                .map(|stmt| this.stmt(stmt))
                .collect::<Vec<_>>()
        });

        if self.level >= 2
            && let Some(keep) = dce::live_prefix(&stmts)
        {
            self.diagnostics.info(
                "unreachable statement removed",
                None,
                stmts[keep].span(),
            );
            stmts.truncate(keep);
            changed = true;
            self.changed = true;
        }

        if changed {
            Block {
                stmts: self.arena.alloc_slice_copy(&stmts),
                span: block.span,
            }
        } else {
            *block
        }
    }

    fn stmt(&mut self, stmt: &Stmt<'ast>) -> Stmt<'ast> {
        match stmt {
            Stmt::Expr(node) => {
                let (expr, changed) = self.probe(|this| node.expr.map(|e| this.expr_ref(e)));
                if changed {
                    Stmt::Expr(ExprStmt {
                        expr,
                        span: node.span,
                    })
                } else {
                    *stmt
                }
            }
            Stmt::VarDecl(decl) => Stmt::VarDecl(self.var_decl(decl)),
            Stmt::Return(node) => {
                let (value, changed) = self.probe(|this| node.value.map(|e| this.expr_ref(e)));
                if changed {
                    Stmt::Return(seedc_parser::ast::ReturnStmt {
                        value,
                        span: node.span,
                    })
                } else {
                    *stmt
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) => *stmt,
            Stmt::Block(block) => Stmt::Block(self.block(block)),
            Stmt::If(node) => self.if_stmt(node),
            Stmt::While(node) => self.while_stmt(node),
            Stmt::For(node) => self.for_stmt(node),
        }
    }

    fn stmt_ref(&mut self, stmt: &'ast Stmt<'ast>) -> &'ast Stmt<'ast> {
        let (value, changed) = self.probe(|this| this.stmt(stmt));
        if changed { self.arena.alloc(value) } else { stmt }
    }

    fn var_decl(&mut self, decl: &VarDeclStmt<'ast>) -> VarDeclStmt<'ast> {
        let (vars, changed) = self.probe(|this| {
            decl.vars
                .iter()
                .map(|var| this.declarator(var))
                .collect::<Vec<_>>()
        });
        if changed {
            VarDeclStmt {
                vars: self.arena.alloc_slice_copy(&vars),
                ..*decl
            }
        } else {
            *decl
        }
    }

    fn declarator(&mut self, var: &VarDeclarator<'ast>) -> VarDeclarator<'ast> {
        let (init, changed) = self.probe(|this| var.init.map(|e| this.expr_ref(e)));
        if changed {
            VarDeclarator { init, ..*var }
        } else {
            *var
        }
    }

    fn if_stmt(&mut self, node: &'ast IfStmt<'ast>) -> Stmt<'ast> {
        let (condition, cond_changed) = self.probe(|this| this.expr_ref(node.condition));

        if self.level >= 2
            && let Some(value) = condition.as_int_const()
        {
            self.changed = true;
            let taken = if value != 0 {
                Some(node.then_stmt)
            } else {
                node.else_stmt
            };
            return match taken {
                Some(branch) => self.stmt(branch),
                // `if (0) ...;` with no else leaves an empty statement.
                None => Stmt::Expr(ExprStmt {
                    expr: None,
                    span: node.span,
                }),
            };
        }

        let (then_stmt, then_changed) = self.probe(|this| this.stmt_ref(node.then_stmt));
        let (else_stmt, else_changed) =
            self.probe(|this| node.else_stmt.map(|s| this.stmt_ref(s)));

        if cond_changed || then_changed || else_changed {
            Stmt::If(self.arena.alloc(IfStmt {
                condition,
                then_stmt,
                else_stmt,
                span: node.span,
            }))
        } else {
            Stmt::If(node)
        }
    }

    fn while_stmt(&mut self, node: &'ast WhileStmt<'ast>) -> Stmt<'ast> {
        let (condition, c1) = self.probe(|this| this.expr_ref(node.condition));
        let (body, c2) = self.probe(|this| this.stmt_ref(node.body));
        if c1 || c2 {
            Stmt::While(self.arena.alloc(WhileStmt {
                condition,
                body,
                span: node.span,
            }))
        } else {
            Stmt::While(node)
        }
    }

    fn for_stmt(&mut self, node: &'ast ForStmt<'ast>) -> Stmt<'ast> {
        let (init, c1) = self.probe(|this| {
            node.init.map(|init| match init {
                ForInit::VarDecl(decl) => ForInit::VarDecl(this.var_decl(&decl)),
                ForInit::Expr(expr) => ForInit::Expr(this.expr_ref(expr)),
            })
        });
        let (condition, c2) = self.probe(|this| node.condition.map(|e| this.expr_ref(e)));
        let (update, c3) = self.probe(|this| node.update.map(|e| this.expr_ref(e)));
        let (body, c4) = self.probe(|this| this.stmt_ref(node.body));

        if c1 || c2 || c3 || c4 {
            Stmt::For(self.arena.alloc(ForStmt {
                init,
                condition,
                update,
                body,
                span: node.span,
            }))
        } else {
            Stmt::For(node)
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn expr_ref(&mut self, expr: &'ast Expr<'ast>) -> &'ast Expr<'ast> {
        let (value, changed) = self.probe(|this| this.expr(*expr));
        if changed { self.arena.alloc(value) } else { expr }
    }

    fn expr(&mut self, expr: Expr<'ast>) -> Expr<'ast> {
        match expr {
            Expr::Literal(_) | Expr::Ident(_) => expr,
            Expr::Binary(node) => self.binary(node),
            Expr::Unary(node) => self.unary(node),
            Expr::Assign(node) => self.assign(node),
            Expr::Call(node) => self.call(node),
        }
    }

    fn binary(&mut self, node: &'ast BinaryExpr<'ast>) -> Expr<'ast> {
        let (left, c1) = self.probe(|this| this.expr_ref(node.left));
        let (right, c2) = self.probe(|this| this.expr_ref(node.right));

        if let (Some(lhs), Some(rhs)) = (left.as_int_const(), right.as_int_const())
            && let Some(value) = fold::binary(node.op, lhs, rhs)
        {
            self.changed = true;
            return int_literal(value, node.span);
        }

        if self.level >= 3
            && let Some(rewrite) = algebra::binary(node.op, right.as_int_const())
        {
            self.changed = true;
            return match rewrite {
                algebra::Rewrite::KeepLeft => *left,
                algebra::Rewrite::Zero => int_literal(0, node.span),
            };
        }

        if c1 || c2 {
            Expr::Binary(self.arena.alloc(BinaryExpr {
                left,
                op: node.op,
                right,
                span: node.span,
            }))
        } else {
            Expr::Binary(node)
        }
    }

    fn unary(&mut self, node: &'ast UnaryExpr<'ast>) -> Expr<'ast> {
        let (operand, changed) = self.probe(|this| this.expr_ref(node.operand));

        if let Some(v) = operand.as_int_const()
            && let Some(value) = fold::unary(node.op, v)
        {
            self.changed = true;
            return int_literal(value, node.span);
        }

        if changed {
            Expr::Unary(self.arena.alloc(UnaryExpr {
                op: node.op,
                operand,
                span: node.span,
            }))
        } else {
            Expr::Unary(node)
        }
    }

    fn assign(&mut self, node: &'ast AssignExpr<'ast>) -> Expr<'ast> {
        let (target, c1) = self.probe(|this| this.expr_ref(node.target));
        let (value, c2) = self.probe(|this| this.expr_ref(node.value));
        if c1 || c2 {
            Expr::Assign(self.arena.alloc(AssignExpr {
                target,
                value,
                span: node.span,
            }))
        } else {
            Expr::Assign(node)
        }
    }

    fn call(&mut self, node: &'ast CallExpr<'ast>) -> Expr<'ast> {
        let (callee, c1) = self.probe(|this| this.expr_ref(node.callee));
        let (args, c2) = self.probe(|this| {
            node.args
                .iter()
                .map(|arg| this.expr(*arg))
                .collect::<Vec<_>>()
        });
        if c1 || c2 {
            Expr::Call(self.arena.alloc(CallExpr {
                callee,
                args: self.arena.alloc_slice_copy(&args),
                span: node.span,
            }))
        } else {
            Expr::Call(node)
        }
    }
}

fn int_literal<'ast>(value: i64, span: seedc_core::Span) -> Expr<'ast> {
    Expr::Literal(LiteralExpr {
        kind: LiteralKind::Int(value),
        span,
    })
}

// ============================================================================
// Tests
// ============================================================================
