//! Statement AST nodes.
//!
//! Provides nodes for all statement forms in the subset:
//! - Expression statements (including the empty statement `;`)
//! - Variable declarations
//! - Control flow (if/else, while, for)
//! - Jump statements (return, break, continue)
//! - Blocks

use crate::ast::expr::Expr;
use crate::ast::node::Ident;
use crate::ast::types::TypeExpr;
use seedc_core::Span;

/// A statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// Expression statement (`expr;`)
    Expr(ExprStmt<'ast>),
    /// Variable declaration
    VarDecl(VarDeclStmt<'ast>),
    /// Return statement
    Return(ReturnStmt<'ast>),
    /// Break statement
    Break(BreakStmt),
    /// Continue statement
    Continue(ContinueStmt),
    /// Block statement
    Block(Block<'ast>),
    /// If statement
    If(&'ast IfStmt<'ast>),
    /// While loop
    While(&'ast WhileStmt<'ast>),
    /// For loop
    For(&'ast ForStmt<'ast>),
}

impl<'ast> Stmt<'ast> {
    /// Get the span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(s) => s.span,
            Self::VarDecl(s) => s.span,
            Self::Return(s) => s.span,
            Self::Break(s) => s.span,
            Self::Continue(s) => s.span,
            Self::Block(s) => s.span,
            Self::If(s) => s.span,
            Self::While(s) => s.span,
            Self::For(s) => s.span,
        }
    }

    /// Check if control cannot flow past this statement.
    ///
    /// Conservative: only statements that always transfer control
    /// count, so an `if` with returns in both arms still answers
    /// false from here.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Return(_) | Self::Break(_) | Self::Continue(_)
        )
    }
}

/// An expression statement (expression followed by semicolon).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    /// The expression (`None` for the empty statement `;`)
    pub expr: Option<&'ast Expr<'ast>>,
    /// Source location
    pub span: Span,
}

/// A variable declaration statement.
///
/// Examples:
/// - `int x;`
/// - `int x = 5;`
/// - `int x = 5, *p = &x;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDeclStmt<'ast> {
    /// The written base type, before per-declarator derivations
    pub base: TypeExpr<'ast>,
    /// The declarators (at least one)
    pub vars: &'ast [VarDeclarator<'ast>],
    /// Source location
    pub span: Span,
}

/// A single declarator within a variable declaration.
///
/// Carries the complete derived type: in `int x, *p;` the first
/// declarator has type `int` and the second `int*`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDeclarator<'ast> {
    /// Complete type of this variable
    pub ty: TypeExpr<'ast>,
    /// Variable name
    pub name: Ident<'ast>,
    /// Optional initializer
    pub init: Option<&'ast Expr<'ast>>,
    /// Source location
    pub span: Span,
}

/// A return statement, with or without a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    /// Optional return value
    pub value: Option<&'ast Expr<'ast>>,
    /// Source location
    pub span: Span,
}

/// A break statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakStmt {
    /// Source location
    pub span: Span,
}

/// A continue statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinueStmt {
    /// Source location
    pub span: Span,
}

/// A brace-delimited block of statements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    /// Statements in the block
    pub stmts: &'ast [Stmt<'ast>],
    /// Source location
    pub span: Span,
}

/// An if statement, with an optional else branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    /// Condition
    pub condition: &'ast Expr<'ast>,
    /// Then branch
    pub then_stmt: &'ast Stmt<'ast>,
    /// Optional else branch
    pub else_stmt: Option<&'ast Stmt<'ast>>,
    /// Source location
    pub span: Span,
}

/// A while loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    /// Condition
    pub condition: &'ast Expr<'ast>,
    /// Body
    pub body: &'ast Stmt<'ast>,
    /// Source location
    pub span: Span,
}

/// A for loop: `for (init; condition; update) body`.
///
/// All three header slots may be empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStmt<'ast> {
    /// Initializer (declaration or expression)
    pub init: Option<ForInit<'ast>>,
    /// Condition (empty means always true)
    pub condition: Option<&'ast Expr<'ast>>,
    /// Update expression
    pub update: Option<&'ast Expr<'ast>>,
    /// Body
    pub body: &'ast Stmt<'ast>,
    /// Source location
    pub span: Span,
}

/// The initializer slot of a for loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForInit<'ast> {
    /// Variable declaration scoped to the loop
    VarDecl(VarDeclStmt<'ast>),
    /// Plain expression
    Expr(&'ast Expr<'ast>),
}
