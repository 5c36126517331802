//! Expression AST nodes.
//!
//! Expressions are a closed sum. Leaf variants are stored inline;
//! anything with children holds an `&'ast` reference to a node struct
//! in the same arena. Every node carries its `Span`.

use crate::ast::node::Ident;
use crate::ast::ops::{BinaryOp, UnaryOp};
use seedc_core::Span;

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    /// Literal constant
    Literal(LiteralExpr<'ast>),
    /// Variable reference
    Ident(IdentExpr<'ast>),
    /// Binary operation
    Binary(&'ast BinaryExpr<'ast>),
    /// Unary prefix operation
    Unary(&'ast UnaryExpr<'ast>),
    /// Assignment
    Assign(&'ast AssignExpr<'ast>),
    /// Function call
    Call(&'ast CallExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Ident(e) => e.span,
            Self::Binary(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Assign(e) => e.span,
            Self::Call(e) => e.span,
        }
    }

    /// The integer value if this is an integer or character constant.
    ///
    /// Character constants count: `'A'` behaves as the integer 65
    /// everywhere an integer is accepted.
    pub fn as_int_const(&self) -> Option<i64> {
        match self {
            Self::Literal(lit) => match lit.kind {
                LiteralKind::Int(v) => Some(v),
                LiteralKind::Char(c) => Some(i64::from(c)),
                LiteralKind::Str(_) => None,
            },
            _ => None,
        }
    }
}

/// A literal constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    /// The constant value
    pub kind: LiteralKind<'ast>,
    /// Source location
    pub span: Span,
}

/// The value of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind<'ast> {
    /// Decimal integer constant
    Int(i64),
    /// Character constant, escape sequences already decoded
    Char(u8),
    /// String constant, escape sequences already decoded
    Str(&'ast str),
}

/// A variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentExpr<'ast> {
    /// The referenced name
    pub ident: Ident<'ast>,
    /// Source location
    pub span: Span,
}

/// A binary operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    /// Left operand
    pub left: &'ast Expr<'ast>,
    /// Operator
    pub op: BinaryOp,
    /// Right operand
    pub right: &'ast Expr<'ast>,
    /// Source location
    pub span: Span,
}

/// A unary prefix operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    /// Operator
    pub op: UnaryOp,
    /// Operand
    pub operand: &'ast Expr<'ast>,
    /// Source location
    pub span: Span,
}

/// An assignment expression. Right-associative: `a = b = c` assigns
/// `c` to `b`, then that value to `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignExpr<'ast> {
    /// Left-hand side (target)
    pub target: &'ast Expr<'ast>,
    /// Right-hand side (value)
    pub value: &'ast Expr<'ast>,
    /// Source location
    pub span: Span,
}

/// A function call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    /// The expression being called
    pub callee: &'ast Expr<'ast>,
    /// Arguments in source order
    pub args: &'ast [Expr<'ast>],
    /// Source location
    pub span: Span,
}

impl<'ast> CallExpr<'ast> {
    /// The called function's name if the callee is a plain identifier.
    pub fn callee_name(&self) -> Option<&'ast str> {
        match self.callee {
            Expr::Ident(ident) => Some(ident.ident.name),
            _ => None,
        }
    }
}
