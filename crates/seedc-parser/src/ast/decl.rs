//! Top-level declaration AST nodes.

use crate::ast::node::Ident;
use crate::ast::stmt::{Block, VarDeclStmt};
use crate::ast::types::TypeExpr;
use seedc_core::Span;

/// A top-level item in a translation unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'ast> {
    /// Function definition or prototype
    Function(FunctionDecl<'ast>),
    /// Global variable declaration
    Global(VarDeclStmt<'ast>),
}

impl<'ast> Item<'ast> {
    /// Get the span of this item.
    pub fn span(&self) -> Span {
        match self {
            Self::Function(d) => d.span,
            Self::Global(d) => d.span,
        }
    }
}

/// A function definition or prototype.
///
/// - `int add(int a, int b) { ... }` is a definition
/// - `int add(int a, int b);` is a prototype (`body` is `None`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionDecl<'ast> {
    /// Return type
    pub return_type: TypeExpr<'ast>,
    /// Function name
    pub name: Ident<'ast>,
    /// Parameters in declaration order
    pub params: &'ast [Param<'ast>],
    /// Body (`None` for prototypes)
    pub body: Option<Block<'ast>>,
    /// Source location
    pub span: Span,
}

impl<'ast> FunctionDecl<'ast> {
    /// Check if this declaration carries a body.
    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }

    /// Check if this function produces a value.
    pub fn returns_value(&self) -> bool {
        !self.return_type.is_void()
    }
}

/// A function parameter.
///
/// The name is optional so prototypes may write `int add(int, int);`;
/// a definition must name every parameter, which the parser enforces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'ast> {
    /// Parameter type
    pub ty: TypeExpr<'ast>,
    /// Parameter name (absent only in prototypes)
    pub name: Option<Ident<'ast>>,
    /// Source location
    pub span: Span,
}
