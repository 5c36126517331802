//! Operator definitions for expressions.
//!
//! Provides the binary and unary operator enums along with the
//! precedence table the Pratt parser climbs.

use crate::lexer::TokenKind;
use std::fmt;

/// Binary operators, organized by precedence from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Equality (lowest)
    /// `==`
    Equal,
    /// `!=`
    NotEqual,

    // Relational
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // Additive
    /// `+`
    Add,
    /// `-`
    Sub,

    // Multiplicative (highest)
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl BinaryOp {
    /// Get the binding power for this operator.
    ///
    /// Higher values bind more tightly. Returns `(left_bp, right_bp)`;
    /// every binary operator here is left-associative, so
    /// `right_bp = left_bp + 1`.
    pub fn binding_power(&self) -> (u8, u8) {
        use BinaryOp::*;
        match self {
            Equal | NotEqual => (3, 4),
            Less | LessEqual | Greater | GreaterEqual => (5, 6),
            Add | Sub => (7, 8),
            Mul | Div | Mod => (9, 10),
        }
    }

    /// Try to convert a token kind to a binary operator.
    pub fn from_token(token: TokenKind) -> Option<Self> {
        use TokenKind::*;

        Some(match token {
            EqualEqual => BinaryOp::Equal,
            BangEqual => BinaryOp::NotEqual,
            Less => BinaryOp::Less,
            LessEqual => BinaryOp::LessEqual,
            Greater => BinaryOp::Greater,
            GreaterEqual => BinaryOp::GreaterEqual,
            Plus => BinaryOp::Add,
            Minus => BinaryOp::Sub,
            Star => BinaryOp::Mul,
            Slash => BinaryOp::Div,
            Percent => BinaryOp::Mod,
            _ => return None,
        })
    }

    /// Check if this operator produces a boolean-valued comparison.
    pub fn is_comparison(&self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let s = match self {
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
        };
        write!(f, "{}", s)
    }
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-` arithmetic negation
    Neg,
    /// `!` logical not
    LogicalNot,
    /// `*` pointer dereference
    Deref,
    /// `&` address-of
    AddrOf,
}

impl UnaryOp {
    /// Get the binding power for prefix operators.
    ///
    /// Higher than every binary operator so `-a * b` parses as
    /// `(-a) * b`.
    pub fn binding_power() -> u8 {
        11
    }

    /// Try to convert a token kind to a unary operator.
    pub fn from_token(token: TokenKind) -> Option<Self> {
        use TokenKind::*;

        Some(match token {
            Minus => UnaryOp::Neg,
            Bang => UnaryOp::LogicalNot,
            Star => UnaryOp::Deref,
            Amp => UnaryOp::AddrOf,
            _ => return None,
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use UnaryOp::*;
        let s = match self {
            Neg => "-",
            LogicalNot => "!",
            Deref => "*",
            AddrOf => "&",
        };
        write!(f, "{}", s)
    }
}
