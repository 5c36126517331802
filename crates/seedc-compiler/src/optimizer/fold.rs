//! Constant folding over integer operands.
//!
//! Arithmetic wraps on overflow, matching the virtual machine's register
//! semantics, so a folded program and an interpreted one agree bit for
//! bit. Division and modulo by a literal zero are never folded; the
//! division stays in the tree and faults at run time like any other.

use seedc_parser::ast::{BinaryOp, UnaryOp};

/// Fold a binary operation over two integer constants.
///
/// Comparisons fold to `1` or `0`. Returns `None` when the operation
/// cannot be folded (division or modulo by zero).
pub(crate) fn binary(op: BinaryOp, lhs: i64, rhs: i64) -> Option<i64> {
    let value = match op {
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::Div => {
            if rhs == 0 {
                return None;
            }
            lhs.wrapping_div(rhs)
        }
        BinaryOp::Mod => {
            if rhs == 0 {
                return None;
            }
            lhs.wrapping_rem(rhs)
        }
        BinaryOp::Equal => (lhs == rhs) as i64,
        BinaryOp::NotEqual => (lhs != rhs) as i64,
        BinaryOp::Less => (lhs < rhs) as i64,
        BinaryOp::LessEqual => (lhs <= rhs) as i64,
        BinaryOp::Greater => (lhs > rhs) as i64,
        BinaryOp::GreaterEqual => (lhs >= rhs) as i64,
    };
    Some(value)
}

/// Fold a unary operation over an integer constant.
///
/// Pointer operations never fold.
pub(crate) fn unary(op: UnaryOp, value: i64) -> Option<i64> {
    match op {
        UnaryOp::Neg => Some(value.wrapping_neg()),
        UnaryOp::LogicalNot => Some((value == 0) as i64),
        UnaryOp::Deref | UnaryOp::AddrOf => None,
    }
}
