//! Algebraic identities with a constant right operand.
//!
//! Only the right-operand forms apply: `x * 1`, `x * 0` and `x + 0`.
//! The mirrored left-operand forms (`0 + x`, `1 * x`) stay as written,
//! keeping the rewrite set small and the pass trivially order-stable.

use seedc_parser::ast::BinaryOp;

/// How a binary node is simplified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rewrite {
    /// Replace the node with its left operand.
    KeepLeft,
    /// Replace the node with the constant zero.
    Zero,
}

/// Match a binary operation against the identity table.
///
/// `rhs` is the right operand's constant value, if it has one.
pub(crate) fn binary(op: BinaryOp, rhs: Option<i64>) -> Option<Rewrite> {
    match (op, rhs?) {
        (BinaryOp::Mul, 1) => Some(Rewrite::KeepLeft),
        (BinaryOp::Mul, 0) => Some(Rewrite::Zero),
        (BinaryOp::Add, 0) => Some(Rewrite::KeepLeft),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_by_one_keeps_left() {
        assert_eq!(binary(BinaryOp::Mul, Some(1)), Some(Rewrite::KeepLeft));
    }

    #[test]
    fn multiply_by_zero_is_zero() {
        assert_eq!(binary(BinaryOp::Mul, Some(0)), Some(Rewrite::Zero));
    }

    #[test]
    fn add_zero_keeps_left() {
        assert_eq!(binary(BinaryOp::Add, Some(0)), Some(Rewrite::KeepLeft));
    }

    #[test]
    fn other_shapes_stay() {
        assert_eq!(binary(BinaryOp::Add, Some(1)), None);
        assert_eq!(binary(BinaryOp::Sub, Some(0)), None);
        assert_eq!(binary(BinaryOp::Div, Some(1)), None);
        assert_eq!(binary(BinaryOp::Mul, None), None);
    }
}
