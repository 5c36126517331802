//! Dead code detection helpers.

use seedc_parser::ast::Stmt;

/// Length of the reachable prefix of a statement list, if anything
/// follows the first statement that unconditionally transfers control.
///
/// Returns `None` when every statement is reachable (no terminator, or
/// the terminator is already last).
pub(crate) fn live_prefix(stmts: &[Stmt<'_>]) -> Option<usize> {
    let first = stmts.iter().position(Stmt::is_terminator)?;
    if first + 1 < stmts.len() {
        Some(first + 1)
    } else {
        None
    }
}
