//! Lexer for the C source subset.
//!
//! This module provides:
//! - [`Cursor`]: low-level character scanning with position tracking
//! - [`Token`] / [`TokenKind`]: the token vocabulary
//! - [`Lexer`]: the scanner itself
//!
//! The lexer is total. Anything it cannot recognize becomes an
//! [`TokenKind::Unknown`] token and the parser reports it with a span,
//! so malformed input never panics the front end.
//!
//! [`Cursor`]: cursor::Cursor

mod cursor;
mod lexer;
mod token;

pub use lexer::Lexer;
pub use token::{Token, TokenKind, lookup_keyword, unescape};
