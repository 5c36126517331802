//! Parser state and entry points.

use bumpalo::Bump;
use seedc_core::ParseError;

use crate::ast::TranslationUnit;
use crate::ast::expr::Expr;
use crate::ast::stmt::Stmt;
use crate::lexer::{Lexer, Token, TokenKind};

/// Recursive-descent parser over a token stream.
///
/// The parser owns the token vector and allocates every node into the
/// caller's arena. Parsing aborts at the first unrecoverable mismatch:
/// the result is either a complete tree or a single [`ParseError`],
/// never a partial tree.
pub struct Parser<'ast> {
    tokens: Vec<Token<'ast>>,
    pos: usize,
    pub(crate) arena: &'ast Bump,
    /// Loop nesting depth, for break/continue validation.
    pub(crate) loop_depth: u32,
}

impl<'ast> Parser<'ast> {
    /// Parse a whole translation unit.
    pub fn parse(source: &str, arena: &'ast Bump) -> Result<TranslationUnit<'ast>, ParseError> {
        let mut parser = Self::new(source, arena);
        parser.parse_translation_unit()
    }

    /// Parse a single expression. Trailing input is an error.
    pub fn expression(source: &str, arena: &'ast Bump) -> Result<&'ast Expr<'ast>, ParseError> {
        let mut parser = Self::new(source, arena);
        let expr = parser.parse_expr(0)?;
        parser.expect_eof()?;
        Ok(expr)
    }

    /// Parse a single statement. Trailing input is an error.
    pub fn statement(source: &str, arena: &'ast Bump) -> Result<Stmt<'ast>, ParseError> {
        let mut parser = Self::new(source, arena);
        // Standalone statements may use break/continue freely.
        parser.loop_depth = 1;
        let stmt = parser.parse_stmt()?;
        parser.expect_eof()?;
        Ok(stmt)
    }

    fn new(source: &str, arena: &'ast Bump) -> Self {
        Self {
            tokens: Lexer::tokenize(source, arena),
            pos: 0,
            arena,
            loop_depth: 0,
        }
    }

    // ===== Token stream primitives =====

    /// The current token. Reading past the end keeps returning `Eof`.
    pub(crate) fn peek(&self) -> Token<'ast> {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Look `n` tokens ahead (`0` is the current token).
    pub(crate) fn peek_nth(&self, n: usize) -> Token<'ast> {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// Consume and return the current token. At the end of input the
    /// `Eof` token is returned without moving.
    pub(crate) fn advance(&mut self) -> Token<'ast> {
        let token = self.peek();
        if !self.at_eof() {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind or fail with an
    /// expected/found error.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek();
            Err(ParseError::expected_token(
                found.span,
                kind.description(),
                found.kind.description(),
            ))
        }
    }

    /// Consume an identifier or fail.
    pub(crate) fn expect_identifier(&mut self) -> Result<Token<'ast>, ParseError> {
        let token = self.peek();
        if token.is(TokenKind::Identifier) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected_identifier(
                token.span,
                token.kind.description(),
            ))
        }
    }

    /// Require that the whole input was consumed.
    pub(crate) fn expect_eof(&self) -> Result<(), ParseError> {
        let token = self.peek();
        if token.is(TokenKind::Eof) {
            Ok(())
        } else {
            Err(ParseError::unexpected_token(
                token.span,
                token.kind.description(),
            ))
        }
    }

    // ===== Arena helpers =====

    pub(crate) fn alloc<T>(&self, value: T) -> &'ast T {
        self.arena.alloc(value)
    }

    pub(crate) fn alloc_slice<T: Copy>(&self, items: &[T]) -> &'ast [T] {
        self.arena.alloc_slice_copy(items)
    }

    pub(crate) fn alloc_str(&self, text: &str) -> &'ast str {
        self.arena.alloc_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedc_core::ParseErrorKind;

    #[test]
    fn peek_past_end_stays_on_eof() {
        let arena = Bump::new();
        let mut parser = Parser::new("x", &arena);
        parser.advance();
        assert!(parser.at_eof());
        parser.advance();
        parser.advance();
        assert!(parser.at_eof());
        assert_eq!(parser.peek_nth(5).kind, TokenKind::Eof);
    }

    #[test]
    fn expect_reports_expected_and_found() {
        let arena = Bump::new();
        let mut parser = Parser::new("42", &arena);
        let err = parser.expect(TokenKind::Semicolon).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedToken);
        assert!(err.to_string().contains("';'"));
        assert!(err.to_string().contains("integer literal"));
    }

    #[test]
    fn expression_rejects_trailing_input() {
        let arena = Bump::new();
        let err = Parser::expression("1 + 2 3", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
    }
}
