//! Statement parsing.

use super::parser::Parser;
use crate::ast::stmt::*;
use crate::lexer::TokenKind;
use seedc_core::{ParseError, ParseErrorKind};

impl<'ast> Parser<'ast> {
    /// Parse a single statement.
    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        match self.peek_kind() {
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_break(),
            TokenKind::Continue => self.parse_continue(),
            kind if kind.is_type_keyword() => Ok(Stmt::VarDecl(self.parse_var_decl()?)),
            _ => self.parse_expr_stmt(),
        }
    }

    /// Parse a brace-delimited block.
    pub(crate) fn parse_block(&mut self) -> Result<Block<'ast>, ParseError> {
        let open = self.expect(TokenKind::LeftBrace)?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            if self.at_eof() {
                return Err(ParseError::unexpected_eof(self.peek().span, "a block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        let close = self.expect(TokenKind::RightBrace)?;
        Ok(Block {
            stmts: self.alloc_slice(&stmts),
            span: open.span.merge(close.span),
        })
    }

    fn parse_if(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::If)?;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expr(0)?;
        self.expect(TokenKind::RightParen)?;

        let then = self.parse_stmt()?;
        let then_stmt = self.alloc(then);

        let else_stmt = if self.eat(TokenKind::Else) {
            let stmt = self.parse_stmt()?;
            Some(self.alloc(stmt))
        } else {
            None
        };

        let end = else_stmt.map_or(then_stmt.span(), |s| s.span());
        Ok(Stmt::If(self.alloc(IfStmt {
            condition,
            then_stmt,
            else_stmt,
            span: keyword.span.merge(end),
        })))
    }

    fn parse_while(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::While)?;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expr(0)?;
        self.expect(TokenKind::RightParen)?;

        self.loop_depth += 1;
        let body = self.parse_stmt();
        self.loop_depth -= 1;
        let body = self.alloc(body?);

        Ok(Stmt::While(self.alloc(WhileStmt {
            condition,
            body,
            span: keyword.span.merge(body.span()),
        })))
    }

    fn parse_for(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::For)?;
        self.expect(TokenKind::LeftParen)?;

        // All three header slots may be empty.
        let init = if self.eat(TokenKind::Semicolon) {
            None
        } else if self.peek_kind().is_type_keyword() {
            // parse_var_decl consumes the terminating semicolon
            Some(ForInit::VarDecl(self.parse_var_decl()?))
        } else {
            let expr = self.parse_expr(0)?;
            self.expect(TokenKind::Semicolon)?;
            Some(ForInit::Expr(expr))
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        self.expect(TokenKind::Semicolon)?;

        let update = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        self.expect(TokenKind::RightParen)?;

        self.loop_depth += 1;
        let body = self.parse_stmt();
        self.loop_depth -= 1;
        let body = self.alloc(body?);

        Ok(Stmt::For(self.alloc(ForStmt {
            init,
            condition,
            update,
            body,
            span: keyword.span.merge(body.span()),
        })))
    }

    fn parse_return(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::Return)?;
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        let semi = self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Return(ReturnStmt {
            value,
            span: keyword.span.merge(semi.span),
        }))
    }

    fn parse_break(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::Break)?;
        if self.loop_depth == 0 {
            return Err(ParseError::new(
                ParseErrorKind::OutsideLoop,
                keyword.span,
                "'break' outside of a loop",
            ));
        }
        let semi = self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Break(BreakStmt {
            span: keyword.span.merge(semi.span),
        }))
    }

    fn parse_continue(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::Continue)?;
        if self.loop_depth == 0 {
            return Err(ParseError::new(
                ParseErrorKind::OutsideLoop,
                keyword.span,
                "'continue' outside of a loop",
            ));
        }
        let semi = self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Continue(ContinueStmt {
            span: keyword.span.merge(semi.span),
        }))
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        // Bare semicolon is the empty statement.
        if self.check(TokenKind::Semicolon) {
            let semi = self.advance();
            return Ok(Stmt::Expr(ExprStmt {
                expr: None,
                span: semi.span,
            }));
        }
        let expr = self.parse_expr(0)?;
        let semi = self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Expr(ExprStmt {
            expr: Some(expr),
            span: expr.span().merge(semi.span),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    fn parse<'ast>(source: &str, arena: &'ast Bump) -> Stmt<'ast> {
        Parser::statement(source, arena).unwrap()
    }

    #[test]
    fn expression_statement() {
        let arena = Bump::new();
        let stmt = parse("x = x + 1;", &arena);
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected expression statement");
        };
        assert!(expr_stmt.expr.is_some());
    }

    #[test]
    fn empty_statement() {
        let arena = Bump::new();
        let stmt = parse(";", &arena);
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected empty statement");
        };
        assert!(expr_stmt.expr.is_none());
    }

    #[test]
    fn block_collects_statements() {
        let arena = Bump::new();
        let stmt = parse("{ int x = 1; x = 2; }", &arena);
        let Stmt::Block(block) = stmt else {
            panic!("expected block");
        };
        assert_eq!(block.stmts.len(), 2);
        assert!(matches!(block.stmts[0], Stmt::VarDecl(_)));
    }

    #[test]
    fn if_without_else() {
        let arena = Bump::new();
        let stmt = parse("if (x > 0) return x;", &arena);
        let Stmt::If(if_stmt) = stmt else {
            panic!("expected if");
        };
        assert!(if_stmt.else_stmt.is_none());
        assert!(matches!(if_stmt.then_stmt, Stmt::Return(_)));
    }

    #[test]
    fn else_attaches_to_nearest_if() {
        let arena = Bump::new();
        let stmt = parse("if (a) if (b) x = 1; else x = 2;", &arena);
        let Stmt::If(outer) = stmt else {
            panic!("expected outer if");
        };
        // The dangling else belongs to the inner if.
        assert!(outer.else_stmt.is_none());
        let Stmt::If(inner) = outer.then_stmt else {
            panic!("expected inner if");
        };
        assert!(inner.else_stmt.is_some());
    }

    #[test]
    fn while_loop_permits_break_and_continue() {
        let arena = Bump::new();
        let stmt = parse("while (1) { if (x) break; continue; }", &arena);
        assert!(matches!(stmt, Stmt::While(_)));
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let arena = Bump::new();
        // Parser::statement permits jumps, so wrap in a real unit.
        let err = Parser::parse("int main(void) { break; }", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::OutsideLoop);
    }

    #[test]
    fn continue_outside_loop_is_rejected() {
        let arena = Bump::new();
        let err = Parser::parse("int main(void) { continue; }", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::OutsideLoop);
    }

    #[test]
    fn for_loop_full_header() {
        let arena = Bump::new();
        let stmt = parse("for (int i = 0; i < 10; i = i + 1) { }", &arena);
        let Stmt::For(for_stmt) = stmt else {
            panic!("expected for");
        };
        assert!(matches!(for_stmt.init, Some(ForInit::VarDecl(_))));
        assert!(for_stmt.condition.is_some());
        assert!(for_stmt.update.is_some());
    }

    #[test]
    fn for_loop_empty_header() {
        let arena = Bump::new();
        let stmt = parse("for (;;) break;", &arena);
        let Stmt::For(for_stmt) = stmt else {
            panic!("expected for");
        };
        assert!(for_stmt.init.is_none());
        assert!(for_stmt.condition.is_none());
        assert!(for_stmt.update.is_none());
    }

    #[test]
    fn for_loop_expression_init() {
        let arena = Bump::new();
        let stmt = parse("for (i = 0; i < 3;) i = i + 1;", &arena);
        let Stmt::For(for_stmt) = stmt else {
            panic!("expected for");
        };
        assert!(matches!(for_stmt.init, Some(ForInit::Expr(_))));
        assert!(for_stmt.update.is_none());
    }

    #[test]
    fn return_with_and_without_value() {
        let arena = Bump::new();
        let with = parse("return 42;", &arena);
        let Stmt::Return(ret) = with else {
            panic!("expected return");
        };
        assert!(ret.value.is_some());

        let without = parse("return;", &arena);
        let Stmt::Return(ret) = without else {
            panic!("expected return");
        };
        assert!(ret.value.is_none());
    }

    #[test]
    fn var_decl_with_multiple_declarators() {
        let arena = Bump::new();
        let stmt = parse("int x = 1, *p = &x, y;", &arena);
        let Stmt::VarDecl(decl) = stmt else {
            panic!("expected declaration");
        };
        assert_eq!(decl.vars.len(), 3);
        assert!(decl.vars[1].ty.is_pointer());
        assert!(decl.vars[2].init.is_none());
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let arena = Bump::new();
        let err = Parser::statement("return 1", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedToken);
        assert!(err.message.contains("';'"));
    }

    #[test]
    fn unterminated_block_reports_eof() {
        let arena = Bump::new();
        let err = Parser::statement("{ x = 1;", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
    }

    #[test]
    fn missing_condition_parens_rejected() {
        let arena = Bump::new();
        let err = Parser::statement("if x > 0 return;", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedToken);
        assert!(err.message.contains("'('"));
    }
}
