//! Expression parsing using Pratt parsing (precedence climbing).
//!
//! Assignment is right-associative and binds loosest; the binary
//! tiers climb equality < relational < additive < multiplicative;
//! unary prefix operators bind tighter than any binary operator and
//! the postfix call tighter still.

use super::parser::Parser;
use crate::ast::expr::*;
use crate::ast::node::Ident;
use crate::ast::ops::{BinaryOp, UnaryOp};
use crate::lexer::{TokenKind, unescape};
use seedc_core::{ParseError, ParseErrorKind};

/// Binding power of `=`: right-associative (right side binds looser
/// than the left), below every binary tier.
const ASSIGN_BP: (u8, u8) = (2, 1);

/// Binding power of the postfix call, above every prefix operator.
const CALL_BP: u8 = 13;

impl<'ast> Parser<'ast> {
    /// Parse an expression with a minimum binding power.
    ///
    /// This is the core of the Pratt parser: it only consumes
    /// operators whose left binding power is at least `min_bp`.
    pub(crate) fn parse_expr(&mut self, min_bp: u8) -> Result<&'ast Expr<'ast>, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            // Postfix call
            if self.check(TokenKind::LeftParen) {
                if CALL_BP < min_bp {
                    break;
                }
                lhs = self.parse_call(lhs)?;
                continue;
            }

            // Assignment
            if self.check(TokenKind::Equal) {
                let (l_bp, r_bp) = ASSIGN_BP;
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                check_assign_target(lhs)?;
                let value = self.parse_expr(r_bp)?;
                let span = lhs.span().merge(value.span());
                lhs = self.alloc(Expr::Assign(self.alloc(AssignExpr {
                    target: lhs,
                    value,
                    span,
                })));
                continue;
            }

            // Binary operators
            if let Some(op) = BinaryOp::from_token(self.peek_kind()) {
                let (l_bp, r_bp) = op.binding_power();
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let rhs = self.parse_expr(r_bp)?;
                let span = lhs.span().merge(rhs.span());
                lhs = self.alloc(Expr::Binary(self.alloc(BinaryExpr {
                    left: lhs,
                    op,
                    right: rhs,
                    span,
                })));
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    /// Parse a prefix expression (the start of an expression).
    fn parse_prefix(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let token = self.peek();

        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    ParseError::new(
                        ParseErrorKind::InvalidLiteral,
                        token.span,
                        format!("integer literal '{}' out of range", token.lexeme),
                    )
                })?;
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind: LiteralKind::Int(value),
                    span: token.span,
                })))
            }

            TokenKind::FloatLiteral => Err(ParseError::new(
                ParseErrorKind::InvalidLiteral,
                token.span,
                format!("float literal '{}' is not supported", token.lexeme),
            )),

            TokenKind::CharLiteral => {
                self.advance();
                let decoded = unescape(trim_quotes(token.lexeme));
                let mut bytes = decoded.bytes();
                match (bytes.next(), bytes.next()) {
                    (Some(value), None) => Ok(self.alloc(Expr::Literal(LiteralExpr {
                        kind: LiteralKind::Char(value),
                        span: token.span,
                    }))),
                    _ => Err(ParseError::new(
                        ParseErrorKind::InvalidLiteral,
                        token.span,
                        format!(
                            "character literal {} must hold exactly one byte",
                            token.lexeme
                        ),
                    )),
                }
            }

            TokenKind::StringLiteral => {
                self.advance();
                let decoded = unescape(trim_quotes(token.lexeme));
                let text = self.alloc_str(&decoded);
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind: LiteralKind::Str(text),
                    span: token.span,
                })))
            }

            TokenKind::Identifier => {
                self.advance();
                Ok(self.alloc(Expr::Ident(IdentExpr {
                    ident: Ident::new(token.lexeme, token.span),
                    span: token.span,
                })))
            }

            // Parenthesized expression; no separate grouping node.
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }

            _ => {
                if let Some(op) = UnaryOp::from_token(token.kind) {
                    self.advance();
                    let operand = self.parse_expr(UnaryOp::binding_power())?;
                    let span = token.span.merge(operand.span());
                    return Ok(self.alloc(Expr::Unary(self.alloc(UnaryExpr {
                        op,
                        operand,
                        span,
                    }))));
                }
                if token.is(TokenKind::Eof) {
                    Err(ParseError::unexpected_eof(token.span, "an expression"))
                } else {
                    Err(ParseError::expected_expression(
                        token.span,
                        token.kind.description(),
                    ))
                }
            }
        }
    }

    /// Parse a call's argument list after the callee.
    fn parse_call(&mut self, callee: &'ast Expr<'ast>) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(*self.parse_expr(0)?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RightParen)?;
        let span = callee.span().merge(close.span);
        Ok(self.alloc(Expr::Call(self.alloc(CallExpr {
            callee,
            args: self.alloc_slice(&args),
            span,
        }))))
    }
}

/// Only identifiers and dereferences may be assigned to.
fn check_assign_target(target: &Expr<'_>) -> Result<(), ParseError> {
    match target {
        Expr::Ident(_) => Ok(()),
        Expr::Unary(unary) if unary.op == UnaryOp::Deref => Ok(()),
        _ => Err(ParseError::new(
            ParseErrorKind::InvalidSyntax,
            target.span(),
            "invalid assignment target",
        )),
    }
}

/// Strip the delimiting quotes from a literal lexeme.
fn trim_quotes(lexeme: &str) -> &str {
    &lexeme[1..lexeme.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    fn parse<'ast>(source: &str, arena: &'ast Bump) -> &'ast Expr<'ast> {
        Parser::expression(source, arena).unwrap()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let arena = Bump::new();
        let expr = parse("1 + 2 * 3", &arena);
        let Expr::Binary(add) = expr else {
            panic!("expected binary add at the root");
        };
        assert_eq!(add.op, BinaryOp::Add);
        let Expr::Binary(mul) = add.right else {
            panic!("expected the product on the right");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
    }

    #[test]
    fn same_tier_is_left_associative() {
        let arena = Bump::new();
        let expr = parse("10 - 4 - 3", &arena);
        let Expr::Binary(outer) = expr else {
            panic!("expected binary root");
        };
        assert_eq!(outer.op, BinaryOp::Sub);
        // ((10 - 4) - 3): the left child is the first subtraction.
        assert!(matches!(outer.left, Expr::Binary(_)));
        assert_eq!(outer.right.as_int_const(), Some(3));
    }

    #[test]
    fn comparison_binds_looser_than_arithmetic() {
        let arena = Bump::new();
        let expr = parse("a + 1 < b * 2", &arena);
        let Expr::Binary(cmp) = expr else {
            panic!("expected comparison at the root");
        };
        assert_eq!(cmp.op, BinaryOp::Less);
        assert!(matches!(cmp.left, Expr::Binary(_)));
        assert!(matches!(cmp.right, Expr::Binary(_)));
    }

    #[test]
    fn equality_binds_looser_than_relational() {
        let arena = Bump::new();
        let expr = parse("a < b == c > d", &arena);
        let Expr::Binary(eq) = expr else {
            panic!("expected equality at the root");
        };
        assert_eq!(eq.op, BinaryOp::Equal);
    }

    #[test]
    fn assignment_is_right_associative() {
        let arena = Bump::new();
        let expr = parse("a = b = 5", &arena);
        let Expr::Assign(outer) = expr else {
            panic!("expected assignment at the root");
        };
        assert!(matches!(outer.target, Expr::Ident(_)));
        assert!(matches!(outer.value, Expr::Assign(_)));
    }

    #[test]
    fn assignment_target_must_be_lvalue() {
        let arena = Bump::new();
        let err = Parser::expression("1 + 2 = 3", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidSyntax);
        assert!(err.message.contains("assignment target"));
    }

    #[test]
    fn deref_assignment_is_allowed() {
        let arena = Bump::new();
        let expr = parse("*p = 7", &arena);
        let Expr::Assign(assign) = expr else {
            panic!("expected assignment");
        };
        let Expr::Unary(deref) = assign.target else {
            panic!("expected deref target");
        };
        assert_eq!(deref.op, UnaryOp::Deref);
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        let arena = Bump::new();
        let expr = parse("-a * b", &arena);
        let Expr::Binary(mul) = expr else {
            panic!("expected product at the root");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
        assert!(matches!(mul.left, Expr::Unary(_)));
    }

    #[test]
    fn nested_unary_operators() {
        let arena = Bump::new();
        let expr = parse("!!ok", &arena);
        let Expr::Unary(outer) = expr else {
            panic!("expected unary root");
        };
        assert_eq!(outer.op, UnaryOp::LogicalNot);
        assert!(matches!(outer.operand, Expr::Unary(_)));
    }

    #[test]
    fn address_of_parses() {
        let arena = Bump::new();
        let expr = parse("&x", &arena);
        let Expr::Unary(unary) = expr else {
            panic!("expected unary root");
        };
        assert_eq!(unary.op, UnaryOp::AddrOf);
    }

    #[test]
    fn call_with_arguments() {
        let arena = Bump::new();
        let expr = parse("add(1, 2 + 3, x)", &arena);
        let Expr::Call(call) = expr else {
            panic!("expected call");
        };
        assert_eq!(call.callee_name(), Some("add"));
        assert_eq!(call.args.len(), 3);
        assert!(matches!(call.args[1], Expr::Binary(_)));
    }

    #[test]
    fn call_binds_tighter_than_unary() {
        let arena = Bump::new();
        let expr = parse("-f(1)", &arena);
        let Expr::Unary(neg) = expr else {
            panic!("expected negation at the root");
        };
        assert_eq!(neg.op, UnaryOp::Neg);
        assert!(matches!(neg.operand, Expr::Call(_)));
    }

    #[test]
    fn parentheses_override_precedence() {
        let arena = Bump::new();
        let expr = parse("(1 + 2) * 3", &arena);
        let Expr::Binary(mul) = expr else {
            panic!("expected product at the root");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
        assert!(matches!(mul.left, Expr::Binary(_)));
    }

    #[test]
    fn char_literal_decodes_escapes() {
        let arena = Bump::new();
        let expr = parse(r"'\n'", &arena);
        assert_eq!(expr.as_int_const(), Some(10));
    }

    #[test]
    fn string_literal_decodes_escapes() {
        let arena = Bump::new();
        let expr = parse(r#""a\tb""#, &arena);
        let Expr::Literal(lit) = expr else {
            panic!("expected literal");
        };
        assert_eq!(lit.kind, LiteralKind::Str("a\tb"));
    }

    #[test]
    fn float_literal_is_rejected() {
        let arena = Bump::new();
        let err = Parser::expression("1.5 + 2", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidLiteral);
        assert!(err.message.contains("1.5"));
    }

    #[test]
    fn wide_char_literal_is_rejected() {
        let arena = Bump::new();
        let err = Parser::expression("'ab'", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidLiteral);
    }

    #[test]
    fn incomplete_expression_reports_eof() {
        let arena = Bump::new();
        let err = Parser::expression("1 +", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
    }

    #[test]
    fn stray_operator_reports_expected_expression() {
        let arena = Bump::new();
        let err = Parser::expression("/ 2", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedExpression);
    }

    #[test]
    fn huge_integer_literal_is_rejected() {
        let arena = Bump::new();
        let err = Parser::expression("99999999999999999999", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidLiteral);
        assert!(err.message.contains("out of range"));
    }
}
