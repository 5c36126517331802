//! Declaration parsing: translation units, functions, globals, types.
//!
//! Functions and globals both start with `type *... name`, so the
//! item parser commits only at the token after the name: `(` means a
//! function, anything else continues as a global declarator list.

use super::parser::Parser;
use crate::ast::TranslationUnit;
use crate::ast::decl::{FunctionDecl, Item, Param};
use crate::ast::node::Ident;
use crate::ast::stmt::{VarDeclStmt, VarDeclarator};
use crate::ast::types::{ArrayType, TypeDesc, TypeExpr};
use crate::lexer::TokenKind;
use seedc_core::{ParseError, ParseErrorKind};

impl<'ast> Parser<'ast> {
    /// Parse the whole token stream as a translation unit.
    pub(crate) fn parse_translation_unit(
        &mut self,
    ) -> Result<TranslationUnit<'ast>, ParseError> {
        let start = self.peek().span;
        let mut items = Vec::new();
        while !self.at_eof() {
            items.push(self.parse_item()?);
        }
        let span = match (items.first(), items.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => start,
        };
        Ok(TranslationUnit::new(self.alloc_slice(&items), span))
    }

    fn parse_item(&mut self) -> Result<Item<'ast>, ParseError> {
        let base = self.parse_base_type()?;
        let ty = self.parse_pointer_suffix(base);
        let name_token = self.expect_identifier()?;
        let name = Ident::new(name_token.lexeme, name_token.span);

        if self.check(TokenKind::LeftParen) {
            Ok(Item::Function(self.parse_function_rest(ty, name)?))
        } else {
            Ok(Item::Global(self.parse_global_rest(base, ty, name)?))
        }
    }

    /// Parse the remainder of a function after `return_type name`.
    fn parse_function_rest(
        &mut self,
        return_type: TypeExpr<'ast>,
        name: Ident<'ast>,
    ) -> Result<FunctionDecl<'ast>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RightParen)?;

        // Prototype: `int add(int a, int b);`
        if self.check(TokenKind::Semicolon) {
            let semi = self.advance();
            return Ok(FunctionDecl {
                return_type,
                name,
                params,
                body: None,
                span: return_type.span.merge(semi.span),
            });
        }

        // A definition must name every parameter.
        for (index, param) in params.iter().enumerate() {
            if param.name.is_none() {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidSyntax,
                    param.span,
                    format!(
                        "parameter {} of '{}' needs a name in a definition",
                        index + 1,
                        name.name
                    ),
                ));
            }
        }

        let body = self.parse_block()?;
        let span = return_type.span.merge(body.span);
        Ok(FunctionDecl {
            return_type,
            name,
            params,
            body: Some(body),
            span,
        })
    }

    /// Parse a parameter list (the parentheses are handled by the
    /// caller). `(void)` is the explicit empty list.
    fn parse_params(&mut self) -> Result<&'ast [Param<'ast>], ParseError> {
        if self.check(TokenKind::RightParen) {
            return Ok(&[]);
        }
        if self.check(TokenKind::Void) && self.peek_nth(1).is(TokenKind::RightParen) {
            self.advance();
            return Ok(&[]);
        }

        let mut params = Vec::new();
        loop {
            let base = self.parse_base_type()?;
            let ty = self.parse_pointer_suffix(base);
            let name = if self.check(TokenKind::Identifier) {
                let token = self.advance();
                Some(Ident::new(token.lexeme, token.span))
            } else {
                None
            };
            if ty.is_void() {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidSyntax,
                    name.map_or(ty.span, |n| n.span),
                    "parameter declared void",
                ));
            }
            let end = name.map_or(ty.span, |n| n.span);
            params.push(Param {
                ty,
                name,
                span: ty.span.merge(end),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(self.alloc_slice(&params))
    }

    /// Parse the remainder of a global after the first `type name`.
    fn parse_global_rest(
        &mut self,
        base: TypeExpr<'ast>,
        first_ty: TypeExpr<'ast>,
        first_name: Ident<'ast>,
    ) -> Result<VarDeclStmt<'ast>, ParseError> {
        let mut vars = vec![self.finish_declarator(first_ty, first_name)?];
        while self.eat(TokenKind::Comma) {
            let ty = self.parse_pointer_suffix(base);
            let name_token = self.expect_identifier()?;
            let name = Ident::new(name_token.lexeme, name_token.span);
            vars.push(self.finish_declarator(ty, name)?);
        }
        let semi = self.expect(TokenKind::Semicolon)?;
        Ok(VarDeclStmt {
            base,
            vars: self.alloc_slice(&vars),
            span: base.span.merge(semi.span),
        })
    }

    /// Parse a variable declaration statement, consuming the
    /// terminating semicolon.
    pub(crate) fn parse_var_decl(&mut self) -> Result<VarDeclStmt<'ast>, ParseError> {
        let base = self.parse_base_type()?;
        let mut vars = Vec::new();
        loop {
            let ty = self.parse_pointer_suffix(base);
            let name_token = self.expect_identifier()?;
            let name = Ident::new(name_token.lexeme, name_token.span);
            vars.push(self.finish_declarator(ty, name)?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let semi = self.expect(TokenKind::Semicolon)?;
        Ok(VarDeclStmt {
            base,
            vars: self.alloc_slice(&vars),
            span: base.span.merge(semi.span),
        })
    }

    // ===== Types =====

    /// Parse the `int`/`char`/`void` base of a declaration.
    pub(crate) fn parse_base_type(&mut self) -> Result<TypeExpr<'ast>, ParseError> {
        let token = self.peek();
        let desc = match token.kind {
            TokenKind::Int => TypeDesc::Int,
            TokenKind::Char => TypeDesc::Char,
            TokenKind::Void => TypeDesc::Void,
            _ => {
                return Err(ParseError::expected_type(
                    token.span,
                    token.kind.description(),
                ));
            }
        };
        self.advance();
        Ok(TypeExpr::new(desc, token.span))
    }

    /// Apply any `*` derivations to a base type.
    pub(crate) fn parse_pointer_suffix(&mut self, base: TypeExpr<'ast>) -> TypeExpr<'ast> {
        let mut ty = base;
        while self.check(TokenKind::Star) {
            let star = self.advance();
            let inner = self.alloc(ty.desc);
            ty = TypeExpr::new(TypeDesc::Pointer(inner), ty.span.merge(star.span));
        }
        ty
    }

    /// Finish a declarator after its name: optional `[N]` array
    /// suffix, the void check, and an optional initializer.
    fn finish_declarator(
        &mut self,
        ty: TypeExpr<'ast>,
        name: Ident<'ast>,
    ) -> Result<VarDeclarator<'ast>, ParseError> {
        let mut ty = ty;
        if self.eat(TokenKind::LeftBracket) {
            let len_token = self.expect(TokenKind::IntLiteral)?;
            let length = len_token.lexeme.parse::<u32>().map_err(|_| {
                ParseError::new(
                    ParseErrorKind::InvalidLiteral,
                    len_token.span,
                    format!("array length '{}' out of range", len_token.lexeme),
                )
            })?;
            let close = self.expect(TokenKind::RightBracket)?;
            ty = TypeExpr::new(
                TypeDesc::Array(self.alloc(ArrayType {
                    element: ty.desc,
                    length,
                })),
                ty.span.merge(close.span),
            );
        }

        if ty.is_void() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidSyntax,
                name.span,
                format!("variable '{}' declared void", name.name),
            ));
        }

        let init = if self.eat(TokenKind::Equal) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        let end = init.map_or(name.span, |e| e.span());
        Ok(VarDeclarator {
            ty,
            name,
            init,
            span: ty.span.merge(end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    #[test]
    fn function_definition() {
        let arena = Bump::new();
        let unit = Parser::parse("int add(int a, int b) { return a + b; }", &arena).unwrap();
        assert_eq!(unit.items().len(), 1);
        let Item::Function(func) = &unit.items()[0] else {
            panic!("expected function");
        };
        assert_eq!(func.name.name, "add");
        assert_eq!(func.params.len(), 2);
        assert!(func.is_definition());
        assert!(func.returns_value());
    }

    #[test]
    fn function_prototype() {
        let arena = Bump::new();
        let unit = Parser::parse("int put_char(int c);", &arena).unwrap();
        let Item::Function(func) = &unit.items()[0] else {
            panic!("expected function");
        };
        assert!(!func.is_definition());
        assert_eq!(func.params.len(), 1);
    }

    #[test]
    fn prototype_params_may_be_unnamed() {
        let arena = Bump::new();
        let unit = Parser::parse("int add(int, int);", &arena).unwrap();
        let Item::Function(func) = &unit.items()[0] else {
            panic!("expected function");
        };
        assert!(func.params.iter().all(|p| p.name.is_none()));
    }

    #[test]
    fn definition_requires_named_params() {
        let arena = Bump::new();
        let err = Parser::parse("int add(int, int b) { return b; }", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidSyntax);
        assert!(err.message.contains("parameter 1"));
        assert!(err.message.contains("add"));
    }

    #[test]
    fn main_void_idiom() {
        let arena = Bump::new();
        let unit = Parser::parse("int main(void) { return 0; }", &arena).unwrap();
        let Item::Function(func) = &unit.items()[0] else {
            panic!("expected function");
        };
        assert_eq!(func.name.name, "main");
        assert!(func.params.is_empty());
    }

    #[test]
    fn pointer_return_type() {
        let arena = Bump::new();
        let unit = Parser::parse("char *name(void);", &arena).unwrap();
        let Item::Function(func) = &unit.items()[0] else {
            panic!("expected function");
        };
        assert!(func.return_type.is_pointer());
    }

    #[test]
    fn global_with_declarator_list() {
        let arena = Bump::new();
        let unit = Parser::parse("int counter = 0, limit = 100;", &arena).unwrap();
        let Item::Global(decl) = &unit.items()[0] else {
            panic!("expected global");
        };
        assert_eq!(decl.vars.len(), 2);
        assert_eq!(decl.vars[0].name.name, "counter");
        assert_eq!(decl.vars[1].name.name, "limit");
    }

    #[test]
    fn global_array_declarator() {
        let arena = Bump::new();
        let unit = Parser::parse("char buffer[256];", &arena).unwrap();
        let Item::Global(decl) = &unit.items()[0] else {
            panic!("expected global");
        };
        let TypeDesc::Array(array) = decl.vars[0].ty.desc else {
            panic!("expected array type");
        };
        assert_eq!(array.length, 256);
        assert_eq!(array.element, TypeDesc::Char);
    }

    #[test]
    fn pointer_binds_per_declarator() {
        let arena = Bump::new();
        let unit = Parser::parse("int *p, q;", &arena).unwrap();
        let Item::Global(decl) = &unit.items()[0] else {
            panic!("expected global");
        };
        assert!(decl.vars[0].ty.is_pointer());
        assert!(!decl.vars[1].ty.is_pointer());
    }

    #[test]
    fn mixed_functions_and_globals() {
        let arena = Bump::new();
        let source = r#"
            int limit = 10;

            int double_it(int x) {
                return x * 2;
            }

            int main(void) {
                return double_it(limit);
            }
        "#;
        let unit = Parser::parse(source, &arena).unwrap();
        assert_eq!(unit.items().len(), 3);
        assert!(matches!(unit.items()[0], Item::Global(_)));
        assert!(matches!(unit.items()[1], Item::Function(_)));
        assert!(matches!(unit.items()[2], Item::Function(_)));
    }

    #[test]
    fn empty_source_is_an_empty_unit() {
        let arena = Bump::new();
        let unit = Parser::parse("", &arena).unwrap();
        assert!(unit.items().is_empty());
    }

    #[test]
    fn void_variable_is_rejected() {
        let arena = Bump::new();
        let err = Parser::parse("void x;", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidSyntax);
        assert!(err.message.contains("declared void"));
    }

    #[test]
    fn void_pointer_variable_is_allowed() {
        let arena = Bump::new();
        let unit = Parser::parse("void *p;", &arena).unwrap();
        let Item::Global(decl) = &unit.items()[0] else {
            panic!("expected global");
        };
        assert!(decl.vars[0].ty.is_pointer());
    }

    #[test]
    fn void_parameter_is_rejected() {
        let arena = Bump::new();
        let err = Parser::parse("int f(void x);", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidSyntax);
        assert!(err.message.contains("parameter declared void"));
    }

    #[test]
    fn item_must_start_with_a_type() {
        let arena = Bump::new();
        let err = Parser::parse("main() { }", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedType);
    }

    #[test]
    fn missing_initializer_expression() {
        let arena = Bump::new();
        let err = Parser::parse("int x = ;", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedExpression);
    }

    #[test]
    fn global_initializer_may_be_any_expression() {
        let arena = Bump::new();
        let unit = Parser::parse("int x = 2 + 3 * 4;", &arena).unwrap();
        let Item::Global(decl) = &unit.items()[0] else {
            panic!("expected global");
        };
        assert!(decl.vars[0].init.is_some());
    }
}
