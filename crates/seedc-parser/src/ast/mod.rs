//! Abstract Syntax Tree (AST) for the C subset.
//!
//! This module provides:
//! - AST node definitions for expressions, statements and declarations
//! - Recursive-descent parser for transforming tokens into AST
//! - Operator precedence tables for the Pratt expression parser
//!
//! # Example
//!
//! ```
//! use seedc_parser::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     int square(int x) {
//!         return x * x;
//!     }
//! "#;
//!
//! match Parser::parse(source, &arena) {
//!     Ok(unit) => println!("parsed {} items", unit.items().len()),
//!     Err(error) => eprintln!("parse error: {}", error),
//! }
//! ```

// Core types
pub mod node;
pub mod ops;

mod parser;

pub mod types;

pub mod expr;
mod expr_parser;

pub mod stmt;
mod stmt_parser;

pub mod decl;
mod decl_parser;

// Re-export error types from core
pub use seedc_core::{ParseError, ParseErrorKind};

pub use decl::*;
pub use expr::*;
pub use node::*;
pub use ops::*;
pub use parser::Parser;
pub use stmt::*;
pub use types::*;

/// A parsed translation unit.
///
/// The unit borrows from an arena allocator. All AST nodes are
/// allocated in the arena and remain valid for the lifetime of the
/// arena, so the unit is cheap to hand around by reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslationUnit<'ast> {
    items: &'ast [Item<'ast>],
    span: seedc_core::Span,
}

impl<'ast> TranslationUnit<'ast> {
    /// Assemble a unit from items. Also used by passes that rebuild
    /// the tree while reusing unchanged subtrees.
    pub fn new(items: &'ast [Item<'ast>], span: seedc_core::Span) -> Self {
        Self { items, span }
    }

    /// Get the top-level items in this unit.
    pub fn items(&self) -> &'ast [Item<'ast>] {
        self.items
    }

    /// Get the source location span of this unit.
    pub fn span(&self) -> seedc_core::Span {
        self.span
    }

    /// Iterate the function declarations in this unit.
    pub fn functions(&self) -> impl Iterator<Item = &'ast FunctionDecl<'ast>> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(func) => Some(func),
            Item::Global(_) => None,
        })
    }

    /// Find a function by name. Definitions win over prototypes when
    /// both are present.
    pub fn find_function(&self, name: &str) -> Option<&'ast FunctionDecl<'ast>> {
        let mut found = None;
        for func in self.functions() {
            if func.name.name != name {
                continue;
            }
            if func.is_definition() {
                return Some(func);
            }
            found.get_or_insert(func);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_function() {
        let arena = bumpalo::Bump::new();
        let source = "void foo(void) { }";
        let result = Parser::parse(source, &arena);
        assert!(result.is_ok());
        let unit = result.unwrap();
        assert_eq!(unit.items().len(), 1);
    }

    #[test]
    fn parse_with_errors() {
        let arena = bumpalo::Bump::new();
        let source = "int x = ;";
        let result = Parser::parse(source, &arena);
        assert!(result.is_err());
    }

    #[test]
    fn parse_expression_simple() {
        let arena = bumpalo::Bump::new();
        let result = Parser::expression("1 + 2", &arena);
        assert!(result.is_ok());
    }

    #[test]
    fn parse_expression_complex() {
        let arena = bumpalo::Bump::new();
        let result = Parser::expression("f(a + 1, g(b)) * -c", &arena);
        assert!(result.is_ok());
    }

    #[test]
    fn parse_expression_with_error() {
        let arena = bumpalo::Bump::new();
        let result = Parser::expression("1 +", &arena);
        assert!(result.is_err());
    }

    #[test]
    fn parse_statement_simple() {
        let arena = bumpalo::Bump::new();
        let result = Parser::statement("return 42;", &arena);
        assert!(result.is_ok());
    }

    #[test]
    fn parse_statement_if() {
        let arena = bumpalo::Bump::new();
        let result = Parser::statement("if (x > 0) { return x; }", &arena);
        assert!(result.is_ok());
    }

    #[test]
    fn parse_statement_for() {
        let arena = bumpalo::Bump::new();
        let result = Parser::statement("for (int i = 0; i < 10; i = i + 1) { }", &arena);
        assert!(result.is_ok());
    }

    #[test]
    fn parse_statement_with_error() {
        let arena = bumpalo::Bump::new();
        let result = Parser::statement("return return;", &arena);
        assert!(result.is_err());
    }

    #[test]
    fn parse_complete_program() {
        let arena = bumpalo::Bump::new();
        let source = r#"
            int counter = 0;

            int add(int a, int b) {
                return a + b;
            }

            void spin(int n) {
                int i;
                for (i = 0; i < n; i = i + 1) {
                    counter = add(counter, 1);
                }
            }

            int main(void) {
                spin(5);
                if (counter == 5) {
                    return 0;
                }
                return 1;
            }
        "#;

        let result = Parser::parse(source, &arena);
        assert!(result.is_ok(), "failed to parse complete program");

        let unit = result.unwrap();
        assert_eq!(unit.items().len(), 4); // global, add, spin, main
    }

    #[test]
    fn functions_iterator_skips_globals() {
        let arena = bumpalo::Bump::new();
        let source = "int g; int f(void) { return g; } char c;";
        let unit = Parser::parse(source, &arena).unwrap();
        let names: Vec<_> = unit.functions().map(|f| f.name.name).collect();
        assert_eq!(names, vec!["f"]);
    }

    #[test]
    fn find_function_prefers_definition() {
        let arena = bumpalo::Bump::new();
        let source = "int f(int x); int f(int x) { return x; }";
        let unit = Parser::parse(source, &arena).unwrap();
        let found = unit.find_function("f").unwrap();
        assert!(found.is_definition());
        assert!(unit.find_function("missing").is_none());
    }

    #[test]
    fn find_function_falls_back_to_prototype() {
        let arena = bumpalo::Bump::new();
        let unit = Parser::parse("int put_char(int c);", &arena).unwrap();
        let found = unit.find_function("put_char").unwrap();
        assert!(!found.is_definition());
    }

    #[test]
    fn unit_span_covers_items() {
        let arena = bumpalo::Bump::new();
        let unit = Parser::parse("int a;\nint b;", &arena).unwrap();
        assert_eq!(unit.span().line, 1);
        assert_eq!(unit.items()[1].span().line, 2);
    }

    #[test]
    fn unknown_token_aborts_with_span() {
        let arena = bumpalo::Bump::new();
        let err = Parser::parse("int x = $;", &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedExpression);
        assert_eq!(err.span.line, 1);
        assert_eq!(err.span.col, 9);
    }

    #[test]
    fn nothing_partial_escapes_a_failed_parse() {
        let arena = bumpalo::Bump::new();
        // Error in the second item: the whole unit is rejected.
        let source = "int good(void) { return 1; } int bad( { }";
        let result = Parser::parse(source, &arena);
        assert!(result.is_err());
    }
}
