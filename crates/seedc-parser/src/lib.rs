//! seedc parser crate.
//!
//! This crate provides the lexer and parser for the C source subset.
//! It includes:
//! - Lexical analysis (tokenization)
//! - Abstract Syntax Tree (AST) definitions
//! - Recursive-descent parser producing arena-allocated trees
//!
//! # Example
//!
//! ```
//! use seedc_parser::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     int add(int a, int b) {
//!         return a + b;
//!     }
//!
//!     int main(void) {
//!         return add(10, 20);
//!     }
//! "#;
//!
//! match Parser::parse(source, &arena) {
//!     Ok(unit) => println!("parsed {} items", unit.items().len()),
//!     Err(error) => eprintln!("parse failed: {}", error),
//! }
//! ```

// Lexer module
pub mod lexer;

// AST module
pub mod ast;

// Re-export commonly used types at crate root
pub use ast::{Parser, TranslationUnit};
pub use lexer::{Lexer, Token, TokenKind};
