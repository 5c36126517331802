//! The lexer: source text to tokens.

use bumpalo::Bump;
use seedc_core::Span;

use crate::lexer::cursor::Cursor;
use crate::lexer::token::{Token, TokenKind, lookup_keyword};

/// Streaming lexer over C source text.
///
/// The lexer is total: input it does not recognize comes back as
/// [`TokenKind::Unknown`] tokens rather than errors, and the parser
/// decides what to do with them. Lexemes are copied into the arena so
/// tokens outlive the source string.
pub struct Lexer<'src, 'ast> {
    cursor: Cursor<'src>,
    arena: &'ast Bump,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
        }
    }

    /// Lex an entire source string. The returned stream always ends
    /// with exactly one [`TokenKind::Eof`] token.
    pub fn tokenize(source: &'src str, arena: &'ast Bump) -> Vec<Token<'ast>> {
        let mut lexer = Lexer::new(source, arena);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    /// Produce the next token, skipping whitespace, comments and
    /// preprocessor lines.
    pub fn next_token(&mut self) -> Token<'ast> {
        self.skip_trivia();

        let start = self.cursor.offset();
        let line = self.cursor.line();
        let column = self.cursor.column();

        let Some(c) = self.cursor.advance() else {
            return Token::new(TokenKind::Eof, "", Span::point(line, column));
        };

        let kind = match c {
            c if is_ident_start(c) => self.identifier(start),
            c if c.is_ascii_digit() => self.number(),
            '\'' => self.quoted(TokenKind::CharLiteral, '\''),
            '"' => self.quoted(TokenKind::StringLiteral, '"'),

            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,

            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                if self.cursor.eat('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            '!' => {
                if self.cursor.eat('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.cursor.eat('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.cursor.eat('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '&' => {
                if self.cursor.eat('&') {
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.cursor.eat('|') {
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }

            _ => TokenKind::Unknown,
        };

        self.make_token(kind, start, line, column)
    }

    fn make_token(&mut self, kind: TokenKind, start: usize, line: u32, column: u32) -> Token<'ast> {
        let text = self.cursor.slice_from(start);
        let lexeme = self.arena.alloc_str(text);
        Token::new(kind, lexeme, Span::new(line, column, text.len() as u32))
    }

    /// Whitespace, `//` and `/* */` comments, and `#...` preprocessor
    /// lines are all skipped wholesale between tokens.
    fn skip_trivia(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(c) if c.is_whitespace() => {
                    self.cursor.advance();
                }
                Some('#') => self.cursor.eat_while(|c| c != '\n'),
                Some('/') if self.cursor.peek_nth(1) == Some('/') => {
                    self.cursor.eat_while(|c| c != '\n');
                }
                Some('/') if self.cursor.peek_nth(1) == Some('*') => self.block_comment(),
                _ => break,
            }
        }
    }

    fn block_comment(&mut self) {
        self.cursor.advance();
        self.cursor.advance();
        // An unterminated block comment just runs to end of input.
        while let Some(c) = self.cursor.advance() {
            if c == '*' && self.cursor.eat('/') {
                break;
            }
        }
    }

    fn identifier(&mut self, start: usize) -> TokenKind {
        self.cursor.eat_while(is_ident_continue);
        lookup_keyword(self.cursor.slice_from(start)).unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        self.cursor.eat_while(|c| c.is_ascii_digit());
        // A fractional part needs a digit after the dot so that member
        // style input never merges into a number by accident.
        if self.cursor.check('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    /// Scan a quoted literal after the opening quote was consumed.
    /// Unterminated literals (newline or end of input before the
    /// closing quote) come back as `Unknown`.
    fn quoted(&mut self, kind: TokenKind, quote: char) -> TokenKind {
        loop {
            match self.cursor.peek() {
                None | Some('\n') => return TokenKind::Unknown,
                Some(c) if c == quote => {
                    self.cursor.advance();
                    return kind;
                }
                Some('\\') => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let arena = Bump::new();
        Lexer::tokenize(source, &arena)
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("int main intx"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn two_char_operators_win_over_one() {
        assert_eq!(
            kinds("== = != <= < >= > && & || |"),
            vec![
                TokenKind::EqualEqual,
                TokenKind::Equal,
                TokenKind::BangEqual,
                TokenKind::LessEqual,
                TokenKind::Less,
                TokenKind::GreaterEqual,
                TokenKind::Greater,
                TokenKind::AmpAmp,
                TokenKind::Amp,
                TokenKind::PipePipe,
                TokenKind::Pipe,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn comments_and_directives_are_trivia() {
        let source = "#include <stdio.h>\nint x; // tail\n/* block\n comment */ char";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Char,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn number_literals() {
        assert_eq!(
            kinds("42 3.14 7."),
            vec![
                TokenKind::IntLiteral,
                TokenKind::FloatLiteral,
                TokenKind::IntLiteral,
                TokenKind::Unknown, // the dangling dot
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn quoted_literals_keep_quotes_in_lexeme() {
        let arena = Bump::new();
        let tokens = Lexer::tokenize(r#"'a' '\n' "hi\t""#, &arena);
        assert_eq!(tokens[0].kind, TokenKind::CharLiteral);
        assert_eq!(tokens[0].lexeme, "'a'");
        assert_eq!(tokens[1].kind, TokenKind::CharLiteral);
        assert_eq!(tokens[1].lexeme, r"'\n'");
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[2].lexeme, r#""hi\t""#);
    }

    #[test]
    fn unterminated_string_is_unknown() {
        let arena = Bump::new();
        let tokens = Lexer::tokenize("\"run away\nint", &arena);
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].kind, TokenKind::Int);
    }

    #[test]
    fn unrecognized_byte_is_unknown() {
        assert_eq!(
            kinds("a $ b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Unknown,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn spans_track_lines() {
        let arena = Bump::new();
        let tokens = Lexer::tokenize("int\n  return", &arena);
        assert_eq!(tokens[0].span, Span::new(1, 1, 3));
        assert_eq!(tokens[1].span, Span::new(2, 3, 6));
    }

    #[test]
    fn empty_source_yields_single_eof() {
        let arena = Bump::new();
        let tokens = Lexer::tokenize("", &arena);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(tokens[0].span, Span::point(1, 1));
    }

    #[test]
    fn unterminated_block_comment_ends_input() {
        assert_eq!(kinds("int /* trailing"), vec![TokenKind::Int, TokenKind::Eof]);
    }
}
