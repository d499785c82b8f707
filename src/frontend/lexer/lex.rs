//! Byte stream -> token stream.

use crate::frontend::errors::{CompileError, ErrorKind};
use crate::frontend::lexer::tokens::{CharPosition, SourceSpan, Token, TokenKind};
use crate::frontend::string_interning::StringTable;
use crate::frontend::dev_log::token_log;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::Chars;

struct Scanner<'a> {
    file: PathBuf,
    chars: Peekable<Chars<'a>>,
    pos: CharPosition,
    start: CharPosition,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str, file: PathBuf) -> Self {
        Self {
            file,
            chars: source.chars().peekable(),
            pos: CharPosition { line: 1, column: 0 },
            start: CharPosition { line: 1, column: 0 },
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 0;
        } else {
            self.pos.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn mark_start(&mut self) {
        self.start = self.pos;
    }

    fn span(&self) -> SourceSpan {
        SourceSpan::new(self.file.clone(), self.start, self.pos)
    }

    fn lex_error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(ErrorKind::Lex, message, self.span())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn keyword(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match word {
        "if" => If,
        "else" => Else,
        "while" => While,
        "for" => For,
        "in" => In,
        "return" => Return,
        "match" => Match,
        "fn" => Fn,
        "struct" => Struct,
        "err" => Err,
        "extern" => Extern,
        "import" => Import,
        "private" => Private,
        "true" => True,
        "false" => False,
        "none" => None,
        "is" => Is,
        "int" => Int,
        "str" => Str,
        "bool" => Bool,
        "char" => Char,
        "f32" => F32,
        "f64" => F64,
        "u32" => U32,
        "u64" => U64,
        "cint" => Cint,
        "cstr" => Cstr,
        "void" => Void,
        "go" => Go,
        "Channel" => Channel,
        "select" => Select,
        "case" => Case,
        "fail" => Fail,
        "or" => Or,
        "default" => Default,
        "List" => List,
        "with" => With,
        "as" => As,
        "await" => Await,
        _ => return None,
    })
}

/// Tokenize `source`, yielding a finite sequence terminated by `Eof`, or the
/// first `LexError` encountered. Identifiers, string literals, and doc
/// comments are interned into `strings` as they're scanned.
pub fn tokenize(
    source: &str,
    file: &Path,
    strings: &mut StringTable,
) -> Result<Vec<Token>, CompileError> {
    let mut scanner = Scanner::new(source, file.to_path_buf());
    let mut tokens = Vec::with_capacity(source.len() / 5);

    loop {
        scanner.mark_start();
        let Some(c) = scanner.advance() else {
            tokens.push(Token::new(TokenKind::Eof, "", scanner.span()));
            break;
        };

        if c.is_whitespace() {
            continue;
        }

        if c == '/' && scanner.peek() == Some('/') {
            scanner.advance();
            let is_doc = scanner.peek() == Some('/');
            if is_doc {
                scanner.advance();
            }
            let mut text = String::new();
            while let Some(next) = scanner.peek() {
                if next == '\n' {
                    break;
                }
                text.push(next);
                scanner.advance();
            }
            if is_doc {
                let stripped = text.strip_prefix(' ').unwrap_or(&text).to_string();
                let id = strings.intern(&stripped);
                let span = scanner.span();
                token_log!("doc comment: {}", stripped);
                tokens.push(Token::new(TokenKind::DocComment(id), text, span));
            }
            continue;
        }

        if c.is_ascii_digit() {
            let mut lexeme = String::new();
            lexeme.push(c);
            let mut is_float = false;
            while let Some(next) = scanner.peek() {
                if next.is_ascii_digit() {
                    lexeme.push(next);
                    scanner.advance();
                } else if next == '.' && !is_float {
                    // `..` is the range operator, not a decimal point: don't
                    // consume it as part of the number.
                    let mut lookahead = scanner.chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'.') {
                        break;
                    }
                    is_float = true;
                    lexeme.push(next);
                    scanner.advance();
                } else {
                    break;
                }
            }
            let span = scanner.span();
            let kind = if is_float {
                TokenKind::FloatLiteral(lexeme.parse().map_err(|_| {
                    scanner.lex_error(format!("invalid float literal '{lexeme}'"))
                })?)
            } else {
                TokenKind::IntLiteral(lexeme.parse().map_err(|_| {
                    scanner.lex_error(format!("invalid integer literal '{lexeme}'"))
                })?)
            };
            tokens.push(Token::new(kind, lexeme, span));
            continue;
        }

        if is_ident_start(c) {
            let mut lexeme = String::new();
            lexeme.push(c);
            while let Some(next) = scanner.peek() {
                if is_ident_continue(next) {
                    lexeme.push(next);
                    scanner.advance();
                } else {
                    break;
                }
            }
            let kind = keyword(&lexeme).unwrap_or_else(|| {
                TokenKind::Identifier(strings.intern(&lexeme))
            });
            tokens.push(Token::new(kind, lexeme, scanner.span()));
            continue;
        }

        if c == '"' {
            let mut text = String::new();
            let mut terminated = false;
            while let Some(next) = scanner.advance() {
                if next == '"' {
                    terminated = true;
                    break;
                }
                text.push(next);
            }
            if !terminated {
                return Err(scanner.lex_error("unterminated string literal"));
            }
            let id = strings.intern(&text);
            tokens.push(Token::new(TokenKind::StringLiteral(id), text, scanner.span()));
            continue;
        }

        if c == '\'' {
            let inner = scanner.advance();
            let closing = scanner.advance();
            match (inner, closing) {
                (Some(ch), Some('\'')) if ch.is_ascii() => {
                    let span = scanner.span();
                    tokens.push(Token::new(TokenKind::CharLiteral(ch as u8), ch.to_string(), span));
                }
                (Some('\''), _) => {
                    return Err(scanner.lex_error("empty character literal"));
                }
                _ => return Err(scanner.lex_error("unterminated character literal")),
            }
            continue;
        }

        macro_rules! two_char {
            ($second:expr, $two:expr, $one:expr) => {{
                if scanner.peek() == Some($second) {
                    scanner.advance();
                    tokens.push(Token::new($two, format!("{c}{}", $second), scanner.span()));
                } else {
                    tokens.push(Token::new($one, c.to_string(), scanner.span()));
                }
            }};
        }

        match c {
            '-' => {
                if scanner.peek() == Some('>') {
                    scanner.advance();
                    tokens.push(Token::new(TokenKind::Arrow, "->", scanner.span()));
                } else if scanner.peek() == Some('=') {
                    scanner.advance();
                    tokens.push(Token::new(TokenKind::MinusEqual, "-=", scanner.span()));
                } else {
                    tokens.push(Token::new(TokenKind::Minus, "-", scanner.span()));
                }
            }
            ':' => {
                if scanner.peek() == Some('=') {
                    scanner.advance();
                    tokens.push(Token::new(TokenKind::ColonEquals, ":=", scanner.span()));
                } else if scanner.peek() == Some(':') {
                    scanner.advance();
                    tokens.push(Token::new(TokenKind::DoubleColon, "::", scanner.span()));
                } else {
                    tokens.push(Token::new(TokenKind::Colon, ":", scanner.span()));
                }
            }
            '.' => two_char!('.', TokenKind::DotDot, TokenKind::Dot),
            '=' => two_char!('=', TokenKind::EqualEqual, TokenKind::Equals),
            '!' => two_char!('=', TokenKind::NotEqual, TokenKind::Bang),
            '<' => two_char!('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => two_char!('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '+' => two_char!('=', TokenKind::PlusEqual, TokenKind::Plus),
            '*' => two_char!('=', TokenKind::StarEqual, TokenKind::Star),
            '/' => two_char!('=', TokenKind::SlashEqual, TokenKind::Slash),
            '(' => tokens.push(Token::new(TokenKind::LParen, "(", scanner.span())),
            ')' => tokens.push(Token::new(TokenKind::RParen, ")", scanner.span())),
            '{' => tokens.push(Token::new(TokenKind::LBrace, "{", scanner.span())),
            '}' => tokens.push(Token::new(TokenKind::RBrace, "}", scanner.span())),
            '[' => tokens.push(Token::new(TokenKind::LBracket, "[", scanner.span())),
            ']' => tokens.push(Token::new(TokenKind::RBracket, "]", scanner.span())),
            ',' => tokens.push(Token::new(TokenKind::Comma, ",", scanner.span())),
            ';' => tokens.push(Token::new(TokenKind::Semicolon, ";", scanner.span())),
            '@' => tokens.push(Token::new(TokenKind::At, "@", scanner.span())),
            '&' => tokens.push(Token::new(TokenKind::Ampersand, "&", scanner.span())),
            '?' => tokens.push(Token::new(TokenKind::Question, "?", scanner.span())),
            _ => {
                // Unknown byte: skipped, not fatal, per spec.
                token_log!("skipping unknown byte '{}'", c);
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut strings = StringTable::new();
        tokenize(source, Path::new("t.gl"), &mut strings)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn every_keyword_round_trips_to_its_own_token_kind() {
        use TokenKind::*;
        let pairs = [
            ("if", If), ("else", Else), ("while", While), ("for", For), ("in", In),
            ("return", Return), ("match", Match), ("fn", Fn), ("struct", Struct), ("err", Err),
            ("extern", Extern), ("import", Import), ("private", Private), ("true", True),
            ("false", False), ("none", None), ("is", Is), ("int", Int), ("str", Str),
            ("bool", Bool), ("char", Char), ("f32", F32), ("f64", F64), ("u32", U32),
            ("u64", U64), ("cint", Cint), ("cstr", Cstr), ("void", Void), ("go", Go),
            ("Channel", Channel), ("select", Select), ("case", Case), ("fail", Fail),
            ("or", Or), ("default", Default), ("List", List), ("with", With), ("as", As),
            ("await", Await),
        ];
        for (word, expected) in pairs {
            let got = &kinds(word)[0];
            assert_eq!(got, &expected, "keyword '{word}' lexed as {got:?}");
        }
    }

    #[test]
    fn a_word_that_is_not_a_keyword_is_an_identifier() {
        assert!(matches!(kinds("total_count")[0], TokenKind::Identifier(_)));
    }

    #[test]
    fn line_numbers_count_preceding_newlines() {
        let mut strings = StringTable::new();
        let tokens = tokenize("fn\nmain\n\n()", Path::new("t.gl"), &mut strings).unwrap();
        assert_eq!(tokens[0].span.line(), 1); // fn
        assert_eq!(tokens[1].span.line(), 2); // main
        assert_eq!(tokens[2].span.line(), 4); // (
    }

    #[test]
    fn plain_line_comments_produce_no_token() {
        assert_eq!(kinds("// just a comment\nfn"), vec![TokenKind::Fn, TokenKind::Eof]);
    }

    #[test]
    fn doc_comments_emit_a_doc_comment_token_with_the_leading_space_stripped() {
        let mut strings = StringTable::new();
        let tokens = tokenize("/// does a thing\nfn", Path::new("t.gl"), &mut strings).unwrap();
        match &tokens[0].kind {
            TokenKind::DocComment(id) => assert_eq!(strings.resolve(*id), "does a thing"),
            other => panic!("expected a doc comment token, got {other:?}"),
        }
    }

    #[test]
    fn dot_dot_after_a_digit_is_a_range_not_a_decimal_point() {
        assert_eq!(
            kinds("0..10"),
            vec![
                TokenKind::IntLiteral(0),
                TokenKind::DotDot,
                TokenKind::IntLiteral(10),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn a_single_dot_after_a_digit_starts_a_float() {
        assert_eq!(kinds("3.5")[0], TokenKind::FloatLiteral(3.5));
    }

    #[test]
    fn string_literals_intern_their_contents() {
        let mut strings = StringTable::new();
        let tokens = tokenize("\"hi there\"", Path::new("t.gl"), &mut strings).unwrap();
        match &tokens[0].kind {
            TokenKind::StringLiteral(id) => assert_eq!(strings.resolve(*id), "hi there"),
            other => panic!("expected a string literal token, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_literal_is_a_lex_error() {
        let mut strings = StringTable::new();
        assert!(tokenize("\"oops", Path::new("t.gl"), &mut strings).is_err());
    }

    #[test]
    fn char_literals_lex_to_their_byte_value() {
        assert_eq!(kinds("'a'")[0], TokenKind::CharLiteral(b'a'));
    }

    #[test]
    fn colon_equals_and_double_colon_are_distinguished_from_a_bare_colon() {
        assert_eq!(
            kinds(": := ::"),
            vec![TokenKind::Colon, TokenKind::ColonEquals, TokenKind::DoubleColon, TokenKind::Eof]
        );
    }

    #[test]
    fn unknown_bytes_are_skipped_rather_than_erroring() {
        let mut strings = StringTable::new();
        let tokens = tokenize("fn # main", Path::new("t.gl"), &mut strings).unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Fn));
        assert!(matches!(tokens[1].kind, TokenKind::Identifier(_)));
        assert!(matches!(tokens[2].kind, TokenKind::Eof));
    }
}
