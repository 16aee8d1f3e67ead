//! Lexical scanner (spec.md §4.1): source text to a token stream.

use peekmore::{PeekMore, PeekMoreIterator};
use std::str::Chars;

use crate::error::{ErrorSink, ScanError};
use crate::literal::Literal;
use crate::token::{Token, Type};

pub struct Scanner<'a> {
    source: PeekMoreIterator<Chars<'a>>,
    tokens: Vec<Token>,
    lexeme: String,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source: source.chars().peekmore(),
            tokens: Vec::new(),
            lexeme: String::new(),
            line: 1,
        }
    }

    /// Scans the whole source, reporting each malformed token through
    /// `sink` and continuing past it, per spec.md §4.1 ("never fails
    /// fatally"). Always ends with exactly one `EOF` token.
    pub fn scan_tokens(mut self, sink: &mut dyn ErrorSink) -> Vec<Token> {
        while !self.is_at_end() {
            self.lexeme.clear();
            self.scan_token(sink);
        }

        self.tokens.push(Token::new(Type::Eof, String::new(), None, self.line));
        self.tokens
    }

    fn is_at_end(&mut self) -> bool {
        self.source.peek().is_none()
    }

    fn advance(&mut self) -> char {
        let c = self.source.next().expect("advance called past end of source");
        self.lexeme.push(c);
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.source.peek().copied()
    }

    fn peek_next(&mut self) -> Option<char> {
        self.source.peek_next().copied()
    }

    /// Consumes the next character if it matches `expected`.
    fn match_char(&mut self, expected: char) -> bool {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn add_token(&mut self, r#type: Type, literal: Option<Literal>) {
        self.tokens.push(Token::new(r#type, self.lexeme.clone(), literal, self.line));
    }

    fn scan_token(&mut self, sink: &mut dyn ErrorSink) {
        let c = self.advance();
        match c {
            '(' => self.add_token(Type::LeftParen, None),
            ')' => self.add_token(Type::RightParen, None),
            '{' => self.add_token(Type::LeftBrace, None),
            '}' => self.add_token(Type::RightBrace, None),
            ',' => self.add_token(Type::Comma, None),
            '.' => self.add_token(Type::Dot, None),
            '-' => self.add_token(Type::Minus, None),
            '+' => self.add_token(Type::Plus, None),
            ';' => self.add_token(Type::Semicolon, None),
            '*' => self.add_token(Type::Star, None),

            '!' => {
                let t = if self.match_char('=') { Type::BangEqual } else { Type::Bang };
                self.add_token(t, None);
            }
            '=' => {
                let t = if self.match_char('=') { Type::EqualEqual } else { Type::Equal };
                self.add_token(t, None);
            }
            '<' => {
                let t = if self.match_char('=') { Type::LessEqual } else { Type::Less };
                self.add_token(t, None);
            }
            '>' => {
                let t = if self.match_char('=') { Type::GreaterEqual } else { Type::Greater };
                self.add_token(t, None);
            }

            '/' => {
                if self.match_char('/') {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                } else {
                    self.add_token(Type::Slash, None);
                }
            }

            ' ' | '\r' | '\t' => {}

            '\n' => {
                self.line += 1;
            }

            '"' => self.string(sink, '"'),
            '\'' => self.string(sink, '\''),

            c if c.is_ascii_digit() => self.number(sink),

            c if c.is_alphabetic() || c == '_' => self.identifier(),

            other => {
                sink.scan_error(&ScanError {
                    line: self.line,
                    message: format!("Unexpected character '{other}'"),
                });
            }
        }
    }

    /// spec.md §4.1: a string may span lines and be delimited by either `"`
    /// or `'`; the stored literal excludes the delimiting quotes and must be
    /// closed by the same quote character that opened it.
    fn string(&mut self, sink: &mut dyn ErrorSink, quote: char) {
        let start_line = self.line;
        let mut value = String::new();

        loop {
            match self.peek() {
                Some(c) if c == quote => break,
                Some(c) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    value.push(c);
                    self.advance();
                }
                None => {
                    sink.scan_error(&ScanError {
                        line: start_line,
                        message: "Unterminated string".to_string(),
                    });
                    return;
                }
            }
        }

        self.advance(); // consume the closing quote.
        self.add_token(Type::String, Some(Literal::String(value)));
    }

    /// spec.md §4.1: `[0-9]+` with an optional `.[0-9]+` fractional part.
    fn number(&mut self, sink: &mut dyn ErrorSink) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') {
            if self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(); // consume the '.'.
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                sink.scan_error(&ScanError {
                    line: self.line,
                    message: "Unterminated number".to_string(),
                });
                return;
            }
        }

        let value: f64 = self.lexeme.parse().expect("scanned digits to parse as a number");
        self.add_token(Type::Number, Some(Literal::Number(value)));
    }

    /// spec.md §4.1: `[A-Za-z][A-Za-z0-9_]*`, matched against the reserved
    /// word table.
    fn identifier(&mut self) {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }

        let r#type = match self.lexeme.as_str() {
            "and" => Type::And,
            "class" => Type::Class,
            "else" => Type::Else,
            "false" => Type::False,
            "for" => Type::For,
            "fun" => Type::Fun,
            "if" => Type::If,
            "nil" => Type::Nil,
            "or" => Type::Or,
            "print" => Type::Print,
            "return" => Type::Return,
            "super" => Type::Super,
            "this" => Type::This,
            "true" => Type::True,
            "var" => Type::Var,
            "while" => Type::While,
            "break" => Type::Break,
            "continue" => Type::Continue,
            _ => Type::Identifier,
        };

        self.add_token(r#type, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;

    fn scan(source: &str) -> Vec<Token> {
        let mut sink = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut sink);
        assert!(!sink.had_error(), "source scanned with an error: {source:?}");
        tokens
    }

    #[test]
    fn scans_single_and_double_char_operators() {
        let tokens = scan("!= == <= >= < > ! =");
        let types: Vec<_> = tokens.iter().map(|t| t.r#type).collect();
        assert_eq!(
            types,
            vec![
                Type::BangEqual, Type::EqualEqual, Type::LessEqual, Type::GreaterEqual,
                Type::Less, Type::Greater, Type::Bang, Type::Equal, Type::Eof,
            ]
        );
    }

    #[test]
    fn ends_with_exactly_one_eof() {
        let tokens = scan("var a = 1;");
        assert_eq!(tokens.last().unwrap().r#type, Type::Eof);
        assert_eq!(tokens.iter().filter(|t| t.r#type == Type::Eof).count(), 1);
    }

    #[test]
    fn number_literal_stores_float_value() {
        let tokens = scan("3.5");
        assert_eq!(tokens[0].literal, Some(Literal::Number(3.5)));
    }

    #[test]
    fn string_literal_excludes_quotes_and_tracks_newlines() {
        let tokens = scan("\"a\nb\"");
        assert_eq!(tokens[0].literal, Some(Literal::String("a\nb".to_string())));
        let tokens = scan("\"a\nb\"\nvar");
        let var_token = tokens.iter().find(|t| t.r#type == Type::Var).unwrap();
        assert_eq!(var_token.line, 3);
    }

    #[test]
    fn single_quotes_delimit_strings_too() {
        let tokens = scan("'hi'");
        assert_eq!(tokens[0].r#type, Type::String);
        assert_eq!(tokens[0].literal, Some(Literal::String("hi".to_string())));
    }

    #[test]
    fn a_quote_does_not_terminate_a_string_opened_with_the_other_quote() {
        let tokens = scan("'she said \"hi\"'");
        assert_eq!(tokens[0].literal, Some(Literal::String("she said \"hi\"".to_string())));
    }

    #[test]
    fn unterminated_string_reports_scan_error() {
        let mut sink = Diagnostics::new();
        Scanner::new("\"abc").scan_tokens(&mut sink);
        assert!(sink.had_error());
    }

    #[test]
    fn unexpected_character_reports_and_continues() {
        let mut sink = Diagnostics::new();
        let tokens = Scanner::new("1 @ 2").scan_tokens(&mut sink);
        assert!(sink.had_error());
        let types: Vec<_> = tokens.iter().map(|t| t.r#type).collect();
        assert_eq!(types, vec![Type::Number, Type::Number, Type::Eof]);
    }

    #[test]
    fn keywords_are_classified_not_identifiers() {
        let tokens = scan("class this super break continue");
        let types: Vec<_> = tokens.iter().map(|t| t.r#type).collect();
        assert_eq!(
            types,
            vec![Type::Class, Type::This, Type::Super, Type::Break, Type::Continue, Type::Eof]
        );
    }
}
