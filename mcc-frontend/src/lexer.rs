//! The lexer.
//!
//! Scans a source string into a token array ending with exactly one `Eof`
//! token. Whitespace and both comment styles are skipped; punctuators are
//! matched greedily (`<<=` over `<<` over `<`). The lexer never fails:
//! unscannable input becomes `Error` tokens that the parser reports as
//! diagnostics.

use crate::srcloc::SourceLoc;
use crate::token::{keyword, LexError, Token, TokenKind};

struct Lexer<'s> {
    source: &'s [u8],
    /// Start of the token being scanned.
    start: usize,
    current: usize,
    line: u32,
    column: u32,
}

fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

fn can_start_identifier(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        *self.source.get(self.current + 1).unwrap_or(&0)
    }

    /// Consume the current byte and return it.
    fn advance(&mut self) -> u8 {
        let b = self.source[self.current];
        self.current += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        b
    }

    /// Consume the current byte when it equals `expected`.
    fn matches(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.advance();
        true
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let len = (self.current - self.start) as u32;
        Token {
            kind,
            loc: SourceLoc {
                line: self.line,
                column: self.column - len,
                offset: self.start as u32,
            },
            len,
        }
    }

    /// Skip a `/* ... */` comment; the opening bytes are already consumed.
    /// Returns `false` when the comment runs to the end of the file.
    fn skip_block_comment(&mut self) -> bool {
        loop {
            if self.is_at_end() {
                return false;
            }
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance();
                self.advance();
                return true;
            }
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != b'\n' {
            self.advance();
        }
    }

    /// A maximal run of digits; if identifier characters continue the run
    /// the whole thing is an error token.
    fn scan_number(&mut self) -> Token {
        while is_digit(self.peek()) || can_start_identifier(self.peek()) {
            self.advance();
        }
        let all_digits = self.source[self.start..self.current]
            .iter()
            .all(|&b| is_digit(b));
        if all_digits {
            self.make_token(TokenKind::Integer)
        } else {
            self.make_token(TokenKind::Error(LexError::MalformedInteger))
        }
    }

    fn scan_identifier(&mut self, source: &str) -> Token {
        while is_digit(self.peek()) || can_start_identifier(self.peek()) {
            self.advance();
        }
        let text = &source[self.start..self.current];
        self.make_token(keyword(text).unwrap_or(TokenKind::Identifier))
    }

    fn next_token(&mut self, source: &str) -> Token {
        // Skip whitespace and comments; an unterminated block comment
        // surfaces as an error token.
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' | b'\n' => {
                    self.advance();
                }
                b'/' if self.peek_next() == b'/' => self.skip_line_comment(),
                b'/' if self.peek_next() == b'*' => {
                    let loc = SourceLoc {
                        line: self.line,
                        column: self.column,
                        offset: self.current as u32,
                    };
                    self.start = self.current;
                    self.advance();
                    self.advance();
                    if !self.skip_block_comment() {
                        // The token covers the whole unclosed comment.
                        return Token {
                            kind: TokenKind::Error(LexError::UnterminatedComment),
                            loc,
                            len: (self.current - self.start) as u32,
                        };
                    }
                }
                _ => break,
            }
        }

        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof);
        }

        let b = self.advance();
        if is_digit(b) {
            return self.scan_number();
        }
        if can_start_identifier(b) {
            return self.scan_identifier(source);
        }

        use TokenKind::*;
        let kind = match b {
            b'(' => LParen,
            b')' => RParen,
            b'{' => LBrace,
            b'}' => RBrace,
            b'[' => LBracket,
            b']' => RBracket,
            b';' => Semicolon,
            b',' => Comma,
            b'.' => Dot,
            b'?' => Question,
            b':' => Colon,
            b'~' => Tilde,
            b'+' => {
                if self.matches(b'+') {
                    PlusPlus
                } else if self.matches(b'=') {
                    PlusEq
                } else {
                    Plus
                }
            }
            b'-' => {
                if self.matches(b'-') {
                    MinusMinus
                } else if self.matches(b'=') {
                    MinusEq
                } else if self.matches(b'>') {
                    Arrow
                } else {
                    Minus
                }
            }
            b'*' => {
                if self.matches(b'=') {
                    StarEq
                } else {
                    Star
                }
            }
            b'/' => {
                if self.matches(b'=') {
                    SlashEq
                } else {
                    Slash
                }
            }
            b'%' => {
                if self.matches(b'=') {
                    PercentEq
                } else {
                    Percent
                }
            }
            b'&' => {
                if self.matches(b'&') {
                    AmpAmp
                } else if self.matches(b'=') {
                    AmpEq
                } else {
                    Amp
                }
            }
            b'|' => {
                if self.matches(b'|') {
                    PipePipe
                } else if self.matches(b'=') {
                    PipeEq
                } else {
                    Pipe
                }
            }
            b'^' => {
                if self.matches(b'=') {
                    CaretEq
                } else {
                    Caret
                }
            }
            b'=' => {
                if self.matches(b'=') {
                    EqEq
                } else {
                    Eq
                }
            }
            b'!' => {
                if self.matches(b'=') {
                    BangEq
                } else {
                    Bang
                }
            }
            b'<' => {
                if self.matches(b'<') {
                    if self.matches(b'=') {
                        LessLessEq
                    } else {
                        LessLess
                    }
                } else if self.matches(b'=') {
                    LessEq
                } else {
                    Less
                }
            }
            b'>' => {
                if self.matches(b'>') {
                    if self.matches(b'=') {
                        GreaterGreaterEq
                    } else {
                        GreaterGreater
                    }
                } else if self.matches(b'=') {
                    GreaterEq
                } else {
                    Greater
                }
            }
            _ => Error(LexError::UnexpectedCharacter),
        };
        self.make_token(kind)
    }
}

/// Scan `source` into a token array. The result always ends with exactly one
/// `Eof` token.
pub fn lex(source: &str) -> Box<[Token]> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token(source);
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    log::debug!("lexed {} tokens", tokens.len());
    tokens.into_boxed_slice()
}
