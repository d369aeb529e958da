use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};
use crate::token::{Keyword, Token, SYMBOLS};

/// Maximum value of a Jack integer constant.
pub const MAX_INT_CONST: u32 = 32767;

pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Spanned<Token>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Token> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return self.make_token(Token::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.source[self.pos];

            if ch == b'"' {
                return self.scan_string(start);
            }

            if ch.is_ascii_digit() {
                return self.scan_number();
            }

            if is_ident_start(ch) {
                return self.scan_ident_or_keyword();
            }

            if SYMBOLS.as_bytes().contains(&ch) {
                self.pos += 1;
                return self.make_token(Token::Symbol(ch as char), start, self.pos);
            }

            // Unknown character: record an error and keep scanning
            self.pos += 1;
            self.diagnostics.push(
                Diagnostic::error(
                    format!("unexpected character '{}' (U+{:04X})", ch as char, ch),
                    Span::new(start as u32, self.pos as u32),
                )
                .with_help("this character is not part of Jack syntax".to_string()),
            );
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            // Line comment: // to end of line
            if self.starts_with(b"//") {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            // Block comment: /* to the first */, not nested.
            // An unterminated block comment consumes to end of input.
            if self.starts_with(b"/*") {
                self.pos += 2;
                while self.pos < self.source.len() && !self.starts_with(b"*/") {
                    self.pos += 1;
                }
                if self.pos < self.source.len() {
                    self.pos += 2;
                }
                continue;
            }

            break;
        }
    }

    fn scan_string(&mut self, start: usize) -> Spanned<Token> {
        self.pos += 1; // opening quote
        let text_start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos] != b'"' {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[text_start..self.pos])
            .unwrap_or_default()
            .to_string();
        if self.pos >= self.source.len() {
            self.diagnostics.push(
                Diagnostic::error(
                    "unterminated string constant".to_string(),
                    Span::new(start as u32, self.pos as u32),
                )
                .with_help("every string constant must have a closing '\"'".to_string()),
            );
            return self.make_token(Token::StrConst(text), start, self.pos);
        }
        self.pos += 1; // closing quote
        self.make_token(Token::StrConst(text), start, self.pos)
    }

    fn scan_number(&mut self) -> Spanned<Token> {
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        match text.parse::<u32>() {
            Ok(n) if n <= MAX_INT_CONST => self.make_token(Token::IntConst(n as u16), start, self.pos),
            _ => {
                self.diagnostics.push(
                    Diagnostic::error(
                        format!("integer constant '{}' is out of range", text),
                        Span::new(start as u32, self.pos as u32),
                    )
                    .with_help(format!("maximum integer constant is {}", MAX_INT_CONST)),
                );
                self.make_token(Token::IntConst(0), start, self.pos)
            }
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Token> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        let token = match Keyword::from_str(text) {
            Some(kw) => Token::Keyword(kw),
            None => Token::Ident(text.to_string()),
        };
        self.make_token(token, start, self.pos)
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.source[self.pos..].starts_with(prefix)
    }

    fn make_token(&self, token: Token, start: usize, end: usize) -> Spanned<Token> {
        Spanned::new(token, Span::new(start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
