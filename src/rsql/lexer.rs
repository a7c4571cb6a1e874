//! Single-pass scanner turning a filter string into tokens.

use super::token::{Token, TokenKind};
use crate::error::{Result, StorageError};

/// Fixed operator spellings, longest alternatives first.
const RESERVED: &[(&str, TokenKind)] = &[
    ("(", TokenKind::LeftParen),
    (")", TokenKind::RightParen),
    (",", TokenKind::Comma),
    ("!=~", TokenKind::NotLike),
    ("!=", TokenKind::NotEquals),
    ("==~", TokenKind::Like),
    ("==", TokenKind::Equals),
    (">=", TokenKind::GreaterOrEquals),
    (">", TokenKind::Greater),
    ("<=", TokenKind::LessOrEquals),
    ("<", TokenKind::Less),
    ("=in=", TokenKind::In),
    ("=out=", TokenKind::NotIn),
];

/// Lexer for the filter language.
///
/// Scans forward only; each call to [`Lexer::next_token`] yields one token
/// and the stream always ends with [`TokenKind::Eof`].
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenize the entire source, including the trailing EOF token.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_blank();
        if self.pos >= self.bytes.len() {
            return Ok(Token::new(TokenKind::Eof, "", self.pos));
        }

        let scanned = self
            .scan_bool()
            .or_else(|| self.scan_connective())
            .or_else(|| self.scan_date())
            .or_else(|| self.scan_number());
        if let Some((kind, end)) = scanned {
            return Ok(self.emit(kind, end));
        }
        if let Some(token) = self.scan_string()? {
            return Ok(token);
        }
        if let Some(end) = self.scan_identifier() {
            return Ok(self.emit(TokenKind::Identifier, end));
        }
        if let Some((kind, end)) = self.scan_reserved() {
            return Ok(self.emit(kind, end));
        }

        Err(StorageError::Lex {
            position: self.pos,
            message: format!("unknown token near '{}'", self.fragment()),
        })
    }

    fn emit(&mut self, kind: TokenKind, end: usize) -> Token {
        let token = Token::new(kind, &self.source[self.pos..end], self.pos);
        self.pos = end;
        token
    }

    fn fragment(&self) -> String {
        self.source[self.pos..].chars().take(16).collect()
    }

    fn scan_bool(&self) -> Option<(TokenKind, usize)> {
        ["true", "false"].iter().find_map(|word| {
            let end = self.pos + word.len();
            (self.starts_with(self.pos, word) && !self.is_ident_char(end))
                .then_some((TokenKind::Boolean, end))
        })
    }

    /// `and`/`or` only count as connectives when surrounded by blanks or the
    /// ends of the input; otherwise they are part of an identifier.
    fn scan_connective(&self) -> Option<(TokenKind, usize)> {
        let blank_before = self.pos == 0 || self.is_blank(self.pos - 1);
        if !blank_before {
            return None;
        }
        let candidates = [
            ("and", TokenKind::And),
            ("AND", TokenKind::And),
            ("or", TokenKind::Or),
            ("OR", TokenKind::Or),
        ];
        candidates.iter().find_map(|(word, kind)| {
            let end = self.pos + word.len();
            let blank_after = end == self.bytes.len() || self.is_blank(end);
            (self.starts_with(self.pos, word) && blank_after).then_some((*kind, end))
        })
    }

    /// `YYYY-MM-DD`, optionally followed by `THH:MM:SS` and `Z` or `±HH[[:]MM]`.
    fn scan_date(&self) -> Option<(TokenKind, usize)> {
        let i = self.pos;
        let is_date = self.digits(i, 4)
            && self.byte_is(i + 4, b'-')
            && self.digits(i + 5, 2)
            && self.byte_is(i + 7, b'-')
            && self.digits(i + 8, 2);
        if !is_date {
            return None;
        }

        let mut end = i + 10;
        let is_time = self.byte_is(end, b'T')
            && self.digits(end + 1, 2)
            && self.byte_is(end + 3, b':')
            && self.digits(end + 4, 2)
            && self.byte_is(end + 6, b':')
            && self.digits(end + 7, 2);
        if !is_time {
            return Some((TokenKind::Date, end));
        }

        end += 9;
        if self.byte_is(end, b'Z') {
            end += 1;
        } else if (self.byte_is(end, b'+') || self.byte_is(end, b'-')) && self.digits(end + 1, 2) {
            if self.byte_is(end + 3, b':') && self.digits(end + 4, 2) {
                end += 6;
            } else if self.digits(end + 3, 2) {
                end += 5;
            } else {
                end += 3;
            }
        }
        Some((TokenKind::DateTime, end))
    }

    fn scan_number(&self) -> Option<(TokenKind, usize)> {
        let mut i = self.pos;
        if self.byte_is(i, b'-') && self.digit_at(i + 1) {
            i += 1;
        }
        if !self.digit_at(i) {
            return None;
        }
        while self.digit_at(i) {
            i += 1;
        }
        if !self.byte_is(i, b'.') {
            return Some((TokenKind::Integer, i));
        }
        i += 1;
        while self.digit_at(i) {
            i += 1;
        }
        Some((TokenKind::Double, i))
    }

    /// Quoted string; the matching quote may be escaped with a backslash.
    fn scan_string(&mut self) -> Result<Option<Token>> {
        let quote = match self.bytes.get(self.pos) {
            Some(&q @ (b'\'' | b'"')) => q,
            _ => return Ok(None),
        };

        let start = self.pos;
        let mut i = start + 1;
        loop {
            match self.bytes.get(i) {
                None => {
                    return Err(StorageError::Lex {
                        position: start,
                        message: "unterminated quoted string".to_string(),
                    })
                }
                Some(&b) if b == quote && self.bytes[i - 1] != b'\\' => break,
                Some(_) => i += 1,
            }
        }

        let quote_char = char::from(quote);
        let raw = &self.source[start + 1..i];
        let value = raw.replace(&format!("\\{quote_char}"), &quote_char.to_string());
        self.pos = i + 1;
        Ok(Some(Token::new(TokenKind::String, value, start)))
    }

    /// `[a-zA-Z_$][a-zA-Z0-9_$]*` segments joined by dots.
    fn scan_identifier(&self) -> Option<usize> {
        let mut i = self.pos;
        if !self.alpha_at(i) {
            return None;
        }
        loop {
            while self.is_ident_char(i) {
                i += 1;
            }
            if self.byte_is(i, b'.') && self.alpha_at(i + 1) {
                i += 1;
            } else {
                return Some(i);
            }
        }
    }

    fn scan_reserved(&self) -> Option<(TokenKind, usize)> {
        RESERVED
            .iter()
            .find(|(text, _)| self.starts_with(self.pos, text))
            .map(|(text, kind)| (*kind, self.pos + text.len()))
    }

    fn skip_blank(&mut self) {
        while self.pos < self.bytes.len() && self.is_blank(self.pos) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, at: usize, text: &str) -> bool {
        self.bytes
            .get(at..at + text.len())
            .is_some_and(|s| s == text.as_bytes())
    }

    fn byte_is(&self, at: usize, b: u8) -> bool {
        self.bytes.get(at) == Some(&b)
    }

    fn is_blank(&self, at: usize) -> bool {
        matches!(self.bytes.get(at), Some(b' ' | b'\n' | b'\t' | b'\r'))
    }

    fn digit_at(&self, at: usize) -> bool {
        self.bytes.get(at).is_some_and(u8::is_ascii_digit)
    }

    fn digits(&self, at: usize, count: usize) -> bool {
        (at..at + count).all(|i| self.digit_at(i))
    }

    fn alpha_at(&self, at: usize) -> bool {
        matches!(self.bytes.get(at), Some(b) if b.is_ascii_alphabetic() || *b == b'_' || *b == b'$')
    }

    fn is_ident_char(&self, at: usize) -> bool {
        self.alpha_at(at) || self.digit_at(at)
    }
}

/// Tokenize `source` in one call.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}
