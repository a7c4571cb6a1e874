//! Token definitions for the filter language.

use std::fmt;

/// Kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Integer,
    Double,
    Date,
    DateTime,
    Boolean,
    Identifier,
    String,
    LeftParen,
    RightParen,
    Or,
    And,
    Equals,
    NotEquals,
    Like,
    NotLike,
    Greater,
    GreaterOrEquals,
    Less,
    LessOrEquals,
    In,
    NotIn,
    Comma,
    Eof,
}

impl TokenKind {
    /// Whether this token starts a literal value.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Integer
                | TokenKind::Double
                | TokenKind::Date
                | TokenKind::DateTime
                | TokenKind::Boolean
                | TokenKind::String
        )
    }

    /// Whether this token is a comparison operator.
    pub fn is_comparator(self) -> bool {
        matches!(
            self,
            TokenKind::Equals
                | TokenKind::NotEquals
                | TokenKind::Like
                | TokenKind::NotLike
                | TokenKind::Greater
                | TokenKind::GreaterOrEquals
                | TokenKind::Less
                | TokenKind::LessOrEquals
                | TokenKind::In
                | TokenKind::NotIn
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Integer => "integer",
            TokenKind::Double => "double",
            TokenKind::Date => "date",
            TokenKind::DateTime => "date-time",
            TokenKind::Boolean => "boolean",
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::Or => "'or'",
            TokenKind::And => "'and'",
            TokenKind::Equals => "'=='",
            TokenKind::NotEquals => "'!='",
            TokenKind::Like => "'==~'",
            TokenKind::NotLike => "'!=~'",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterOrEquals => "'>='",
            TokenKind::Less => "'<'",
            TokenKind::LessOrEquals => "'<='",
            TokenKind::In => "'=in='",
            TokenKind::NotIn => "'=out='",
            TokenKind::Comma => "','",
            TokenKind::Eof => "end of input",
        };
        f.write_str(s)
    }
}

/// A token with its text and byte offset in the source.
///
/// For strings `value` holds the unquoted, unescaped content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            position,
        }
    }
}
